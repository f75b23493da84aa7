//! Markdown rendering with deterministic heading ids and bare-URL autolinks.

use std::collections::HashSet;

use pulldown_cmark::{CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd, html};

use crate::config::MarkdownConfig;

#[derive(thiserror::Error, Debug)]
pub enum MarkdownError {
    #[error("invalid markdown extension: {0}")]
    InvalidExtension(String),
}

/// Parser options and post-processing switches resolved from config.
#[derive(Debug, Clone, Copy)]
struct RenderOptions {
    parser: Options,
    autolink: bool,
}

impl RenderOptions {
    fn from_config(config: &MarkdownConfig) -> Result<Self, MarkdownError> {
        let mut parser = Options::empty();
        let mut autolink = false;
        for extension in &config.extensions {
            match extension.as_str() {
                "autolink" => autolink = true,
                "definition_lists" => parser.insert(Options::ENABLE_DEFINITION_LIST),
                "footnotes" => parser.insert(Options::ENABLE_FOOTNOTES),
                "gfm" => parser.insert(Options::ENABLE_GFM),
                "heading_attributes" => parser.insert(Options::ENABLE_HEADING_ATTRIBUTES),
                "smart_punctuation" => parser.insert(Options::ENABLE_SMART_PUNCTUATION),
                "strikethrough" => parser.insert(Options::ENABLE_STRIKETHROUGH),
                "tables" => parser.insert(Options::ENABLE_TABLES),
                "tasklists" => parser.insert(Options::ENABLE_TASKLISTS),
                other => return Err(MarkdownError::InvalidExtension(other.to_string())),
            }
        }
        Ok(Self { parser, autolink })
    }
}

/// Check that every configured extension is known.
pub fn validate_config(config: &MarkdownConfig) -> Result<(), MarkdownError> {
    RenderOptions::from_config(config).map(|_| ())
}

/// Render markdown to HTML using pulldown-cmark.
///
/// Headings without an explicit id get one derived from their text, so the
/// same document always renders to the same anchors.
pub fn render_markdown(markdown: &str, config: &MarkdownConfig) -> Result<String, MarkdownError> {
    let options = RenderOptions::from_config(config)?;
    let parser = Parser::new_ext(markdown, options.parser);

    let events: Vec<Event> = if options.autolink {
        autolink(parser)
    } else {
        parser.collect()
    };
    let events = anchor_headings(events);

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());
    Ok(html_output)
}

/// Turn bare `http://` / `https://` URLs in plain text into links.
///
/// Text inside existing links and code blocks is left alone.
fn autolink<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    events
        .flat_map(|event| match event {
            Event::Start(Tag::Link { .. }) => {
                link_depth += 1;
                vec![event]
            }
            Event::End(TagEnd::Link) => {
                link_depth = link_depth.saturating_sub(1);
                vec![event]
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                vec![event]
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                vec![event]
            }
            Event::Text(text) if link_depth == 0 && !in_code_block => link_urls(text),
            _ => vec![event],
        })
        .collect()
}

fn link_urls(text: CowStr<'_>) -> Vec<Event<'_>> {
    let mut events = Vec::new();
    let mut rest: &str = &text;

    while let Some(start) = find_url_start(rest) {
        let candidate = &rest[start..];
        let end = candidate
            .find(|c: char| c.is_whitespace() || c == '<' || c == '"')
            .unwrap_or(candidate.len());
        let url = candidate[..end].trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'']);

        // A scheme with nothing after it is not a link.
        if url.ends_with("://") {
            events.push(Event::Text(rest[..start + url.len()].to_string().into()));
            rest = &rest[start + url.len()..];
            continue;
        }

        if start > 0 {
            events.push(Event::Text(rest[..start].to_string().into()));
        }
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: url.to_string().into(),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        events.push(Event::Text(url.to_string().into()));
        events.push(Event::End(TagEnd::Link));
        rest = &rest[start + url.len()..];
    }

    if events.is_empty() {
        return vec![Event::Text(text.to_string().into())];
    }
    if !rest.is_empty() {
        events.push(Event::Text(rest.to_string().into()));
    }
    events
}

fn find_url_start(text: &str) -> Option<usize> {
    ["https://", "http://"]
        .iter()
        .filter_map(|scheme| text.find(scheme))
        .min()
}

/// Give every heading an id attribute derived from its text.
fn anchor_headings(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    struct HeadingState<'a> {
        level: HeadingLevel,
        classes: Vec<String>,
        attrs: Vec<(String, Option<String>)>,
        inner: Vec<Event<'a>>,
        text: String,
    }

    let mut in_heading: Option<HeadingState> = None;
    let mut used_heading_ids: HashSet<String> = HashSet::new();
    let mut output = Vec::with_capacity(events.len());

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                ref id,
                ref classes,
                ref attrs,
            }) => {
                // Explicit ids pass straight through
                if let Some(existing_id) = id {
                    used_heading_ids.insert(existing_id.to_string());
                    output.push(event);
                    continue;
                }
                in_heading = Some(HeadingState {
                    level,
                    classes: classes.iter().map(|c| c.to_string()).collect(),
                    attrs: attrs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.as_ref().map(|v| v.to_string())))
                        .collect(),
                    inner: Vec::new(),
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) if in_heading.is_some() => {
                let Some(state) = in_heading.take() else {
                    continue;
                };

                let base_id = slugify(&state.text);
                let mut id = base_id.clone();
                let mut suffix = 1;
                while used_heading_ids.contains(&id) {
                    id = format!("{}-{}", base_id, suffix);
                    suffix += 1;
                }
                used_heading_ids.insert(id.clone());

                let class_attr = if state.classes.is_empty() {
                    String::new()
                } else {
                    format!(" class=\"{}\"", state.classes.join(" "))
                };
                let extra_attrs = state
                    .attrs
                    .iter()
                    .map(|(k, v)| match v {
                        Some(val) => format!(" {}=\"{}\"", k, val),
                        None => format!(" {}", k),
                    })
                    .collect::<String>();

                let mut inner_html = String::new();
                html::push_html(&mut inner_html, state.inner.into_iter());

                let level = state.level as usize;
                output.push(Event::Html(
                    format!(
                        "<h{level} id=\"{id}\"{class_attr}{extra_attrs}>{inner_html}</h{level}>\n"
                    )
                    .into(),
                ));
            }
            event => match in_heading.as_mut() {
                Some(state) => {
                    if let Event::Text(text) | Event::Code(text) = &event {
                        state.text.push_str(text);
                    }
                    state.inner.push(event);
                }
                None => output.push(event),
            },
        }
    }

    output
}

/// Convert a string to a slug suitable for use as an HTML id.
fn slugify(s: &str) -> String {
    let slug = s
        .trim()
        .to_lowercase()
        .replace(' ', "-")
        .replace(|c: char| !c.is_alphanumeric() && c != '-', "");
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(extensions: &[&str]) -> MarkdownConfig {
        MarkdownConfig {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's New?"), "whats-new");
        assert_eq!(slugify("API Reference"), "api-reference");
        assert_eq!(slugify("???"), "section");
    }

    #[test]
    fn test_render_basic_markdown() {
        let html = render_markdown("# Hello\n\nWorld", &MarkdownConfig::default()).unwrap();

        assert!(html.starts_with("<h1 id=\"hello\">Hello</h1>"));
        assert!(html.contains("<p>World</p>"));
    }

    #[test]
    fn test_heading_ids_are_unique() {
        let html = render_markdown("# Intro\n\n## Intro\n\n## Intro", &MarkdownConfig::default())
            .unwrap();

        assert!(html.contains("<h1 id=\"intro\">"));
        assert!(html.contains("<h2 id=\"intro-1\">"));
        assert!(html.contains("<h2 id=\"intro-2\">"));
    }

    #[test]
    fn test_heading_inline_markup_is_kept_and_escaped() {
        let html = render_markdown("# Using `<T>` *well*", &MarkdownConfig::default()).unwrap();

        assert!(html.contains("id=\"using-t-well\""));
        assert!(html.contains("<code>&lt;T&gt;</code>"));
        assert!(html.contains("<em>well</em>"));
    }

    #[test]
    fn test_tables_extension() {
        let source = "| a | b |\n|---|---|\n| 1 | 2 |";

        let with = render_markdown(source, &config(&["tables"])).unwrap();
        let without = render_markdown(source, &config(&[])).unwrap();

        assert!(with.contains("<table>"));
        assert!(!without.contains("<table>"));
    }

    #[test]
    fn test_autolink_bare_urls() {
        let html = render_markdown(
            "See https://example.com/docs. Or [this](https://x.dev) one.",
            &config(&["autolink"]),
        )
        .unwrap();

        assert!(html.contains(
            "<a href=\"https://example.com/docs\">https://example.com/docs</a>."
        ));
        assert_eq!(html.matches("<a href").count(), 2);
    }

    #[test]
    fn test_autolink_skips_code_blocks() {
        let html = render_markdown("```\nhttps://example.com\n```", &config(&["autolink"]))
            .unwrap();

        assert!(!html.contains("<a href"));
    }

    #[test]
    fn test_invalid_extension() {
        let result = render_markdown("# Test", &config(&["not_a_real_extension"]));
        assert!(matches!(result, Err(MarkdownError::InvalidExtension(_))));
    }
}

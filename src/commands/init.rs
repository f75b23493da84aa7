use std::path::{Path, PathBuf};

use crate::{
    InitArgs,
    config::{DEFAULT_CONFIG_FILE, SiteConfig},
};

const POST_TEMPLATE: &str = r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{{ metadata.title.0 }}</title>
    <link rel="stylesheet" href="/static/style.css">
  </head>
  <body>
    <p><a href="/">&larr; All posts</a></p>
    {% if metadata.date %}<time>{{ metadata.date.0 }}</time>{% endif %}
    <article>{{ content | safe }}</article>
  </body>
</html>
"#;

const INDEX_TEMPLATE: &str = r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Posts</title>
    <link rel="stylesheet" href="/static/style.css">
  </head>
  <body>
    <h1>Posts</h1>
    <ul>
    {% for post in metadata.inputs %}
      <li><a href="{{ post.url | safe }}">{{ post.metadata.title.0 }}</a>{% if post.metadata.date %} <time>{{ post.metadata.date.0 }}</time>{% endif %}</li>
    {% endfor %}
    </ul>
  </body>
</html>
"#;

const SAMPLE_POST: &str = "\
- date: 2024-01-01
- tags: welcome, meta

# Hello World

This is your first post. Posts start with `- key: value` metadata lines,
followed by a `# Title` line and the markdown body.

| Key  | Meaning                 |
|------|-------------------------|
| date | Sort order on the index |
| tags | Anything you like       |

Read more at https://commonmark.org.
";

const STYLESHEET: &str = "\
body { max-width: 42rem; margin: 2rem auto; font-family: sans-serif; }
time { color: #666; }
";

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            println!("Created directory {path}", path = path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    println!("Initializing site in {}", path.display());
    for file in scaffold(&path).await? {
        println!("Created {}", file.display());
    }

    Ok(())
}

/// Write the starter config, templates, post and stylesheet into `path`.
///
/// Refuses to touch a directory that already has a config file.
async fn scaffold(path: &Path) -> Result<Vec<PathBuf>, anyhow::Error> {
    let config_path = path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() {
        return Err(anyhow::anyhow!(
            "{} already exists; not overwriting",
            config_path.display()
        ));
    }

    let config = SiteConfig::default();
    let files = [
        (PathBuf::from(DEFAULT_CONFIG_FILE), serde_yaml::to_string(&config)?),
        (
            config.layout.templates.join(format!("{}.html", config.templates.post)),
            POST_TEMPLATE.to_string(),
        ),
        (
            config.layout.templates.join(format!("{}.html", config.templates.index)),
            INDEX_TEMPLATE.to_string(),
        ),
        (config.layout.posts.join("hello-world.md"), SAMPLE_POST.to_string()),
        (PathBuf::from("static/style.css"), STYLESHEET.to_string()),
    ];

    let mut created = Vec::with_capacity(files.len());
    for (relative, content) in files {
        let target = path.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;
        created.push(target);
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Builder;

    #[tokio::test]
    async fn test_scaffold_builds() {
        let dir = tempfile::tempdir().unwrap();

        let created = scaffold(dir.path()).await.unwrap();
        assert_eq!(created.len(), 5);

        let config =
            SiteConfig::load_from_arg(Some(&dir.path().join(DEFAULT_CONFIG_FILE))).unwrap();
        let result = Builder::new(config).build().await.unwrap();

        assert!(result.report.is_success(), "{:?}", result.report.failures);
        let post = std::fs::read_to_string(dir.path().join("_site/posts/hello-world.html")).unwrap();
        assert!(post.contains("<h1 id=\"hello-world\">Hello World</h1>"));
        assert!(post.contains("<table>"));
        assert!(post.contains("href=\"https://commonmark.org\""));

        let index = std::fs::read_to_string(dir.path().join("_site/index.html")).unwrap();
        assert!(index.contains("<a href=\"/posts/hello-world.html\">Hello World</a>"));
        assert!(dir.path().join("_site/static/style.css").exists());
    }

    #[tokio::test]
    async fn test_scaffold_refuses_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "output: x\n").unwrap();

        assert!(scaffold(dir.path()).await.is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(DEFAULT_CONFIG_FILE)).unwrap(),
            "output: x\n"
        );
    }
}

//! Configuration loading and types for sitepipe.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for config structures (`types`)
//! - Loading configs from files and the environment (`load`)

mod load;
mod types;

pub use load::DEFAULT_CONFIG_FILE;
pub use types::{MarkdownConfig, SiteConfig};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to deserialize config: {0}")]
    Deserialize(#[from] config::ConfigError),

    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("invalid markdown config: {0}")]
    Markdown(#[from] crate::build::MarkdownError),

    #[error("{0}")]
    Validation(String),
}

impl SiteConfig {
    /// Check the settings that cannot be expressed through serde alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.templates.post.trim().is_empty() {
            return Err(ConfigError::Validation(
                "invalid config: 'templates.post' must name a template".to_string(),
            ));
        }
        if self.templates.index.trim().is_empty() {
            return Err(ConfigError::Validation(
                "invalid config: 'templates.index' must name a template".to_string(),
            ));
        }
        if self.templates.index_output.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "invalid config: 'templates.index_output' must be a file path".to_string(),
            ));
        }
        crate::build::validate_markdown_config(&self.markdown)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: SiteConfig = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.output, std::path::PathBuf::from("_site"));
        assert_eq!(config.layout.static_dirs.len(), 2);
        assert_eq!(config.templates.post, "post");
        assert_eq!(
            config.templates.timeout(),
            Some(std::time::Duration::from_secs(30))
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_timeout_waits_forever() {
        let config: SiteConfig = serde_yaml::from_str("templates:\n  timeout_secs: 0").unwrap();
        assert_eq!(config.templates.timeout(), None);
    }

    #[test]
    fn test_validate_rejects_empty_template_name() {
        let config: SiteConfig = serde_yaml::from_str("templates:\n  index: ''").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_markdown_extension() {
        let config: SiteConfig =
            serde_yaml::from_str("markdown:\n  extensions: [tables, emoji]").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Markdown(_))));
    }
}

//! Configuration loading from files.
//!
//! Values come from the YAML config file (optional), overridden by
//! `SITEPIPE_*` environment variables, e.g. `SITEPIPE_OUTPUT=public` or
//! `SITEPIPE_TEMPLATES__TIMEOUT_SECS=5`.

use std::path::{Path, PathBuf};

use super::{ConfigError, SiteConfig};

/// Config file looked up when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "sitepipe.yaml";

const ENV_PREFIX: &str = "SITEPIPE";

impl SiteConfig {
    /// Load the config from the command line argument, defaulting to `sitepipe.yaml`.
    ///
    /// Relative `input` and `output` paths are resolved against the config
    /// file's directory.
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let config_file = if config_file.is_relative() {
            std::env::current_dir()
                .map_err(ConfigError::CwdFailure)?
                .join(config_file)
        } else {
            config_file.to_path_buf()
        };

        let mut config = Self::load_from_file(&config_file)?;
        config.resolve_paths(&base_path_from_config(&config_file));
        config.validate()?;
        Ok(config)
    }

    /// Load the config from a file path. A missing file yields the defaults.
    pub(crate) fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
        }

        Ok(config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<SiteConfig>()?)
    }

    /// Make `input` and `output` absolute relative to `base_path`.
    pub fn resolve_paths(&mut self, base_path: &Path) {
        if self.input.is_relative() {
            self.input = base_path.join(&self.input);
        }
        if self.output.is_relative() {
            self.output = base_path.join(&self.output);
        }
    }
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path_from_config() {
        assert_eq!(
            base_path_from_config(Path::new("/project/sitepipe.yaml")),
            PathBuf::from("/project")
        );
        assert_eq!(
            base_path_from_config(Path::new("sitepipe.yaml")),
            PathBuf::from("")
        );
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("site.yaml");
        std::fs::write(&config_path, "input: src\noutput: public\n").unwrap();

        let config = SiteConfig::load_from_arg(Some(&config_path)).unwrap();

        assert_eq!(config.input, dir.path().join("src"));
        assert_eq!(config.output, dir.path().join("public"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = SiteConfig::load_from_arg(Some(&dir.path().join("absent.yaml"))).unwrap();

        assert_eq!(config.input, dir.path().join("."));
        assert_eq!(config.output, dir.path().join("_site"));
        assert_eq!(config.templates.index, "index");
    }

    #[test]
    fn test_nested_sections_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("sitepipe.yaml");
        std::fs::write(
            &config_path,
            "layout:\n  posts: articles\n  static_dirs: [assets]\ntemplates:\n  post: article\n",
        )
        .unwrap();

        let config = SiteConfig::load_from_arg(Some(&config_path)).unwrap();

        assert_eq!(config.layout.posts, PathBuf::from("articles"));
        assert_eq!(config.layout.static_dirs, vec![PathBuf::from("assets")]);
        assert_eq!(config.templates.post, "article");
        assert_eq!(config.templates.index, "index");
    }
}

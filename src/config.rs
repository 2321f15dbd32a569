//! Configuration for the registry bulk-load, dispatcher defaults and logging.
//!
//! Files are rendered through `tera` before parsing, so values can be pulled
//! from the environment:
//!
//! ```yaml
//! prefixes:
//!   ILX: {{ get_env(name="ILX_NAMESPACE", default="http://uri.interlex.org/base/ilx_") }}
//! query:
//!   prefix: [UBERON]
//! logger:
//!   enable: true
//!   level: debug
//!   format: compact
//! ```

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    logger::{Format, LogLevel, Rotation},
    ontology::{CurieRegistry, QueryDispatcher, ServiceHandle, TermResolver},
    Error, Result,
};

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// `prefix -> namespace` table. Empty means the built-in defaults.
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub logger: LoggerSettings,
}

/// Qualifiers merged into every dispatched query.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QuerySettings {
    #[serde(default)]
    pub prefix: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
}

/// Logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggerSettings {
    /// Enable the stdout layer.
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: Format,

    /// Raw `EnvFilter` directives replacing the level-based default, e.g.
    /// `ontquery=trace,info`. `RUST_LOG` still takes precedence.
    pub override_filter: Option<String>,

    pub file_appender: Option<LoggerFileAppender>,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            enable: true,
            level: LogLevel::default(),
            format: Format::default(),
            override_filter: None,
            file_appender: None,
        }
    }
}

/// Rolling file output.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggerFileAppender {
    #[serde(default)]
    pub enable: bool,
    /// Write through a background worker.
    #[serde(default)]
    pub non_blocking: bool,
    /// Filters this layer only; the stdout level does not apply here.
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: Format,
    #[serde(default)]
    pub rotation: Rotation,
    /// Directory for log files, `./logs` when unset.
    pub dir: Option<String>,
    pub filename_prefix: Option<String>,
    pub filename_suffix: Option<String>,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
}

fn default_max_log_files() -> usize {
    365
}

fn render(content: &str) -> Result<String> {
    Ok(tera::Tera::one_off(content, &tera::Context::new(), false)?)
}

impl Settings {
    /// Parses YAML settings after template rendering.
    ///
    /// # Errors
    ///
    /// Template or YAML errors.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(&render(content)?)?)
    }

    /// Parses TOML settings after template rendering.
    ///
    /// # Errors
    ///
    /// Template or TOML errors.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(&render(content)?)?)
    }

    /// Loads settings from a `.yaml`, `.yml` or `.toml` file.
    ///
    /// # Errors
    ///
    /// I/O errors, parse errors, or an unsupported extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "config_loaded");
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            _ => Err(Error::Message(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Builds the curie registry from `prefixes`.
    ///
    /// # Errors
    ///
    /// Invalid prefixes.
    pub fn registry(&self) -> Result<CurieRegistry> {
        if self.prefixes.is_empty() {
            return Ok(CurieRegistry::with_defaults());
        }
        Ok(CurieRegistry::from_prefixes(&self.prefixes)?)
    }

    /// Builds a dispatcher over `services` with the configured defaults.
    ///
    /// # Errors
    ///
    /// Invalid prefixes.
    pub fn dispatcher(&self, services: Vec<ServiceHandle>) -> Result<QueryDispatcher> {
        Ok(QueryDispatcher::from_settings(
            &self.query,
            Arc::new(self.registry()?),
            services,
        ))
    }

    /// Builds a resolver with a fresh cache.
    ///
    /// # Errors
    ///
    /// Invalid prefixes.
    pub fn resolver(&self, services: Vec<ServiceHandle>) -> Result<TermResolver> {
        Ok(TermResolver::new(Arc::new(self.dispatcher(services)?)))
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let settings = Settings::from_yaml_str("{}").expect("settings");
        assert!(settings.prefixes.is_empty());
        assert!(settings.logger.enable);
        assert!(settings.registry().expect("registry").knows_prefix("UBERON"));
    }

    #[test]
    fn yaml_settings() {
        let settings = Settings::from_yaml_str(
            r#"
prefixes:
  EX: http://example.org/
query:
  prefix: [EX]
  category: [anatomy]
logger:
  enable: false
  level: debug
  format: json
  file_appender:
    enable: true
    rotation: daily
    dir: /tmp/ontquery
"#,
        )
        .expect("settings");

        let registry = settings.registry().expect("registry");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.qname("http://example.org/a"), "EX:a");
        assert_debug_snapshot!(settings.query, @r###"
        QuerySettings {
            prefix: [
                "EX",
            ],
            category: [
                "anatomy",
            ],
        }
        "###);
        let appender = settings.logger.file_appender.expect("appender");
        assert_eq!(appender.max_log_files, 365);
        assert!(matches!(appender.rotation, Rotation::Daily));
    }

    #[test]
    fn toml_settings() {
        let settings = Settings::from_toml_str(
            r#"
[prefixes]
EX = "http://example.org/"

[query]
prefix = ["EX"]

[logger]
level = "warn"
"#,
        )
        .expect("settings");
        assert_eq!(settings.query.prefix, vec!["EX"]);
        assert_eq!(settings.logger.level.to_string(), "warn");
    }

    #[test]
    fn templates_read_the_environment() {
        let settings = Settings::from_yaml_str(
            r#"
prefixes:
  EX: {{ get_env(name="ONTQUERY_UNSET_NAMESPACE", default="http://example.org/env/") }}
"#,
        )
        .expect("settings");
        assert_eq!(
            settings.prefixes.get("EX").map(String::as_str),
            Some("http://example.org/env/")
        );
    }

    #[test]
    fn invalid_prefix_is_rejected() {
        let settings = Settings::from_yaml_str("prefixes:\n  'bad prefix': http://example.org/\n")
            .expect("settings");
        assert!(matches!(settings.registry(), Err(Error::Registry(_))));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = std::env::temp_dir().join("ontquery-settings.ini");
        fs::write(&path, "").expect("write");
        assert!(matches!(Settings::from_file(&path), Err(Error::Message(_))));
        let _ = fs::remove_file(path);
    }
}

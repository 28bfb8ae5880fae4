//! Configuration for the server and the bug report composer.
//!
//! [`AppConfig`] is loaded with figment from, in increasing precedence:
//! built-in defaults, a TOML file, then `BUG_REPORTER_*` environment
//! variables (`__` separates nested keys, e.g. `BUG_REPORTER_SERVER__BIND`).

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{BugError, Result};
use crate::models::Priority;

/// Endpoint used when the composer has no `api_endpoint` configured.
pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8080/api/bugs";

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE_NAME: &str = "bug-reporter.toml";

const ENV_PREFIX: &str = "BUG_REPORTER_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub reporter: ReporterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    pub bind: String,
    pub database_path: PathBuf,
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            database_path: PathBuf::from("bugs.db"),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `*` or a comma separated list of origins.
    pub allowed_origins: String,
    /// Comma separated list of HTTP methods.
    pub allowed_methods: String,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "*".to_string(),
            allowed_methods: "GET,POST,PUT,DELETE".to_string(),
            max_age_secs: 3600,
        }
    }
}

impl CorsConfig {
    /// True when `*` appears anywhere in the origin list.
    pub fn allows_any_origin(&self) -> bool {
        self.origins().contains(&"*")
    }

    pub fn origins(&self) -> Vec<&str> {
        split_list(&self.allowed_origins)
    }

    pub fn methods(&self) -> Vec<&str> {
        split_list(&self.allowed_methods)
    }
}

fn split_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Options of the embeddable bug report form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub show_description: bool,
    pub show_priority: bool,
    pub show_screenshot_url: bool,
    pub show_metadata_fields: bool,
    pub default_priority: Priority,
    /// Collection URL submissions are sent to. Falls back to
    /// [`DEFAULT_API_ENDPOINT`] when unset.
    pub api_endpoint: Option<String>,
    pub title: String,
    pub submit_button_text: String,
    pub success_message: String,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            show_description: true,
            show_priority: true,
            show_screenshot_url: true,
            show_metadata_fields: false,
            default_priority: Priority::Medium,
            api_endpoint: Some(DEFAULT_API_ENDPOINT.to_string()),
            title: "Report a Bug".to_string(),
            submit_button_text: "Submit Bug Report".to_string(),
            success_message: "Bug report submitted successfully!".to_string(),
        }
    }
}

/// A partial [`ReporterConfig`]: every field left `None` keeps the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterOptions {
    pub show_description: Option<bool>,
    pub show_priority: Option<bool>,
    pub show_screenshot_url: Option<bool>,
    pub show_metadata_fields: Option<bool>,
    pub default_priority: Option<Priority>,
    pub api_endpoint: Option<String>,
    pub title: Option<String>,
    pub submit_button_text: Option<String>,
    pub success_message: Option<String>,
}

impl ReporterConfig {
    /// Overlay `options` on this config, field by field. A `Some` in
    /// `options` always replaces the base value.
    #[must_use]
    pub fn with_options(mut self, options: &ReporterOptions) -> Self {
        if let Some(v) = options.show_description {
            self.show_description = v;
        }
        if let Some(v) = options.show_priority {
            self.show_priority = v;
        }
        if let Some(v) = options.show_screenshot_url {
            self.show_screenshot_url = v;
        }
        if let Some(v) = options.show_metadata_fields {
            self.show_metadata_fields = v;
        }
        if let Some(v) = options.default_priority {
            self.default_priority = v;
        }
        if let Some(v) = &options.api_endpoint {
            self.api_endpoint = Some(v.clone());
        }
        if let Some(v) = &options.title {
            self.title = v.clone();
        }
        if let Some(v) = &options.submit_button_text {
            self.submit_button_text = v.clone();
        }
        if let Some(v) = &options.success_message {
            self.success_message = v.clone();
        }
        self
    }

    /// The endpoint to submit to, never empty.
    pub fn endpoint(&self) -> &str {
        match self.api_endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ => DEFAULT_API_ENDPOINT,
        }
    }
}

impl AppConfig {
    /// Load from `bug-reporter.toml` in the working directory (if present)
    /// and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let config_file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        if config_path.is_some() && !config_file.exists() {
            return Err(BugError::Config(format!(
                "config file {} does not exist",
                config_file.display()
            )));
        }

        let config: AppConfig = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            return Err(BugError::Config("server.bind must not be empty".to_string()));
        }
        if self.server.database_path.as_os_str().is_empty() {
            return Err(BugError::Config(
                "server.database_path must not be empty".to_string(),
            ));
        }
        if self.server.cors.methods().is_empty() {
            return Err(BugError::Config(
                "server.cors.allowed_methods must list at least one method".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reporter_defaults() {
        let config = ReporterConfig::default();
        assert!(config.show_description);
        assert!(config.show_priority);
        assert!(config.show_screenshot_url);
        assert!(!config.show_metadata_fields);
        assert_eq!(config.default_priority, Priority::Medium);
        assert_eq!(config.endpoint(), DEFAULT_API_ENDPOINT);
        assert_eq!(config.title, "Report a Bug");
        assert_eq!(config.submit_button_text, "Submit Bug Report");
        assert_eq!(config.success_message, "Bug report submitted successfully!");
    }

    #[test]
    fn test_empty_options_keep_base() {
        let base = ReporterConfig::default();
        let merged = base.clone().with_options(&ReporterOptions::default());
        assert_eq!(merged, base);
    }

    #[test]
    fn test_options_override_field_by_field() {
        let options = ReporterOptions {
            show_screenshot_url: Some(false),
            title: Some("Report an Issue".to_string()),
            submit_button_text: Some("Send Report".to_string()),
            api_endpoint: Some("https://example.com/api/bugs".to_string()),
            ..Default::default()
        };

        let merged = ReporterConfig::default().with_options(&options);

        assert!(!merged.show_screenshot_url);
        assert!(merged.show_description);
        assert_eq!(merged.title, "Report an Issue");
        assert_eq!(merged.submit_button_text, "Send Report");
        assert_eq!(merged.success_message, "Bug report submitted successfully!");
        assert_eq!(merged.endpoint(), "https://example.com/api/bugs");
    }

    #[test]
    fn test_later_overlay_wins() {
        let first = ReporterOptions {
            default_priority: Some(Priority::Low),
            title: Some("First".to_string()),
            ..Default::default()
        };
        let second = ReporterOptions {
            default_priority: Some(Priority::High),
            ..Default::default()
        };

        let merged = ReporterConfig::default()
            .with_options(&first)
            .with_options(&second);

        assert_eq!(merged.default_priority, Priority::High);
        assert_eq!(merged.title, "First");
    }

    #[test]
    fn test_blank_endpoint_falls_back() {
        let mut config = ReporterConfig::default();
        config.api_endpoint = None;
        assert_eq!(config.endpoint(), DEFAULT_API_ENDPOINT);

        config.api_endpoint = Some("   ".to_string());
        assert_eq!(config.endpoint(), DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn test_cors_lists() {
        let cors = CorsConfig {
            allowed_origins: "http://a.test, http://b.test".to_string(),
            allowed_methods: "GET, POST,".to_string(),
            max_age_secs: 10,
        };
        assert!(!cors.allows_any_origin());
        assert_eq!(cors.origins(), vec!["http://a.test", "http://b.test"]);
        assert_eq!(cors.methods(), vec!["GET", "POST"]);
        assert!(CorsConfig::default().allows_any_origin());

        let mixed = CorsConfig {
            allowed_origins: "http://a.test, *".to_string(),
            ..Default::default()
        };
        assert!(mixed.allows_any_origin());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bug-reporter.toml");
        std::fs::write(
            &path,
            r#"
            [server]
            bind = "0.0.0.0:9090"

            [server.cors]
            allowed_origins = "http://localhost:5173"

            [reporter]
            show_metadata_fields = true
            default_priority = "HIGH"
            "#,
        )
        .unwrap();

        let config = AppConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:9090");
        assert_eq!(config.server.database_path, PathBuf::from("bugs.db"));
        assert_eq!(config.server.cors.allowed_origins, "http://localhost:5173");
        assert_eq!(config.server.cors.max_age_secs, 3600);
        assert!(config.reporter.show_metadata_fields);
        assert_eq!(config.reporter.default_priority, Priority::High);
        assert_eq!(config.reporter.title, "Report a Bug");
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempdir().unwrap();
        let result = AppConfig::load_from(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(BugError::Config(_))));
    }

    #[test]
    fn test_invalid_toml_value_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[reporter]\ndefault_priority = \"URGENT\"\n").unwrap();

        assert!(AppConfig::load_from(Some(&path)).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_methods() {
        let mut config = AppConfig::default();
        config.server.cors.allowed_methods = " , ".to_string();
        assert!(config.validate().is_err());
    }
}

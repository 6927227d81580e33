//! TOML-based configuration for the repository event notifier.
//!
//! The Slack webhook URL is a secret, so the file only names the environment
//! variable that holds it (`slack.webhook_url_env`). The value is resolved
//! once at startup via [`AppConfig::resolve_env_vars`] and then validated.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Runtime settings (logging, AWS region).
    #[serde(default)]
    pub relay: RelayConfig,

    /// Slack delivery and attachment styling.
    #[serde(default)]
    pub slack: SlackConfig,

    /// HTTP receiver settings.
    #[serde(default)]
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// AWS region for repository lookups. Falls back to the SDK's default
    /// provider chain (`AWS_REGION`, profile) when unset.
    #[serde(default)]
    pub region: Option<String>,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            region: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Slack
// ---------------------------------------------------------------------------

/// Slack webhook delivery and attachment styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Environment variable holding the Slack incoming-webhook URL.
    #[serde(default = "default_webhook_url_env")]
    pub webhook_url_env: String,

    /// Attachment side-bar color (e.g. `#36a64f` or `good`).
    #[serde(default)]
    pub color: Option<String>,

    /// Attachment author line.
    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default)]
    pub author_link: Option<String>,

    #[serde(default)]
    pub author_icon: Option<String>,

    /// Attachment footer text.
    #[serde(default = "default_footer")]
    pub footer: String,

    /// Footer icon URL. Defaults to the CodeCommit logo; set to `""` to omit.
    #[serde(default = "default_footer_icon")]
    pub footer_icon: Option<String>,

    /// Resolved webhook URL (populated by `resolve_env_vars`). When `None`,
    /// delivery is disabled.
    #[serde(skip)]
    pub webhook_url: Option<String>,
}

fn default_webhook_url_env() -> String {
    "slack_webhook_url".into()
}
fn default_author_name() -> String {
    "repo-event-notifier".into()
}
fn default_footer() -> String {
    "AWS CodeCommit".into()
}
fn default_footer_icon() -> Option<String> {
    Some(DEFAULT_FOOTER_ICON.into())
}

/// CodeCommit logo shown next to the attachment footer.
pub const DEFAULT_FOOTER_ICON: &str = "https://raw.githubusercontent.com/miztiik/serverless-code-commit-repo-event-notifier/master/images/aws-code-commit-logo.png";

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url_env: default_webhook_url_env(),
            color: None,
            author_name: default_author_name(),
            author_link: None,
            author_icon: None,
            footer: default_footer(),
            footer_icon: default_footer_icon(),
            webhook_url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Web receiver
// ---------------------------------------------------------------------------

/// HTTP receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Listen address (default `127.0.0.1:3000`).
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:3000".into()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `slack.webhook_url_env` into `slack.webhook_url`.
    ///
    /// A missing or empty variable is not an error: it disables delivery.
    pub fn resolve_env_vars(&mut self) {
        self.slack.webhook_url =
            resolve_optional_env(&self.slack.webhook_url_env, "slack.webhook_url_env");
        if self.slack.webhook_url.is_none() {
            info!("no Slack webhook URL configured, notifications will not be sent");
        }
    }

    /// Validate resolved values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.slack.webhook_url {
            validate_http_url(url, "slack.webhook_url")?;
        }
        for (field, value) in [
            ("slack.author_link", &self.slack.author_link),
            ("slack.author_icon", &self.slack.author_icon),
            ("slack.footer_icon", &self.slack.footer_icon),
        ] {
            if let Some(url) = value.as_deref().filter(|u| !u.is_empty()) {
                validate_http_url(url, field)?;
            }
        }
        if let Some(ref region) = self.relay.region {
            if region.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "relay.region".into(),
                    detail: "region must not be empty when set".into(),
                });
            }
        }
        if self.web.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "web.listen".into(),
                detail: format!("'{}' is not a socket address", self.web.listen),
            });
        }
        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Default configuration with environment references resolved and
    /// validated. Used when no config file is given.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }
}

fn validate_http_url(value: &str, field: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field: field.into(),
        detail: format!("not a valid URL: {}", e),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: format!("unsupported URL scheme '{}'", url.scheme()),
        });
    }
    Ok(())
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs and returns `None` if the variable is unset or empty.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.trim().is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val.trim().to_string())
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            debug!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r##"
[relay]
log_level = "debug"
region = "eu-west-1"

[slack]
webhook_url_env = "NOTIFIER_TEST_UNUSED_URL"
color = "#36a64f"
author_name = "Repo Monitor"
author_link = "https://example.com/monitor"
footer = "CodeCommit"

[web]
listen = "0.0.0.0:8080"
"##
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.relay.log_level, "debug");
        assert_eq!(config.relay.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.slack.color.as_deref(), Some("#36a64f"));
        assert_eq!(config.slack.author_name, "Repo Monitor");
        assert_eq!(config.slack.footer, "CodeCommit");
        assert!(config.slack.author_icon.is_none());
        assert_eq!(config.web.listen, "0.0.0.0:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifier.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.relay.log_level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/notifier.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[slack\ncolor = ").unwrap();
        let result = AppConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.relay.log_level, "info");
        assert!(config.relay.region.is_none());
        assert_eq!(config.slack.webhook_url_env, "slack_webhook_url");
        assert_eq!(config.slack.footer, "AWS CodeCommit");
        assert_eq!(
            config.slack.footer_icon.as_deref(),
            Some(DEFAULT_FOOTER_ICON)
        );
        assert!(config.slack.author_icon.is_none());
        assert_eq!(config.web.listen, "127.0.0.1:3000");
        assert!(config.slack.webhook_url.is_none());
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("NOTIFIER_TEST_WEBHOOK", " https://hooks.slack.com/services/T/B/X ");

        let mut config: AppConfig =
            toml::from_str("[slack]\nwebhook_url_env = \"NOTIFIER_TEST_WEBHOOK\"\n").unwrap();
        config.resolve_env_vars();
        assert_eq!(
            config.slack.webhook_url.as_deref(),
            Some("https://hooks.slack.com/services/T/B/X")
        );
        assert!(config.validate().is_ok());

        std::env::remove_var("NOTIFIER_TEST_WEBHOOK");
    }

    #[test]
    fn test_unset_env_disables_delivery() {
        let mut config: AppConfig =
            toml::from_str("[slack]\nwebhook_url_env = \"NOTIFIER_TEST_NEVER_SET\"\n").unwrap();
        config.resolve_env_vars();
        assert!(config.slack.webhook_url.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_webhook_url() {
        let mut config = AppConfig::default();
        config.slack.webhook_url = Some("not a url".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "slack.webhook_url"
        ));

        config.slack.webhook_url = Some("ftp://hooks.example.com/x".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "slack.webhook_url"
        ));
    }

    #[test]
    fn test_empty_footer_icon_is_accepted() {
        let config: AppConfig = toml::from_str("[slack]\nfooter_icon = \"\"\n").unwrap();
        assert_eq!(config.slack.footer_icon.as_deref(), Some(""));
        assert!(config.validate().is_ok());
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_listen_and_region() {
        let mut config = AppConfig::default();
        config.web.listen = "localhost".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "web.listen"
        ));

        let mut config = AppConfig::default();
        config.relay.region = Some("  ".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "relay.region"
        ));
    }
}

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8420;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Top-level config (daybook.toml + DAYBOOK_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaybookConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Transactional email credentials. Absent means job triggers report a
    /// configuration error instead of touching the store.
    pub mail: Option<MailConfig>,
    /// Identity-provider admin surface, used only as a fallback when a
    /// profile has no cached email.
    pub identity: Option<IdentityConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for DaybookConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            mail: None,
            identity: None,
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Static bearer token required on job trigger and profile endpoints.
    /// None leaves them unauthenticated (logged as a warning at startup).
    pub trigger_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            trigger_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// API key for the transactional email service.
    pub api_key: String,
    #[serde(default = "default_mail_base_url")]
    pub base_url: String,
    /// Sender address used on every outbound email.
    #[serde(default = "default_mail_from")]
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the authentication service's admin API.
    pub base_url: String,
    /// Service-role key for lookup-by-id requests.
    pub service_key: String,
}

/// Built-in clock driver settings. The normal deployment fires jobs via an
/// external scheduler over HTTP; `internal = true` runs them in-process for
/// single-box setups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub internal: bool,
    /// Reference-zone time at which the internal driver fires the daily digest.
    #[serde(default = "default_digest_hour")]
    pub digest_hour: u8,
    #[serde(default)]
    pub digest_minute: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            internal: false,
            digest_hour: default_digest_hour(),
            digest_minute: 0,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.daybook/daybook.db", home)
}
fn default_mail_base_url() -> String {
    "https://api.resend.com".to_string()
}
fn default_mail_from() -> String {
    "Daybook <reminders@daybook.app>".to_string()
}
fn default_digest_hour() -> u8 {
    7
}

impl DaybookConfig {
    /// Load config from a TOML file with DAYBOOK_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.daybook/daybook.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: DaybookConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("DAYBOOK_").split("_"))
            .extract()
            .map_err(|e| crate::error::DaybookError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.daybook/daybook.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_mail_or_identity() {
        let config = DaybookConfig::default();
        assert!(config.mail.is_none());
        assert!(config.identity.is_none());
        assert!(!config.scheduler.internal);
        assert_eq!(config.server.port, DEFAULT_PORT);
    }

    #[test]
    fn mail_config_fills_defaults() {
        let mail: MailConfig = serde_json::from_value(serde_json::json!({
            "api_key": "re_test"
        }))
        .unwrap();
        assert_eq!(mail.base_url, "https://api.resend.com");
        assert!(mail.from.contains('@'));
    }
}

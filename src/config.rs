use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{error, warn};

/// Identity accepted when `ALLOWED_USER_IDS` is not set.
pub const DEFAULT_ALLOWED_USER: u64 = 854_024_514_781_315_082;

pub const DEFAULT_API_BASE: &str = "https://openapi.api.govee.com";

/// Process settings taken from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_file: PathBuf,
    pub govee: GoveeSettings,
    pub discord: DiscordSettings,
}

#[derive(Debug, Clone)]
pub struct GoveeSettings {
    pub api_base: String,
    pub timeout: Duration,
    /// Reply with the failure text when a control call gets a non-200 status
    /// instead of claiming success.
    pub report_control_failures: bool,
}

#[derive(Debug, Clone)]
pub struct DiscordSettings {
    pub allowed_users: HashSet<u64>,
    pub activity: String,
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Boolean setting; a value that is set but not `true`/`false` is ignored
/// with a warning.
fn env_bool(key: &str, default: bool) -> bool {
    let Some(raw) = env_optional(key) else {
        return default;
    };
    parse_bool(&raw).unwrap_or_else(|| {
        warn!("{key}={raw} is not a boolean (true/false), using {default}");
        default
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    raw.trim().parse().ok()
}

fn parse_user_ids(raw: &str) -> Result<HashSet<u64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u64>()
                .map_err(|e| format!("ALLOWED_USER_IDS has invalid user id '{id}': {e}"))
        })
        .collect()
}

impl Settings {
    pub fn from_env() -> Result<Self, String> {
        let allowed_users = match env_optional("ALLOWED_USER_IDS") {
            Some(raw) => parse_user_ids(&raw)?,
            None => HashSet::from([DEFAULT_ALLOWED_USER]),
        };

        let settings = Self {
            config_file: env_or_default("CONFIG_FILE", PathBuf::from("config.json")),
            govee: GoveeSettings {
                api_base: env_or_default("GOVEE_API_BASE", DEFAULT_API_BASE.to_string()),
                timeout: Duration::from_secs(env_or_default("GOVEE_HTTP_TIMEOUT_SECS", 30)),
                report_control_failures: env_bool("GOVEE_REPORT_CONTROL_FAILURES", false),
            },
            discord: DiscordSettings {
                allowed_users,
                activity: env_or_default("BOT_ACTIVITY", "anditv.dev".to_string()),
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), String> {
        if self.govee.api_base.is_empty() {
            return Err("GOVEE_API_BASE must not be empty".into());
        }
        if self.govee.timeout.is_zero() {
            return Err("GOVEE_HTTP_TIMEOUT_SECS must be > 0".into());
        }
        if self.discord.allowed_users.is_empty() {
            return Err("ALLOWED_USER_IDS must name at least one user".into());
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Value for key '{key}' is missing from {path}. Please check the configuration file and try again."
    )]
    Missing { key: String, path: PathBuf },
}

impl ConfigError {
    /// Log the error and terminate the process.
    pub fn abort(&self) -> ! {
        error!("{}", self);
        std::process::exit(1);
    }
}

/// Read-only key-value lookup backing the bot's secrets and device ids.
pub trait ConfigProvider: Send + Sync {
    fn lookup(&self, key: &str) -> Result<String, ConfigError>;

    /// Like [`lookup`](Self::lookup), but a missing key terminates the
    /// process. May not return.
    fn get(&self, key: &str) -> String {
        match self.lookup(key) {
            Ok(value) => value,
            Err(e) => e.abort(),
        }
    }
}

/// JSON document on disk, re-read on every lookup.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, serde_json::Value>, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

impl ConfigProvider for ConfigFile {
    fn lookup(&self, key: &str) -> Result<String, ConfigError> {
        let mut values = self.load()?;
        values
            .remove(key)
            .and_then(truthy_text)
            .ok_or_else(|| ConfigError::Missing {
                key: key.to_string(),
                path: self.path.clone(),
            })
    }
}

/// JSON truthiness: null, false, 0, "", [] and {} are empty.
pub fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;

    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Text form of a config value, or `None` when it is not truthy.
fn truthy_text(value: serde_json::Value) -> Option<String> {
    if !is_truthy(&value) {
        return None;
    }
    match value {
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn write_config(value: serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{value}").unwrap();
        file
    }

    #[test]
    fn lookup_returns_string_values() {
        let file = write_config(json!({"api_key": "abc", "sku": "H7102"}));
        let config = ConfigFile::new(file.path());

        assert_eq!(config.lookup("api_key").unwrap(), "abc");
        assert_eq!(config.lookup("sku").unwrap(), "H7102");
    }

    #[test]
    fn numeric_values_are_returned_as_text() {
        let file = write_config(json!({"device_id": 42}));
        let config = ConfigFile::new(file.path());

        assert_eq!(config.lookup("device_id").unwrap(), "42");
    }

    #[test]
    fn absent_key_is_missing() {
        let file = write_config(json!({"api_key": "abc"}));
        let config = ConfigFile::new(file.path());

        let err = config.lookup("sku").unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key, .. } if key == "sku"));
        assert!(err.to_string().contains("'sku'"));
    }

    #[test]
    fn falsy_values_are_missing() {
        let file = write_config(json!({
            "empty": "",
            "null": null,
            "zero": 0,
            "no": false,
            "list": [],
            "map": {},
        }));
        let config = ConfigFile::new(file.path());

        for key in ["empty", "null", "zero", "no", "list", "map"] {
            assert!(
                matches!(config.lookup(key), Err(ConfigError::Missing { .. })),
                "{key} should be treated as missing"
            );
        }
    }

    #[test]
    fn every_lookup_rereads_the_file() {
        let file = write_config(json!({"sku": "H7102"}));
        let config = ConfigFile::new(file.path());
        assert_eq!(config.lookup("sku").unwrap(), "H7102");

        std::fs::write(file.path(), json!({"sku": "H7106"}).to_string()).unwrap();
        assert_eq!(config.lookup("sku").unwrap(), "H7106");
    }

    #[test]
    fn unreadable_and_malformed_files_are_errors() {
        let config = ConfigFile::new("/nonexistent/config.json");
        assert!(matches!(config.lookup("token"), Err(ConfigError::Read { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let config = ConfigFile::new(file.path());
        assert!(matches!(config.lookup("token"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn truthiness_matches_falsy_set() {
        let empty = [
            json!(null),
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!([]),
            json!({}),
        ];
        for value in empty {
            assert!(!is_truthy(&value), "{value} should be empty");
        }
        for value in [json!(true), json!(1), json!("x"), json!([0]), json!({"a": null})] {
            assert!(is_truthy(&value), "{value} should not be empty");
        }
    }

    #[test]
    fn bool_setting_parsing() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" false "), Some(false));
        assert_eq!(parse_bool("1"), None);
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn user_id_list_parsing() {
        let ids = parse_user_ids("1, 2,,3").unwrap();
        assert_eq!(ids, HashSet::from([1, 2, 3]));

        assert!(parse_user_ids("1,abc").is_err());
    }
}

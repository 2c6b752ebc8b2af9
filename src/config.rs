use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::{AuthMode, Credentials};
use crate::domain::AppError;

const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
const DEFAULT_POPUP_HIDE_MS: u64 = 5_000;

/// Which credential fields authenticate requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Apikey,
    Login,
}

/// When to ask the user for a job name before sending a link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NzbNamePolicy {
    /// Prompt whenever no explicit name was supplied
    #[default]
    Always,
    /// Fall back to the link's basename
    Auto,
}

/// Agent configuration, read from a JSON file and otherwise read-only to the
/// core. A `reloadConfig` command re-reads the file at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub host: String,
    pub auth_method: AuthMethod,
    pub api_key: String,
    pub username: String,
    pub password: String,
    pub request_interval_ms: u64,
    /// How long notification popups stay visible; zero disables them
    pub popup_hide_ms: u64,
    pub hide_categories: bool,
    pub nzb_name: NzbNamePolicy,
    /// Upload fetched NZB files instead of handing the link to the server
    pub file_upload: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            auth_method: AuthMethod::Apikey,
            api_key: String::new(),
            username: String::new(),
            password: String::new(),
            request_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            popup_hide_ms: DEFAULT_POPUP_HIDE_MS,
            hide_categories: false,
            nzb_name: NzbNamePolicy::Always,
            file_upload: false,
        }
    }
}

impl AgentConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sabagent")
            .join("config.json")
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.host.is_empty() {
            return Err(AppError::Config("host is not set".to_string()));
        }
        Url::parse(&self.host)
            .map_err(|e| AppError::Config(format!("invalid host {}: {}", self.host, e)))?;
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        let auth = match self.auth_method {
            AuthMethod::Apikey => AuthMode::ApiKey(self.api_key.clone()),
            AuthMethod::Login => AuthMode::Login {
                username: self.username.clone(),
                password: self.password.clone(),
            },
        };
        Credentials::new(&self.host, auth)
    }

    /// A zero interval counts as unset and falls back to the default
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(if self.request_interval_ms == 0 {
            DEFAULT_POLL_INTERVAL_MS
        } else {
            self.request_interval_ms
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.request_interval_ms, 10_000);
        assert_eq!(config.popup_hide_ms, 5_000);
        assert_eq!(config.auth_method, AuthMethod::Apikey);
        assert_eq!(config.nzb_name, NzbNamePolicy::Always);
        assert!(!config.file_upload);
        assert!(!config.hide_categories);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AgentConfig = serde_json::from_str(
            r#"{"host":"http://localhost:8080","api_key":"secret"}"#,
        )
        .unwrap();
        assert_eq!(config.host, "http://localhost:8080");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.request_interval_ms, 10_000);
    }

    #[test]
    fn test_login_credentials() {
        let config: AgentConfig = serde_json::from_str(
            r#"{"host":"http://localhost:8080","auth_method":"login","username":"u","password":"p"}"#,
        )
        .unwrap();
        let credentials = config.credentials();
        assert_eq!(credentials.host(), "http://localhost:8080/");
        assert_eq!(
            credentials.auth,
            AuthMode::Login {
                username: "u".to_string(),
                password: "p".to_string(),
            }
        );
    }

    #[test]
    fn test_zero_interval_falls_back_to_default() {
        let config = AgentConfig {
            request_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(10_000));

        let config = AgentConfig {
            request_interval_ms: 2_500,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(2_500));
    }

    #[test]
    fn test_load_rejects_missing_or_invalid_host() {
        let dir = std::env::temp_dir();

        let path = dir.join(format!("sabagent-config-{}-empty.json", std::process::id()));
        std::fs::write(&path, r#"{"api_key":"secret"}"#).unwrap();
        let err = AgentConfig::load(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        std::fs::remove_file(&path).ok();

        let path = dir.join(format!("sabagent-config-{}-bad.json", std::process::id()));
        std::fs::write(&path, r#"{"host":"not a url"}"#).unwrap();
        let err = AgentConfig::load(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_reports_missing_file_as_io() {
        let err = AgentConfig::load(Path::new("/nonexistent/sabagent.json")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}

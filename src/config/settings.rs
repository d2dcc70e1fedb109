use crate::errors::HarnessError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SEARCH: &str = "project = OCPBUGS AND created >= -14d AND status != Closed";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub jira: JiraConfig,
    #[serde(default)]
    pub bigquery: BigQueryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JiraConfig {
    pub url: String,
    #[serde(default)]
    pub auth: AuthScheme,
    #[serde(default)]
    pub email: Option<String>,
    pub token: String,
    #[serde(default = "default_search")]
    pub search: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// Personal Access Token sent as a Bearer header (Jira Data Center/Server).
    #[default]
    Bearer,
    /// Email + API token over Basic auth (Jira Cloud).
    Basic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    PersonalAccessToken { token: String },
    ApiToken { email: String, token: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BigQueryConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_dataset")]
    pub dataset_id: String,
    #[serde(default = "default_table")]
    pub table_id: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_bigquery_url")]
    pub base_url: String,
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            dataset_id: default_dataset(),
            table_id: default_table(),
            access_token: None,
            base_url: default_bigquery_url(),
        }
    }
}

fn default_search() -> String {
    DEFAULT_SEARCH.to_string()
}

fn default_dataset() -> String {
    "jira".to_string()
}

fn default_table() -> String {
    "tickets".to_string()
}

fn default_bigquery_url() -> String {
    "https://bigquery.googleapis.com".to_string()
}

impl Settings {
    /// Loads `~/.jirarow/config.toml` (or `path`), then `JIRAROW_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let settings = config::Config::builder()
            .add_source(config::File::from(config_path.as_path()).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix("JIRAROW")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(HarnessError::from)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?
            .try_deserialize::<Settings>()
            .map_err(HarnessError::from)
            .context("Failed to parse configuration")?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.jira.url.trim().is_empty() {
            return Err(HarnessError::ConfigValidationFailed("jira.url is empty".to_string()).into());
        }
        if self.jira.token.trim().is_empty() {
            return Err(HarnessError::ConfigValidationFailed("jira.token is empty".to_string()).into());
        }
        if self.jira.auth == AuthScheme::Basic && self.jira.email.as_deref().unwrap_or("").is_empty() {
            return Err(HarnessError::ConfigValidationFailed(
                "jira.email is required for basic auth".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Extra checks before anything is written to BigQuery.
    pub fn validate_bigquery(&self) -> Result<()> {
        if self.bigquery.project_id.as_deref().unwrap_or("").is_empty() {
            return Err(HarnessError::ConfigValidationFailed(
                "bigquery.project_id must be set".to_string(),
            )
            .into());
        }
        if self.bigquery.access_token.as_deref().unwrap_or("").is_empty() {
            return Err(HarnessError::ConfigValidationFailed(
                "bigquery.access_token must be set".to_string(),
            )
            .into());
        }
        Ok(())
    }

    pub fn auth_method(&self) -> AuthMethod {
        match self.jira.auth {
            AuthScheme::Bearer => AuthMethod::PersonalAccessToken {
                token: self.jira.token.clone(),
            },
            AuthScheme::Basic => AuthMethod::ApiToken {
                email: self.jira.email.clone().unwrap_or_default(),
                token: self.jira.token.clone(),
            },
        }
    }

    /// Copy with every secret masked, for display.
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        masked.jira.token = mask(&self.jira.token);
        masked.bigquery.access_token = self.bigquery.access_token.as_deref().map(mask);
        masked
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".jirarow"))
    }
}

fn mask(secret: &str) -> String {
    if secret.len() <= 8 || !secret.is_ascii() {
        return "***".to_string();
    }
    format!("{}***{}", &secret[..4], &secret[secret.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("jirarow-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_from_file_with_defaults() {
        let path = write_config(
            "defaults",
            r#"
[jira]
url = "https://issues.example.com"
token = "abcdefghijkl"
"#,
        );

        let settings = Settings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.jira.url, "https://issues.example.com");
        assert_eq!(settings.jira.auth, AuthScheme::Bearer);
        assert_eq!(settings.jira.search, DEFAULT_SEARCH);
        assert_eq!(settings.bigquery.dataset_id, "jira");
        assert_eq!(settings.bigquery.table_id, "tickets");
        assert_eq!(settings.bigquery.base_url, "https://bigquery.googleapis.com");
        assert!(settings.validate().is_ok());
        assert!(settings.validate_bigquery().is_err());
    }

    #[test]
    fn test_basic_auth_requires_email() {
        let path = write_config(
            "basic",
            r#"
[jira]
url = "https://example.atlassian.net"
auth = "basic"
token = "abcdefghijkl"

[bigquery]
project_id = "openshift-ci"
access_token = "ya29.token-value"
"#,
        );

        let mut settings = Settings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(settings.validate().is_err());
        assert!(settings.validate_bigquery().is_ok());

        settings.jira.email = Some("me@example.com".to_string());
        assert!(settings.validate().is_ok());
        assert_eq!(
            settings.auth_method(),
            AuthMethod::ApiToken {
                email: "me@example.com".to_string(),
                token: "abcdefghijkl".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let path = std::env::temp_dir().join("jirarow-does-not-exist.toml");
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_masked_settings_serialize() {
        let settings = Settings {
            jira: JiraConfig {
                url: "https://jira.example.com".to_string(),
                auth: AuthScheme::Bearer,
                email: None,
                token: "supersecrettoken".to_string(),
                search: default_search(),
            },
            bigquery: BigQueryConfig {
                access_token: Some("short".to_string()),
                ..Default::default()
            },
        };

        let toml_str = toml::to_string(&settings.masked()).unwrap();
        assert!(toml_str.contains("supe***oken"));
        assert!(!toml_str.contains("supersecrettoken"));
        assert!(toml_str.contains("access_token = \"***\""));
    }
}

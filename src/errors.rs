use colored::*;
use std::fmt;

#[derive(Debug)]
pub enum HarnessError {
    // Configuration errors
    ConfigInvalid(String),
    ConfigValidationFailed(String),

    // Jira errors
    JiraAuthFailed(u16),
    IssueNotFound(String),
    JiraApiError(u16, String),

    // BigQuery errors
    BigQueryWriteFailed(String),

    // Network errors
    NetworkError(String),

    // Generic error
    Other(String),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Configuration errors
            HarnessError::ConfigInvalid(msg) => {
                writeln!(f, "{}", "Invalid configuration".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                writeln!(f, "   To fix:")?;
                writeln!(f, "   1. Check your config file: ~/.jirarow/config.toml")?;
                write!(f, "   2. Or override with environment: {}", "JIRAROW_JIRA__URL=...".green())
            }
            HarnessError::ConfigValidationFailed(msg) => {
                writeln!(f, "{}", "Configuration validation failed".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                writeln!(f, "   To fix:")?;
                writeln!(f, "   1. Inspect the effective settings: {}", "jirarow config show".green())?;
                write!(f, "   2. Fill in the missing values in ~/.jirarow/config.toml")
            }

            // Jira errors
            HarnessError::JiraAuthFailed(status) => {
                writeln!(f, "{}", format!("Jira authentication failed ({})", status).red().bold())?;
                write!(f, "   {}\n\n", "Your token may have expired or is invalid".dimmed())?;
                writeln!(f, "   To fix:")?;
                writeln!(f, "   1. Data Center: create a Personal Access Token in your Jira profile")?;
                writeln!(f, "   2. Cloud: {}", "https://id.atlassian.com/manage-profile/security/api-tokens".cyan())?;
                write!(f, "   3. Update {} or {}", "jira.token".green(), "JIRAROW_JIRA__TOKEN".green())
            }
            HarnessError::IssueNotFound(key) => {
                writeln!(f, "{}", format!("Issue '{}' not found", key).red().bold())?;
                write!(f, "   {}\n\n", "The issue doesn't exist or you don't have access to it".dimmed())?;
                writeln!(f, "   To fix:")?;
                writeln!(f, "   1. Check the issue key is correct")?;
                write!(f, "   2. Search for it: {}", format!("jirarow search --jql \"key = {}\"", key).green())
            }
            HarnessError::JiraApiError(status, msg) => {
                writeln!(f, "{}", format!("Jira API error ({})", status).red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   Check the JQL syntax or try again")
            }

            // BigQuery errors
            HarnessError::BigQueryWriteFailed(msg) => {
                writeln!(f, "{}", "Failed to write rows to BigQuery".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                writeln!(f, "   To fix:")?;
                writeln!(f, "   1. Refresh the access token: {}", "gcloud auth print-access-token".green())?;
                writeln!(f, "   2. Verify the dataset and table exist")?;
                write!(f, "   3. Preview the rows first: {}", "jirarow sync --dry-run <KEY>".green())
            }

            // Network errors
            HarnessError::NetworkError(msg) => {
                writeln!(f, "{}", "Network error".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                writeln!(f, "   To fix:")?;
                writeln!(f, "   1. Check your internet connection")?;
                writeln!(f, "   2. Verify you can reach the API endpoints")?;
                write!(f, "   3. Try again in a moment")
            }

            // Generic
            HarnessError::Other(msg) => {
                writeln!(f, "{}", "Error".red().bold())?;
                write!(f, "   {}", msg.dimmed())
            }
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<reqwest::Error> for HarnessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            HarnessError::NetworkError(err.to_string())
        } else if let Some(status) = err.status() {
            if status == 401 || status == 403 {
                HarnessError::JiraAuthFailed(status.as_u16())
            } else {
                HarnessError::Other(err.to_string())
            }
        } else {
            HarnessError::Other(err.to_string())
        }
    }
}

impl From<config::ConfigError> for HarnessError {
    fn from(err: config::ConfigError) -> Self {
        HarnessError::ConfigInvalid(err.to_string())
    }
}

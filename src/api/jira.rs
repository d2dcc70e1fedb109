use crate::config::settings::AuthMethod;
use crate::errors::HarnessError;
use crate::models::issue::{Issue, SearchPage};
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

const MAX_PAGE_SIZE: u32 = 100;

pub struct JiraClient {
    client: Client,
    base_url: String,
    auth: AuthMethod,
}

impl JiraClient {
    pub fn new(base_url: String, auth: AuthMethod) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            AuthMethod::PersonalAccessToken { token } => request.bearer_auth(token),
            AuthMethod::ApiToken { email, token } => request.basic_auth(email, Some(token)),
        }
    }

    pub async fn get_issue(&self, key: &str) -> Result<Issue> {
        let url = format!(
            "{}/rest/api/2/issue/{}",
            self.base_url,
            urlencoding::encode(key)
        );
        debug!(%url, "fetching issue");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(HarnessError::from)
            .context("Failed to send request to Jira")?;

        let response = check_status(response, Some(key)).await?;

        let issue = response
            .json::<Issue>()
            .await
            .context("Failed to parse Jira issue")?;

        Ok(issue)
    }

    /// Pages through `/search` until `limit` issues are collected or the
    /// result set runs out.
    pub async fn search_issues(&self, jql: &str, limit: u32) -> Result<Vec<Issue>> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let mut issues: Vec<Issue> = Vec::new();
        let mut start_at = 0u32;

        while (issues.len() as u32) < limit {
            let page_size = (limit - issues.len() as u32).min(MAX_PAGE_SIZE);
            debug!(jql, start_at, page_size, "searching issues");

            let response = self
                .authorize(self.client.get(&url))
                .query(&[
                    ("jql", jql.to_string()),
                    ("startAt", start_at.to_string()),
                    ("maxResults", page_size.to_string()),
                ])
                .send()
                .await
                .map_err(HarnessError::from)
                .context("Failed to send search request to Jira")?;

            let response = check_status(response, None).await?;
            let page = response
                .json::<SearchPage>()
                .await
                .context("Failed to parse Jira search response")?;

            let fetched = page.issues.len() as u32;
            issues.extend(page.issues);

            start_at = page.start_at + fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }

        issues.truncate(limit as usize);
        Ok(issues)
    }
}

async fn check_status(response: Response, key: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let err = match (status, key) {
        (StatusCode::NOT_FOUND, Some(key)) => HarnessError::IssueNotFound(key.to_string()),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            HarnessError::JiraAuthFailed(status.as_u16())
        }
        _ => {
            let text = response.text().await.unwrap_or_default();
            HarnessError::JiraApiError(status.as_u16(), text)
        }
    };
    Err(err.into())
}

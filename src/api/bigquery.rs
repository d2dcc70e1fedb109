use crate::config::settings::BigQueryConfig;
use crate::errors::HarnessError;
use crate::models::ticket::TicketRow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

/// Destination for a batch of ticket rows.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Writes `rows` and returns how many were accepted.
    async fn write_rows(&self, rows: &[TicketRow]) -> Result<usize>;
}

/// Streams rows through `tabledata.insertAll`.
pub struct BigQuerySink {
    client: Client,
    base_url: String,
    project_id: String,
    dataset_id: String,
    table_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Debug, Deserialize)]
struct InsertError {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

impl BigQuerySink {
    pub fn new(
        base_url: String,
        project_id: String,
        dataset_id: String,
        table_id: String,
        access_token: String,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            dataset_id,
            table_id,
            access_token,
        }
    }

    pub fn from_config(config: &BigQueryConfig) -> Result<Self> {
        let project_id = config
            .project_id
            .clone()
            .context("bigquery.project_id is not set")?;
        let access_token = config
            .access_token
            .clone()
            .context("bigquery.access_token is not set")?;

        Ok(Self::new(
            config.base_url.clone(),
            project_id,
            config.dataset_id.clone(),
            config.table_id.clone(),
            access_token,
        ))
    }

    fn insert_url(&self) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            self.base_url,
            urlencoding::encode(&self.project_id),
            urlencoding::encode(&self.dataset_id),
            urlencoding::encode(&self.table_id)
        )
    }
}

#[async_trait]
impl RowSink for BigQuerySink {
    async fn write_rows(&self, rows: &[TicketRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let body = serde_json::json!({
            "kind": "bigquery#tableDataInsertAllRequest",
            "skipInvalidRows": false,
            "ignoreUnknownValues": true,
            "rows": rows
                .iter()
                .map(|row| serde_json::json!({"insertId": row.insert_id(), "json": row}))
                .collect::<Vec<_>>(),
        });

        debug!(
            table = %format!("{}.{}.{}", self.project_id, self.dataset_id, self.table_id),
            rows = rows.len(),
            "streaming rows to bigquery"
        );

        let response = self
            .client
            .post(self.insert_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(HarnessError::from)
            .context("Failed to send request to BigQuery")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(HarnessError::BigQueryWriteFailed(format!("{}: {}", status, text)).into());
        }

        let result = response
            .json::<InsertAllResponse>()
            .await
            .context("Failed to parse BigQuery insertAll response")?;

        if let Some(first) = result.insert_errors.first() {
            let detail = first
                .errors
                .first()
                .map(|e| format!("{}: {}", e.reason, e.message))
                .unwrap_or_default();
            return Err(HarnessError::BigQueryWriteFailed(format!(
                "{} of {} rows rejected (row {}: {})",
                result.insert_errors.len(),
                rows.len(),
                first.index,
                detail
            ))
            .into());
        }

        info!(rows = rows.len(), "wrote rows to bigquery");
        Ok(rows.len())
    }
}

/// Prints rows instead of writing them.
pub struct StdoutSink;

#[async_trait]
impl RowSink for StdoutSink {
    async fn write_rows(&self, rows: &[TicketRow]) -> Result<usize> {
        let json = serde_json::to_string_pretty(rows)?;
        println!("{}", json);
        info!("[Dry Run] would sync {} issues to bigquery", rows.len());
        Ok(rows.len())
    }
}

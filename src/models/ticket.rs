use crate::models::custom_field::CustomField;
use crate::models::issue::Issue;
use crate::normalize::{self, Warning};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// A flattened issue, shaped for one BigQuery table row.
#[derive(Debug, Clone, Serialize)]
pub struct TicketRow {
    pub issue_id: String,
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub labels: Vec<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub custom_fields: Vec<CustomField>,
    pub refresh_time: String,
}

impl TicketRow {
    pub fn from_issue(issue: &Issue, refresh_time: DateTime<Utc>) -> (Self, Vec<Warning>) {
        let fields = &issue.fields;
        let normalized = normalize::normalize_json(&fields.custom_fields());

        let row = Self {
            issue_id: issue.id.clone(),
            key: issue.key.clone(),
            summary: fields.summary.clone(),
            status: fields.status.as_ref().map(|s| s.name.clone()),
            issue_type: fields.issuetype.as_ref().map(|t| t.name.clone()),
            priority: fields.priority.as_ref().map(|p| p.name.clone()),
            assignee: fields.assignee.as_ref().map(|u| u.display_name.clone()),
            reporter: fields.reporter.as_ref().map(|u| u.display_name.clone()),
            labels: fields.labels.clone(),
            created: fields.created.clone(),
            updated: fields.updated.clone(),
            custom_fields: normalized.fields,
            refresh_time: refresh_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        (row, normalized.warnings)
    }

    /// Deduplication key for streaming inserts.
    pub fn insert_id(&self) -> String {
        format!("{}-{}", self.key, self.refresh_time)
    }
}

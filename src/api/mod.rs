pub mod bigquery;
pub mod jira;

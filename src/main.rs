use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod errors;
mod models;
mod normalize;

use crate::api::bigquery::{BigQuerySink, RowSink, StdoutSink};
use crate::api::jira::JiraClient;
use crate::config::settings::Settings;
use crate::models::issue::Issue;
use crate::models::ticket::TicketRow;
use crate::normalize::Warning;

#[derive(Parser)]
#[command(name = "jirarow")]
#[command(version = "0.1.0")]
#[command(about = "Fetch Jira issues, flatten their custom fields and stream them into BigQuery", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.jirarow/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one issue and dump it as JSON
    Issue {
        /// (e.g., OCPBUGS-35865)
        key: String,
    },

    /// Run a JQL search and list the issues found
    Search {
        /// JQL query (default: jira.search from the config)
        #[arg(long)]
        jql: Option<String>,

        /// Maximum number of results
        #[arg(long, default_value = "50")]
        limit: u32,
    },

    /// Print an issue's custom fields, flattened
    Fields {
        key: String,
    },

    /// Convert issues to ticket rows and write them to BigQuery
    Sync {
        /// Issue keys to sync
        #[arg(required_unless_present = "jql")]
        keys: Vec<String>,

        /// Sync every issue matching this JQL instead
        #[arg(long, conflicts_with = "keys")]
        jql: Option<String>,

        /// Maximum number of issues taken from --jql
        #[arg(long, default_value = "50")]
        limit: u32,

        /// Print the rows instead of writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Display the effective configuration (with masked secrets)
    Show,

    /// Get the path to the config file
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Issue { key } => handle_issue(config_path, &key).await,

        Commands::Search { jql, limit } => handle_search(config_path, jql.as_deref(), limit).await,

        Commands::Fields { key } => handle_fields(config_path, &key).await,

        Commands::Sync { keys, jql, limit, dry_run } => {
            handle_sync(config_path, &keys, jql.as_deref(), limit, dry_run).await
        }

        Commands::Config { action } => handle_config(config_path, action),
    };

    if let Err(e) = result {
        eprintln!("\n{}", e);
        for cause in e.chain().skip(1) {
            eprintln!("   {}", format!("caused by: {}", cause).dimmed());
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "jirarow=debug" } else { "jirarow=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&std::path::Path>) -> anyhow::Result<Settings> {
    let settings = Settings::load(path)?;
    settings.validate()?;
    Ok(settings)
}

fn jira_client(settings: &Settings) -> JiraClient {
    JiraClient::new(settings.jira.url.clone(), settings.auth_method())
}

fn log_warnings(key: &str, warnings: &[Warning]) {
    for warning in warnings {
        warn!(issue = key, "{}", warning);
    }
}

async fn handle_issue(config_path: Option<&std::path::Path>, key: &str) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    let jira = jira_client(&settings);

    let issue = jira.get_issue(key).await?;

    println!("{}", serde_json::to_string_pretty(&issue)?);
    Ok(())
}

async fn handle_search(
    config_path: Option<&std::path::Path>,
    jql: Option<&str>,
    limit: u32,
) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    let jira = jira_client(&settings);

    let jql = jql.unwrap_or(&settings.jira.search);
    println!("{}", format!("  JQL: {}", jql).dimmed());
    println!();

    let issues = jira.search_issues(jql, limit).await?;

    if issues.is_empty() {
        println!("{}", "  No issues found".dimmed());
        return Ok(());
    }

    println!("  {} issues found", issues.len().to_string().bright_white());
    println!();

    for issue in &issues {
        println!("  {}", format_issue_line(issue));
    }

    if issues.len() == limit as usize {
        println!();
        println!("{}", format!("  Showing {} of potentially more results. Use --limit to see more.", limit).dimmed());
    }

    Ok(())
}

fn format_issue_line(issue: &Issue) -> String {
    let status = issue
        .fields
        .status
        .as_ref()
        .map(|s| s.name.as_str())
        .unwrap_or("-");

    format!(
        "{} {} [{}]  {}",
        issue.id.dimmed(),
        issue.key.bright_white().bold(),
        status,
        issue.fields.summary
    )
}

async fn handle_fields(config_path: Option<&std::path::Path>, key: &str) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    let jira = jira_client(&settings);

    let issue = jira.get_issue(key).await?;
    let normalized = normalize::normalize_json(&issue.fields.custom_fields());
    log_warnings(key, &normalized.warnings);

    println!("{}", serde_json::to_string_pretty(&normalized.fields)?);
    Ok(())
}

async fn handle_sync(
    config_path: Option<&std::path::Path>,
    keys: &[String],
    jql: Option<&str>,
    limit: u32,
    dry_run: bool,
) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    if !dry_run {
        settings.validate_bigquery()?;
    }
    let jira = jira_client(&settings);

    let issues = match jql {
        Some(jql) => jira.search_issues(jql, limit).await?,
        None => {
            let mut issues = Vec::with_capacity(keys.len());
            for key in keys {
                issues.push(jira.get_issue(key).await?);
            }
            issues
        }
    };

    let refresh_time = chrono::Utc::now();
    let rows: Vec<TicketRow> = issues
        .iter()
        .map(|issue| {
            debug!(issue = %issue.key, custom = issue.fields.custom_fields().len(), "converting issue");
            let (row, warnings) = TicketRow::from_issue(issue, refresh_time);
            log_warnings(&issue.key, &warnings);
            row
        })
        .collect();

    let sink: Box<dyn RowSink> = if dry_run {
        Box::new(StdoutSink)
    } else {
        Box::new(BigQuerySink::from_config(&settings.bigquery)?)
    };

    let written = sink.write_rows(&rows).await?;

    if !dry_run {
        println!(
            "{}",
            format!(
                "✓ Synced {} issues to {}.{}",
                written, settings.bigquery.dataset_id, settings.bigquery.table_id
            )
            .green()
            .bold()
        );
    }

    Ok(())
}

fn handle_config(config_path: Option<&std::path::Path>, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load(config_path)?;

            println!("{}", "Current Configuration".cyan().bold());
            println!();
            println!("{}", toml::to_string_pretty(&settings.masked())?);

            if let Err(e) = settings.validate() {
                println!("{}", format!("  Warning: {}", e).yellow());
            }

            Ok(())
        }

        ConfigAction::Path => {
            let path = match config_path {
                Some(p) => p.to_path_buf(),
                None => Settings::config_path()?,
            };
            println!("{}", path.display());
            Ok(())
        }
    }
}

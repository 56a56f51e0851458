//! Command-line interface and export pipeline

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth;
use crate::client::{MailClient, ProductionGmailClient};
use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::exclusions::ExclusionFilter;
use crate::models::LabelInfo;
use crate::scanner::{ExportScanner, ScanConfig};
use crate::writer;

#[derive(Parser, Debug)]
#[command(name = "gmail-export")]
#[command(version)]
#[command(about = "Export sender and recipient metadata from Gmail labels to a spreadsheet", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".gmail-export/token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with Gmail API
    Auth {
        /// Force re-authentication even if token exists
        #[arg(long)]
        force: bool,
    },

    /// Export messages from selected labels
    Export {
        /// Output spreadsheet (.xlsx or .csv); overrides export.output_path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Label indices to export, e.g. "1,3,4"; prompts when omitted
        #[arg(short, long)]
        labels: Option<String>,
    },

    /// List available labels with their selection indices
    Labels,

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_multi_progress(MultiProgress::new())
    }

    /// Share a MultiProgress with the tracing writer so logs print above bars
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        Self {
            multi,
            spinner_style,
        }
    }

    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }

    pub fn println(&self, msg: impl AsRef<str>) {
        let _ = self.multi.println(msg);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one export run
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub labels: Vec<String>,
    pub rows_exported: usize,
    /// `None` when nothing was written
    pub output_path: Option<PathBuf>,
}

impl ExportReport {
    fn new(started_at: DateTime<Utc>, labels: &[LabelInfo], rows: usize, output: Option<PathBuf>) -> Self {
        let completed_at = Utc::now();
        Self {
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_seconds(),
            labels: labels.iter().map(|l| l.name.clone()).collect(),
            rows_exported: rows,
            output_path: output,
        }
    }
}

/// Numbered label list as shown to the user (1-based)
pub fn format_label_list(labels: &[LabelInfo]) -> String {
    labels
        .iter()
        .enumerate()
        .map(|(index, label)| format!("{}. {}", index + 1, label.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve a comma-separated list of 1-based indices against `labels`.
///
/// Out-of-range indices are skipped and repeated ones collapse to their first
/// occurrence. A non-numeric entry is an error.
pub fn parse_label_selection(input: &str, labels: &[LabelInfo]) -> Result<Vec<LabelInfo>> {
    let mut selected: Vec<LabelInfo> = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let index: usize = part
            .parse()
            .map_err(|_| ExportError::InvalidSelection(format!("'{}' is not a label index", part)))?;

        match index.checked_sub(1).and_then(|i| labels.get(i)) {
            Some(label) if !selected.iter().any(|s| s.id == label.id) => {
                selected.push(label.clone())
            }
            Some(_) => {}
            None => tracing::warn!("Ignoring label index {} (out of range)", index),
        }
    }

    Ok(selected)
}

/// Ask the user which labels to export
fn prompt_label_selection(reporter: &ProgressReporter, labels: &[LabelInfo]) -> Result<String> {
    reporter.println(format!("Available Labels:\n{}", format_label_list(labels)));

    reporter
        .multi_progress()
        .suspend(|| inquire::Text::new("Get messages from labels index. E.g: 1,3,4 :").prompt())
        .map_err(|e| match e {
            inquire::InquireError::OperationCanceled | inquire::InquireError::OperationInterrupted => {
                ExportError::OperationCancelled("label selection aborted".to_string())
            }
            other => ExportError::InvalidSelection(other.to_string()),
        })
}

/// Run the export against an already-constructed client.
///
/// `selection` is the comma-separated label index list; the user is prompted
/// when it is `None`. The output path must not exist yet.
pub async fn export_with_client<C>(
    client: C,
    config: &Config,
    output: &Path,
    selection: Option<&str>,
    reporter: &ProgressReporter,
) -> Result<ExportReport>
where
    C: MailClient,
{
    let started_at = Utc::now();
    writer::ensure_absent(output)?;
    writer::sink_for(output)?;

    let filter = ExclusionFilter::from_config(&config.filter)?;

    let label_spinner = reporter.add_spinner("Fetching labels...");
    let labels = client.list_labels().await?;
    reporter.finish_spinner(&label_spinner, &format!("Found {} labels", labels.len()));

    if labels.is_empty() {
        reporter.println("No labels found.");
        return Ok(ExportReport::new(started_at, &[], 0, None));
    }

    let selection = match selection {
        Some(s) => s.to_string(),
        None => prompt_label_selection(reporter, &labels)?,
    };
    let selected = parse_label_selection(&selection, &labels)?;
    if selected.is_empty() {
        reporter.println("No labels selected.");
        return Ok(ExportReport::new(started_at, &[], 0, None));
    }

    let names: Vec<&str> = selected.iter().map(|l| l.name.as_str()).collect();
    reporter.println(format!("Select labels: {}", names.join(",")));

    let scanner = ExportScanner::new(client, filter, ScanConfig::from(&config.export));
    let scan_spinner = reporter.add_spinner("Reading messages...");
    let rows = scanner.collect_labels(&selected).await?;
    reporter.finish_spinner(&scan_spinner, &format!("Collected {} rows", rows.len()));

    if rows.is_empty() {
        reporter.println("No messages.");
        return Ok(ExportReport::new(started_at, &selected, 0, None));
    }

    // The sink refuses to replace a file created while the export ran
    writer::write_rows(output, &rows)?;

    Ok(ExportReport::new(
        started_at,
        &selected,
        rows.len(),
        Some(output.to_path_buf()),
    ))
}

/// Full export: pre-flight, config, auth, then [`export_with_client`]
pub async fn run_export(
    cli: &Cli,
    output: Option<&Path>,
    selection: Option<&str>,
    reporter: &ProgressReporter,
) -> Result<ExportReport> {
    let config_spinner = reporter.add_spinner("Loading configuration...");
    let config = Config::load(&cli.config).await?;
    reporter.finish_spinner(&config_spinner, &format!("Configuration loaded from {:?}", cli.config));

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.export.output_path.clone());

    // Nothing touches the network when the destination is already there
    writer::ensure_absent(&output)?;
    writer::sink_for(&output)?;

    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authenticated successfully");

    let client = Arc::new(ProductionGmailClient::with_user(
        hub,
        config.export.user_id.clone(),
        config.export.max_concurrent_requests,
        config.export.max_retries,
    ));

    info!("Exporting to {:?}", output);
    export_with_client(client, &config, &output, selection, reporter).await
}

/// Print the numbered label list
pub async fn run_list_labels(cli: &Cli, reporter: &ProgressReporter) -> Result<Vec<LabelInfo>> {
    let config = Config::load(&cli.config).await?;
    let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;
    let client = ProductionGmailClient::with_user(
        hub,
        config.export.user_id.clone(),
        config.export.max_concurrent_requests,
        config.export.max_retries,
    );

    let spinner = reporter.add_spinner("Fetching labels...");
    let labels = client.list_labels().await?;
    reporter.finish_spinner(&spinner, &format!("Found {} labels", labels.len()));
    Ok(labels)
}

//! Gmail Export
//!
//! Exports sender and recipient metadata (Date, From, To) from selected Gmail
//! labels into a spreadsheet, skipping automated senders.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 installed-app flow with token caching
//! - **Scanning**: label pagination with bounded concurrent header fetches
//! - **Filtering**: exclusion of newsletter/noreply/notification senders
//! - **Output**: single-sheet `.xlsx` or `.csv` with a fixed column schema
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_export::{auth, client::ProductionGmailClient, config::Config};
//! use gmail_export::{ExclusionFilter, ExportScanner, ScanConfig, MailClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!
//!     let hub = auth::initialize_gmail_hub(
//!         "credentials.json".as_ref(),
//!         ".gmail-export/token.json".as_ref(),
//!     ).await?;
//!     let client = ProductionGmailClient::new(hub, config.export.max_concurrent_requests, 3);
//!
//!     let labels = client.list_labels().await?;
//!     let scanner = ExportScanner::new(
//!         client,
//!         ExclusionFilter::from_config(&config.filter)?,
//!         ScanConfig::from(&config.export),
//!     );
//!     let rows = scanner.collect_labels(&labels[..1]).await?;
//!     gmail_export::writer::write_rows("emails.xlsx".as_ref(), &rows)?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`address`] - `Name <email>` header parsing
//! - [`auth`] - OAuth2 authentication and Gmail API initialization
//! - [`client`] - Rate-limited Gmail API client with retry logic
//! - [`cli`] - Command-line interface and export pipeline
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`exclusions`] - Automated-sender exclusion filter
//! - [`models`] - Core data structures
//! - [`scanner`] - Label pagination, concurrent fetch and filtering
//! - [`writer`] - Spreadsheet output

pub mod address;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod exclusions;
pub mod models;
pub mod scanner;
pub mod writer;

pub use error::{ExportError, Result};

pub use models::{Address, LabelInfo, MessageHeader, MessagePage, MessageRecord, Row, COLUMNS};

pub use address::parse_address;
pub use exclusions::ExclusionFilter;

pub use config::{Config, ExportConfig, FilterConfig};

pub use client::{MailClient, ProductionGmailClient};

pub use scanner::{ExportScanner, ScanConfig};

pub use writer::{CsvSink, TabularSink, XlsxSink};

pub use cli::{Cli, Commands, ExportReport, ProgressReporter};

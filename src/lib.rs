//! Gmail Retention
//!
//! Label-driven retention policies for a Gmail mailbox. Labels named
//! `ManagedLabels/KeepLast<N>` keep the newest N messages from each sender;
//! labels named `ManagedLabels/KeepDays<D>` keep the messages received in the
//! last D days. Everything else carrying the label is deleted.
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_retention::{auth, client::ProductionGmailClient, config::Config};
//! use gmail_retention::engine::{EngineOptions, RetentionEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!
//!     let scopes = auth::required_scopes(config.execution.deletion_mode);
//!     let hub = auth::initialize_gmail_hub(
//!         "credentials.json".as_ref(),
//!         ".gmail-retention/token.json".as_ref(),
//!         scopes,
//!     )
//!     .await?;
//!
//!     let client = ProductionGmailClient::new(
//!         hub,
//!         config.account.user_id.clone(),
//!         config.execution.deletion_mode,
//!         &config.client,
//!     );
//!     let engine = RetentionEngine::new(Box::new(client), EngineOptions::from_config(&config));
//!     let report = engine.run(None).await?;
//!     println!("{} messages deleted", report.deletion.deleted);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail API initialization
//! - [`client`] - Mail service trait and the Gmail-backed implementation
//! - [`classifier`] - Label name parsing into retention rules
//! - [`headers`] - Subject, sender and timestamp extraction
//! - [`fetcher`] - Paginated message listing and header resolution
//! - [`evaluator`] - KeepLast and KeepDays selection
//! - [`executor`] - Deletion of the selected messages
//! - [`engine`] - Run orchestration
//! - [`report`] - Run summaries in Markdown and JSON
//! - [`cli`] - Command-line interface
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`models`] - Core data structures

pub mod auth;
pub mod classifier;
pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod fetcher;
pub mod headers;
pub mod models;
pub mod report;

pub use error::{Result, RetentionError};

pub use models::{
    DeletionSet, Label, ManagedLabel, MessageHeader, MessagePage, MessageRecord, RetentionRule,
};

pub use classifier::{classify_label, classify_labels, ClassifiedLabels};

pub use config::{Config, DeletionMode, ExecutionConfig, LabelConfig, ListingErrorPolicy};

pub use client::{MailService, ProductionGmailClient};

pub use engine::{EngineOptions, RetentionEngine, RetentionPlan};

pub use executor::{execute_deletions, DeletionReport};

pub use report::RunReport;

pub use cli::{Cli, Commands, ProgressReporter};

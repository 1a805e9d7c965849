//! Command-line interface

use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{self, required_scopes};
use crate::classifier::ClassifiedLabels;
use crate::client::{ProductionGmailClient, ProgressCallback};
use crate::config::Config;
use crate::engine::{EngineOptions, RetentionEngine};
use crate::error::Result;
use crate::report::RunReport;

#[derive(Parser, Debug)]
#[command(name = "gmail-retention")]
#[command(version)]
#[command(about = "Delete Gmail messages that violate label-based retention rules", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".gmail-retention/token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub json_logs: bool,

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

    /// Show the retention rules found in the mailbox labels
    Rules,

    /// Apply every retention rule and delete violating messages
    Run(RunArgs),

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

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Dry run mode (select messages but delete nothing)
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Write a Markdown report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write a JSON report to this path
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

/// Truncate a string to max_len characters, adding "..." if truncated
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len.saturating_sub(3)).collect::<String>())
    }
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar_style = ProgressStyle::default_bar()
            .template("[{elapsed:>6}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        Self {
            multi,
            spinner_style,
            bar_style,
        }
    }

    pub fn new() -> Self {
        Self::with_multi_progress(MultiProgress::new())
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

    pub fn add_progress_bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.bar_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        self.println(&format!("  ✓ {}", msg));
    }

    pub fn println(&self, msg: &str) {
        let _ = self.multi.println(msg);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render classified rules as aligned text lines
pub fn format_rules(classified: &ClassifiedLabels) -> Vec<String> {
    if classified.is_empty() {
        return vec!["No managed labels found.".to_string()];
    }

    let mut lines = Vec::with_capacity(classified.len());
    for managed in classified.iter() {
        let marker = if managed.rule.is_degenerate() { "!" } else { " " };
        lines.push(format!(
            "{} {:<48} {}",
            marker,
            truncate_string(&managed.label.name, 48),
            managed.rule
        ));
    }
    lines
}

/// Load config, authenticate and build the Gmail client
async fn connect(
    cli: &Cli,
    config: &Config,
    reporter: &ProgressReporter,
) -> Result<ProductionGmailClient> {
    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let scopes = required_scopes(config.execution.deletion_mode);
    let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache, scopes).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authenticated");

    Ok(ProductionGmailClient::new(
        hub,
        config.account.user_id.clone(),
        config.execution.deletion_mode,
        &config.client,
    ))
}

/// `rules` command: list classified rules without touching messages
pub async fn show_rules(cli: &Cli, multi: MultiProgress) -> Result<ClassifiedLabels> {
    let reporter = ProgressReporter::with_multi_progress(multi);
    let config = Config::load(&cli.config).await?;
    let client = connect(cli, &config, &reporter).await?;

    let engine = RetentionEngine::new(Box::new(client), EngineOptions::from_config(&config));
    let spinner = reporter.add_spinner("Listing labels...");
    let classified = engine.classify().await?;
    reporter.finish_spinner(&spinner, &format!("{} managed labels", classified.len()));

    for line in format_rules(&classified) {
        reporter.println(&line);
    }
    for warning in classified.warnings() {
        reporter.println(&format!("warning: {}", warning));
    }

    Ok(classified)
}

fn confirm(reporter: &ProgressReporter, prompt: &str) -> Result<bool> {
    reporter.multi_progress().suspend(|| {
        print!("{} [y/N]: ", prompt);
        let _ = std::io::Write::flush(&mut std::io::stdout());
    });

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// `run` command. Returns `None` when the user declines the confirmation.
pub async fn run_retention(
    cli: &Cli,
    args: &RunArgs,
    multi: MultiProgress,
) -> Result<Option<RunReport>> {
    let reporter = ProgressReporter::with_multi_progress(multi);

    let config_spinner = reporter.add_spinner("Loading configuration...");
    let mut config = Config::load(&cli.config).await?;
    if args.dry_run {
        config.execution.dry_run = true;
    }
    reporter.finish_spinner(
        &config_spinner,
        &format!("Configuration loaded (prefix: {})", config.labels.prefix),
    );

    let client = connect(cli, &config, &reporter).await?;
    let engine = RetentionEngine::new(Box::new(client), EngineOptions::from_config(&config));

    let plan_spinner = reporter.add_spinner("Evaluating retention rules...");
    let plan = engine.plan(Utc::now()).await?;
    reporter.finish_spinner(
        &plan_spinner,
        &format!(
            "{} labels evaluated, {} messages selected",
            plan.outcomes.len(),
            plan.deletion_set.len()
        ),
    );

    for warning in &plan.warnings {
        reporter.println(&format!("warning: {}", warning));
    }
    for skipped in &plan.skipped_labels {
        reporter.println(&format!("skipped: {} ({})", skipped.label_name, skipped.reason));
    }

    let dry_run = engine.options().dry_run;
    if !dry_run && !args.yes && !plan.deletion_set.is_empty() {
        let prompt = format!(
            "Delete {} messages ({:?} mode)?",
            plan.deletion_set.unique_count(),
            config.execution.deletion_mode
        );
        if !confirm(&reporter, &prompt)? {
            reporter.println("Aborted.");
            return Ok(None);
        }
    }

    let label = if dry_run {
        "Checking selection..."
    } else {
        "Deleting messages..."
    };
    let bar = reporter.add_progress_bar(plan.deletion_set.len() as u64, label);
    let bar_clone = bar.clone();
    let on_progress: ProgressCallback = Arc::new(move || bar_clone.inc(1));

    let report = engine.execute(plan, Some(on_progress)).await;
    bar.finish_with_message(if dry_run {
        format!("{} messages would be deleted", report.deletion.attempted)
    } else {
        format!(
            "Deleted {} messages ({} failed)",
            report.deletion.deleted,
            report.deletion.failed_count()
        )
    });

    if let Some(path) = &args.report {
        report.save_markdown(path).await?;
    }
    if let Some(path) = &args.report_json {
        report.save_json(path).await?;
    }

    Ok(Some(report))
}

use anyhow::Result;
use clap::Parser;
use gmail_retention::auth::{initialize_gmail_hub, required_scopes};
use gmail_retention::cli::{self, Cli, Commands};
use gmail_retention::config::Config;
use gmail_retention::error::RetentionError;
use indicatif::MultiProgress;
use std::io::Write;
use std::process;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// A writer that prints through MultiProgress to avoid progress bar conflicts
#[derive(Clone)]
struct MultiProgressWriter {
    multi: Arc<MultiProgress>,
    buffer: Arc<std::sync::Mutex<Vec<u8>>>,
}

impl MultiProgressWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self {
            multi,
            buffer: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        if !buffer.is_empty() {
            let msg = String::from_utf8_lossy(&buffer);
            let msg = msg.trim_end_matches('\n');
            if !msg.is_empty() {
                let _ = self.multi.println(msg);
            }
            buffer.clear();
        }
        Ok(())
    }
}

impl Drop for MultiProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter implementation for tracing
#[derive(Clone)]
struct MultiProgressMakeWriter {
    multi: Arc<MultiProgress>,
}

impl MultiProgressMakeWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self { multi }
    }
}

impl<'a> MakeWriter<'a> for MultiProgressMakeWriter {
    type Writer = MultiProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiProgressWriter::new(Arc::clone(&self.multi))
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        display_error(&e);
        eprintln!("\nFor help, run: gmail-retention --help");
        process::exit(1);
    }
}

fn init_tracing(cli: &Cli, multi_progress: &Arc<MultiProgress>) {
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_retention=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_retention=info,warn"))
    };

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .init();
    } else {
        // Logs print above progress bars
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(MultiProgressMakeWriter::new(Arc::clone(multi_progress)))
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

async fn run() -> Result<()> {
    // aws-lc-rs everywhere except Windows, where ring avoids the NASM/CMake toolchain
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let multi_progress = Arc::new(MultiProgress::new());
    init_tracing(&cli, &multi_progress);

    if let Some(parent) = cli.token_cache.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    match &cli.command {
        Commands::Auth { force } => {
            tracing::info!("Authenticating with Gmail API...");
            let config = Config::load(&cli.config).await?;

            if *force && cli.token_cache.exists() {
                tokio::fs::remove_file(&cli.token_cache).await?;
                tracing::info!("Removed existing token cache");
            }

            let scopes = required_scopes(config.execution.deletion_mode);
            let hub = initialize_gmail_hub(&cli.credentials, &cli.token_cache, scopes).await?;

            println!("Successfully authenticated with Gmail API");
            println!("Token cached at: {:?}", cli.token_cache);

            // Same scope as the token, otherwise a second consent flow starts
            let (_, profile) = hub
                .users()
                .get_profile(&config.account.user_id)
                .add_scope(scopes[0])
                .doit()
                .await
                .map_err(RetentionError::from)?;
            println!(
                "Connected to account: {}",
                profile.email_address.unwrap_or_default()
            );

            Ok(())
        }

        Commands::Rules => {
            let classified = cli::show_rules(&cli, (*multi_progress).clone()).await?;
            if !classified.is_empty() && !classified.warnings().is_empty() {
                println!("\nRules marked with '!' have a zero parameter and select aggressively.");
            }
            Ok(())
        }

        Commands::Run(args) => {
            tracing::info!("Starting retention run");
            if args.dry_run {
                println!("Running in DRY RUN mode - no messages will be deleted");
            }

            let Some(report) = cli::run_retention(&cli, args, (*multi_progress).clone()).await?
            else {
                return Ok(());
            };

            println!("\n========================================");
            println!("Retention Run Summary");
            println!("========================================");
            for line in report.summary_lines() {
                println!("{}", line);
            }
            println!("========================================");

            Ok(())
        }

        Commands::InitConfig { output, force } => {
            tracing::info!("Generating example configuration file");

            if output.exists() && !force {
                return Err(RetentionError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(output).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nKey settings to review:");
            println!("  - labels.prefix: Parent label holding the retention rules");
            println!("  - execution.deletion_mode: 'permanent' or 'trash'");
            println!("  - execution.on_listing_error: 'abort' or 'skip_label'");

            Ok(())
        }
    }
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    for cause in error.chain().skip(1) {
        eprintln!("  Caused by: {}", cause);
    }

    if let Some(err) = error.downcast_ref::<RetentionError>() {
        match err {
            RetentionError::AuthError(_) | RetentionError::Forbidden(_) => {
                eprintln!("\nHint: Make sure your credentials.json file is valid.");
                eprintln!("      Permanent deletion needs the full mail.google.com scope.");
                eprintln!("      Try running: gmail-retention auth --force");
            }
            RetentionError::RateLimitExceeded { .. } => {
                eprintln!("\nHint: You've hit Gmail API rate limits.");
                eprintln!("      Wait a few minutes and try again.");
            }
            RetentionError::ListingFailed { .. } => {
                eprintln!("\nHint: A managed label could not be listed, nothing was deleted.");
                eprintln!("      Set execution.on_listing_error = \"skip_label\" to continue past it.");
            }
            RetentionError::ConfigError(_) => {
                eprintln!("\nHint: Check your configuration file for errors.");
                eprintln!("      Run: gmail-retention init-config --force");
            }
            _ => {}
        }
    }
}

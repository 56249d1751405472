//! DATASUS Updater CLI application
//!
//! Checks the DATASUS repository for newer BPA, SIA, FPO and BDSIA installers
//! and downloads them on confirmation, plus the CNES and Firebird archives.

use std::fs::OpenOptions;
use std::process;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use datasus_updater::cli::{
    handle_bdsia, handle_check, handle_cnes, handle_config, handle_firebird, handle_update, Cli,
    CommandContext, Commands,
};
use datasus_updater::config::{AppConfig, LoggingConfig};
use datasus_updater::errors::{AppError, Result};

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            report(&e);
            1
        }
    };

    // Exit here rather than dropping the runtime: an abandoned FTP transfer
    // thread would otherwise hold the process open until its socket errors
    process::exit(code);
}

/// Main application logic
async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    // Logging settings only; commands report configuration errors themselves
    let logging = AppConfig::load(cli.global.config.clone())
        .await
        .map(|config| config.logging)
        .unwrap_or_default();
    init_logging(&cli, &logging);

    info!("DATASUS Updater v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = CommandContext {
        config_path: cli.global.config.clone(),
        quiet: cli.global.quiet,
    };

    match cli.command.unwrap_or(Commands::Check) {
        Commands::Check => {
            info!("Executing check command");
            handle_check(&ctx).await
        }
        Commands::Update(args) => {
            info!("Executing update command");
            handle_update(&ctx, args).await
        }
        Commands::Bdsia(args) => {
            info!("Executing bdsia command");
            handle_bdsia(&ctx, args).await
        }
        Commands::Cnes(args) => {
            info!("Executing cnes command");
            handle_cnes(&ctx, args).await
        }
        Commands::Firebird(args) => {
            info!("Executing firebird command");
            handle_firebird(&ctx, args).await
        }
        Commands::Config(args) => handle_config(&ctx, args).await,
    }
}

/// Print a failed command's error, with a retry hint when it may be transient
fn report(error: &AppError) {
    tracing::debug!(category = error.category(), "Command failed: {}", error);
    eprintln!("Error: {}", error);
    if error.is_recoverable() {
        eprintln!("This may be temporary; run the command again to retry.");
    }
}

/// Initialize logging from the CLI verbosity flags and the logging config
///
/// The terminal follows the flags; the optional activity log file records
/// at the configured level.
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let terminal_filter = crate_filter(&cli.log_level().to_string());
    let terminal = fmt::layer()
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .with_filter(terminal_filter);

    let mut file_error = None;
    let file = logging.log_file.as_ref().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(crate_filter(&logging.level)),
            ),
            Err(e) => {
                file_error = Some(format!("Cannot open log file {}: {}", path.display(), e));
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(terminal)
        .with(file)
        .init();

    if let Some(message) = file_error {
        tracing::warn!("{}", message);
    }
    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}

/// Environment filter with this crate raised to `level`
fn crate_filter(level: &str) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match format!("datasus_updater={}", level.to_lowercase()).parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

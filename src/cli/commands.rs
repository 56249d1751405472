//! Command handlers for the CLI
//!
//! Each handler loads the configuration, builds a coordinator over the real
//! DATASUS client and drives it through one or two drain cycles.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::client::{ClientConfig, RemoteClient};
use crate::app::coordinator::{Coordinator, CoordinatorConfig, LoopExit};
use crate::app::models::{Product, ProductCatalog};
use crate::cli::args::{BdsiaArgs, ConfigAction, ConfigArgs, FirebirdArgs, TransferArgs, UpdateArgs};
use crate::cli::console::ConsolePresenter;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Options shared by every handler
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
    /// Suppress informational output
    pub quiet: bool,
}

impl CommandContext {
    async fn load_config(&self) -> Result<AppConfig> {
        Ok(AppConfig::load(self.config_path.clone()).await?)
    }

    async fn coordinator(&self, transfer: &TransferArgs) -> Result<Coordinator<ConsolePresenter>> {
        let config = self.load_config().await?;
        let client = RemoteClient::new(&ClientConfig::from_app_config(&config))?;
        let catalog = Arc::new(ProductCatalog::from_config(&config));
        let presenter = ConsolePresenter::new(self.quiet)
            .with_assume_yes(transfer.yes)
            .with_preset_directory(transfer.extract_to.clone());

        Ok(Coordinator::new(
            CoordinatorConfig::from_app_config(&config),
            Arc::new(client),
            catalog,
            presenter,
        ))
    }
}

/// Handle the check command: folder layout plus one check of every product
pub async fn handle_check(ctx: &CommandContext) -> Result<()> {
    let mut coordinator = ctx.coordinator(&TransferArgs::default()).await?;
    coordinator.start_layout();
    coordinator.start_check_all();
    let exit = coordinator.run_until_idle().await;
    finish(&coordinator, exit)
}

/// Handle the update command
///
/// Runs a full check, then requests the download of every selected product
/// the check found actionable. Successful downloads recheck their product.
pub async fn handle_update(ctx: &CommandContext, args: UpdateArgs) -> Result<()> {
    let mut coordinator = ctx.coordinator(&args.transfer).await?;
    coordinator.start_layout();
    coordinator.start_check_all();
    if coordinator.run_until_idle().await == LoopExit::Interrupted {
        return finish(&coordinator, LoopExit::Interrupted);
    }

    let actionable: Vec<Product> = args
        .selected_products()
        .into_iter()
        .filter(|product| {
            coordinator
                .result(*product)
                .is_some_and(|result| result.is_actionable())
        })
        .collect();

    if actionable.is_empty() {
        info!("Nothing to update");
        return finish(&coordinator, LoopExit::Idle);
    }

    for product in actionable {
        coordinator.trigger_action(product);
    }
    let exit = coordinator.run_until_idle().await;
    finish(&coordinator, exit)
}

/// Handle the bdsia command
pub async fn handle_bdsia(ctx: &CommandContext, args: BdsiaArgs) -> Result<()> {
    let mut coordinator = ctx.coordinator(&args.transfer).await?;
    coordinator.start_check(Product::Bdsia);
    if coordinator.run_until_idle().await == LoopExit::Interrupted {
        return finish(&coordinator, LoopExit::Interrupted);
    }

    let Some(pick) = args.pick else {
        return finish(&coordinator, LoopExit::Idle);
    };

    let rows = coordinator
        .result(Product::Bdsia)
        .map_or(0, |result| result.bulk_rows.len());
    args.validate(rows).map_err(AppError::generic)?;

    coordinator.trigger_bulk_download(pick - 1);
    let exit = coordinator.run_until_idle().await;
    finish(&coordinator, exit)
}

/// Handle the cnes command
pub async fn handle_cnes(ctx: &CommandContext, args: TransferArgs) -> Result<()> {
    let mut coordinator = ctx.coordinator(&args).await?;
    coordinator.download_cnes();
    let exit = coordinator.run_until_idle().await;
    finish(&coordinator, exit)
}

/// Handle the firebird command
pub async fn handle_firebird(ctx: &CommandContext, args: FirebirdArgs) -> Result<()> {
    let mut coordinator = ctx.coordinator(&args.transfer).await?;
    coordinator.download_firebird(args.dest);
    let exit = coordinator.run_until_idle().await;
    finish(&coordinator, exit)
}

/// Handle configuration management
pub async fn handle_config(ctx: &CommandContext, args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Init => match AppConfig::initialize(ctx.config_path.clone()).await? {
            Some(path) => println!("Created configuration file: {}", path.display()),
            None => println!("Configuration file already exists; left unchanged"),
        },
        ConfigAction::Show => {
            let config = ctx.load_config().await?;
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}

/// Log the session summary and turn failures into an error exit
fn finish(coordinator: &Coordinator<ConsolePresenter>, exit: LoopExit) -> Result<()> {
    let stats = coordinator.stats();
    info!("Session finished: {}", stats.summary());

    if exit == LoopExit::Interrupted {
        warn!("Interrupted before all operations finished");
        return Err(AppError::generic("Interrupted"));
    }
    if stats.has_failures() {
        return Err(AppError::generic(format!(
            "{} check(s), {} download(s) and {} version record(s) failed",
            stats.checks_failed, stats.downloads_failed, stats.marker_failures
        )));
    }
    Ok(())
}

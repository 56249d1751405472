//! Command-line argument parsing for the DATASUS updater
//!
//! This module defines the CLI structure using clap derive macros. With no
//! subcommand the tool runs a general check, like pressing the start button
//! of the desktop updater.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::models::Product;

/// DATASUS Updater - keep BPA, SIA, FPO and BDSIA current
#[derive(Parser, Debug)]
#[command(
    name = "datasus-updater",
    version,
    about = "Check and download DATASUS billing system updates",
    long_about = "Checks the DATASUS FTP repository for newer BPA, SIA, FPO and BDSIA installers,
compares them with the versions recorded locally and downloads the right file on confirmation.
Also fetches the CNES database and the Firebird 1.5.5 installer."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand; defaults to `check`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the folder layout and check every product
    Check,

    /// Check, then download every product with an update
    Update(UpdateArgs),

    /// List the most recent BDSIA tables and optionally download one
    Bdsia(BdsiaArgs),

    /// Download the full CNES database archive
    Cnes(TransferArgs),

    /// Download the Firebird 1.5.5 installer archive
    Firebird(FirebirdArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Prompt overrides shared by every downloading command
#[derive(Args, Debug, Clone, Default)]
pub struct TransferArgs {
    /// Answer yes to every download confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Extract downloaded archives here instead of prompting
    #[arg(long, value_name = "DIR")]
    pub extract_to: Option<PathBuf>,
}

/// Arguments for the update command
#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Only update these products (repeatable); BDSIA only when named
    #[arg(short, long = "product", value_enum, value_name = "PRODUCT")]
    pub products: Vec<Product>,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

/// Arguments for the bdsia command
#[derive(Args, Debug, Clone)]
pub struct BdsiaArgs {
    /// Download table N from the list (1 is the newest)
    #[arg(long, value_name = "N")]
    pub pick: Option<usize>,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

/// Arguments for the firebird command
#[derive(Args, Debug, Clone)]
pub struct FirebirdArgs {
    /// Folder to save the installer in; prompted for when absent
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init,

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl UpdateArgs {
    /// Products to act on; every marked product when none were named
    pub fn selected_products(&self) -> Vec<Product> {
        if self.products.is_empty() {
            Product::ALL
                .into_iter()
                .filter(|product| product.has_version_marker())
                .collect()
        } else {
            let mut products = self.products.clone();
            products.sort();
            products.dedup();
            products
        }
    }
}

impl BdsiaArgs {
    /// Validate the row number
    pub fn validate(&self, rows: usize) -> Result<(), String> {
        match self.pick {
            Some(0) => Err("Row numbers start at 1".to_string()),
            Some(n) if n > rows => Err(format!("Row {} is out of range (1-{})", n, rows)),
            _ => Ok(()),
        }
    }
}

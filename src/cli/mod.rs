//! Command-line interface components
//!
//! This module contains CLI-specific code for the DATASUS updater,
//! including argument parsing, the terminal presenter and command handlers.

pub mod args;
pub mod commands;
pub mod console;

pub use args::{
    BdsiaArgs, Cli, Commands, ConfigAction, ConfigArgs, FirebirdArgs, GlobalArgs, TransferArgs,
    UpdateArgs,
};
pub use commands::{
    handle_bdsia, handle_check, handle_cnes, handle_config, handle_firebird, handle_update,
    CommandContext,
};
pub use console::ConsolePresenter;

//! DATASUS Updater Library
//!
//! Checks the DATASUS file repository for newer BPA, SIA, FPO and BDSIA
//! installers, compares them with the locally recorded versions and downloads
//! the right artifact on confirmation, without blocking the presenter.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

//! Data models for DATASUS products and transfer sources
//!
//! A [`Product`] is one of the four independently versioned packages the
//! updater manages. [`ProductCatalog`] binds each product to its remote
//! directory and local installation root, resolved from configuration.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::constants::{files, layout};

/// One of the fixed set of update targets
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    /// Boletim de Produção Ambulatorial (`bpamag<digits>.exe`)
    Bpa,
    /// Sistema de Informações Ambulatoriais (`instsia<4 digits>.exe`)
    Sia,
    /// Ficha de Programação Orçamentária, installed once then updated
    Fpo,
    /// BDSIA unified table, offered as the most recent few files
    Bdsia,
}

impl Product {
    /// Every product, in dashboard order
    pub const ALL: [Product; 4] = [Product::Bpa, Product::Sia, Product::Fpo, Product::Bdsia];

    /// Display name used on the dashboard
    pub fn name(&self) -> &'static str {
        match self {
            Product::Bpa => "BPA",
            Product::Sia => "SIA",
            Product::Fpo => "FPO",
            Product::Bdsia => "BDSIA",
        }
    }

    /// Whether an installed version is recorded locally
    ///
    /// BDSIA has no marker: it is always re-downloadable and never "up to date".
    pub fn has_version_marker(&self) -> bool {
        !matches!(self, Product::Bdsia)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a product lives remotely and locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLocation {
    /// FTP directory listed for candidates
    pub remote_dir: String,
    /// Local installation root (downloads land here)
    pub install_dir: PathBuf,
    /// Local version marker, absent for products without one
    pub version_file: Option<PathBuf>,
}

/// Resolved locations for every product plus the HTTP bulk artifacts
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    locations: HashMap<Product, ProductLocation>,
    cnes_dir: PathBuf,
    cnes_url: String,
    firebird_url: String,
}

impl ProductCatalog {
    /// Build the catalog from the loaded configuration
    pub fn from_config(config: &AppConfig) -> Self {
        let server = &config.server;
        let dirs = &config.directories;

        let marked = |remote_dir: &str, install_dir: &Path| ProductLocation {
            remote_dir: remote_dir.to_string(),
            install_dir: install_dir.to_path_buf(),
            version_file: Some(install_dir.join(layout::VERSION_FILE_NAME)),
        };

        let mut locations = HashMap::new();
        locations.insert(Product::Bpa, marked(&server.bpa_path, &dirs.bpa));
        locations.insert(Product::Sia, marked(&server.sia_path, &dirs.sia));
        locations.insert(Product::Fpo, marked(&server.fpo_path, &dirs.fpo));
        // BDSIA tables sit next to the SIA installers and are saved into the SIA root
        locations.insert(
            Product::Bdsia,
            ProductLocation {
                remote_dir: server.sia_path.clone(),
                install_dir: dirs.sia.clone(),
                version_file: None,
            },
        );

        Self {
            locations,
            cnes_dir: dirs.cnes.clone(),
            cnes_url: server.cnes_url.clone(),
            firebird_url: server.firebird_url.clone(),
        }
    }

    /// Location of a product
    pub fn location(&self, product: Product) -> &ProductLocation {
        // Every variant is inserted by the only constructor
        &self.locations[&product]
    }

    /// CNES installation root
    pub fn cnes_dir(&self) -> &Path {
        &self.cnes_dir
    }

    /// CNES archive URL
    pub fn cnes_url(&self) -> &str {
        &self.cnes_url
    }

    /// Firebird installer archive URL
    pub fn firebird_url(&self) -> &str {
        &self.firebird_url
    }

    /// Folders that must exist for the installed systems to work
    ///
    /// Parents come before children so creation order is stable.
    pub fn required_folders(&self) -> Vec<PathBuf> {
        let bpa = &self.location(Product::Bpa).install_dir;
        let fpo = &self.location(Product::Fpo).install_dir;
        let sia = &self.location(Product::Sia).install_dir;
        vec![
            bpa.clone(),
            bpa.join(layout::EXPORT_DIR),
            fpo.clone(),
            fpo.join(layout::EXPORT_DIR),
            sia.clone(),
            sia.join(layout::IMPORT_DIR),
            self.cnes_dir.clone(),
        ]
    }
}

/// Where a transfer reads its bytes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// A file inside an FTP directory on the configured host
    Ftp { directory: String, filename: String },
    /// A plain HTTP(S) GET
    Http { url: String },
}

impl SourceLocator {
    /// Human-readable description for logs
    pub fn describe(&self) -> String {
        match self {
            SourceLocator::Ftp {
                directory,
                filename,
            } => format!("ftp:{}{}", directory, filename),
            SourceLocator::Http { url } => url.clone(),
        }
    }
}

/// What a downloaded file is, which decides the post-download action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Executable installer; may carry a version marker update
    Installer,
    /// Zip archive; extraction is offered
    Archive,
}

impl ArtifactKind {
    /// Classify a file by its extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Self {
        let is_archive = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(files::ARCHIVE_EXTENSION));

        if is_archive {
            ArtifactKind::Archive
        } else {
            ArtifactKind::Installer
        }
    }
}

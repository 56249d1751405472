//! Latest-file selection under product naming rules
//!
//! DATASUS embeds a zero-padded date or sequence number in every installer
//! name, so the newest file is simply the greatest name in plain string
//! order. Names are never parsed as versions: irregular names must sort
//! exactly the way the server listing compares them byte by byte.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::app::models::Product;

/// Filename predicate for one candidate subset
#[derive(Debug, Clone)]
pub enum MatchRule {
    /// Whole-name pattern, case-insensitive
    Pattern(Regex),
    /// Name contains `token` and ends with `suffix` (both case-insensitive)
    Containing {
        token: &'static str,
        suffix: &'static str,
    },
    /// Name starts with `prefix`, ends with `suffix` and lacks `excluded`
    /// (all case-insensitive)
    PrefixedWithout {
        prefix: &'static str,
        excluded: &'static str,
        suffix: &'static str,
    },
}

impl MatchRule {
    /// Build a whole-name, case-insensitive pattern rule
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&format!("^(?:{})$", pattern))
            .case_insensitive(true)
            .build()?;
        Ok(MatchRule::Pattern(regex))
    }

    /// Check whether a remote filename belongs to this subset
    pub fn matches(&self, filename: &str) -> bool {
        match self {
            MatchRule::Pattern(regex) => regex.is_match(filename),
            MatchRule::Containing { token, suffix } => {
                let lower = filename.to_lowercase();
                lower.contains(token) && lower.ends_with(suffix)
            }
            MatchRule::PrefixedWithout {
                prefix,
                excluded,
                suffix,
            } => {
                let lower = filename.to_lowercase();
                lower.starts_with(prefix) && lower.ends_with(suffix) && !lower.contains(excluded)
            }
        }
    }

    /// Short description shown when nothing matches
    pub fn describe(&self) -> String {
        match self {
            MatchRule::Pattern(regex) => format!("'{}'", regex.as_str()),
            MatchRule::Containing { token, suffix } => format!("'*{}*{}'", token, suffix),
            MatchRule::PrefixedWithout {
                prefix,
                excluded,
                suffix,
            } => format!("'{}*{}' without '{}'", prefix, suffix, excluded),
        }
    }
}

fn fixed_pattern(pattern: &str) -> MatchRule {
    MatchRule::pattern(pattern).expect("product patterns are valid regular expressions")
}

const FPO_INSTALLER_TOKEN: &str = "instalador";

static BPA_RULE: LazyLock<MatchRule> = LazyLock::new(|| fixed_pattern(r"bpamag\d+\.exe"));

static SIA_RULE: LazyLock<MatchRule> = LazyLock::new(|| fixed_pattern(r"instsia\d{4}\.exe"));

static BDSIA_RULE: LazyLock<MatchRule> =
    LazyLock::new(|| fixed_pattern(r"BDSIA\d{6}[a-z]\.exe"));

static FPO_INSTALLER_RULE: MatchRule = MatchRule::Containing {
    token: FPO_INSTALLER_TOKEN,
    suffix: ".exe",
};

static FPO_UPDATE_RULE: MatchRule = MatchRule::PrefixedWithout {
    prefix: "fpo",
    excluded: FPO_INSTALLER_TOKEN,
    suffix: ".exe",
};

/// How a product picks its candidates out of one listing
#[derive(Debug, Clone, Copy)]
pub enum SelectionPlan {
    /// The single latest match
    Latest(&'static MatchRule),
    /// Latest of two disjoint subsets, chosen independently
    InstallerSplit {
        installer: &'static MatchRule,
        update: &'static MatchRule,
    },
    /// The first `n` matches in selection order
    Top(&'static MatchRule, usize),
}

impl SelectionPlan {
    /// Plan for a product; `bulk_rows` sizes the BDSIA table
    pub fn for_product(product: Product, bulk_rows: usize) -> Self {
        match product {
            Product::Bpa => SelectionPlan::Latest(&BPA_RULE),
            Product::Sia => SelectionPlan::Latest(&SIA_RULE),
            Product::Fpo => SelectionPlan::InstallerSplit {
                installer: &FPO_INSTALLER_RULE,
                update: &FPO_UPDATE_RULE,
            },
            Product::Bdsia => SelectionPlan::Top(&BDSIA_RULE, bulk_rows),
        }
    }
}

/// Pick the latest filename matching `rule`
///
/// Independent of input order: among matches, the greatest string wins.
pub fn select_latest(filenames: &[String], rule: &MatchRule) -> Option<String> {
    filenames
        .iter()
        .filter(|name| rule.matches(name))
        .max()
        .cloned()
}

/// The first `n` matches in descending string order
pub fn select_top_n(filenames: &[String], rule: &MatchRule, n: usize) -> Vec<String> {
    let mut matches: Vec<String> = filenames
        .iter()
        .filter(|name| rule.matches(name))
        .cloned()
        .collect();

    matches.sort_unstable_by(|a, b| b.cmp(a));
    matches.dedup();
    matches.truncate(n);
    matches
}

/// Version identifier of a remote file: the name without its extension
pub fn version_of(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
        .to_string()
}

//! Terminal presenter
//!
//! Renders the dashboard as plain lines, asks questions on stdin and shows
//! one `indicatif` bar per running download. Notification lines carry a
//! local timestamp like the desktop updater's notification log.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::Local;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use crate::app::coordinator::{Presenter, Severity, StatusView};
use crate::app::models::Product;
use crate::app::task::TaskId;

const BAR_TEMPLATE: &str =
    "{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix} [{elapsed_precise}] {bytes} {bytes_per_sec}";

/// Presenter for an interactive (or scripted) terminal session
pub struct ConsolePresenter {
    quiet: bool,
    assume_yes: bool,
    preset_directory: Option<PathBuf>,
    multi: MultiProgress,
    bars: HashMap<TaskId, ProgressBar>,
}

impl ConsolePresenter {
    /// Create a presenter; `quiet` hides informational lines and bars
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        Self {
            quiet,
            assume_yes: false,
            preset_directory: None,
            multi,
            bars: HashMap::new(),
        }
    }

    /// Answer yes to every confirmation
    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    /// Answer every directory prompt with this folder
    pub fn with_preset_directory(mut self, directory: Option<PathBuf>) -> Self {
        self.preset_directory = directory;
        self
    }

    fn print(&self, line: &str) {
        if self.bars.is_empty() {
            println!("{}", line);
        } else if let Err(e) = self.multi.println(line) {
            debug!("Could not print above progress bars: {}", e);
        }
    }

    fn ask(&self, prompt: &str) -> Option<String> {
        self.multi.suspend(|| {
            print!("{}", prompt);
            if let Err(e) = io::stdout().flush() {
                debug!("Could not flush prompt: {}", e);
            }

            let mut answer = String::new();
            match io::stdin().lock().read_line(&mut answer) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(answer.trim().to_string()),
            }
        })
    }

    fn new_bar(&self, id: TaskId, filename: &str, total: Option<u64>) -> ProgressBar {
        let (bar, template) = match total {
            Some(total) => (ProgressBar::new(total), BAR_TEMPLATE),
            None => (ProgressBar::new_spinner(), SPINNER_TEMPLATE),
        };
        match ProgressStyle::default_bar().template(template) {
            Ok(style) => bar.set_style(style.progress_chars("##-")),
            Err(e) => debug!("Progress bar template error: {}", e),
        }
        bar.set_prefix(format!("{} {}", id, filename));
        self.multi.add(bar)
    }
}

/// Marker printed in front of status lines
fn badge(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "[ .. ]",
        Severity::Success => "[ OK ]",
        Severity::Warning => "[ !! ]",
        Severity::Error => "[FAIL]",
    }
}

/// Yes/no answer parsing; anything unrecognised is a no
fn is_yes(answer: &str) -> bool {
    matches!(
        answer.to_lowercase().as_str(),
        "y" | "yes" | "s" | "sim"
    )
}

impl Presenter for ConsolePresenter {
    fn render_status(&mut self, product: Product, view: &StatusView) {
        let action = view
            .action
            .as_deref()
            .map(|label| format!("  -> {}", label))
            .unwrap_or_default();
        self.print(&format!(
            "{} {:<6} {}{}",
            badge(view.severity),
            product.name(),
            view.message,
            action
        ));
    }

    fn render_bulk_rows(&mut self, rows: &[String]) {
        if rows.is_empty() {
            self.print("       BDSIA  no tables available");
            return;
        }
        for (index, row) in rows.iter().enumerate() {
            self.print(&format!("       BDSIA  {}. {}", index + 1, row));
        }
    }

    fn confirm(&mut self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            self.print(&format!("{}: {} [yes]", title, message.replace('\n', " ")));
            return true;
        }
        self.ask(&format!("{}\n{} [y/N]: ", title, message))
            .is_some_and(|answer| is_yes(&answer))
    }

    fn choose_directory(&mut self, title: &str) -> Option<PathBuf> {
        if let Some(directory) = &self.preset_directory {
            return Some(directory.clone());
        }
        if self.assume_yes {
            // Nobody to ask in an unattended run
            return None;
        }
        self.ask(&format!("{} (empty to cancel): ", title))
            .filter(|answer| !answer.is_empty())
            .map(PathBuf::from)
    }

    fn alert(&mut self, severity: Severity, title: &str, message: &str) {
        let text = format!("{} {}: {}", badge(severity), title, message.replace('\n', " "));
        if severity == Severity::Error {
            self.multi.suspend(|| eprintln!("{}", text));
        } else if !self.quiet {
            self.print(&text);
        }
    }

    fn log(&mut self, severity: Severity, message: &str) {
        if self.quiet && severity != Severity::Error {
            return;
        }
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.print(&format!("[{}] {}", timestamp, message));
    }

    fn transfer_progress(&mut self, id: TaskId, filename: &str, bytes: u64, total: Option<u64>) {
        if !self.bars.contains_key(&id) {
            let bar = self.new_bar(id, filename, total);
            self.bars.insert(id, bar);
        }
        if let Some(bar) = self.bars.get(&id) {
            bar.set_position(bytes);
        }
    }

    fn transfer_finished(&mut self, id: TaskId) {
        if let Some(bar) = self.bars.remove(&id) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

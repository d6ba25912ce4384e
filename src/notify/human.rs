//! Terminal notifier: styled toasts, an indicatif spinner and progress bar.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, instrument, trace};

use super::{Notifier, RetryPolicy, Severity, StatCounter};
use crate::theme::FpTheme;

/// Styled stderr output for people at a terminal.
#[derive(Debug)]
pub struct HumanNotifier {
    term: Term,
    theme: FpTheme,
    quiet: bool,
    retry: RetryPolicy,
    spinner: Mutex<Option<ProgressBar>>,
    progress: Mutex<Option<ProgressBar>>,
    exports: AtomicU64,
}

impl HumanNotifier {
    #[instrument]
    pub fn new(use_color: bool, quiet: bool, retry: RetryPolicy) -> Self {
        debug!("Creating HumanNotifier");
        Self {
            term: Term::stderr(),
            theme: if use_color {
                FpTheme::default()
            } else {
                FpTheme::plain()
            },
            quiet,
            retry,
            spinner: Mutex::new(None),
            progress: Mutex::new(None),
            exports: AtomicU64::new(0),
        }
    }

    /// Exports counted so far.
    #[must_use]
    pub fn export_count(&self) -> u64 {
        self.exports.load(Ordering::Relaxed)
    }

    fn active_bar(&self) -> Option<ProgressBar> {
        let progress = self.progress.lock().ok().and_then(|p| p.clone());
        progress.or_else(|| self.spinner.lock().ok().and_then(|s| s.clone()))
    }

    /// Write a line without tearing an active bar.
    fn write_line(&self, line: &str) {
        match self.active_bar() {
            Some(bar) => bar.suspend(|| {
                let _ = self.term.write_line(line);
            }),
            None => {
                let _ = self.term.write_line(line);
            }
        }
    }

    fn bar_style(template: &str, fallback: ProgressStyle) -> ProgressStyle {
        ProgressStyle::with_template(template).unwrap_or(fallback)
    }
}

impl Notifier for HumanNotifier {
    fn show_toast(&self, message: &str, severity: Severity) {
        trace!(?severity, message, "Toast");
        if self.quiet && severity != Severity::Error {
            return;
        }
        let (tag, style) = match severity {
            Severity::Success => ("[OK]", &self.theme.success),
            Severity::Info => ("[..]", &self.theme.info),
            Severity::Warning => ("[WARN]", &self.theme.warning),
            Severity::Error => ("[ERR]", &self.theme.error),
        };
        self.write_line(&format!("{} {message}", style.apply_to(tag)));
    }

    fn show_loading(&self, active: bool, message: Option<&str>) {
        let Ok(mut spinner) = self.spinner.lock() else {
            return;
        };
        if let Some(old) = spinner.take() {
            old.finish_and_clear();
        }
        if !active || self.quiet {
            return;
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::bar_style(
            self.theme.spinner_template,
            ProgressStyle::default_spinner(),
        ));
        bar.set_message(message.unwrap_or("Working...").to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        *spinner = Some(bar);
    }

    fn update_progress(&self, percent: u8, message: &str) {
        trace!(percent, message, "Progress");
        if self.quiet {
            return;
        }
        let Ok(mut progress) = self.progress.lock() else {
            return;
        };
        let bar = progress.get_or_insert_with(|| {
            let bar = ProgressBar::new(100);
            bar.set_style(
                Self::bar_style(self.theme.progress_template, ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            bar
        });
        bar.set_position(u64::from(percent.min(100)));
        bar.set_message(message.to_string());
        if percent >= 100 {
            bar.finish_and_clear();
            *progress = None;
        }
    }

    fn update_stats(&self, counter: StatCounter) {
        match counter {
            StatCounter::Exports => {
                let total = self.exports.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(total, "Export counted");
            }
        }
    }

    fn confirm(&self, question: &str) -> bool {
        match self.retry {
            RetryPolicy::Always => true,
            RetryPolicy::Never => false,
            RetryPolicy::Ask => {
                if !self.term.is_term() {
                    debug!("Not a terminal, declining prompt");
                    return false;
                }
                let prompt = format!("{} [y/N] ", self.theme.value.apply_to(question));
                let answer = match self.active_bar() {
                    Some(bar) => bar.suspend(|| ask(&self.term, &prompt)),
                    None => ask(&self.term, &prompt),
                };
                debug!(answer, "Prompt answered");
                answer
            }
        }
    }
}

fn ask(term: &Term, prompt: &str) -> bool {
    if term.write_str(prompt).is_err() {
        return false;
    }
    term.read_line()
        .map(|line| matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
        .unwrap_or(false)
}

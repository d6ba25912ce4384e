//! User notification sinks.
//!
//! The exporter reports through a [`Notifier`] without knowing whether a
//! person is watching a terminal ([`HumanNotifier`]), a script is reading
//! JSON ([`RobotNotifier`]), or a test is inspecting the calls
//! ([`mock::RecordingNotifier`]).

mod human;
pub mod mock;
mod robot;

pub use human::HumanNotifier;
pub use robot::{RobotFormat, RobotNotifier};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// Usage counters the notifier keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatCounter {
    Exports,
}

/// How to answer the degraded-retry prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryPolicy {
    /// Ask on the terminal (declines when not interactive).
    #[default]
    Ask,
    Always,
    Never,
}

/// Sink for user-facing feedback.
pub trait Notifier: Send + Sync {
    fn show_toast(&self, message: &str, severity: Severity);

    /// Toggle the loading indicator. `message` is ignored when hiding.
    fn show_loading(&self, active: bool, message: Option<&str>);

    /// Report batch progress in percent.
    fn update_progress(&self, percent: u8, message: &str);

    fn update_stats(&self, counter: StatCounter);

    /// Ask a yes/no question.
    fn confirm(&self, question: &str) -> bool;
}

//! Robot mode notifier: one JSON object per event on stderr.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, instrument, trace};

use super::{Notifier, RetryPolicy, Severity, StatCounter};

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

impl RobotFormat {
    /// Serialize `data` in this format.
    pub fn render<T: Serialize + ?Sized>(self, data: &T) -> serde_json::Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(data),
            Self::JsonCompact => serde_json::to_string(data),
        }
    }
}

/// Event emitted by [`RobotNotifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RobotEvent<'a> {
    Toast {
        severity: Severity,
        message: &'a str,
    },
    Loading {
        active: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<&'a str>,
    },
    Progress {
        percent: u8,
        message: &'a str,
    },
    Stats {
        counter: StatCounter,
        total: u64,
    },
    Confirm {
        question: &'a str,
        answer: bool,
    },
}

/// JSON event stream for agents and scripts.
///
/// Events go to stderr so stdout carries only the command result.
#[derive(Debug)]
pub struct RobotNotifier {
    retry: RetryPolicy,
    exports: AtomicU64,
}

impl RobotNotifier {
    #[instrument]
    pub fn new(retry: RetryPolicy) -> Self {
        debug!("Creating RobotNotifier");
        Self {
            retry,
            exports: AtomicU64::new(0),
        }
    }

    fn emit(&self, event: &RobotEvent<'_>) {
        match serde_json::to_string(event) {
            Ok(line) => {
                trace!(json_len = line.len(), "Robot event");
                eprintln!("{line}");
            }
            Err(e) => debug!(error = %e, "Failed to serialize robot event"),
        }
    }
}

impl Notifier for RobotNotifier {
    fn show_toast(&self, message: &str, severity: Severity) {
        self.emit(&RobotEvent::Toast { severity, message });
    }

    fn show_loading(&self, active: bool, message: Option<&str>) {
        self.emit(&RobotEvent::Loading {
            active,
            message: message.filter(|_| active),
        });
    }

    fn update_progress(&self, percent: u8, message: &str) {
        self.emit(&RobotEvent::Progress { percent, message });
    }

    fn update_stats(&self, counter: StatCounter) {
        let total = match counter {
            StatCounter::Exports => self.exports.fetch_add(1, Ordering::Relaxed) + 1,
        };
        self.emit(&RobotEvent::Stats { counter, total });
    }

    /// No one can answer a prompt in robot mode; `Ask` declines.
    fn confirm(&self, question: &str) -> bool {
        let answer = self.retry == RetryPolicy::Always;
        self.emit(&RobotEvent::Confirm { question, answer });
        answer
    }
}

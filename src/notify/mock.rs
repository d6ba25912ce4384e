//! Recording notifier for unit and integration testing.
//!
//! Captures every call in order and answers prompts from a script.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Notifier, Severity, StatCounter};

/// One recorded notifier call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyEvent {
    Toast {
        message: String,
        severity: Severity,
    },
    Loading {
        active: bool,
        message: Option<String>,
    },
    Progress {
        percent: u8,
        message: String,
    },
    Stats(StatCounter),
    Confirm {
        question: String,
        answer: bool,
    },
}

/// Notifier that records instead of displaying.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotifyEvent>>,
    answers: Mutex<VecDeque<bool>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next `confirm` call. Unscripted prompts decline.
    pub fn answer_next(&self, answer: bool) {
        self.answers.lock().unwrap().push_back(answer);
    }

    #[must_use]
    pub fn events(&self) -> Vec<NotifyEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Toasts with the given severity, in order.
    #[must_use]
    pub fn toasts(&self, severity: Severity) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                NotifyEvent::Toast {
                    message,
                    severity: s,
                } if s == severity => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Reported progress percentages, in order.
    #[must_use]
    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                NotifyEvent::Progress { percent, .. } => Some(percent),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn stats_count(&self, counter: StatCounter) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == NotifyEvent::Stats(counter))
            .count()
    }

    /// Questions asked through `confirm`.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                NotifyEvent::Confirm { question, .. } => Some(question),
                _ => None,
            })
            .collect()
    }

    /// True if the last loading event turned the indicator off.
    #[must_use]
    pub fn loading_cleared(&self) -> bool {
        self.events()
            .iter()
            .rev()
            .find_map(|e| match e {
                NotifyEvent::Loading { active, .. } => Some(!active),
                _ => None,
            })
            .unwrap_or(true)
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn record(&self, event: NotifyEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Notifier for RecordingNotifier {
    fn show_toast(&self, message: &str, severity: Severity) {
        self.record(NotifyEvent::Toast {
            message: message.to_string(),
            severity,
        });
    }

    fn show_loading(&self, active: bool, message: Option<&str>) {
        self.record(NotifyEvent::Loading {
            active,
            message: message.map(str::to_string),
        });
    }

    fn update_progress(&self, percent: u8, message: &str) {
        self.record(NotifyEvent::Progress {
            percent,
            message: message.to_string(),
        });
    }

    fn update_stats(&self, counter: StatCounter) {
        self.record(NotifyEvent::Stats(counter));
    }

    fn confirm(&self, question: &str) -> bool {
        let answer = self.answers.lock().unwrap().pop_front().unwrap_or(false);
        self.record(NotifyEvent::Confirm {
            question: question.to_string(),
            answer,
        });
        answer
    }
}

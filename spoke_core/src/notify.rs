//! # User-facing collaborators
//!
//! The core never prints. Outcomes of user actions go through a
//! [`Notifier`], and irreversible actions ask a [`Confirm`] first. Front
//! ends provide the implementations.

use serde::{Deserialize, Serialize};

use crate::errors::CalcResult;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Short label for terminal output
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "ok",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// Channel for surfacing messages to the user.
pub trait Notifier {
    fn notify(&mut self, message: &str, severity: Severity);
}

/// Asked before an irreversible action. Returning `false` cancels it.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Report the outcome of a user action.
///
/// On success `success_message` is sent with [`Severity::Success`] and the
/// value is returned; on failure the error is sent with its own severity
/// and `None` is returned.
pub fn report<T>(
    notifier: &mut dyn Notifier,
    outcome: CalcResult<T>,
    success_message: impl FnOnce(&T) -> String,
) -> Option<T> {
    match outcome {
        Ok(value) => {
            notifier.notify(&success_message(&value), Severity::Success);
            Some(value)
        }
        Err(e) => {
            notifier.notify(&e.to_string(), e.severity());
            None
        }
    }
}

/// Notifier that keeps every message, for tests and batch use.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    pub messages: Vec<(String, Severity)>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages with the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.messages.iter().filter(|(_, s)| *s == severity).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, message: &str, severity: Severity) {
        self.messages.push((message.to_string(), severity));
    }
}

/// Confirmation with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

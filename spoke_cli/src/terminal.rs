//! Terminal implementations of the core's user-facing collaborators.

use std::io::{self, BufRead, Write};

use spoke_core::notify::{Confirm, Notifier, Severity};

/// Writes notifications to stderr, one line each.
#[derive(Debug, Default)]
pub struct TerminalNotifier {
    /// Suppress success/info lines (`--quiet`)
    pub quiet: bool,
}

impl Notifier for TerminalNotifier {
    fn notify(&mut self, message: &str, severity: Severity) {
        if self.quiet && matches!(severity, Severity::Success | Severity::Info) {
            return;
        }
        eprintln!("[{}] {}", severity.label(), message);
    }
}

/// Asks on stdin. Anything but "y"/"yes" is a no.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        prompt_line(&format!("{} [y/N]: ", prompt))
            .map(|answer| is_yes(&answer))
            .unwrap_or(false)
    }
}

/// Always answers yes (`--yes`).
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Print `prompt` and read one line. `None` on EOF or I/O error.
pub fn prompt_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    if io::stdout().flush().is_err() {
        return None;
    }

    let mut input = String::new();
    match io::stdin().lock().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()),
    }
}

/// Prompt for a field, showing the current value. Blank keeps `current`.
pub fn prompt_field(label: &str, current: &str) -> Option<String> {
    let prompt = if current.is_empty() {
        format!("{}: ", label)
    } else {
        format!("{} [{}]: ", label, current)
    };
    let answer = prompt_line(&prompt)?;
    let answer = answer.trim();
    if answer.is_empty() {
        Some(current.to_string())
    } else {
        Some(answer.to_string())
    }
}

//! Semantic validation of a loaded [`StudybotConfig`].

use std::collections::HashSet;

use secrecy::ExposeSecret;

use crate::schema::StudybotConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "handoff.operators[1].id"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Check a config for values that would make the bot unusable or surprising.
pub fn validate(config: &StudybotConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let token = config.telegram.token.expose_secret().trim();
    if token.is_empty() {
        result.push(
            Severity::Error,
            "telegram.token",
            "bot token is empty (set it in the file or via TELEGRAM_TOKEN)",
        );
    } else if token.contains("${") {
        result.push(
            Severity::Error,
            "telegram.token",
            "bot token still holds an unresolved ${...} placeholder",
        );
    }

    let handoff = &config.handoff;
    if handoff.operators.is_empty() {
        result.push(
            Severity::Warning,
            "handoff.operators",
            "no operators configured, every hand-off request will be queued",
        );
    }
    if handoff.max_active_per_operator == 0 {
        result.push(
            Severity::Error,
            "handoff.max_active_per_operator",
            "must be at least 1",
        );
    }
    if handoff.sweep_interval_secs == 0 {
        result.push(
            Severity::Error,
            "handoff.sweep_interval_secs",
            "must be greater than zero",
        );
    }

    let mut seen = HashSet::new();
    for (i, op) in handoff.operators.iter().enumerate() {
        if !seen.insert(op.id) {
            result.push(
                Severity::Warning,
                format!("handoff.operators[{i}].id"),
                format!("duplicate operator {}, later entry ignored", op.id),
            );
        }
        if op.max_active == Some(0) {
            result.push(
                Severity::Warning,
                format!("handoff.operators[{i}].max_active"),
                format!("operator {} can never receive a conversation", op.id),
            );
        }
    }

    if let Some(hours) = &handoff.working_hours {
        match hours.window_minutes() {
            Ok((start, end)) if start == end => result.push(
                Severity::Warning,
                "handoff.working_hours",
                "start equals end, routing is always closed",
            ),
            Ok(_) => {},
            Err(e) => result.push(Severity::Error, "handoff.working_hours", e),
        }
        if let Err(e) = hours.tz() {
            result.push(Severity::Error, "handoff.working_hours.timezone", e);
        }
    }

    let api_key = config.llm.api_key.expose_secret().trim();
    if api_key.is_empty() || api_key.contains("${") {
        result.push(
            Severity::Warning,
            "llm.api_key",
            "no API key, free-form questions will get a fallback answer",
        );
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        result.push(Severity::Error, "llm.temperature", "must be within 0.0..=2.0");
    }
    if config.leads.notification_threshold > 10 {
        result.push(
            Severity::Warning,
            "leads.notification_threshold",
            "interest scores never exceed 10, the manager button will never show",
        );
    }

    result
}

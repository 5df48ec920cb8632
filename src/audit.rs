//! Severity-tagged audit entries
//!
//! Lifecycle milestones and recovered failures are written as structured
//! tracing events carrying a `severity` field, so a log shipper can map them
//! onto a four-level audit trail without the crawler depending on one.

use std::fmt;

/// Audit severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Notice,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes one audit entry
///
/// `context` is free text (usually an error message or the offending input)
/// and is omitted from the event when empty.
pub fn entry(severity: Severity, message: &str, context: &str) {
    let severity_name = severity.as_str();
    match (severity, context.is_empty()) {
        (Severity::Info | Severity::Notice, true) => {
            tracing::info!(severity = severity_name, "{}", message)
        }
        (Severity::Info | Severity::Notice, false) => {
            tracing::info!(severity = severity_name, context = %context, "{}", message)
        }
        (Severity::Error | Severity::Critical, true) => {
            tracing::error!(severity = severity_name, "{}", message)
        }
        (Severity::Error | Severity::Critical, false) => {
            tracing::error!(severity = severity_name, context = %context, "{}", message)
        }
    }
}

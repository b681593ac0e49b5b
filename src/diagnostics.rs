//! Developer diagnostics
//!
//! Non-fatal conditions (unknown element types, discovery failures, legacy
//! fallbacks, deprecated hooks) are recorded as structured entries and logged
//! through `tracing`. Callers and tests inspect the collected entries instead
//! of scraping log output.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnknownType,
    Discovery,
    Migration,
    Deprecation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Element type key or discovery provider the entry concerns.
    pub subject: String,
    pub message: String,
    /// Source location of the caller, for deprecations.
    #[serde(default)]
    pub location: Option<String>,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: &std::panic::Location<'_>) -> Self {
        self.location = Some(format!("{}:{}", location.file(), location.line()));
        self
    }
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<Diagnostic>,
    once: HashSet<String>,
}

/// Cloneable handle to one diagnostics log.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    inner: Arc<Mutex<State>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned log still holds valid entries.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn emit(&self, diagnostic: Diagnostic) {
        match &diagnostic.location {
            Some(location) => tracing::warn!(
                kind = ?diagnostic.kind,
                subject = %diagnostic.subject,
                location = %location,
                "{}",
                diagnostic.message
            ),
            None => tracing::warn!(
                kind = ?diagnostic.kind,
                subject = %diagnostic.subject,
                "{}",
                diagnostic.message
            ),
        }
        self.state().entries.push(diagnostic);
    }

    /// Emit only the first time `key` is seen by this log.
    pub fn emit_once(&self, key: &str, diagnostic: Diagnostic) -> bool {
        if !self.state().once.insert(key.to_string()) {
            return false;
        }
        self.emit(diagnostic);
        true
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.state().entries.clone()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.state()
            .entries
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.once.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_once_suppresses_repeats() {
        let diagnostics = Diagnostics::new();
        let d = Diagnostic::new(DiagnosticKind::Deprecation, "text", "old hook");
        assert!(diagnostics.emit_once("text:hook", d.clone()));
        assert!(!diagnostics.emit_once("text:hook", d));
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[test]
    fn clones_share_one_log() {
        let diagnostics = Diagnostics::new();
        let other = diagnostics.clone();
        other.emit(Diagnostic::new(DiagnosticKind::Migration, "border", "wrapped scalar"));
        assert_eq!(diagnostics.of_kind(DiagnosticKind::Migration).len(), 1);
        assert!(diagnostics.of_kind(DiagnosticKind::Discovery).is_empty());
    }
}

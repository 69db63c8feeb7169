//! Diagnostics - What Best-Effort Steps Skipped
//!
//! Item-level failures never stop a run. They are recorded here instead
//! of vanishing, so callers and tests can see exactly what was skipped.

use serde::{Deserialize, Serialize};

use crate::geometry::ItemId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Vectorize,
    Layers,
    Consolidate,
    Propagate,
    BackgroundFilter,
    BleedOffset,
    Contour,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Something was skipped that should have happened
    Warning,
    /// A step did less than it could, by configuration
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemId>,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a swallowed failure.
    pub fn skip(&mut self, phase: Phase, item: Option<ItemId>, error: impl ToString) {
        let message = error.to_string();
        tracing::warn!(?phase, item = ?item, %message, "skipped");
        self.entries.push(Diagnostic {
            phase,
            item,
            severity: Severity::Warning,
            message,
        });
    }

    pub fn note(&mut self, phase: Phase, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(?phase, %message, "note");
        self.entries.push(Diagnostic {
            phase,
            item: None,
            severity: Severity::Info,
            message,
        });
    }

    pub fn has_warnings(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn in_phase(&self, phase: Phase) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.phase == phase)
    }
}

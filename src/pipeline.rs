//! Preparation Pipeline - Single Entry Point
//!
//! CRITICAL: phases run in a fixed order. Vectorizing and layer setup
//! never fail the run; from consolidation on, the first fatal error stops
//! everything and the document is left exactly as that phase left it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::background::strip_background;
use crate::bleed::apply_offset;
use crate::config::PipelineParams;
use crate::consolidate::consolidate;
use crate::contour::finalize;
use crate::diagnostics::{Diagnostics, Phase};
use crate::document::Document;
use crate::hashing::fingerprint;
use crate::layers::prepare_layers;
use crate::macros::{MacroError, MacroPlayer};
use crate::print::ProductionLayer;
use crate::propagate::duplicate_into;
use crate::vectorize::vectorize;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No document open")]
    NoDocument,

    #[error("Grouping failed: {0}")]
    Grouping(String),

    #[error("Artwork consolidation failed: {0}")]
    Consolidation(String),

    #[error("Bleed offset failed: {0}")]
    Offset(#[source] MacroError),

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Vectorizing,
    LayersPrepared,
    ArtworkConsolidated,
    Propagated,
    BleedFiltered,
    BleedOffset,
    ContourUnified,
    Colored,
    Done,
    Failed,
}

/// Follow-up the operator still has to do by hand.
pub const MANUAL_STEPS: [&str; 3] = [
    "Apply the CutContour spot swatch to the cut path",
    "Check the bleed visually",
    "Check the adhesive width",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: PipelineState,
    pub states: Vec<PipelineState>,
    pub diagnostics: Diagnostics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_steps: Vec<String>,
}

/// The application holding the open document.
pub trait Host {
    fn active_document(&mut self) -> Option<&mut Document>;

    /// Ask the host to refresh its views after a successful run.
    fn redraw(&mut self);
}

/// In-process host: one optional document, a redraw counter.
#[derive(Debug, Default)]
pub struct Workspace {
    pub document: Option<Document>,
    pub redraws: u32,
}

impl Workspace {
    pub fn with_document(document: Document) -> Self {
        Self {
            document: Some(document),
            redraws: 0,
        }
    }
}

impl Host for Workspace {
    fn active_document(&mut self) -> Option<&mut Document> {
        self.document.as_mut()
    }

    fn redraw(&mut self) {
        self.redraws += 1;
    }
}

struct Run {
    states: Vec<PipelineState>,
    diagnostics: Diagnostics,
}

impl Run {
    fn enter(&mut self, state: PipelineState) {
        tracing::info!(?state, "pipeline state");
        self.states.push(state);
    }

    fn state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Idle)
    }
}

/// The preparation pipeline - one document per run
pub struct PreparationPipeline {
    params: PipelineParams,
}

impl PreparationPipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    /// Prepare the host's active document.
    ///
    /// Never panics and never returns an error: failures are reported in
    /// the outcome, with the error message verbatim.
    pub fn run<H, P>(&self, host: &mut H, player: &mut P) -> PipelineOutcome
    where
        H: Host + ?Sized,
        P: MacroPlayer + ?Sized,
    {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let span = tracing::info_span!("prepare", %run_id);
        let _enter = span.enter();

        let mut run = Run {
            states: vec![PipelineState::Idle],
            diagnostics: Diagnostics::new(),
        };

        let (result, input_hash, output_hash) = match host.active_document() {
            None => (Err(PipelineError::NoDocument), None, None),
            Some(doc) => self.execute_fingerprinted(doc, player, &mut run),
        };

        match result {
            Ok(()) => {
                run.enter(PipelineState::Done);
                host.redraw();
                PipelineOutcome {
                    success: true,
                    message: Some(completion_notice()),
                    error: None,
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                    state: run.state(),
                    states: run.states,
                    diagnostics: run.diagnostics,
                    input_hash,
                    output_hash,
                    manual_steps: MANUAL_STEPS.iter().map(|s| s.to_string()).collect(),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, failed_after = ?run.state(), "preparation aborted");
                // No transition out of Idle when there was nothing to prepare.
                if !matches!(e, PipelineError::NoDocument) {
                    run.enter(PipelineState::Failed);
                }
                PipelineOutcome {
                    success: false,
                    message: Some(e.to_string()),
                    error: Some(e.to_string()),
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                    state: run.state(),
                    states: run.states,
                    diagnostics: run.diagnostics,
                    input_hash,
                    output_hash,
                    manual_steps: vec![],
                }
            }
        }
    }

    /// Run the phases between two document fingerprints.
    ///
    /// A failed run still reports the fingerprint of what it left behind.
    fn execute_fingerprinted<P>(
        &self,
        doc: &mut Document,
        player: &mut P,
        run: &mut Run,
    ) -> (Result<(), PipelineError>, Option<String>, Option<String>)
    where
        P: MacroPlayer + ?Sized,
    {
        let input_hash = match fingerprint(doc) {
            Ok(hash) => hash,
            Err(e) => return (Err(e.into()), None, None),
        };
        let result = self.execute(doc, player, run);
        match (result, fingerprint(doc)) {
            (Ok(()), Ok(output)) => (Ok(()), Some(input_hash), Some(output)),
            (Ok(()), Err(e)) => (Err(e.into()), Some(input_hash), None),
            (Err(e), output) => (Err(e), Some(input_hash), output.ok()),
        }
    }

    fn execute<P>(&self, doc: &mut Document, player: &mut P, run: &mut Run) -> Result<(), PipelineError>
    where
        P: MacroPlayer + ?Sized,
    {
        let options = &self.params.options;
        let procedures = &options.procedures;
        let artwork = ProductionLayer::Artwork.name();
        let bleed = ProductionLayer::FondPerdu.name();
        let cut = ProductionLayer::CutContour.name();

        if options.vectorize {
            run.enter(PipelineState::Vectorizing);
            vectorize(doc, player, &self.params, &mut run.diagnostics);
        }

        prepare_layers(doc, &mut run.diagnostics);
        run.enter(PipelineState::LayersPrepared);

        // Only the layer being worked on stays unlocked.
        self.lock_layers(doc, &[bleed, cut], run);
        self.unlock_layers(doc, &[artwork], run);
        consolidate(doc, options, &mut run.diagnostics)?;
        run.enter(PipelineState::ArtworkConsolidated);

        self.unlock_layers(doc, &[bleed, cut], run);
        duplicate_into(doc, artwork, bleed, &mut run.diagnostics);
        duplicate_into(doc, artwork, cut, &mut run.diagnostics);
        self.lock_layers(doc, &[artwork, cut], run);
        run.enter(PipelineState::Propagated);

        let selection = strip_background(doc, bleed, &mut run.diagnostics);
        run.enter(PipelineState::BleedFiltered);

        apply_offset(
            doc,
            &selection,
            player,
            self.params.offset_action_path.as_deref(),
            &procedures.offset,
        )
        .map_err(PipelineError::Offset)?;
        run.enter(PipelineState::BleedOffset);

        self.lock_layers(doc, &[bleed], run);
        let report = finalize(
            doc,
            player,
            self.params.pathfinder_union_action_path.as_deref(),
            &procedures.union,
            &mut run.diagnostics,
        );
        run.enter(PipelineState::ContourUnified);
        tracing::debug!(recolored = report.recolored, united = report.united, "contour painted");
        run.enter(PipelineState::Colored);
        Ok(())
    }

    fn lock_layers(&self, doc: &mut Document, names: &[&str], run: &mut Run) {
        self.set_locked(doc, names, true, run);
    }

    fn unlock_layers(&self, doc: &mut Document, names: &[&str], run: &mut Run) {
        self.set_locked(doc, names, false, run);
    }

    fn set_locked(&self, doc: &mut Document, names: &[&str], locked: bool, run: &mut Run) {
        for name in names {
            if let Err(e) = doc.set_layer_locked(name, locked) {
                run.diagnostics.skip(Phase::Layers, None, e);
            }
        }
    }
}

fn completion_notice() -> String {
    let steps: Vec<_> = MANUAL_STEPS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect();
    format!("Preparation complete. Remaining manual steps: {}", steps.join("; "))
}

impl Default for PreparationPipeline {
    fn default() -> Self {
        Self::new(PipelineParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error_is_fatal_and_verbatim() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let detail = source.to_string();
        let err = PipelineError::from(source);
        assert!(matches!(err, PipelineError::Serialization(_)));
        assert_eq!(err.to_string(), format!("Document serialization failed: {}", detail));
    }

    #[test]
    fn test_successful_run_records_both_fingerprints() {
        let mut doc = Document::new("empty", kurbo::Rect::new(0.0, 0.0, 10.0, 10.0));
        let before = fingerprint(&doc).unwrap();
        let mut run = Run {
            states: vec![PipelineState::Idle],
            diagnostics: Diagnostics::new(),
        };
        let (result, input, output) = PreparationPipeline::default().execute_fingerprinted(
            &mut doc,
            &mut crate::macros::GeometryPlayer::new(),
            &mut run,
        );
        assert!(result.is_ok());
        assert_eq!(input, Some(before));
        assert_eq!(output, fingerprint(&doc).ok());
        assert_eq!(run.state(), PipelineState::Colored);
    }
}

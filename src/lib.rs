//! CutPrep Core - Cut-Contour Preparation Engine
//!
//! # The Rules (Non-Negotiable)
//! 1. Three Layers: CutContour over Artwork over FondPerdu
//! 2. One Item Never Blocks a Batch
//! 3. No Bleed Without Offset
//! 4. Collect, Then Delete
//! 5. No Rollback: a failed run stays inspectable
//! 6. Actions Are Opaque: the host plays them, the engine sequences them

pub mod geometry;
pub mod document;
pub mod print;
pub mod config;
pub mod diagnostics;
pub mod macros;
pub mod layers;
pub mod consolidate;
pub mod propagate;
pub mod background;
pub mod bleed;
pub mod contour;
pub mod vectorize;
pub mod validation;
pub mod hashing;
pub mod pipeline;

pub use geometry::{Color, CompoundPath, Group, ItemId, Leaf, LeafKind, PageItem};
pub use document::{Document, DocumentError, ItemError, Layer, Placement, Selection};
pub use config::{ConfigError, MacroProcedures, PipelineOptions, PipelineParams, ResizeMode};
pub use diagnostics::{Diagnostic, Diagnostics, Phase, Severity};
pub use macros::{ActionFile, ActionOp, ActionSet, GeometryPlayer, MacroError, MacroPlayer, run_macro};
pub use validation::{ValidationResult, Validator, Violation, ViolationSeverity};
pub use hashing::{canonical_json, fingerprint};
pub use print::ProductionLayer;
pub use pipeline::{Host, PipelineError, PipelineOutcome, PipelineState, PreparationPipeline, Workspace};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DOCUMENT_FORMAT_VERSION: &str = "1.0.0";

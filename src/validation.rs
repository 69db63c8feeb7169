//! Invariant Validation - Rule/Policy Separation
//!
//! Rules inspect a finished document and produce structured violations.
//! Policy (error vs warning) decides whether the document is usable.

use serde::{Deserialize, Serialize};

use crate::background::leaf_is_background;
use crate::document::Document;
use crate::geometry::{walk_leaves, PageItem};
use crate::print::{cut_line_color, ProductionLayer, LEGACY_LAYER};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn violated(&self, rule: &str) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }
}

/// Invariant rule trait - produces violations
pub trait InvariantRule {
    fn name(&self) -> &'static str;
    fn check(&self, doc: &Document) -> Vec<Violation>;
}

fn error(rule: &str, message: impl Into<String>, expected: String, actual: String, fix: &str) -> Violation {
    Violation {
        rule: rule.to_string(),
        severity: ViolationSeverity::Error,
        message: message.into(),
        expected: Some(expected),
        actual: Some(actual),
        remediation: vec![fix.to_string()],
    }
}

// --- Concrete Rules ---

pub struct LayerStackRule;

impl InvariantRule for LayerStackRule {
    fn name(&self) -> &'static str { "layer_stack" }

    fn check(&self, doc: &Document) -> Vec<Violation> {
        let expected: Vec<_> = ProductionLayer::FRONT_TO_BACK.iter().map(|l| l.name()).collect();
        let actual = doc.layer_names();
        if actual == expected {
            return vec![];
        }
        vec![error(
            self.name(),
            "Layer set or stacking order is wrong",
            expected.join(" > "),
            actual.join(" > "),
            "Run the preparation again or reorder layers by hand",
        )]
    }
}

pub struct LegacyLayerRule;

impl InvariantRule for LegacyLayerRule {
    fn name(&self) -> &'static str { "legacy_layer" }

    fn check(&self, doc: &Document) -> Vec<Violation> {
        match doc.find_layer(LEGACY_LAYER) {
            None => vec![],
            Some(layer) => vec![error(
                self.name(),
                format!("Legacy layer '{}' still present", LEGACY_LAYER),
                "absent".to_string(),
                format!("{} items", layer.items.len()),
                "Unlock its items and move them to the Artwork layer",
            )],
        }
    }
}

pub struct ArtworkGroupRule;

impl InvariantRule for ArtworkGroupRule {
    fn name(&self) -> &'static str { "artwork_group" }

    fn check(&self, doc: &Document) -> Vec<Violation> {
        let Some(layer) = doc.find_layer(ProductionLayer::Artwork.name()) else {
            return vec![];
        };
        match layer.items.as_slice() {
            [PageItem::Group(_)] | [] => vec![],
            items => vec![error(
                self.name(),
                "Artwork is not wrapped in a single group",
                "1 group".to_string(),
                format!("{} top-level items", items.len()),
                "Group all artwork",
            )],
        }
    }
}

pub struct BleedBackgroundRule;

impl InvariantRule for BleedBackgroundRule {
    fn name(&self) -> &'static str { "bleed_background" }

    fn check(&self, doc: &Document) -> Vec<Violation> {
        let Some(layer) = doc.find_layer(ProductionLayer::FondPerdu.name()) else {
            return vec![];
        };
        let mut white = 0;
        for item in &layer.items {
            walk_leaves(item, &mut |leaf, _| {
                if leaf_is_background(leaf).unwrap_or(false) {
                    white += 1;
                }
            });
        }
        if white == 0 {
            return vec![];
        }
        vec![error(
            self.name(),
            "Bleed layer still holds background-colored geometry",
            "0 white shapes".to_string(),
            format!("{} white shapes", white),
            "Delete white shapes from FondPerdu, they would print past the cut",
        )]
    }
}

pub struct CutContourRule;

impl InvariantRule for CutContourRule {
    fn name(&self) -> &'static str { "cut_contour" }

    fn check(&self, doc: &Document) -> Vec<Violation> {
        let Some(layer) = doc.find_layer(ProductionLayer::CutContour.name()) else {
            return vec![];
        };
        let mut violations = vec![];

        if layer.items.len() > 1 {
            violations.push(Violation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: "Cut contour was not merged into a single path".to_string(),
                expected: Some("1 path".to_string()),
                actual: Some(format!("{} top-level items", layer.items.len())),
                remediation: vec!["Unite the cut contour with Pathfinder".to_string()],
            });
        }

        if let Some(first) = layer.items.first() {
            let color = cut_line_color();
            let mut wrong = 0;
            walk_leaves(first, &mut |leaf, _| {
                if leaf.filled || !leaf.stroked || leaf.stroke_color.as_ref() != Some(&color) {
                    wrong += 1;
                }
            });
            if wrong > 0 {
                violations.push(error(
                    self.name(),
                    "Cut path is not painted as a die line",
                    "unfilled, stroked CMYK 0/100/100/0".to_string(),
                    format!("{} shapes painted otherwise", wrong),
                    "Set no fill and the cut-line stroke",
                ));
            }
        }
        violations
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn InvariantRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(LayerStackRule),
                Box::new(LegacyLayerRule),
                Box::new(ArtworkGroupRule),
                Box::new(BleedBackgroundRule),
                Box::new(CutContourRule),
            ],
        }
    }

    pub fn validate(&self, doc: &Document) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            all_violations.extend(rule.check(doc));
        }

        // Warnings don't block
        let valid = !all_violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        ValidationResult {
            valid,
            violations: all_violations,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

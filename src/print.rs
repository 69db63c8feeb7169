//! Print Production Constants
//!
//! Defines the layer contract and the inks the cutting device reads,
//! so no phase hardcodes its own copy of a name or a color.

use serde::{Deserialize, Serialize};

use crate::geometry::Color;

/// Legacy default layer whose content is migrated into [`ProductionLayer::Artwork`].
pub const LEGACY_LAYER: &str = "Calque 1";

/// Spot ink name treated as background, like CMYK 0/0/0/0.
pub const BACKGROUND_SPOT: &str = "Blanc";

/// Millimetres to points.
pub const MM_TO_PT: f64 = 2.83465;

/// The three structurally significant layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionLayer {
    /// Bleed: oversized copy of the artwork, stripped of background
    FondPerdu,
    /// Source art, grouped and normalized
    Artwork,
    /// Die line read by the cutter
    CutContour,
}

impl ProductionLayer {
    /// Required stacking, front to back.
    pub const FRONT_TO_BACK: [ProductionLayer; 3] = [
        ProductionLayer::CutContour,
        ProductionLayer::Artwork,
        ProductionLayer::FondPerdu,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::FondPerdu => "FondPerdu",
            Self::Artwork => "Artwork",
            Self::CutContour => "CutContour",
        }
    }
}

/// Stroke color of the final cut path: CMYK 0/100/100/0.
pub fn cut_line_color() -> Color {
    Color::cmyk(0.0, 100.0, 100.0, 0.0)
}

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * MM_TO_PT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stacking_order_names() {
        let names: Vec<_> = ProductionLayer::FRONT_TO_BACK.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["CutContour", "Artwork", "FondPerdu"]);
    }

    #[test]
    fn test_margin_conversion() {
        assert!((mm_to_pt(20.0) - 56.693).abs() < 1e-9);
    }
}

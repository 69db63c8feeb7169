//! Pipeline Configuration - The Invocation Bundle
//!
//! The host hands the pipeline one JSON bundle. Field names match the
//! bundle the host already produces; every tunable has a default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read parameters {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid parameters {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineParams {
    /// Converts text frames to outlines
    #[serde(default)]
    pub vecto_texte_action_path: Option<PathBuf>,
    /// Converts stroked paths to filled outlines
    #[serde(default)]
    pub vecto_contour_action_path: Option<PathBuf>,
    /// Applies the bleed offset
    #[serde(default)]
    pub offset_action_path: Option<PathBuf>,
    /// Boolean union of the cut contour
    #[serde(default)]
    pub pathfinder_union_action_path: Option<PathBuf>,
    #[serde(default)]
    pub options: PipelineOptions,
}

impl PipelineParams {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOptions {
    /// Width and height the artwork group is resized to, in points
    #[serde(default = "default_target_size")]
    pub target_size: f64,
    #[serde(default = "default_margin_mm")]
    pub artboard_margin_mm: f64,
    #[serde(default)]
    pub resize_mode: ResizeMode,
    #[serde(default = "default_true")]
    pub vectorize: bool,
    #[serde(default)]
    pub procedures: MacroProcedures,
}

fn default_true() -> bool { true }
fn default_target_size() -> f64 { 1000.0 }
fn default_margin_mm() -> f64 { 20.0 }

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            artboard_margin_mm: default_margin_mm(),
            resize_mode: ResizeMode::default(),
            vectorize: true,
            procedures: MacroProcedures::default(),
        }
    }
}

/// How the artwork group reaches `target_size`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Width and height set independently; distorts non-square artwork
    #[default]
    Stretch,
    /// Largest side set to the target, aspect ratio kept
    Uniform,
}

/// Procedure names invoked inside each loaded action file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MacroProcedures {
    #[serde(default = "default_text_procedure")]
    pub outline_text: String,
    #[serde(default = "default_stroke_procedure")]
    pub outline_stroke: String,
    #[serde(default = "default_offset_procedure")]
    pub offset: String,
    #[serde(default = "default_union_procedure")]
    pub union: String,
}

fn default_text_procedure() -> String { "VectoTexte".to_string() }
fn default_stroke_procedure() -> String { "VectoContour".to_string() }
fn default_offset_procedure() -> String { "Offset".to_string() }
fn default_union_procedure() -> String { "Union".to_string() }

impl Default for MacroProcedures {
    fn default() -> Self {
        Self {
            outline_text: default_text_procedure(),
            outline_stroke: default_stroke_procedure(),
            offset: default_offset_procedure(),
            union: default_union_procedure(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_reports_missing_and_malformed_bundles() {
        let missing = PipelineParams::load(Path::new("/definitely/not/params.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"options\": {\"targetSize\": \"big\"}}").unwrap();
        let err = PipelineParams::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("Invalid parameters"));
    }

    #[test]
    fn test_load_reads_a_bundle_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"offsetActionPath": "/a/offset.json", "options": {"targetSize": 500}}"#).unwrap();
        let params = PipelineParams::load(file.path()).unwrap();
        assert_eq!(params.offset_action_path, Some(PathBuf::from("/a/offset.json")));
        assert_eq!(params.options.target_size, 500.0);
    }

    #[test]
    fn test_bundle_uses_host_field_names() {
        let json = r#"{
            "offsetActionPath": "/actions/offset.json",
            "pathfinderUnionActionPath": "/actions/union.json"
        }"#;
        let params: PipelineParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.offset_action_path, Some(PathBuf::from("/actions/offset.json")));
        assert!(params.vecto_texte_action_path.is_none());
        assert_eq!(params.options.target_size, 1000.0);
        assert_eq!(params.options.resize_mode, ResizeMode::Stretch);
        assert_eq!(params.options.procedures.union, "Union");
    }

    #[test]
    fn test_options_override() {
        let json = r#"{"options": {"resizeMode": "uniform", "vectorize": false}}"#;
        let params: PipelineParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.options.resize_mode, ResizeMode::Uniform);
        assert!(!params.options.vectorize);
        assert_eq!(params.options.artboard_margin_mm, 20.0);
    }
}

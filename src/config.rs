//! Analyzer settings, with defaults matching the TI simulation outputs.

use serde::{Deserialize, Serialize};

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::surface::SurfaceToolConfig;

/// Which mesh an analysis runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSpace {
    /// Use the mesh directly if it is a central surface (`*_central.msh`), else derive one.
    Auto,
    /// The field mesh is a surface and is analyzed as given.
    Surface,
    /// Analyze element data of the volumetric mesh. Only sphere ROIs are supported.
    Volume,
}

impl Default for AnalysisSpace {
    fn default() -> Self {
        AnalysisSpace::Auto
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Scalar field the statistics are computed on.
    pub field_name: String,
    pub space: AnalysisSpace,
    pub compute_focality: bool,
    pub extract_normal_field: bool,
    /// Suffix of the normal component field, e.g. `TI_max_normal` for `TI_max`.
    pub normal_field_suffix: String,
    pub surface_tool: SurfaceToolConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            field_name: String::from("TI_max"),
            space: AnalysisSpace::Auto,
            compute_focality: true,
            extract_normal_field: true,
            normal_field_suffix: String::from("_normal"),
            surface_tool: SurfaceToolConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Read a configuration from a JSON file. Missing keys take their default.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<AnalyzerConfig> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_field<S: Into<String>>(mut self, field_name: S) -> Self {
        self.field_name = field_name.into();
        self
    }

    pub fn with_space(mut self, space: AnalysisSpace) -> Self {
        self.space = space;
        self
    }

    pub fn normal_field_name(&self) -> String {
        format!("{}{}", self.field_name, self.normal_field_suffix)
    }
}

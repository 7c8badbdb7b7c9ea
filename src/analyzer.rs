//! ROI analysis of simulated fields on head and cortical surface meshes.
//!
//! A [`MeshAnalyzer`] is bound to one field mesh and one subject. Each analysis call loads the mesh
//! once and runs to completion; the only state shared between calls is the cached central surface
//! on disk. Three kinds of ROI are supported:
//!
//! * spheres, selecting nodes (or element barycenters) strictly inside the sphere,
//! * single atlas regions of the cortex,
//! * every region of an atlas at once ("whole head"), with failures isolated per region.
//!
//! Sphere ROIs are purely geometric and may reach into places where the field is not defined, so
//! only values above zero enter their statistics. Atlas regions are used as they are. A sphere that
//! contains no mesh point at all is an error, while an empty atlas region just has no statistics.

use log::{debug, info, warn};
use ndarray::{ArrayView1, Axis};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::atlas::AnnotAtlasProvider;
use crate::config::{AnalysisSpace, AnalyzerConfig};
use crate::error::{AnalysisError, Result};
use crate::export::{write_json, write_whole_head_csv};
use crate::focality::{focality_metrics, FocalityMetrics};
use crate::mesh::{FieldLocation, FieldMesh, Weights};
use crate::msh::read_msh;
use crate::stats::{selection, weighted_stats, ValueFilter, WeightedStats};
use crate::surface::{ensure_central_surface, is_central_surface_path, Msh2Cortex};
use crate::traits::{AtlasProvider, SurfaceExtractor};

/// Region of interest of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoiSpec {
    Sphere { center: [f64; 3], radius: f64 },
    CorticalRegion { atlas_type: String, region_name: String },
    WholeHead { atlas_type: String },
}

/// Statistics of one field within one ROI. Absent statistics are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub roi: RoiSpec,
    pub field_name: String,
    pub mean_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_value: Option<f64>,
    #[serde(skip)]
    pub roi_mask: Vec<bool>,
    /// Set for node based analyses.
    pub nodes_in_roi: Option<usize>,
    /// Set for element based analyses on volumetric meshes.
    pub elements_in_roi: Option<usize>,
    pub focality: Option<FocalityMetrics>,
    pub normal_field: Option<WeightedStats>,
}

impl AnalysisResult {
    /// A result without any statistics.
    pub fn empty(roi: RoiSpec, field_name: &str) -> AnalysisResult {
        AnalysisResult {
            roi,
            field_name: field_name.to_string(),
            mean_value: None,
            max_value: None,
            min_value: None,
            roi_mask: Vec::new(),
            nodes_in_roi: None,
            elements_in_roi: None,
            focality: None,
            normal_field: None,
        }
    }

    pub fn has_statistics(&self) -> bool {
        self.mean_value.is_some()
    }

    /// Number of nodes or elements in the ROI.
    pub fn roi_size(&self) -> Option<usize> {
        self.nodes_in_roi.or(self.elements_in_roi)
    }
}

/// Why the analysis of a single whole-head region failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFailure {
    pub reason: String,
}

pub type RegionOutcome = std::result::Result<AnalysisResult, RegionFailure>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMean {
    pub region: String,
    pub mean_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WholeHeadSummary {
    pub total_regions: usize,
    pub valid_regions: usize,
    pub failed_regions: Vec<String>,
    pub highest_mean: Option<RegionMean>,
    pub lowest_mean: Option<RegionMean>,
}

impl WholeHeadSummary {
    fn from_outcomes(regions: &[(String, RegionOutcome)]) -> WholeHeadSummary {
        let means: Vec<RegionMean> = regions
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                Ok(result) => result.mean_value.map(|mean_value| RegionMean {
                    region: name.clone(),
                    mean_value,
                }),
                Err(_) => None,
            })
            .collect();
        let by_mean = |a: &&RegionMean, b: &&RegionMean| a.mean_value.partial_cmp(&b.mean_value).unwrap_or(std::cmp::Ordering::Equal);
        WholeHeadSummary {
            total_regions: regions.len(),
            valid_regions: means.len(),
            failed_regions: regions
                .iter()
                .filter(|(_, outcome)| outcome.is_err())
                .map(|(name, _)| name.clone())
                .collect(),
            highest_mean: means.iter().max_by(by_mean).cloned(),
            lowest_mean: means.iter().min_by(by_mean).cloned(),
        }
    }
}

/// Results for every region of an atlas, in atlas order.
#[derive(Debug, Clone, PartialEq)]
pub struct WholeHeadReport {
    pub atlas_type: String,
    pub field_name: String,
    pub regions: Vec<(String, RegionOutcome)>,
    /// Focality over the whole surface, independent of the regions.
    pub whole_head_focality: Option<FocalityMetrics>,
    pub summary: WholeHeadSummary,
}

impl WholeHeadReport {
    pub fn region(&self, name: &str) -> Option<&RegionOutcome> {
        self.regions.iter().find(|(n, _)| n == name).map(|(_, outcome)| outcome)
    }

    /// Placeholder with null statistics for failed regions.
    pub fn record<'a>(&self, name: &str, outcome: &'a RegionOutcome) -> Cow<'a, AnalysisResult> {
        match outcome {
            Ok(result) => Cow::Borrowed(result),
            Err(_) => Cow::Owned(AnalysisResult::empty(
                RoiSpec::CorticalRegion {
                    atlas_type: self.atlas_type.clone(),
                    region_name: name.to_string(),
                },
                &self.field_name,
            )),
        }
    }
}

#[derive(Serialize)]
struct RegionRecord<'a> {
    #[serde(flatten)]
    result: Cow<'a, AnalysisResult>,
    error: Option<&'a str>,
}

struct RegionRecords<'a>(&'a WholeHeadReport);

impl<'a> Serialize for RegionRecords<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.regions.iter().map(|(name, outcome)| {
            let record = RegionRecord {
                result: self.0.record(name, outcome),
                error: outcome.as_ref().err().map(|f| f.reason.as_str()),
            };
            (name, record)
        }))
    }
}

impl Serialize for WholeHeadReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("WholeHeadReport", 5)?;
        s.serialize_field("atlas_type", &self.atlas_type)?;
        s.serialize_field("field_name", &self.field_name)?;
        s.serialize_field("regions", &RegionRecords(self))?;
        s.serialize_field("whole_head_focality", &self.whole_head_focality)?;
        s.serialize_field("summary", &self.summary)?;
        s.end()
    }
}

/// Outcome of [`MeshAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Single(AnalysisResult),
    WholeHead(WholeHeadReport),
}

/// Runs ROI analyses on the field mesh of one subject.
pub struct MeshAnalyzer {
    field_mesh_path: PathBuf,
    subject_dir: PathBuf,
    output_dir: PathBuf,
    config: AnalyzerConfig,
    extractor: Box<dyn SurfaceExtractor>,
    atlas_provider: Box<dyn AtlasProvider>,
}

impl MeshAnalyzer {
    /// Create an analyzer. Fails if the field mesh does not exist; creates the output directory.
    pub fn new<P, Q, R>(field_mesh_path: P, subject_dir: Q, output_dir: R, config: AnalyzerConfig) -> Result<MeshAnalyzer>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let field_mesh_path = field_mesh_path.as_ref().to_path_buf();
        if !field_mesh_path.is_file() {
            return Err(AnalysisError::MeshNotFound(field_mesh_path));
        }
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;

        let extractor = Box::new(Msh2Cortex::new(config.surface_tool.clone()));
        Ok(MeshAnalyzer {
            field_mesh_path,
            subject_dir: subject_dir.as_ref().to_path_buf(),
            output_dir,
            config,
            extractor,
            atlas_provider: Box::new(AnnotAtlasProvider),
        })
    }

    pub fn with_surface_extractor(mut self, extractor: Box<dyn SurfaceExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_atlas_provider(mut self, atlas_provider: Box<dyn AtlasProvider>) -> Self {
        self.atlas_provider = atlas_provider;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn field_mesh_path(&self) -> &Path {
        &self.field_mesh_path
    }

    /// The mesh analyses run on, deriving the central surface if needed.
    pub fn analysis_mesh_path(&self) -> Result<PathBuf> {
        match self.config.space {
            AnalysisSpace::Surface | AnalysisSpace::Volume => Ok(self.field_mesh_path.clone()),
            AnalysisSpace::Auto if is_central_surface_path(&self.field_mesh_path) => Ok(self.field_mesh_path.clone()),
            AnalysisSpace::Auto => ensure_central_surface(&self.field_mesh_path, &self.subject_dir, self.extractor.as_ref()),
        }
    }

    fn load_analysis_mesh(&self) -> Result<FieldMesh> {
        let path = self.analysis_mesh_path()?;
        let mesh = read_msh(&path)?;
        debug!("Loaded {}: {}", path.display(), mesh);
        Ok(mesh)
    }

    fn require_surface(&self, mesh: &FieldMesh, location: FieldLocation) -> Result<()> {
        if self.config.space == AnalysisSpace::Volume {
            return Err(AnalysisError::SurfaceRequired(String::from(
                "atlas regions cannot be analyzed in volume space",
            )));
        }
        if location != FieldLocation::Node || !mesh.is_surface() {
            return Err(AnalysisError::SurfaceRequired(format!(
                "field '{}' must be node data on a triangle surface",
                self.config.field_name
            )));
        }
        Ok(())
    }

    /// Values of the normal component field, if it exists on the same mesh entities.
    fn normal_values<'m>(&self, mesh: &'m FieldMesh, location: FieldLocation) -> Option<ArrayView1<'m, f64>> {
        if !self.config.extract_normal_field {
            return None;
        }
        let name = self.config.normal_field_name();
        match mesh.field(&name) {
            Ok(field) if field.location == location => match field.scalar_values() {
                Ok(values) => Some(values),
                Err(e) => {
                    warn!("Skipping normal field: {}", e);
                    None
                }
            },
            Ok(_) => {
                warn!("Skipping normal field '{}': it is not defined on the analyzed mesh entities.", name);
                None
            }
            Err(_) => {
                warn!("Normal field '{}' not found in mesh, skipping normal component.", name);
                None
            }
        }
    }

    /// Statistics, focality and normal component of one ROI mask.
    #[allow(clippy::too_many_arguments)]
    fn roi_result(
        &self,
        roi: RoiSpec,
        values: ArrayView1<f64>,
        weights: &Weights,
        normal: Option<ArrayView1<f64>>,
        location: FieldLocation,
        mask: Vec<bool>,
        filter: ValueFilter,
    ) -> Result<AnalysisResult> {
        let stats = weighted_stats(values, weights.values.view(), &mask, filter)?;
        let count = mask.iter().filter(|m| **m).count();

        let mut result = AnalysisResult::empty(roi, &self.config.field_name);
        match location {
            FieldLocation::Node => result.nodes_in_roi = Some(count),
            FieldLocation::Element => result.elements_in_roi = Some(count),
        }

        if let Some(stats) = stats {
            result.mean_value = Some(stats.mean);
            result.max_value = Some(stats.max);
            result.min_value = Some(stats.min);

            if self.config.compute_focality {
                let selected = selection(values, &mask, filter)?;
                let roi_values = values.select(Axis(0), &selected);
                let roi_weights = weights.values.select(Axis(0), &selected);
                result.focality = focality_metrics(roi_values.view(), roi_weights.view(), weights.unit, &roi_label(&result.roi))?;
            }
        }

        if let Some(normal) = normal {
            if count > 0 {
                result.normal_field = weighted_stats(normal, weights.values.view(), &mask, ValueFilter::All)?;
            }
        }

        result.roi_mask = mask;
        Ok(result)
    }

    /// Statistics of the field within a sphere.
    ///
    /// Fails if the sphere contains no node (or element barycenter) or if the field does not exist.
    /// If the sphere only covers values at or below zero, the result has no statistics.
    pub fn analyze_sphere(&self, center: [f64; 3], radius: f64) -> Result<AnalysisResult> {
        if !(radius > 0.0 && radius.is_finite()) || center.iter().any(|c| !c.is_finite()) {
            return Err(AnalysisError::InvalidRoi(format!(
                "sphere needs a finite center and a positive radius, got center {:?} and radius {}",
                center, radius
            )));
        }
        info!(
            "Analyzing '{}' in sphere at ({}, {}, {}) with radius {} mm.",
            self.config.field_name, center[0], center[1], center[2], radius
        );

        let mesh = self.load_analysis_mesh()?;
        let location = match mesh.field(&self.config.field_name) {
            Ok(field) => field.location,
            Err(_) if self.config.space == AnalysisSpace::Volume => FieldLocation::Element,
            Err(_) => FieldLocation::Node,
        };

        let positions = mesh.positions(location);
        let volumetric_elements = location == FieldLocation::Element && mesh.num_tetrahedra() > 0;
        let r2 = radius * radius;
        let mask: Vec<bool> = positions
            .outer_iter()
            .enumerate()
            .map(|(idx, p)| {
                let d2 = (p[0] - center[0]).powi(2) + (p[1] - center[1]).powi(2) + (p[2] - center[2]).powi(2);
                d2 < r2 && (!volumetric_elements || mesh.elements[idx].is_tetrahedron())
            })
            .collect();

        if !mask.iter().any(|m| *m) {
            return Err(AnalysisError::EmptySphere {
                center,
                radius,
                space: match location {
                    FieldLocation::Node => "nodes",
                    FieldLocation::Element => "elements",
                },
            });
        }

        let field = mesh.field(&self.config.field_name)?;
        if location == FieldLocation::Node && !mesh.is_surface() {
            // Node areas only come from triangles, so they cannot weight values inside a volume.
            return Err(AnalysisError::SurfaceRequired(format!(
                "node field '{}' on a volumetric mesh, use element data for volume spheres",
                self.config.field_name
            )));
        }
        let values = field.scalar_values()?;
        let weights = mesh.weights(location);
        let normal = self.normal_values(&mesh, location);

        let result = self.roi_result(
            RoiSpec::Sphere { center, radius },
            values,
            &weights,
            normal,
            location,
            mask,
            ValueFilter::PositiveOnly,
        )?;
        if !result.has_statistics() {
            warn!(
                "No positive '{}' values within {} mm of ({}, {}, {}).",
                self.config.field_name, radius, center[0], center[1], center[2]
            );
        }
        Ok(result)
    }

    /// Statistics of the field within one region of a subject atlas.
    ///
    /// An unknown region is an error; a region without nodes gives a result without statistics.
    pub fn analyze_cortex(&self, atlas_type: &str, target_region: &str) -> Result<AnalysisResult> {
        info!("Analyzing '{}' in region '{}' of atlas '{}'.", self.config.field_name, target_region, atlas_type);

        let mesh = self.load_analysis_mesh()?;
        let field = mesh.field(&self.config.field_name)?;
        self.require_surface(&mesh, field.location)?;
        let values = field.scalar_values()?;

        let atlas = self.atlas_provider.load_atlas(atlas_type, &self.subject_dir)?;
        let mask = atlas.mask(target_region)?.to_vec();

        let weights = mesh.weights(FieldLocation::Node);
        let normal = self.normal_values(&mesh, FieldLocation::Node);
        let result = self.roi_result(
            RoiSpec::CorticalRegion {
                atlas_type: atlas_type.to_string(),
                region_name: target_region.to_string(),
            },
            values,
            &weights,
            normal,
            FieldLocation::Node,
            mask,
            ValueFilter::All,
        )?;
        if result.nodes_in_roi == Some(0) {
            warn!("Region '{}' of atlas '{}' contains no nodes.", target_region, atlas_type);
        }
        Ok(result)
    }

    /// Statistics of the field for every region of a subject atlas.
    ///
    /// Mesh and atlas are loaded once. A region whose analysis fails is recorded as failed and the
    /// remaining regions are still analyzed.
    pub fn analyze_whole_head(&self, atlas_type: &str) -> Result<WholeHeadReport> {
        info!("Analyzing '{}' in all regions of atlas '{}'.", self.config.field_name, atlas_type);

        let mesh = self.load_analysis_mesh()?;
        let field = mesh.field(&self.config.field_name)?;
        self.require_surface(&mesh, field.location)?;
        let values = field.scalar_values()?;
        let weights = mesh.weights(FieldLocation::Node);
        let normal = self.normal_values(&mesh, FieldLocation::Node);

        let atlas = self.atlas_provider.load_atlas(atlas_type, &self.subject_dir)?;

        let mut regions: Vec<(String, RegionOutcome)> = Vec::with_capacity(atlas.len());
        for region in atlas.regions() {
            let roi = RoiSpec::CorticalRegion {
                atlas_type: atlas_type.to_string(),
                region_name: region.name.clone(),
            };
            let outcome = self
                .roi_result(roi, values, &weights, normal, FieldLocation::Node, region.mask.clone(), ValueFilter::All)
                .map_err(|e| {
                    warn!("Analysis of region '{}' failed: {}", region.name, e);
                    RegionFailure { reason: e.to_string() }
                });
            if let Ok(result) = &outcome {
                debug!("Region '{}': mean {:?} over {:?} nodes.", region.name, result.mean_value, result.nodes_in_roi);
            }
            regions.push((region.name.clone(), outcome));
        }

        let whole_head_focality = if self.config.compute_focality {
            focality_metrics(values, weights.values.view(), weights.unit, "whole head")?
        } else {
            None
        };

        let summary = WholeHeadSummary::from_outcomes(&regions);
        info!(
            "Whole-head analysis of atlas '{}': {} regions, {} with results, {} failed.",
            atlas_type,
            summary.total_regions,
            summary.valid_regions,
            summary.failed_regions.len()
        );
        if let (Some(high), Some(low)) = (&summary.highest_mean, &summary.lowest_mean) {
            info!(
                "Highest mean in '{}' ({}), lowest mean in '{}' ({}).",
                high.region, high.mean_value, low.region, low.mean_value
            );
        }

        Ok(WholeHeadReport {
            atlas_type: atlas_type.to_string(),
            field_name: self.config.field_name.clone(),
            regions,
            whole_head_focality,
            summary,
        })
    }

    /// Run the analysis for any ROI.
    pub fn analyze(&self, roi: &RoiSpec) -> Result<Analysis> {
        match roi {
            RoiSpec::Sphere { center, radius } => self.analyze_sphere(*center, *radius).map(Analysis::Single),
            RoiSpec::CorticalRegion { atlas_type, region_name } => {
                self.analyze_cortex(atlas_type, region_name).map(Analysis::Single)
            }
            RoiSpec::WholeHead { atlas_type } => self.analyze_whole_head(atlas_type).map(Analysis::WholeHead),
        }
    }

    /// Write a result as `<name>.json` into the output directory.
    pub fn save_result(&self, name: &str, result: &AnalysisResult) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.json", name));
        write_json(&path, result)?;
        info!("Saved analysis result to {}.", path.display());
        Ok(path)
    }

    /// Write a whole-head report as JSON and CSV into the output directory.
    pub fn save_whole_head(&self, report: &WholeHeadReport) -> Result<(PathBuf, PathBuf)> {
        let stem = format!("{}_{}_whole_head", report.atlas_type, report.field_name);
        let json = self.output_dir.join(format!("{}.json", stem));
        let csv = self.output_dir.join(format!("{}.csv", stem));
        write_json(&json, report)?;
        write_whole_head_csv(fs::File::create(&csv)?, report)?;
        info!("Saved whole-head report to {} and {}.", json.display(), csv.display());
        Ok((json, csv))
    }
}

fn roi_label(roi: &RoiSpec) -> String {
    match roi {
        RoiSpec::Sphere { center, radius } => {
            format!("sphere ({}, {}, {}) r={}", center[0], center[1], center[2], radius)
        }
        RoiSpec::CorticalRegion { region_name, .. } => region_name.clone(),
        RoiSpec::WholeHead { atlas_type } => format!("whole head ({})", atlas_type),
    }
}

/// Mean of a field over a mesh, weighted by node areas or element sizes. Convenience for callers
/// that only need a single number, e.g. to normalize maps.
pub fn mesh_weighted_mean(mesh: &FieldMesh, field_name: &str) -> Result<Option<f64>> {
    let field = mesh.field(field_name)?;
    let values = field.scalar_values()?;
    let weights = mesh.weights(field.location);
    let mask = vec![true; values.len()];
    Ok(weighted_stats(values, weights.values.view(), &mask, ValueFilter::All)?.map(|s| s.mean))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::atlas::Atlas;
    use crate::mesh::Field;
    use crate::msh::write_msh;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    struct FixedAtlas(Atlas);

    impl AtlasProvider for FixedAtlas {
        fn load_atlas(&self, _atlas_type: &str, _subject_dir: &Path) -> Result<Atlas> {
            Ok(self.0.clone())
        }
    }

    fn square_mesh(values: [f64; 4]) -> FieldMesh {
        let mut mesh = FieldMesh::surface(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
            &[[0, 1, 2], [1, 3, 2]],
        )
        .unwrap();
        mesh.insert_field(Field::scalar("TI_max", FieldLocation::Node, arr1(&values))).unwrap();
        mesh
    }

    fn analyzer_for(dir: &Path, mesh: &FieldMesh) -> MeshAnalyzer {
        let path = dir.join("ernie_TI_central.msh");
        write_msh(&path, mesh).unwrap();
        MeshAnalyzer::new(&path, dir, dir.join("analysis"), AnalyzerConfig::default()).unwrap()
    }

    #[test]
    fn summary_picks_highest_and_lowest_means() {
        let mut a = AnalysisResult::empty(RoiSpec::WholeHead { atlas_type: String::from("DK40") }, "TI_max");
        a.mean_value = Some(0.2);
        let mut b = a.clone();
        b.mean_value = Some(0.7);
        let mut c = a.clone();
        c.mean_value = None;
        let regions = vec![
            (String::from("lh.a"), Ok(a)),
            (String::from("lh.b"), Ok(b)),
            (String::from("lh.c"), Ok(c)),
            (String::from("lh.d"), Err(RegionFailure { reason: String::from("corrupt") })),
        ];
        let summary = WholeHeadSummary::from_outcomes(&regions);
        assert_eq!(4, summary.total_regions);
        assert_eq!(2, summary.valid_regions);
        assert_eq!(vec![String::from("lh.d")], summary.failed_regions);
        assert_eq!("lh.b", summary.highest_mean.unwrap().region);
        assert_eq!("lh.a", summary.lowest_mean.unwrap().region);
    }

    #[test]
    fn sphere_statistics_on_a_small_square() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = analyzer_for(dir.path(), &square_mesh([1.0, 2.0, 3.0, 4.0]));
        let result = analyzer.analyze_sphere([0.5, 0.5, 0.0], 1.0).unwrap();

        // Opposite corners carry the same area, so the weighted mean is the plain mean.
        assert_abs_diff_eq!(result.mean_value.unwrap(), 2.5, epsilon = 1e-12);
        assert_eq!(Some(4.0), result.max_value);
        assert_eq!(Some(1.0), result.min_value);
        assert_eq!(Some(4), result.nodes_in_roi);
        assert_eq!(None, result.elements_in_roi);
        assert_eq!(vec![true; 4], result.roi_mask);
        assert!(result.focality.is_some());
        assert!(result.normal_field.is_none());
    }

    #[test]
    fn sphere_boundary_points_are_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = analyzer_for(dir.path(), &square_mesh([1.0, 2.0, 3.0, 4.0]));
        let result = analyzer.analyze_sphere([0.0, 0.0, 0.0], 1.0).unwrap();
        assert_eq!(vec![true, false, false, false], result.roi_mask);
        assert_eq!(Some(1), result.nodes_in_roi);
    }

    #[test]
    fn non_positive_sphere_values_give_a_result_without_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = analyzer_for(dir.path(), &square_mesh([0.0, -1.0, 0.0, -2.0]));
        let result = analyzer.analyze_sphere([0.5, 0.5, 0.0], 1.0).unwrap();
        assert_eq!(None, result.mean_value);
        assert_eq!(None, result.max_value);
        assert_eq!(None, result.focality);
        assert_eq!(Some(4), result.nodes_in_roi);
    }

    #[test]
    fn invalid_sphere_radius_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = analyzer_for(dir.path(), &square_mesh([1.0, 2.0, 3.0, 4.0]));
        assert!(matches!(analyzer.analyze_sphere([0.0; 3], 0.0), Err(AnalysisError::InvalidRoi(_))));
        assert!(matches!(analyzer.analyze_sphere([0.0; 3], f64::NAN), Err(AnalysisError::InvalidRoi(_))));
    }

    #[test]
    fn cortex_regions_are_not_filtered_for_positive_values() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = Atlas::from_regions(
            "DK40",
            vec![(String::from("lh.precentral"), vec![true, true, false, false])],
        );
        let analyzer = analyzer_for(dir.path(), &square_mesh([-1.0, 3.0, 5.0, 5.0]))
            .with_atlas_provider(Box::new(FixedAtlas(atlas)));
        let result = analyzer.analyze_cortex("DK40", "lh.precentral").unwrap();

        // Node 0 has area 1/6, node 1 has area 1/3.
        assert_abs_diff_eq!(result.mean_value.unwrap(), (-1.0 / 6.0 + 1.0) / 0.5, epsilon = 1e-12);
        assert_eq!(Some(-1.0), result.min_value);
    }

    #[test]
    fn volume_space_does_not_support_atlas_regions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ernie_TI.msh");
        write_msh(&path, &square_mesh([1.0, 2.0, 3.0, 4.0])).unwrap();
        let config = AnalyzerConfig::default().with_space(AnalysisSpace::Volume);
        let analyzer = MeshAnalyzer::new(&path, dir.path(), dir.path(), config).unwrap();
        assert!(matches!(
            analyzer.analyze_cortex("DK40", "lh.precentral"),
            Err(AnalysisError::SurfaceRequired(_))
        ));
    }

    #[test]
    fn whole_mesh_mean_uses_node_areas() {
        let mesh = square_mesh([1.0, 2.0, 3.0, 4.0]);
        // Areas: 1/6, 1/3, 1/3, 1/6.
        let expected = (1.0 / 6.0 + 2.0 / 3.0 + 1.0 + 4.0 / 6.0) / 1.0;
        assert_abs_diff_eq!(mesh_weighted_mean(&mesh, "TI_max").unwrap().unwrap(), expected, epsilon = 1e-12);
    }
}

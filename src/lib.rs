//! Analysis of temporal interference (TI) stimulation fields on head meshes.
//!
//! The crate reads Gmsh field meshes and FreeSurfer annotation atlases, combines electric fields
//! into TI and multipolar TI (mTI) vectors, and computes area or volume weighted statistics and
//! focality metrics within spherical, atlas region and whole-head ROIs.

pub mod analyzer;
pub mod atlas;
pub mod config;
pub mod error;
pub mod export;
pub mod focality;
pub mod fs_annot;
pub mod mesh;
pub mod msh;
pub mod stats;
pub mod surface;
pub mod ti_vectors;
pub mod traits;
pub mod util;

pub use analyzer::{Analysis, AnalysisResult, MeshAnalyzer, RegionFailure, RoiSpec, WholeHeadReport, WholeHeadSummary};
pub use atlas::{load_subject_atlas, AnnotAtlasProvider, Atlas, AtlasRegion};
pub use config::{AnalysisSpace, AnalyzerConfig};
pub use error::{AnalysisError, Result};
pub use export::{export_ti_vectors_ply, write_json, write_vector_ply, write_whole_head_csv};
pub use focality::{focality_metrics, FocalityMetrics};
pub use fs_annot::{read_annot, write_annot, FsAnnot, FsAnnotColortable};
pub use mesh::{Element, Field, FieldLocation, FieldMesh, WeightUnit, Weights};
pub use msh::{read_msh, write_msh};
pub use stats::{weighted_stats, ValueFilter, WeightedStats};
pub use surface::{ensure_central_surface, Msh2Cortex, SurfaceToolConfig};
pub use ti_vectors::{add_mti_fields, add_ti_fields, get_dir_ti, get_mti_vectors, get_ti_vectors, ti_amplitude};
pub use traits::{AtlasProvider, SurfaceExtractor};

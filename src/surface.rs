//! Central cortical surface derivation and its on-disk cache.
//!
//! Surface extraction is expensive and deterministic, so its result is stored beside the volumetric
//! mesh as `<stem>_central.msh` and reused by every later analysis of the same mesh.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{AnalysisError, Result};
use crate::traits::SurfaceExtractor;
use crate::util::mesh_stem;

pub const CENTRAL_SUFFIX: &str = "_central";

/// The cache path of the central surface of a volumetric mesh: `<dir>/<stem>_central.msh`.
pub fn central_surface_path<P: AsRef<Path>>(volumetric_mesh: P) -> PathBuf {
    let volumetric_mesh = volumetric_mesh.as_ref();
    let file_name = format!("{}{}.msh", mesh_stem(volumetric_mesh), CENTRAL_SUFFIX);
    match volumetric_mesh.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Whether a mesh path already names a central surface.
pub fn is_central_surface_path<P: AsRef<Path>>(path: P) -> bool {
    mesh_stem(path).ends_with(CENTRAL_SUFFIX)
}

/// Return the central surface of a volumetric mesh, running the extractor only if it is not cached yet.
///
/// The extractor writes into a fresh temporary directory beside the mesh and the result is renamed
/// onto the cache path, so concurrent callers never observe a partially written surface.
pub fn ensure_central_surface<P, Q>(volumetric_mesh: P, subject_dir: Q, extractor: &dyn SurfaceExtractor) -> Result<PathBuf>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let volumetric_mesh = volumetric_mesh.as_ref();
    let subject_dir = subject_dir.as_ref();
    let cache = central_surface_path(volumetric_mesh);

    if cache.is_file() {
        debug!("Using cached central surface {}.", cache.display());
        return Ok(cache);
    }
    if !volumetric_mesh.is_file() {
        return Err(AnalysisError::MeshNotFound(volumetric_mesh.to_path_buf()));
    }
    if !subject_dir.is_dir() {
        return Err(AnalysisError::SubjectDirNotFound(subject_dir.to_path_buf()));
    }

    let cache_dir = match cache.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = mesh_stem(volumetric_mesh);
    let scratch = tempfile::Builder::new()
        .prefix(&format!(".{}{}-", stem, CENTRAL_SUFFIX))
        .tempdir_in(&cache_dir)?;

    info!("Extracting central surface of {}.", volumetric_mesh.display());
    extractor.extract(volumetric_mesh, subject_dir, scratch.path())?;

    let produced = scratch.path().join(format!("{}{}.msh", stem, CENTRAL_SUFFIX));
    if !produced.is_file() {
        return Err(AnalysisError::SurfaceExtraction {
            program: String::from("surface extractor"),
            status: None,
            stdout: String::new(),
            stderr: format!("expected output {} was not written", produced.display()),
        });
    }

    if cache.is_file() {
        warn!("Central surface {} was created concurrently, discarding own result.", cache.display());
    } else {
        fs::rename(&produced, &cache)?;
        info!("Cached central surface at {}.", cache.display());
    }
    Ok(cache)
}

/// Configuration of the external surface extraction tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceToolConfig {
    pub program: String,
    pub extra_args: Vec<String>,
}

impl Default for SurfaceToolConfig {
    fn default() -> Self {
        SurfaceToolConfig {
            program: String::from("msh2cortex"),
            extra_args: Vec::new(),
        }
    }
}

/// Runs the SimNIBS `msh2cortex` tool (or a compatible program) as `<program> -i <mesh> -m <subject_dir> -o <output_dir>`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Msh2Cortex {
    pub config: SurfaceToolConfig,
}

impl Msh2Cortex {
    pub fn new(config: SurfaceToolConfig) -> Self {
        Msh2Cortex { config }
    }
}

impl SurfaceExtractor for Msh2Cortex {
    fn extract(&self, volumetric_mesh: &Path, subject_dir: &Path, output_dir: &Path) -> Result<()> {
        let output = Command::new(&self.config.program)
            .arg("-i")
            .arg(volumetric_mesh)
            .arg("-m")
            .arg(subject_dir)
            .arg("-o")
            .arg(output_dir)
            .args(&self.config.extra_args)
            .output()
            .map_err(|e| AnalysisError::SurfaceExtraction {
                program: self.config.program.clone(),
                status: None,
                stdout: String::new(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AnalysisError::SurfaceExtraction {
                program: self.config.program.clone(),
                status: Some(output.status),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        debug!("{} finished: {}", self.config.program, String::from_utf8_lossy(&output.stdout).trim());
        Ok(())
    }
}

use std::path::Path;

use crate::atlas::Atlas;
use crate::error::Result;

/// Produces the central cortical surface of a volumetric head mesh.
///
/// Implementations must write `<stem>_central.msh` into `output_dir`, where `<stem>` is the file
/// stem of `volumetric_mesh`.
pub trait SurfaceExtractor {
    fn extract(&self, volumetric_mesh: &Path, subject_dir: &Path, output_dir: &Path) -> Result<()>;
}

/// Builds the subject specific atlas for an atlas type.
pub trait AtlasProvider {
    fn load_atlas(&self, atlas_type: &str, subject_dir: &Path) -> Result<Atlas>;
}

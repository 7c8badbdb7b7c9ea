//! Subject atlases: an ordered mapping from region name to a node mask on the central surface.

use log::{debug, info};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, Result};
use crate::fs_annot::{read_annot, FsAnnot};
use crate::traits::AtlasProvider;

pub const HEMISPHERES: [&str; 2] = ["lh", "rh"];

/// A named node mask of an atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasRegion {
    pub name: String,
    pub mask: Vec<bool>,
}

impl AtlasRegion {
    pub fn num_nodes(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }
}

/// Region masks in their natural order. Masks may overlap, need not cover the mesh and may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Atlas {
    pub atlas_type: String,
    regions: Vec<AtlasRegion>,
}

impl Atlas {
    /// Build an atlas from named masks. Mask lengths are checked when a region is analyzed, not here.
    pub fn from_regions<S: Into<String>>(atlas_type: S, regions: Vec<(String, Vec<bool>)>) -> Atlas {
        Atlas {
            atlas_type: atlas_type.into(),
            regions: regions
                .into_iter()
                .map(|(name, mask)| AtlasRegion { name, mask })
                .collect(),
        }
    }

    /// Combine the per-hemisphere annots of a subject, left hemisphere nodes first.
    /// Region names get the hemisphere as prefix, e.g. `lh.precentral`.
    pub fn from_hemisphere_annots<S: Into<String>>(atlas_type: S, lh: &FsAnnot, rh: &FsAnnot) -> Atlas {
        let total = lh.num_vertices() + rh.num_vertices();
        let mut regions = Vec::with_capacity(lh.num_regions() + rh.num_regions());
        let mut offset = 0;
        for (hemi, annot) in HEMISPHERES.iter().zip([lh, rh].iter()) {
            for (idx, name) in annot.colortable.name.iter().enumerate() {
                let mut mask = vec![false; total];
                for (v, member) in annot.region_mask_at(idx).into_iter().enumerate() {
                    mask[offset + v] = member;
                }
                regions.push((format!("{}.{}", hemi, name), mask));
            }
            offset += annot.num_vertices();
        }
        Atlas::from_regions(atlas_type, regions)
    }

    pub fn regions(&self) -> &[AtlasRegion] {
        &self.regions
    }

    pub fn region_names(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The mask of a region. The error lists all region names of the atlas.
    pub fn mask(&self, region: &str) -> Result<&[bool]> {
        self.regions
            .iter()
            .find(|r| r.name == region)
            .map(|r| r.mask.as_slice())
            .ok_or_else(|| AnalysisError::RegionNotFound {
                region: region.to_string(),
                atlas_type: self.atlas_type.clone(),
                available: self.region_names(),
            })
    }
}

impl fmt::Display for Atlas {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Atlas '{}' with {} regions.", self.atlas_type, self.regions.len())
    }
}

/// Path of the annot file for a hemisphere, preferring an uncompressed file over a gzipped one.
pub fn annot_path(subject_dir: &Path, hemi: &str, atlas_type: &str) -> PathBuf {
    let plain = subject_dir.join("label").join(format!("{}.{}.annot", hemi, atlas_type));
    if plain.is_file() {
        return plain;
    }
    let gz = subject_dir.join("label").join(format!("{}.{}.annot.gz", hemi, atlas_type));
    if gz.is_file() {
        gz
    } else {
        plain
    }
}

/// Load the atlas of a subject from `<subject_dir>/label/{lh,rh}.<atlas_type>.annot`.
pub fn load_subject_atlas<P: AsRef<Path>>(atlas_type: &str, subject_dir: P) -> Result<Atlas> {
    let subject_dir = subject_dir.as_ref();
    if !subject_dir.is_dir() {
        return Err(AnalysisError::SubjectDirNotFound(subject_dir.to_path_buf()));
    }

    let mut annots = Vec::with_capacity(2);
    for hemi in HEMISPHERES.iter() {
        let path = annot_path(subject_dir, hemi, atlas_type);
        if !path.is_file() {
            return Err(AnalysisError::AtlasUnavailable {
                atlas_type: atlas_type.to_string(),
                subject_dir: subject_dir.to_path_buf(),
                reason: format!("missing annot file {}", path.display()),
            });
        }
        debug!("Reading {} annot {}.", hemi, path.display());
        let annot = read_annot(&path).map_err(|e| AnalysisError::AtlasUnavailable {
            atlas_type: atlas_type.to_string(),
            subject_dir: subject_dir.to_path_buf(),
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        annots.push(annot);
    }

    let atlas = Atlas::from_hemisphere_annots(atlas_type, &annots[0], &annots[1]);
    info!("Loaded {}", atlas);
    Ok(atlas)
}

/// Reads subject atlases from FreeSurfer annot files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotAtlasProvider;

impl AtlasProvider for AnnotAtlasProvider {
    fn load_atlas(&self, atlas_type: &str, subject_dir: &Path) -> Result<Atlas> {
        load_subject_atlas(atlas_type, subject_dir)
    }
}

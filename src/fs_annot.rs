//! Functions for reading FreeSurfer brain surface parcellations from annot files.
//!
//! These files assign each vertex of a brain surface mesh to exactly one brain region.
//! A so-called colortable contains data on the regions, including the region's
//! name and a unique label computed from its display color. Subject atlases are
//! built from one annot file per hemisphere, see [`crate::atlas`].

use byteordered::ByteOrdered;

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::util::{open_maybe_gz, read_fixed_length_string};

#[derive(Debug, Clone, PartialEq)]
pub struct FsAnnotColortable {
    pub id: Vec<i32>,
    pub name: Vec<String>,
    pub r: Vec<i32>,
    pub g: Vec<i32>,
    pub b: Vec<i32>,
    pub a: Vec<i32>,
    pub label: Vec<i32>, // Computed from r,g,b,a. Used in annot.vertex_labels to identify the region.
}

/// Compute the FreeSurfer region label from its RGBA color.
pub fn color_label(r: i32, g: i32, b: i32, a: i32) -> i32 {
    r + g * (1 << 8) + b * (1 << 16) + a * (1 << 24)
}

impl FsAnnotColortable {
    /// Read a colortable in format version 2 from a reader. The reader must be positioned directly after the version and entry count fields.
    pub fn from_reader<S>(input: &mut S) -> Result<FsAnnotColortable>
    where
        S: Read,
    {
        let mut input = ByteOrdered::be(input);

        let num_chars_orig_filename = input.read_i32()?;
        let _orig_filename = read_fixed_length_string(&mut input, num_chars_orig_filename as usize)?;
        let num_entries = input.read_i32()?; // Stored a second time for version 2.
        if num_entries < 0 {
            return Err(AnalysisError::UnsupportedFsAnnotFormatVersion);
        }
        let num_entries = num_entries as usize;

        let mut ct = FsAnnotColortable {
            id: Vec::with_capacity(num_entries),
            name: Vec::with_capacity(num_entries),
            r: Vec::with_capacity(num_entries),
            g: Vec::with_capacity(num_entries),
            b: Vec::with_capacity(num_entries),
            a: Vec::with_capacity(num_entries),
            label: Vec::with_capacity(num_entries),
        };

        for _ in 0..num_entries {
            ct.id.push(input.read_i32()?);
            let num_chars_region_name = input.read_i32()?;
            ct.name.push(read_fixed_length_string(&mut input, num_chars_region_name as usize)?);
            let (r, g, b, a) = (input.read_i32()?, input.read_i32()?, input.read_i32()?, input.read_i32()?);
            ct.r.push(r);
            ct.g.push(g);
            ct.b.push(b);
            ct.a.push(a);
            ct.label.push(color_label(r, g, b, a));
        }

        Ok(ct)
    }
}

impl fmt::Display for FsAnnotColortable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Colortable for {} brain regions.", self.id.len())
    }
}

/// Models a FreeSurfer brain surface parcellation from an annot file.
///
/// The `vertex_labels` field contains one entry per mesh vertex, in vertex order, and assigns the vertex to a
/// brain region using the `label` field (not the `id` field!) of the `colortable`.
#[derive(Debug, Clone, PartialEq)]
pub struct FsAnnot {
    pub vertex_indices: Vec<i32>,
    pub vertex_labels: Vec<i32>,
    pub colortable: FsAnnotColortable,
}

impl FsAnnot {
    /// Read an annot from a file. Files ending in ".gz" are decompressed on the fly.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsAnnot> {
        let mut input = open_maybe_gz(path)?;
        FsAnnot::from_reader(&mut input)
    }

    pub fn from_reader<S>(input: &mut S) -> Result<FsAnnot>
    where
        S: Read,
    {
        let mut input = ByteOrdered::be(input);

        let num_vertices = input.read_i32()?;
        if num_vertices < 0 {
            return Err(AnalysisError::UnsupportedFsAnnotFormatVersion);
        }

        let mut vertex_indices: Vec<i32> = Vec::with_capacity(num_vertices as usize);
        let mut vertex_labels: Vec<i32> = Vec::with_capacity(num_vertices as usize);
        for _ in 0..num_vertices {
            vertex_indices.push(input.read_i32()?);
            vertex_labels.push(input.read_i32()?);
        }

        let has_colortable = input.read_i32()?;
        if has_colortable != 1 {
            return Err(AnalysisError::UnsupportedFsAnnotFormatVersion);
        }

        // A negative entry count encodes the format version. Only version 2 is supported.
        let version_code = input.read_i32()?;
        if version_code != -2 {
            return Err(AnalysisError::UnsupportedFsAnnotFormatVersion);
        }
        let _num_entries = input.read_i32()?;

        let colortable = FsAnnotColortable::from_reader(input.inner_mut())?;

        Ok(FsAnnot {
            vertex_indices,
            vertex_labels,
            colortable,
        })
    }

    /// Get the region names, in colortable order.
    pub fn regions(&self) -> Vec<String> {
        self.colortable.name.clone()
    }

    pub fn num_regions(&self) -> usize {
        self.colortable.name.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertex_labels.len()
    }

    /// Per-vertex membership mask of the region at the given colortable index.
    ///
    /// A region without any assigned vertices yields an all-false mask.
    pub fn region_mask_at(&self, region_idx: usize) -> Vec<bool> {
        let region_label = self.colortable.label[region_idx];
        self.vertex_labels.iter().map(|l| *l == region_label).collect()
    }

    /// Per-vertex membership mask of the named region, or `None` if the annot has no such region.
    pub fn region_mask(&self, region: &str) -> Option<Vec<bool>> {
        self.colortable
            .name
            .iter()
            .position(|x| x == region)
            .map(|idx| self.region_mask_at(idx))
    }

    /// Get the indices of all vertices which are part of the named region.
    pub fn region_vertices(&self, region: &str) -> Option<Vec<usize>> {
        self.region_mask(region).map(|mask| {
            mask.iter()
                .enumerate()
                .filter(|(_, m)| **m)
                .map(|(idx, _)| idx)
                .collect()
        })
    }
}

impl fmt::Display for FsAnnot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Surface parcellation assigning {} vertices to {} brain regions.",
            self.vertex_labels.len(),
            self.colortable.id.len()
        )
    }
}

/// Read a brain parcellation from a FreeSurfer annot file.
pub fn read_annot<P: AsRef<Path>>(path: P) -> Result<FsAnnot> {
    FsAnnot::from_file(path)
}

/// Write an annot file in format version 2. Mostly useful to produce test data.
pub fn write_annot<W: Write>(output: W, annot: &FsAnnot) -> Result<()> {
    let mut out = ByteOrdered::be(output);
    out.write_i32(annot.vertex_labels.len() as i32)?;
    for (idx, label) in annot.vertex_indices.iter().zip(annot.vertex_labels.iter()) {
        out.write_i32(*idx)?;
        out.write_i32(*label)?;
    }
    out.write_i32(1)?;
    out.write_i32(-2)?;
    let ct = &annot.colortable;
    out.write_i32(ct.name.len() as i32)?;
    let orig = b"ti_analyzer\0";
    out.write_i32(orig.len() as i32)?;
    out.write_all(orig)?;
    out.write_i32(ct.name.len() as i32)?;
    for i in 0..ct.name.len() {
        out.write_i32(ct.id[i])?;
        let mut name = ct.name[i].clone().into_bytes();
        name.push(0);
        out.write_i32(name.len() as i32)?;
        out.write_all(&name)?;
        out.write_i32(ct.r[i])?;
        out.write_i32(ct.g[i])?;
        out.write_i32(ct.b[i])?;
        out.write_i32(ct.a[i])?;
    }
    Ok(())
}

impl FsAnnot {
    /// Build an annot from region names and per-vertex region indices, assigning distinct colors.
    ///
    /// Fails if a vertex refers to a region index outside of `region_names`.
    pub fn from_assignment(region_names: &[&str], vertex_regions: &[usize]) -> Result<FsAnnot> {
        if let Some((vertex, region)) = vertex_regions.iter().enumerate().find(|(_, r)| **r >= region_names.len()) {
            return Err(AnalysisError::InvalidShape(format!(
                "vertex {} is assigned to region {}, but there are only {} regions",
                vertex,
                region,
                region_names.len()
            )));
        }
        let n = region_names.len();
        let mut ct = FsAnnotColortable {
            id: Vec::with_capacity(n),
            name: Vec::with_capacity(n),
            r: Vec::with_capacity(n),
            g: Vec::with_capacity(n),
            b: Vec::with_capacity(n),
            a: Vec::with_capacity(n),
            label: Vec::with_capacity(n),
        };
        for (idx, name) in region_names.iter().enumerate() {
            let (r, g, b) = ((idx as i32 * 37) % 256, (idx as i32 * 11 + 20) % 256, (idx as i32 / 7 + 1) % 256);
            ct.id.push(idx as i32);
            ct.name.push(name.to_string());
            ct.r.push(r);
            ct.g.push(g);
            ct.b.push(b);
            ct.a.push(0);
            ct.label.push(color_label(r, g, b, 0));
        }
        let vertex_labels = vertex_regions.iter().map(|r| ct.label[*r]).collect();
        Ok(FsAnnot {
            vertex_indices: (0..vertex_regions.len() as i32).collect(),
            vertex_labels,
            colortable: ct,
        })
    }
}

//! Writing analysis results: JSON documents, whole-head CSV tables and PLY vector clouds.

use byteordered::ByteOrdered;
use ndarray::ArrayView2;
use serde::Serialize;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analyzer::WholeHeadReport;
use crate::error::{AnalysisError, Result};
use crate::mesh::{FieldLocation, FieldMesh};
use crate::ti_vectors::get_ti_vectors;

pub const WHOLE_HEAD_CSV_HEADER: [&str; 7] =
    ["region", "status", "mean_value", "max_value", "min_value", "nodes_in_roi", "error"];

/// Write any result as pretty printed JSON. Absent statistics become `null`.
pub fn write_json<P: AsRef<Path>, T: Serialize + ?Sized>(path: P, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per region in atlas order. Missing values are empty cells.
pub fn write_whole_head_csv<W: Write>(output: W, report: &WholeHeadReport) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&WHOLE_HEAD_CSV_HEADER)?;
    for (name, outcome) in &report.regions {
        let row = match outcome {
            Ok(result) => [
                name.clone(),
                String::from(if result.has_statistics() { "ok" } else { "empty" }),
                cell(result.mean_value),
                cell(result.max_value),
                cell(result.min_value),
                cell(result.nodes_in_roi),
                String::new(),
            ],
            Err(failure) => [
                name.clone(),
                String::from("failed"),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                failure.reason.clone(),
            ],
        };
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write points with an attached vector as a PLY vertex cloud with properties `x y z vx vy vz`.
pub fn write_vector_ply_to<W: Write>(output: W, positions: ArrayView2<f64>, vectors: ArrayView2<f64>, binary: bool) -> Result<()> {
    if positions.ncols() != 3 || vectors.ncols() != 3 {
        return Err(AnalysisError::InvalidShape(format!(
            "positions and vectors must have 3 columns, got {} and {}",
            positions.ncols(),
            vectors.ncols()
        )));
    }
    if positions.nrows() != vectors.nrows() {
        return Err(AnalysisError::LengthMismatch {
            what: String::from("vectors"),
            expected: positions.nrows(),
            actual: vectors.nrows(),
        });
    }

    let mut writer = BufWriter::new(output);
    writeln!(writer, "ply")?;
    if binary {
        writeln!(writer, "format binary_little_endian 1.0")?;
    } else {
        writeln!(writer, "format ascii 1.0")?;
    }
    writeln!(writer, "element vertex {}", positions.nrows())?;
    for property in &["x", "y", "z", "vx", "vy", "vz"] {
        writeln!(writer, "property float {}", property)?;
    }
    writeln!(writer, "end_header")?;

    if binary {
        let mut out = ByteOrdered::le(&mut writer);
        for (p, v) in positions.outer_iter().zip(vectors.outer_iter()) {
            for x in p.iter().chain(v.iter()) {
                out.write_f32(*x as f32)?;
            }
        }
    } else {
        for (p, v) in positions.outer_iter().zip(vectors.outer_iter()) {
            writeln!(writer, "{} {} {} {} {} {}", p[0], p[1], p[2], v[0], v[1], v[2])?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_vector_ply<P: AsRef<Path>>(path: P, positions: ArrayView2<f64>, vectors: ArrayView2<f64>, binary: bool) -> Result<()> {
    write_vector_ply_to(File::create(path)?, positions, vectors, binary)
}

/// Export the TI vectors of two electric field vector fields of `mesh` for visualization.
///
/// Vectors sit at the nodes or element barycenters, depending on where the fields live.
pub fn export_ti_vectors_ply<P: AsRef<Path>>(mesh: &FieldMesh, e1: &str, e2: &str, path: P, binary: bool) -> Result<()> {
    let f1 = mesh.field(e1)?;
    let f2 = mesh.field(e2)?;
    if f1.location != f2.location {
        return Err(AnalysisError::InvalidShape(format!(
            "fields '{}' and '{}' are defined on different mesh entities",
            e1, e2
        )));
    }
    let ti = get_ti_vectors(f1.vectors()?, f2.vectors()?)?;
    let positions = mesh.positions(f1.location);
    log::info!(
        "Writing {} TI vectors at {} to {}.",
        ti.nrows(),
        match f1.location {
            FieldLocation::Node => "nodes",
            FieldLocation::Element => "element centers",
        },
        path.as_ref().display()
    );
    write_vector_ply(path, positions.view(), ti.view(), binary)
}

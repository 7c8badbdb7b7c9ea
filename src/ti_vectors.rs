//! Temporal interference (TI) envelope vectors.
//!
//! Two sinusoidal fields `E1`, `E2` of slightly different frequency superpose to a field whose
//! amplitude is modulated at the difference frequency. [`get_ti_vectors`] computes, per point, the
//! vector of the maximal modulation envelope. Multipolar TI (mTI) applies the same combination to
//! the TI vectors of two electrode pairs.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{AnalysisError, Result};
use crate::mesh::{Field, FieldLocation, FieldMesh};

/// Relative size of `|E1 - E2|` below which both fields are treated as coinciding.
pub const COINCIDENCE_TOLERANCE: f64 = 1e-12;

fn check_shapes(what: &str, a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> Result<()> {
    if a.ncols() != 3 || b.ncols() != 3 {
        return Err(AnalysisError::InvalidShape(format!(
            "{}: vectors must have 3 components, got {} and {}",
            what,
            a.ncols(),
            b.ncols()
        )));
    }
    if a.nrows() != b.nrows() {
        return Err(AnalysisError::InvalidShape(format!(
            "{}: fields differ in length, {} vs {}",
            what,
            a.nrows(),
            b.nrows()
        )));
    }
    Ok(())
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Lexicographic "greater than" on components, used to order vectors of equal length.
fn lex_greater(a: [f64; 3], b: [f64; 3]) -> bool {
    for i in 0..3 {
        if a[i] != b[i] {
            return a[i] > b[i];
        }
    }
    false
}

/// Maximal TI envelope vector of a single point.
pub fn ti_vector(e1: [f64; 3], e2: [f64; 3]) -> [f64; 3] {
    let (mut e1, mut e2) = (e1, e2);
    let (n1, n2) = (norm(e1), norm(e2));
    if n2 > n1 || (n2 == n1 && lex_greater(e2, e1)) {
        std::mem::swap(&mut e1, &mut e2);
    }
    // Both signs of E2 describe the same oscillation, keep the angle at or below 90 degrees.
    if dot(e1, e2) < 0.0 {
        e2 = [-e2[0], -e2[1], -e2[2]];
    }

    let (n1, n2) = (norm(e1), norm(e2));
    let diff = [e1[0] - e2[0], e1[1] - e2[1], e1[2] - e2[2]];
    let n_diff = norm(diff);

    let along_e2 = if n1 == 0.0 || n2 == 0.0 || n_diff <= COINCIDENCE_TOLERANCE * n1 {
        true
    } else {
        let cos_alpha = dot(e1, e2) / (n1 * n2);
        n2 <= n1 * cos_alpha
    };

    if along_e2 {
        [2.0 * e2[0], 2.0 * e2[1], 2.0 * e2[2]]
    } else {
        let c = cross(e2, diff);
        [2.0 * c[0] / n_diff, 2.0 * c[1] / n_diff, 2.0 * c[2] / n_diff]
    }
}

/// Per-point maximal TI envelope vectors of two `[N, 3]` field vector arrays.
///
/// The inputs are not modified. The result is symmetric in its arguments.
pub fn get_ti_vectors(e1: ArrayView2<f64>, e2: ArrayView2<f64>) -> Result<Array2<f64>> {
    check_shapes("TI", &e1, &e2)?;
    let mut out = Array2::<f64>::zeros((e1.nrows(), 3));
    for ((mut o, a), b) in out
        .axis_iter_mut(Axis(0))
        .zip(e1.axis_iter(Axis(0)))
        .zip(e2.axis_iter(Axis(0)))
    {
        let v = ti_vector([a[0], a[1], a[2]], [b[0], b[1], b[2]]);
        o[0] = v[0];
        o[1] = v[1];
        o[2] = v[2];
    }
    Ok(out)
}

/// Multipolar TI: the TI combination of the TI vectors of the pairs (E1, E2) and (E3, E4).
pub fn get_mti_vectors(
    e1: ArrayView2<f64>,
    e2: ArrayView2<f64>,
    e3: ArrayView2<f64>,
    e4: ArrayView2<f64>,
) -> Result<Array2<f64>> {
    let ti_ab = get_ti_vectors(e1, e2)?;
    let ti_cd = get_ti_vectors(e3, e4)?;
    get_ti_vectors(ti_ab.view(), ti_cd.view())
}

/// Length of each row, i.e. the maximal TI amplitude of TI vectors.
pub fn ti_amplitude(vectors: ArrayView2<f64>) -> Array1<f64> {
    vectors
        .axis_iter(Axis(0))
        .map(|row| row.dot(&row).sqrt())
        .collect()
}

/// TI envelope amplitude along a direction per point: `| |(E1+E2)·n| - |(E1-E2)·n| |`.
///
/// Directions are normalized first; a zero direction yields zero amplitude.
pub fn get_dir_ti(e1: ArrayView2<f64>, e2: ArrayView2<f64>, directions: ArrayView2<f64>) -> Result<Array1<f64>> {
    check_shapes("directional TI", &e1, &e2)?;
    check_shapes("directional TI", &e1, &directions)?;
    let mut out = Array1::<f64>::zeros(e1.nrows());
    for (i, o) in out.iter_mut().enumerate() {
        let (a, b, d) = (e1.row(i), e2.row(i), directions.row(i));
        let len = d.dot(&d).sqrt();
        if len == 0.0 {
            continue;
        }
        let sum = ((a[0] + b[0]) * d[0] + (a[1] + b[1]) * d[1] + (a[2] + b[2]) * d[2]) / len;
        let diff = ((a[0] - b[0]) * d[0] + (a[1] - b[1]) * d[1] + (a[2] - b[2]) * d[2]) / len;
        *o = (sum.abs() - diff.abs()).abs();
    }
    Ok(out)
}

/// Add the maximal TI amplitude of two vector fields of the mesh as scalar field `output`.
///
/// For node fields on a surface, the amplitude along the surface normal is added as `<output>_normal`.
pub fn add_ti_fields(mesh: &mut FieldMesh, e1: &str, e2: &str, output: &str) -> Result<()> {
    let (location, vectors, normal) = {
        let f1 = mesh.field(e1)?;
        let f2 = mesh.field(e2)?;
        if f1.location != f2.location {
            return Err(AnalysisError::InvalidShape(format!(
                "fields '{}' and '{}' live on different mesh entities",
                e1, e2
            )));
        }
        let vectors = get_ti_vectors(f1.vectors()?, f2.vectors()?)?;
        let normal = if f1.location == FieldLocation::Node && mesh.is_surface() {
            Some(get_dir_ti(f1.vectors()?, f2.vectors()?, mesh.node_normals().view())?)
        } else {
            None
        };
        (f1.location, vectors, normal)
    };

    mesh.insert_field(Field::scalar(output, location, ti_amplitude(vectors.view())))?;
    if let Some(normal) = normal {
        mesh.insert_field(Field::scalar(format!("{}_normal", output), location, normal))?;
    }
    Ok(())
}

/// Add the maximal mTI amplitude of four vector fields of the mesh as scalar field `output`.
pub fn add_mti_fields(mesh: &mut FieldMesh, fields: [&str; 4], output: &str) -> Result<()> {
    let (location, vectors) = {
        let f: Vec<&Field> = fields.iter().map(|name| mesh.field(name)).collect::<Result<_>>()?;
        if f.iter().any(|x| x.location != f[0].location) {
            return Err(AnalysisError::InvalidShape(String::from(
                "mTI fields live on different mesh entities",
            )));
        }
        let vectors = get_mti_vectors(f[0].vectors()?, f[1].vectors()?, f[2].vectors()?, f[3].vectors()?)?;
        (f[0].location, vectors)
    };
    mesh.insert_field(Field::scalar(output, location, ti_amplitude(vectors.view())))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn parallel_fields_give_twice_the_weaker_field() {
        let e1 = arr2(&[[2.0, 0.0, 0.0]]);
        let e2 = arr2(&[[1.0, 0.0, 0.0]]);
        let ti = get_ti_vectors(e1.view(), e2.view()).unwrap();
        assert_abs_diff_eq!(ti, arr2(&[[2.0, 0.0, 0.0]]), epsilon = 1e-12);
    }

    #[test]
    fn weaker_field_is_flipped_into_the_same_half_space() {
        let e1 = arr2(&[[3.0, 0.0, 0.0]]);
        let e2 = arr2(&[[-1.0, 0.5, 0.0]]);
        let ti = get_ti_vectors(e1.view(), e2.view()).unwrap();
        assert_abs_diff_eq!(ti, arr2(&[[2.0, -1.0, 0.0]]), epsilon = 1e-12);
    }

    #[test]
    fn orthogonal_fields_of_equal_strength() {
        // |E2| > |E1| cos(90°), so the envelope is the part of E2 perpendicular to E1 - E2.
        let e1 = arr2(&[[1.0, 0.0, 0.0]]);
        let e2 = arr2(&[[0.0, 1.0, 0.0]]);
        let ti = get_ti_vectors(e1.view(), e2.view()).unwrap();
        assert_abs_diff_eq!(ti_amplitude(ti.view())[0], 2.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn inputs_are_not_modified() {
        let e1 = arr2(&[[0.5, 0.0, 0.0], [0.0, -2.0, 0.0]]);
        let e2 = arr2(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.5]]);
        let (c1, c2) = (e1.clone(), e2.clone());
        get_ti_vectors(e1.view(), e2.view()).unwrap();
        assert_eq!(c1, e1);
        assert_eq!(c2, e2);
    }

    #[test]
    fn coinciding_and_zero_fields_are_finite() {
        let e = arr2(&[[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]]);
        let ti = get_ti_vectors(e.view(), e.view()).unwrap();
        assert_abs_diff_eq!(ti, arr2(&[[2.0, 4.0, 6.0], [0.0, 0.0, 0.0]]), epsilon = 1e-12);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let e1 = arr2(&[[1.0, 0.0, 0.0]]);
        let e2 = arr2(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        assert!(matches!(get_ti_vectors(e1.view(), e2.view()), Err(AnalysisError::InvalidShape(_))));
        let flat = arr2(&[[1.0, 0.0]]);
        assert!(get_ti_vectors(flat.view(), flat.view()).is_err());
    }

    #[test]
    fn directional_ti_along_the_field_axis() {
        let e1 = arr2(&[[1.0, 0.0, 0.0]]);
        let e2 = arr2(&[[0.5, 0.0, 0.0]]);
        let n = arr2(&[[2.0, 0.0, 0.0]]);
        let along = get_dir_ti(e1.view(), e2.view(), n.view()).unwrap();
        assert_abs_diff_eq!(along, arr1(&[1.0]), epsilon = 1e-12);

        let across = arr2(&[[0.0, 0.0, 1.0]]);
        let zero = get_dir_ti(e1.view(), e2.view(), across.view()).unwrap();
        assert_abs_diff_eq!(zero, arr1(&[0.0]), epsilon = 1e-12);
    }

    #[test]
    fn ti_fields_are_added_to_surfaces() {
        let mut mesh = FieldMesh::surface(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0, 1, 2]],
        )
        .unwrap();
        let e1 = arr2(&[[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 0.0, 2.0]]);
        let e2 = arr2(&[[0.0, 0.0, 0.5], [0.5, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        mesh.insert_field(Field::vector("E1", FieldLocation::Node, e1)).unwrap();
        mesh.insert_field(Field::vector("E2", FieldLocation::Node, e2)).unwrap();

        add_ti_fields(&mut mesh, "E1", "E2", "TI_max").unwrap();

        let ti = mesh.field("TI_max").unwrap().scalar_values().unwrap().to_owned();
        assert_abs_diff_eq!(ti, arr1(&[1.0, 1.0, 2.0]), epsilon = 1e-12);
        let normal = mesh.field("TI_max_normal").unwrap().scalar_values().unwrap().to_owned();
        assert_abs_diff_eq!(normal, arr1(&[1.0, 0.0, 2.0]), epsilon = 1e-12);
    }
}

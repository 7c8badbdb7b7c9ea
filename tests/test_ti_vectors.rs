use ndarray::{Array2, Axis};
use ti_analyzer::{get_mti_vectors, get_ti_vectors, ti_amplitude};

/// Deterministic pseudo random field vectors in [-1, 1).
fn random_fields(n: usize, seed: u64) -> Array2<f64> {
    let mut state = seed;
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    };
    Array2::from_shape_fn((n, 3), |_| next())
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[test]
fn ti_vectors_are_symmetric() {
    let e1 = random_fields(500, 1);
    let e2 = random_fields(500, 2);
    let ab = get_ti_vectors(e1.view(), e2.view()).unwrap();
    let ba = get_ti_vectors(e2.view(), e1.view()).unwrap();
    assert_eq!(ab, ba);
}

#[test]
fn envelope_never_exceeds_twice_the_weaker_field() {
    let e1 = random_fields(500, 3);
    let e2 = random_fields(500, 4);
    let amplitude = ti_amplitude(get_ti_vectors(e1.view(), e2.view()).unwrap().view());
    for (i, a) in amplitude.iter().enumerate() {
        let n1 = norm(e1.row(i).as_slice().unwrap());
        let n2 = norm(e2.row(i).as_slice().unwrap());
        assert!(*a <= 2.0 * n1.min(n2) + 1e-12, "point {}: {} > 2 * min({}, {})", i, a, n1, n2);
    }
}

#[test]
fn aligned_fields_give_twice_the_weaker_magnitude() {
    let e1 = random_fields(200, 5);
    let mut checked = 0;
    for (i, row) in e1.axis_iter(Axis(0)).enumerate() {
        // A shorter field close to E1 (or to -E1) has |E2| <= |E1| cos(alpha).
        let scale = if i % 2 == 0 { 0.3 } else { -0.3 };
        let e2 = [row[0] * scale + 1e-3, row[1] * scale, row[2] * scale];
        let a = [row[0], row[1], row[2]];
        let n1 = norm(&a);
        let n2 = norm(&e2);
        let cos = (a[0] * e2[0] + a[1] * e2[1] + a[2] * e2[2]).abs() / (n1 * n2);
        if n2 > n1 || n2 > n1 * cos {
            continue;
        }
        let ti = ti_analyzer::ti_vectors::ti_vector(a, e2);
        approx::assert_abs_diff_eq!(norm(&ti), 2.0 * n2, epsilon = 1e-9);
        checked += 1;
    }
    assert!(checked > 100);
}

#[test]
fn mti_is_ti_of_the_pair_vectors() {
    let fields: Vec<Array2<f64>> = (10..14).map(|seed| random_fields(300, seed)).collect();
    let mti = get_mti_vectors(fields[0].view(), fields[1].view(), fields[2].view(), fields[3].view()).unwrap();
    let ab = get_ti_vectors(fields[0].view(), fields[1].view()).unwrap();
    let cd = get_ti_vectors(fields[2].view(), fields[3].view()).unwrap();
    assert_eq!(get_ti_vectors(ab.view(), cd.view()).unwrap(), mti);
}

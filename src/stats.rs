//! Weighted statistics over a masked selection of nodes or elements.

use log::{debug, warn};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Whether values at or below zero take part in the statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFilter {
    /// Use every selected value. Atlas regions are tissue restricted already.
    All,
    /// Use only values above zero. Geometric ROIs may cover places where the field is undefined.
    PositiveOnly,
}

impl ValueFilter {
    pub fn accepts(self, value: f64) -> bool {
        match self {
            ValueFilter::All => !value.is_nan(),
            ValueFilter::PositiveOnly => value > 0.0,
        }
    }
}

/// Weighted mean and plain extrema of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Number of values the statistics are computed from.
    pub count: usize,
}

pub(crate) fn check_len(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(AnalysisError::LengthMismatch {
            what: what.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Indices selected by `mask` whose value passes `filter`. NaN values never pass.
pub fn selection(values: ArrayView1<f64>, mask: &[bool], filter: ValueFilter) -> Result<Vec<usize>> {
    check_len("ROI mask", values.len(), mask.len())?;
    Ok(mask
        .iter()
        .zip(values.iter())
        .enumerate()
        .filter(|(_, (m, v))| **m && filter.accepts(**v))
        .map(|(idx, _)| idx)
        .collect())
}

/// Weighted mean, min and max of `values` where `mask` is set.
///
/// Returns `Ok(None)` for an empty mask, for a selection emptied by `filter`, and for a selection
/// with zero total weight. Mismatched array lengths are an error.
pub fn weighted_stats(
    values: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    mask: &[bool],
    filter: ValueFilter,
) -> Result<Option<WeightedStats>> {
    check_len("weights", values.len(), weights.len())?;
    check_len("ROI mask", values.len(), mask.len())?;

    if !mask.iter().any(|m| *m) {
        debug!("No nodes in ROI.");
        return Ok(None);
    }

    let selected = selection(values, mask, filter)?;
    if selected.is_empty() {
        if filter == ValueFilter::PositiveOnly {
            warn!("All {} values in ROI are zero or negative.", mask.iter().filter(|m| **m).count());
        } else {
            warn!("All values in ROI are NaN.");
        }
        return Ok(None);
    }

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for idx in selected.iter() {
        let (v, w) = (values[*idx], weights[*idx]);
        weighted_sum += v * w;
        weight_sum += w;
        min = min.min(v);
        max = max.max(v);
    }

    if weight_sum == 0.0 {
        warn!("ROI of {} values has zero total weight.", selected.len());
        return Ok(None);
    }

    Ok(Some(WeightedStats {
        mean: weighted_sum / weight_sum,
        min,
        max,
        count: selected.len(),
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    /// Reference weighted average, written out independently of the implementation.
    fn reference_average(values: &[f64], weights: &[f64]) -> f64 {
        let num: f64 = values.iter().zip(weights).map(|(v, w)| v * w).sum();
        let den: f64 = weights.iter().sum();
        num / den
    }

    #[test]
    fn weighted_mean_matches_the_reference() {
        let values = arr1(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        let weights = arr1(&[0.5, 1.5, 0.25, 2.0, 3.0]);
        let mask = [true, true, false, true, false];
        let stats = weighted_stats(values.view(), weights.view(), &mask, ValueFilter::All)
            .unwrap()
            .unwrap();

        assert_abs_diff_eq!(stats.mean, reference_average(&[1.0, 2.0, 4.0], &[0.5, 1.5, 2.0]), epsilon = 1e-12);
        assert_eq!(1.0, stats.min);
        assert_eq!(4.0, stats.max);
        assert_eq!(3, stats.count);
    }

    #[test]
    fn an_empty_mask_gives_no_statistics() {
        let values = arr1(&[1.0, 2.0]);
        let weights = arr1(&[1.0, 1.0]);
        let res = weighted_stats(values.view(), weights.view(), &[false, false], ValueFilter::All).unwrap();
        assert_eq!(None, res);
    }

    #[test]
    fn the_positivity_filter_drops_non_positive_values() {
        let values = arr1(&[-1.0, 0.0, 2.0, 4.0]);
        let weights = arr1(&[1.0, 1.0, 1.0, 3.0]);
        let mask = [true; 4];
        let stats = weighted_stats(values.view(), weights.view(), &mask, ValueFilter::PositiveOnly)
            .unwrap()
            .unwrap();
        assert_abs_diff_eq!(stats.mean, 3.5, epsilon = 1e-12);
        assert_eq!(2.0, stats.min);
        assert_eq!(2, stats.count);

        let unfiltered = weighted_stats(values.view(), weights.view(), &mask, ValueFilter::All)
            .unwrap()
            .unwrap();
        assert_eq!(-1.0, unfiltered.min);
    }

    #[test]
    fn an_all_negative_selection_gives_no_statistics() {
        let values = arr1(&[-1.0, 0.0]);
        let weights = arr1(&[1.0, 1.0]);
        let res = weighted_stats(values.view(), weights.view(), &[true, true], ValueFilter::PositiveOnly).unwrap();
        assert_eq!(None, res);
    }

    #[test]
    fn zero_total_weight_gives_no_statistics() {
        let values = arr1(&[1.0, 2.0]);
        let weights = arr1(&[0.0, 0.0]);
        let res = weighted_stats(values.view(), weights.view(), &[true, true], ValueFilter::All).unwrap();
        assert_eq!(None, res);
    }

    #[test]
    fn mismatched_lengths_are_errors() {
        let values = arr1(&[1.0, 2.0]);
        let weights = arr1(&[1.0]);
        assert!(weighted_stats(values.view(), weights.view(), &[true, true], ValueFilter::All).is_err());
        let weights = arr1(&[1.0, 1.0]);
        assert!(weighted_stats(values.view(), weights.view(), &[true], ValueFilter::All).is_err());
    }
}

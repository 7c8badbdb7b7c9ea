//! Focality: how much area or volume a field covers above fractions of its near-maximum.
//!
//! The reference level is the 99.9th percentile, which is robust against single outlier values. For
//! each cutoff in [`FOCALITY_CUTOFFS`] the extent (area or volume) with values at or above
//! `cutoff% * p99.9` is summed. Smaller extents at high cutoffs mean a more focal field.

use log::debug;
use ndarray::{Array1, ArrayView1, Axis};
use ndarray_stats::interpolate::Linear;
use ndarray_stats::QuantileExt;
use noisy_float::types::n64;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::mesh::WeightUnit;
use crate::stats::check_len;

/// Percentages of the 99.9th percentile at which the focality extent is measured.
pub const FOCALITY_CUTOFFS: [f64; 4] = [50.0, 75.0, 90.0, 95.0];

pub const MM2_PER_CM2: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocalityMetrics {
    pub max_value: f64,
    pub min_value: f64,
    pub percentile_95: f64,
    pub percentile_99: f64,
    pub percentile_99_9: f64,
    /// Field values at 50, 75, 90 and 95 % of the 99.9th percentile.
    pub thresholds: [f64; 4],
    /// Extent at or above each threshold, in cm² for areas and mm³ for volumes.
    pub focality_50: f64,
    pub focality_75: f64,
    pub focality_90: f64,
    pub focality_95: f64,
    pub total_area_cm2: Option<f64>,
    pub total_volume_mm3: Option<f64>,
    pub num_elements: usize,
}

impl FocalityMetrics {
    pub fn focality(&self) -> [f64; 4] {
        [self.focality_50, self.focality_75, self.focality_90, self.focality_95]
    }
}

/// Convert a weight in its native unit to the unit focality is reported in.
fn report_extent(weight: f64, unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::AreaMm2 => weight / MM2_PER_CM2,
        WeightUnit::VolumeMm3 => weight,
    }
}

fn percentile(values: &mut Array1<f64>, p: f64) -> Result<f64> {
    values
        .quantile_axis_skipnan_mut(Axis(0), n64(p / 100.0), &Linear)
        .map(|q| q[()])
        .map_err(|e| AnalysisError::InvalidShape(format!("percentile {}: {}", p, e)))
}

/// Focality metrics of `values` with per-value `weights` in `unit`.
///
/// NaN values are dropped first; `Ok(None)` if nothing remains.
pub fn focality_metrics(
    values: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    unit: WeightUnit,
    region_name: &str,
) -> Result<Option<FocalityMetrics>> {
    check_len("focality weights", values.len(), weights.len())?;

    let (clean_values, clean_weights): (Vec<f64>, Vec<f64>) = values
        .iter()
        .zip(weights.iter())
        .filter(|(v, _)| !v.is_nan())
        .map(|(v, w)| (*v, *w))
        .unzip();
    if clean_values.is_empty() {
        debug!("No valid values for focality in '{}'.", region_name);
        return Ok(None);
    }

    let mut sorted = Array1::from(clean_values.clone());
    let max_value = *sorted.max_skipnan();
    let min_value = *sorted.min_skipnan();
    let percentile_95 = percentile(&mut sorted, 95.0)?;
    let percentile_99 = percentile(&mut sorted, 99.0)?;
    let percentile_99_9 = percentile(&mut sorted, 99.9)?;

    let mut thresholds = [0.0; 4];
    let mut extents = [0.0; 4];
    for (i, cutoff) in FOCALITY_CUTOFFS.iter().enumerate() {
        thresholds[i] = cutoff / 100.0 * percentile_99_9;
        let weight: f64 = clean_values
            .iter()
            .zip(clean_weights.iter())
            .filter(|(v, _)| **v >= thresholds[i])
            .map(|(_, w)| *w)
            .sum();
        extents[i] = report_extent(weight, unit);
    }

    let total = report_extent(clean_weights.iter().sum(), unit);
    let (total_area_cm2, total_volume_mm3) = match unit {
        WeightUnit::AreaMm2 => (Some(total), None),
        WeightUnit::VolumeMm3 => (None, Some(total)),
    };

    debug!(
        "Focality of '{}': p99.9 = {}, extents {:?} over {} values.",
        region_name,
        percentile_99_9,
        extents,
        clean_values.len()
    );

    Ok(Some(FocalityMetrics {
        max_value,
        min_value,
        percentile_95,
        percentile_99,
        percentile_99_9,
        thresholds,
        focality_50: extents[0],
        focality_75: extents[1],
        focality_90: extents[2],
        focality_95: extents[3],
        total_area_cm2,
        total_volume_mm3,
        num_elements: clean_values.len(),
    }))
}

//! Summaries of extracted fields
//!
//! This module computes and prints the quick statistics shown after an
//! extraction: shape, month coverage and min/mean/max/std over unmasked values.

use crate::extraction::{BoundaryTransect, TrimmedField};
use crate::masked::MaskedArray;
use serde::Serialize;

/// Statistics of one extracted field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub shape: Vec<usize>,
    pub timesteps: usize,
    /// Timesteps per calendar month, January first
    pub month_counts: [usize; 12],
    pub unmasked: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

impl FieldSummary {
    /// Summarize `data` and its month-of-year indices
    pub fn new(data: &MaskedArray, month_indices: &[u32]) -> Self {
        let mut month_counts = [0; 12];
        for &month in month_indices {
            if let Some(count) = (month as usize).checked_sub(1).and_then(|m| month_counts.get_mut(m)) {
                *count += 1;
            }
        }

        let mean = data.mean();
        let std_dev = mean.map(|mean| {
            let values: Vec<f64> = data
                .data()
                .iter()
                .zip(data.mask().iter())
                .filter_map(|(&v, &m)| (!m).then_some(v))
                .collect();
            (values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
        });

        Self {
            shape: data.shape().to_vec(),
            timesteps: month_indices.len(),
            month_counts,
            unmasked: data.count_unmasked(),
            min: data.min(),
            max: data.max(),
            mean,
            std_dev,
        }
    }

    /// Whether every calendar month has at least one timestep
    pub fn covers_all_months(&self) -> bool {
        self.month_counts.iter().all(|&c| c > 0)
    }
}

impl From<&TrimmedField> for FieldSummary {
    fn from(field: &TrimmedField) -> Self {
        Self::new(&field.data, &field.month_indices)
    }
}

impl From<&BoundaryTransect> for FieldSummary {
    fn from(transect: &BoundaryTransect) -> Self {
        Self::new(&transect.data, &transect.month_indices)
    }
}

fn format_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "(all masked)".to_string(), |v| format!("{v:.4}"))
}

/// Print a summary in the same layout as the other report sections
pub fn print_field_summary(title: &str, summary: &FieldSummary) {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    println!("\n Summary for {}", title);
    println!("================================");
    println!("   Shape: {:?}", summary.shape);
    println!("   Timesteps: {}", summary.timesteps);
    println!("   Unmasked values: {}", summary.unmasked);
    println!("   Min: {}", format_stat(summary.min));
    println!("   Max: {}", format_stat(summary.max));
    println!("   Mean: {}", format_stat(summary.mean));
    println!("   Std Dev: {}", format_stat(summary.std_dev));

    println!("\n Month Coverage");
    println!("==================");
    let coverage: Vec<String> = MONTHS
        .iter()
        .zip(summary.month_counts.iter())
        .map(|(name, count)| format!("{name}:{count}"))
        .collect();
    println!("   {}", coverage.join(" "));
    if !summary.covers_all_months() {
        println!("   (some months have no data)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn summary_ignores_masked_values() {
        let data = arr2(&[[1.0, f64::NAN], [3.0, 5.0]]).into_dyn();
        let summary = FieldSummary::new(&MaskedArray::from_nan(data), &[1, 2]);

        assert_eq!(summary.shape, vec![2, 2]);
        assert_eq!(summary.unmasked, 3);
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.max, Some(5.0));
        assert_relative_eq!(summary.mean.unwrap(), 3.0);
        assert_relative_eq!(summary.std_dev.unwrap(), (8.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_eq!(summary.month_counts[0], 1);
        assert_eq!(summary.month_counts[1], 1);
        assert!(!summary.covers_all_months());
    }

    #[test]
    fn all_masked_summary_has_no_statistics() {
        let summary = FieldSummary::new(&MaskedArray::masked_zeros(&[12, 1]), &(1..=12).collect::<Vec<_>>());
        assert_eq!(summary.mean, None);
        assert_eq!(summary.std_dev, None);
        assert!(summary.covers_all_months());
        assert_eq!(serde_json::to_value(&summary).unwrap()["min"], serde_json::Value::Null);
    }
}

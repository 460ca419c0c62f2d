//! Chronological ordering and year trimming of an assembled series

use crate::calendar::CalendarDate;
use crate::errors::{Cmip5Error, Result};
use crate::masked::MaskedArray;
use ndarray::Axis;

/// A series ordered by date and cut down to the requested years
#[derive(Debug, Clone, PartialEq)]
pub struct SortedSeries {
    pub data: MaskedArray,
    /// Month of year, 1-12, per timestep
    pub month_indices: Vec<u32>,
    pub times: Vec<CalendarDate>,
}

/// Timesteps whose year lies in `[start_year, end_year]`
pub fn count_in_range(times: &[CalendarDate], start_year: i32, end_year: i32) -> usize {
    times
        .iter()
        .filter(|t| (start_year..=end_year).contains(&t.year))
        .count()
}

/// Order of `times` by date key; ties keep their assembly order
pub fn chronological_order(times: &[CalendarDate]) -> Vec<usize> {
    let keys: Vec<f64> = times.iter().map(CalendarDate::date_key).collect();
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));
    order
}

/// Sort `data` (time on axis 0) by date and keep only the in-range timesteps
pub fn sort_and_trim(
    times: &[CalendarDate],
    data: &MaskedArray,
    start_year: i32,
    end_year: i32,
) -> Result<SortedSeries> {
    if data.ndim() == 0 || data.len_of(Axis(0)) != times.len() {
        return Err(Cmip5Error::ShapeMismatch {
            path: Default::default(),
            expected: vec![times.len()],
            found: data.shape().to_vec(),
        });
    }

    let count = count_in_range(times, start_year, end_year);
    let mut shape = data.shape().to_vec();
    shape[0] = count;
    let mut trimmed = MaskedArray::masked_zeros(&shape);
    let mut month_indices = Vec::with_capacity(count);
    let mut kept = Vec::with_capacity(count);

    for index in chronological_order(times) {
        let time = times[index];
        if !(start_year..=end_year).contains(&time.year) {
            continue;
        }
        trimmed.copy_slab_from(kept.len(), data, index);
        month_indices.push(time.month);
        kept.push(time);
    }
    debug_assert_eq!(kept.len(), count, "trimmed storage must be filled exactly");

    Ok(SortedSeries {
        data: trimmed,
        month_indices,
        times: kept,
    })
}

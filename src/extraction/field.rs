//! Extraction front doors
//!
//! A request is validated against the variable sets and model quirks before
//! anything touches the filesystem, then the directory goes through the time
//! pass, the data pass, chronological trimming and unit conversion.

use super::data::{assemble_field, assemble_transect};
use super::sorting::sort_and_trim;
use super::time::{assemble_times, TimePlan};
use super::units::convert_units;
use super::vertical::VerticalAxis;
use crate::errors::{Cmip5Error, Result};
use crate::masked::MaskedArray;
use crate::models::{FileSetLocator, ModelDescriptor};
use crate::variables::Variable;
use log::{info, warn};
use ndarray::{Array1, ArrayD};

/// A full-grid field ordered by date, trimmed to the requested years
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedField {
    /// `[time, (depth,) lat, lon]`
    pub data: MaskedArray,
    pub lon: ArrayD<f64>,
    pub lat: ArrayD<f64>,
    /// Present for variables with a vertical axis
    pub depth: Option<VerticalAxis>,
    /// Month of year, 1-12, per timestep
    pub month_indices: Vec<u32>,
}

/// A transect at one target latitude
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryTransect {
    /// `[time, axis, lon]`, or `[time, lon]` for ocean surface fields
    pub data: MaskedArray,
    /// Latitudes for atmosphere fields, depths for ocean fields
    pub axis: Array1<f64>,
    pub month_indices: Vec<u32>,
}

/// Parse the variable name and check the model may provide it
pub fn validate_request(model: &ModelDescriptor, var_name: &str) -> Result<Variable> {
    let variable = Variable::parse(var_name)?;
    if model.excludes(variable) {
        return Err(Cmip5Error::ExcludedCombination {
            model: model.name.clone(),
            variable: variable.name().to_string(),
        });
    }
    Ok(variable)
}

/// Validate, locate, and run the time pass for a request
fn plan_request(
    locator: &dyn FileSetLocator,
    model: &ModelDescriptor,
    experiment: &str,
    var_name: &str,
    start_year: i32,
    end_year: i32,
) -> Result<(Variable, TimePlan)> {
    let variable = validate_request(model, var_name)?;
    let dir = locator
        .locate(model, experiment, variable)
        .ok_or_else(|| Cmip5Error::NoDataAvailable {
            model: model.name.clone(),
            experiment: experiment.to_string(),
            variable: variable.name().to_string(),
        })?;

    info!(
        "Extracting {} {} {} {}-{} from {}",
        model.name,
        experiment,
        variable,
        start_year,
        end_year,
        dir.display()
    );
    let plan = assemble_times(&dir, start_year, end_year)?;
    if plan.is_empty() {
        return Err(plan.no_overlap());
    }
    info!("{} timesteps from {} files", plan.len(), plan.files.len());
    Ok((variable, plan))
}

/// Extract a full-grid field, reporting failures as errors
pub fn try_extract_field(
    locator: &dyn FileSetLocator,
    model: &ModelDescriptor,
    experiment: &str,
    var_name: &str,
    start_year: i32,
    end_year: i32,
) -> Result<TrimmedField> {
    let (variable, plan) = plan_request(locator, model, experiment, var_name, start_year, end_year)?;
    let (series, grid) = assemble_field(&plan, model, variable)?;

    let mut sorted = sort_and_trim(&plan.times, &series, start_year, end_year)?;
    convert_units(variable, &mut sorted.data);

    Ok(TrimmedField {
        data: sorted.data,
        lon: grid.lon,
        lat: grid.lat,
        depth: grid.depth,
        month_indices: sorted.month_indices,
    })
}

/// Extract a transect at `target_lat`, reporting failures as errors
pub fn try_extract_boundary(
    locator: &dyn FileSetLocator,
    model: &ModelDescriptor,
    experiment: &str,
    var_name: &str,
    start_year: i32,
    end_year: i32,
    target_lat: f64,
) -> Result<BoundaryTransect> {
    let (variable, plan) = plan_request(locator, model, experiment, var_name, start_year, end_year)?;
    let (series, geometry) = assemble_transect(&plan, model, variable, target_lat)?;

    let mut sorted = sort_and_trim(&plan.times, &series, start_year, end_year)?;
    convert_units(variable, &mut sorted.data);

    Ok(BoundaryTransect {
        data: sorted.data,
        axis: geometry.axis,
        month_indices: sorted.month_indices,
    })
}

/// Extract a full-grid field, or `None` when the request cannot be served
///
/// The reason is logged at warn level; use [`try_extract_field`] to get it.
pub fn extract_field(
    locator: &dyn FileSetLocator,
    model: &ModelDescriptor,
    experiment: &str,
    var_name: &str,
    start_year: i32,
    end_year: i32,
) -> Option<TrimmedField> {
    try_extract_field(locator, model, experiment, var_name, start_year, end_year)
        .map_err(|e| warn!("{}: {e}", model.name))
        .ok()
}

/// Extract a transect at `target_lat`, or `None` when the request cannot be served
pub fn extract_boundary(
    locator: &dyn FileSetLocator,
    model: &ModelDescriptor,
    experiment: &str,
    var_name: &str,
    start_year: i32,
    end_year: i32,
    target_lat: f64,
) -> Option<BoundaryTransect> {
    try_extract_boundary(locator, model, experiment, var_name, start_year, end_year, target_lat)
        .map_err(|e| warn!("{}: {e}", model.name))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn unreachable_locator(_: &ModelDescriptor, _: &str, _: Variable) -> Option<PathBuf> {
        panic!("locator must not be consulted for a rejected request")
    }

    #[test]
    fn unknown_variable_rejected_before_lookup() {
        let model = ModelDescriptor::new("CCSM4");
        let result = try_extract_field(&unreachable_locator, &model, "historical", "bogus_var", 2000, 2001);
        assert!(matches!(result, Err(Cmip5Error::UnknownVariable { .. })));
        assert!(extract_field(&unreachable_locator, &model, "historical", "bogus_var", 2000, 2001).is_none());
    }

    #[test]
    fn excluded_combination_rejected_before_lookup() {
        let model = ModelDescriptor::lookup("NorESM1-M");
        let result = try_extract_boundary(&unreachable_locator, &model, "rcp85", "evspsbl", 2000, 2001, -30.0);
        assert!(matches!(result, Err(Cmip5Error::ExcludedCombination { .. })));
    }

    #[test]
    fn missing_directory_is_no_data() {
        let model = ModelDescriptor::new("CCSM4");
        let nowhere = |_: &ModelDescriptor, _: &str, _: Variable| -> Option<PathBuf> { None };
        let result = try_extract_field(&nowhere, &model, "historical", "tas", 2000, 2001);
        assert!(matches!(result, Err(Cmip5Error::NoDataAvailable { .. })));
    }
}

//! NetCDF reading helpers shared by the assemblers
//!
//! Everything that touches a `netcdf::File` lives here: opening files,
//! pulling attributes, reading whole variables or row slabs as `f64`, and
//! turning fill values into a mask.

use crate::errors::{Cmip5Error, Result};
use crate::masked::MaskedArray;
use ndarray::{ArrayD, IxDyn};
use netcdf::{AttributeValue, File, Variable};
use std::ops::Range;
use std::path::Path;

/// netCDF default fill for doubles
pub const NC_FILL_DOUBLE: f64 = 9.969_209_968_386_869e36;
/// netCDF default fill for floats
pub const NC_FILL_FLOAT: f32 = 9.969_209_968_386_869e36;

/// Raw time coordinate of one file
#[derive(Debug, Clone)]
pub struct TimeCoordinate {
    /// Raw offsets; entries matching a fill value come back as NaN
    pub values: Vec<f64>,
    pub units: String,
    /// `None` when the file does not declare a calendar
    pub calendar: Option<String>,
}

/// Open a NetCDF file, reporting missing paths as I/O errors
pub fn open_file(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )
        .into());
    }
    Ok(netcdf::open(path)?)
}

/// Look up a variable, naming the file in the error
pub fn variable<'f>(file: &'f File, name: &str, path: &Path) -> Result<Variable<'f>> {
    file.variable(name)
        .ok_or_else(|| Cmip5Error::VariableNotFound {
            var: name.to_string(),
            path: path.to_path_buf(),
        })
}

pub fn variable_shape(var: &Variable) -> Vec<usize> {
    var.dimensions().iter().map(|d| d.len()).collect()
}

pub fn string_attribute(var: &Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(ss) => ss.into_iter().next(),
        _ => None,
    }
}

/// First value of a numeric attribute, widened to `f64`
pub fn numeric_attribute(var: &Variable, name: &str) -> Option<f64> {
    let value = match var.attribute(name)?.value().ok()? {
        AttributeValue::Double(v) => v,
        AttributeValue::Doubles(vs) => *vs.first()?,
        AttributeValue::Float(v) => f64::from(v),
        AttributeValue::Floats(vs) => f64::from(*vs.first()?),
        AttributeValue::Int(v) => f64::from(v),
        AttributeValue::Ints(vs) => f64::from(*vs.first()?),
        AttributeValue::Short(v) => f64::from(v),
        AttributeValue::Shorts(vs) => f64::from(*vs.first()?),
        AttributeValue::Uint(v) => f64::from(v),
        AttributeValue::Ushort(v) => f64::from(v),
        AttributeValue::Schar(v) => f64::from(v),
        AttributeValue::Uchar(v) => f64::from(v),
        _ => return None,
    };
    Some(value)
}

/// Read the `time` variable with its `units` and `calendar` attributes
pub fn read_time_coordinate(file: &File, path: &Path) -> Result<TimeCoordinate> {
    let var = variable(file, "time", path)?;
    let units = string_attribute(&var, "units").ok_or_else(|| Cmip5Error::InvalidTimeUnits {
        units: String::new(),
        reason: format!("time variable in {} has no 'units' attribute", path.display()),
    })?;
    let calendar = string_attribute(&var, "calendar");
    let is_fill = fill_predicate(&var);
    let values = var
        .get_values::<f64, _>(..)?
        .into_iter()
        .map(|v| if is_fill(v) { f64::NAN } else { v })
        .collect();
    Ok(TimeCoordinate {
        values,
        units,
        calendar,
    })
}

/// Read the values inside `ranges`, one range per dimension
pub fn read_values(var: &Variable, ranges: &[Range<usize>]) -> Result<Vec<f64>> {
    let values = match ranges {
        [] => var.get_values::<f64, _>(..)?,
        [a] => var.get_values::<f64, _>(a.clone())?,
        [a, b] => var.get_values::<f64, _>((a.clone(), b.clone()))?,
        [a, b, c] => var.get_values::<f64, _>((a.clone(), b.clone(), c.clone()))?,
        [a, b, c, d] => {
            var.get_values::<f64, _>((a.clone(), b.clone(), c.clone(), d.clone()))?
        }
        _ => {
            return Err(Cmip5Error::ShapeMismatch {
                path: Default::default(),
                expected: vec![4],
                found: vec![ranges.len()],
            })
        }
    };
    Ok(values)
}

/// Read a whole variable as an `f64` array shaped like its dimensions
pub fn read_array(file: &File, name: &str, path: &Path) -> Result<ArrayD<f64>> {
    read_block(&variable(file, name, path)?, path, None)
}

/// Matches the values a variable uses to mark missing data
fn fill_predicate(var: &Variable) -> impl Fn(f64) -> bool {
    let fill_value = numeric_attribute(var, "_FillValue");
    let missing_value = numeric_attribute(var, "missing_value");
    move |v: f64| {
        v.is_nan()
            || Some(v) == fill_value
            || Some(v) == missing_value
            || v == NC_FILL_DOUBLE
            || v == f64::from(NC_FILL_FLOAT)
    }
}

/// Read the whole variable, or the `ranges` block of it, as a shaped array
fn read_block(
    var: &Variable,
    path: &Path,
    ranges: Option<&[Range<usize>]>,
) -> Result<ArrayD<f64>> {
    let full_shape = variable_shape(var);
    let (values, shape) = match ranges {
        Some(ranges) => {
            if ranges.len() != full_shape.len() {
                return Err(Cmip5Error::ShapeMismatch {
                    path: path.to_path_buf(),
                    expected: full_shape,
                    found: ranges.iter().map(|r| r.len()).collect(),
                });
            }
            let shape: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
            (read_values(var, ranges)?, shape)
        }
        None => (var.get_values::<f64, _>(..)?, full_shape),
    };
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
}

/// Read a variable with its fill values replaced by NaN
pub fn read_filled_nan(
    file: &File,
    name: &str,
    path: &Path,
    ranges: Option<&[Range<usize>]>,
) -> Result<ArrayD<f64>> {
    let var = variable(file, name, path)?;
    let is_fill = fill_predicate(&var);
    Ok(read_block(&var, path, ranges)?.mapv_into(|v| if is_fill(v) { f64::NAN } else { v }))
}

/// Read a block with fill values masked and packing undone, leaving zeros alone
///
/// The flag is true when the file itself marked at least one element missing,
/// which is what decides whether zeros are data or land.
pub fn read_fill_masked(
    file: &File,
    name: &str,
    path: &Path,
    ranges: Option<&[Range<usize>]>,
) -> Result<(MaskedArray, bool)> {
    let var = variable(file, name, path)?;
    let data = read_block(&var, path, ranges)?;
    let mut masked = MaskedArray::masked_where(data, fill_predicate(&var));
    let explicit_mask = masked.count_unmasked() < masked.data().len();

    let scale = numeric_attribute(&var, "scale_factor");
    let offset = numeric_attribute(&var, "add_offset");
    if scale.is_some() || offset.is_some() {
        let (scale, offset) = (scale.unwrap_or(1.0), offset.unwrap_or(0.0));
        masked.map_unmasked_inplace(|v| v * scale + offset);
    }
    Ok((masked, explicit_mask))
}

/// Mask exact zeros, the land convention of files without fill values
pub fn mask_zeros(masked: &mut MaskedArray) {
    masked.mask_additional(|v| v == 0.0);
}

/// Read a variable (or the `ranges` sub-block of it) with its missing values masked
///
/// Values equal to `_FillValue`, `missing_value`, the netCDF default fill, or
/// NaN are masked, and `scale_factor`/`add_offset` are applied to the rest.
/// When none of those mark anything, or `zero_is_missing` is set, exact zeros
/// are taken to be land and masked too.
pub fn read_masked(
    file: &File,
    name: &str,
    path: &Path,
    ranges: Option<&[Range<usize>]>,
    zero_is_missing: bool,
) -> Result<MaskedArray> {
    let (mut masked, explicit_mask) = read_fill_masked(file, name, path, ranges)?;
    if zero_is_missing || !explicit_mask {
        mask_zeros(&mut masked);
    }
    Ok(masked)
}

//! Data slab assembly, the second pass over the retained files
//!
//! Storage for the whole series is allocated once from the [`TimePlan`] and
//! each file's slab is written at its offset, in file-iteration order.

use super::time::TimePlan;
use super::vertical::{resolve_vertical_axis, BoundaryGeometry, VerticalAxis};
use crate::errors::{Cmip5Error, Result};
use crate::masked::MaskedArray;
use crate::models::ModelDescriptor;
use crate::netcdf_io::{self, open_file, read_array, read_masked, variable_shape};
use crate::variables::Variable;
use log::debug;
use ndarray::ArrayD;
use netcdf::File;
use std::path::Path;

/// Horizontal and vertical coordinates of the full grid
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// 1D or 2D
    pub lon: ArrayD<f64>,
    /// 1D or 2D
    pub lat: ArrayD<f64>,
    /// `None` for surface fields
    pub depth: Option<VerticalAxis>,
}

impl Grid {
    /// Read `lon`, `lat` and, for variables with levels, the vertical axis
    pub fn read(file: &File, path: &Path, model: &ModelDescriptor, variable: Variable) -> Result<Self> {
        let depth = if variable.has_vertical_axis() {
            Some(resolve_vertical_axis(file, path, model)?)
        } else {
            None
        };
        Ok(Self {
            lon: read_array(file, "lon", path)?,
            lat: read_array(file, "lat", path)?,
            depth,
        })
    }
}

/// Fill `[plan.len(), ...slab_shape]` storage with one slab per retained file
///
/// `read` gets each open file in turn and must return `[file timesteps, ...slab_shape]`.
pub fn assemble_series<F>(plan: &TimePlan, slab_shape: &[usize], mut read: F) -> Result<MaskedArray>
where
    F: FnMut(&File, &Path) -> Result<MaskedArray>,
{
    let mut shape = vec![plan.len()];
    shape.extend_from_slice(slab_shape);
    let mut series = MaskedArray::masked_zeros(&shape);

    for retained in &plan.files {
        let slab = {
            let file = open_file(&retained.path)?;
            read(&file, &retained.path)?
        };

        let mut expected = vec![retained.len];
        expected.extend_from_slice(slab_shape);
        if slab.shape() != expected.as_slice() {
            return Err(Cmip5Error::ShapeMismatch {
                path: retained.path.clone(),
                expected,
                found: slab.shape().to_vec(),
            });
        }

        debug!("{}: slab {:?} at offset {}", retained.path.display(), slab.shape(), retained.offset);
        series.write_block(retained.offset, &slab);
    }

    Ok(series)
}

/// Read the full-grid series and the grid it lives on
///
/// The grid and the per-timestep shape come from the first retained file.
pub fn assemble_field(
    plan: &TimePlan,
    model: &ModelDescriptor,
    variable: Variable,
) -> Result<(MaskedArray, Grid)> {
    let first = plan.files.first().ok_or_else(|| plan.no_overlap())?;
    let (grid, slab_shape) = {
        let file = open_file(&first.path)?;
        let grid = Grid::read(&file, &first.path, model, variable)?;
        let shape = variable_shape(&netcdf_io::variable(&file, variable.name(), &first.path)?);
        (grid, shape.get(1..).unwrap_or_default().to_vec())
    };

    let series = assemble_series(plan, &slab_shape, |file, path| {
        read_masked(file, variable.name(), path, None, model.masked_as_zero_fill)
    })?;
    Ok((series, grid))
}

/// Read the transect series at `target` latitude and its geometry
pub fn assemble_transect(
    plan: &TimePlan,
    model: &ModelDescriptor,
    variable: Variable,
    target: f64,
) -> Result<(MaskedArray, BoundaryGeometry)> {
    let first = plan.files.first().ok_or_else(|| plan.no_overlap())?;
    let (geometry, slab_shape) = {
        let file = open_file(&first.path)?;
        let geometry = BoundaryGeometry::resolve(&file, &first.path, model, variable, target)?;
        let shape = variable_shape(&netcdf_io::variable(&file, variable.name(), &first.path)?);
        let slab_shape = geometry.slab_shape(&shape);
        (geometry, slab_shape)
    };

    let series = assemble_series(plan, &slab_shape, |file, path| {
        geometry.read_transect(file, path, variable, model.masked_as_zero_fill)
    })?;
    Ok((series, geometry))
}

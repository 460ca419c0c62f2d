//! Vertical coordinates and latitude-boundary transects
//!
//! Z-coordinate models publish depth directly in `lev`. Sigma-coordinate models
//! publish a terrain-following fraction in `lev` and the bathymetry in `depth`,
//! so physical depth is `-sigma[k] * bathymetry[j, i]`.
//!
//! The boundary mode extracts a transect at one target latitude by reading only
//! the two grid rows on either side of it and interpolating between them.

use crate::errors::{Cmip5Error, Result};
use crate::masked::MaskedArray;
use crate::models::ModelDescriptor;
use crate::netcdf_io::{self, mask_zeros, read_array, read_fill_masked, read_filled_nan, read_masked, variable_shape};
use crate::variables::{Realm, Variable};
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView1, ArrayView2, Axis, Ix1, Ix2, Ix3, Zip};
use netcdf::File;
use std::ops::Range;
use std::path::Path;

/// Northern boundary of the regional ocean model the transects feed
pub const ROMS_NORTHERN_BOUNDARY: f64 = -30.0;

/// Levels on the regular depth grid sigma rows are resampled onto
pub const UNIFORM_DEPTH_LEVELS: usize = 50;

/// Depth of the vertical levels
#[derive(Debug, Clone, PartialEq)]
pub enum VerticalAxis {
    /// One depth per level, shared by every column
    Levels(Array1<f64>),
    /// Depth per level and column, `[k, j, i]`
    Field(Array3<f64>),
}

impl VerticalAxis {
    pub fn num_levels(&self) -> usize {
        match self {
            Self::Levels(levels) => levels.len(),
            Self::Field(field) => field.len_of(Axis(0)),
        }
    }
}

/// `depth[k, j, i] = -sigma[k] * bathymetry[j, i]`
pub fn sigma_to_depth(sigma: ArrayView1<f64>, bathymetry: ArrayView2<f64>) -> Array3<f64> {
    let (nj, ni) = bathymetry.dim();
    Array3::from_shape_fn((sigma.len(), nj, ni), |(k, j, i)| -sigma[k] * bathymetry[[j, i]])
}

/// Resolve the full-grid vertical axis of an ocean variable
pub fn resolve_vertical_axis(file: &File, path: &Path, model: &ModelDescriptor) -> Result<VerticalAxis> {
    let lev = read_array(file, "lev", path)?.into_dimensionality::<Ix1>()?;
    if model.uses_sigma_coordinates {
        let bathymetry = read_filled_nan(file, "depth", path, None)?.into_dimensionality::<Ix2>()?;
        Ok(VerticalAxis::Field(sigma_to_depth(lev.view(), bathymetry.view())))
    } else {
        Ok(VerticalAxis::Levels(lev))
    }
}

/// One latitude per grid row; 2D latitude is averaged over longitude
pub fn row_latitudes(lat: &ArrayD<f64>, path: &Path) -> Result<Array1<f64>> {
    let rows = match lat.ndim() {
        1 => Some(lat.clone()),
        2 => lat.mean_axis(Axis(1)),
        _ => None,
    };
    match rows {
        Some(rows) => Ok(rows.into_dimensionality::<Ix1>()?),
        None => Err(Cmip5Error::ShapeMismatch {
            path: path.to_path_buf(),
            expected: vec![0, 0],
            found: lat.shape().to_vec(),
        }),
    }
}

/// The grid rows immediately south and north of a target latitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryRows {
    pub south: usize,
    pub north: usize,
    pub lat_south: f64,
    pub lat_north: f64,
    pub target: f64,
}

impl BoundaryRows {
    /// Find the bracketing rows for latitudes that increase or decrease with index
    pub fn bracket(lat: ArrayView1<f64>, target: f64) -> Result<Self> {
        let not_bracketed = || Cmip5Error::NoBracketingRows { target };
        if lat.len() < 2 {
            return Err(not_bracketed());
        }

        let (south, north) = if lat[0] > lat[1] {
            let south = lat.iter().position(|&l| l < target).ok_or_else(not_bracketed)?;
            if south == 0 {
                return Err(not_bracketed());
            }
            (south, south - 1)
        } else if lat[0] < lat[1] {
            let north = lat.iter().position(|&l| l > target).ok_or_else(not_bracketed)?;
            if north == 0 {
                return Err(not_bracketed());
            }
            (north - 1, north)
        } else {
            return Err(not_bracketed());
        };

        Ok(Self {
            south,
            north,
            lat_south: lat[south],
            lat_north: lat[north],
            target,
        })
    }

    /// Fraction of the way from the southern row to the northern one
    pub fn weight(&self) -> f64 {
        (self.target - self.lat_south) / (self.lat_north - self.lat_south)
    }

    /// Linear interpolation of two row slabs to the target latitude
    ///
    /// Evaluated as `w * north + (1 - w) * south`, so a target sitting on either
    /// row reproduces that row exactly. Masked in either row means masked.
    pub fn interpolate(&self, south: &MaskedArray, north: &MaskedArray) -> Result<MaskedArray> {
        if south.shape() != north.shape() {
            return Err(ndarray::ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape).into());
        }
        let w = self.weight();
        let data = Zip::from(south.data())
            .and(north.data())
            .map_collect(|&s, &n| w * n + (1.0 - w) * s);
        let mask = Zip::from(south.mask())
            .and(north.mask())
            .map_collect(|&s, &n| s || n);
        MaskedArray::new(data, mask)
    }

    /// Rows kept for surface fields: the target row band and everything south of it
    fn southern_rows(&self, num_rows: usize) -> Range<usize> {
        if self.north < self.south {
            self.north..num_rows
        } else {
            0..self.north + 1
        }
    }
}

/// Evenly spaced depths from the surface to `max_depth`
pub fn uniform_depth_axis(max_depth: f64) -> Array1<f64> {
    Array1::linspace(0.0, max_depth, UNIFORM_DEPTH_LEVELS)
}

/// Piecewise-linear interpolation of `(x, y)` at `x_new`, `x` ascending
///
/// Requests outside `[x[0], x[last]]` are NaN, as is any segment touching a
/// NaN sample.
pub fn interp_linear(x: &[f64], y: &[f64], x_new: f64) -> f64 {
    let n = x.len();
    if n < 2 || x_new < x[0] || x_new > x[n - 1] || x_new.is_nan() {
        return f64::NAN;
    }
    let hi = x.partition_point(|&v| v < x_new).clamp(1, n - 1);
    let lo = hi - 1;
    let slope = (y[hi] - y[lo]) / (x[hi] - x[lo]);
    slope * (x_new - x[lo]) + y[lo]
}

/// Resample a `[time, level, lon]` row onto `axis` using its own `[level, lon]` depths
pub fn resample_row(row: &MaskedArray, depth: ArrayView2<f64>, axis: ArrayView1<f64>) -> Result<MaskedArray> {
    let values = row.filled_nan().into_dimensionality::<Ix3>()?;
    let (nt, _, ni) = values.dim();
    let mut out = Array3::from_elem((nt, axis.len(), ni), f64::NAN);

    for i in 0..ni {
        let column = depth.column(i);
        let mut levels: Vec<usize> = (0..column.len()).filter(|&k| column[k].is_finite()).collect();
        levels.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
        let x: Vec<f64> = levels.iter().map(|&k| column[k]).collect();

        for t in 0..nt {
            let y: Vec<f64> = levels.iter().map(|&k| values[[t, k, i]]).collect();
            for (n, &z) in axis.iter().enumerate() {
                out[[t, n, i]] = interp_linear(&x, &y, z);
            }
        }
    }

    Ok(MaskedArray::from_nan(out.into_dyn()))
}

#[derive(Debug, Clone, PartialEq)]
enum TransectKind {
    /// Surface field, rows south of the target are kept as they are
    Surface { rows: Range<usize> },
    /// Ocean surface field interpolated to the target
    OceanSurface,
    /// Shared z levels
    ZLevels,
    /// Per-row sigma depths resampled onto the shared axis
    Sigma {
        south_depth: Array2<f64>,
        north_depth: Array2<f64>,
    },
}

/// Everything about the grid a transect needs, resolved once per run
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryGeometry {
    pub rows: BoundaryRows,
    /// Latitudes of surface rows, or depths of ocean levels
    pub axis: Array1<f64>,
    kind: TransectKind,
}

impl BoundaryGeometry {
    /// Work out the bracketing rows and transect axis from one file of the series
    pub fn resolve(
        file: &File,
        path: &Path,
        model: &ModelDescriptor,
        variable: Variable,
        target: f64,
    ) -> Result<Self> {
        let lat = row_latitudes(&read_array(file, "lat", path)?, path)?;
        let rows = BoundaryRows::bracket(lat.view(), target)?;

        let (axis, kind) = match variable.realm() {
            Realm::Atmos => {
                let kept = rows.southern_rows(lat.len());
                let axis = lat.slice(ndarray::s![kept.clone()]).to_owned();
                (axis, TransectKind::Surface { rows: kept })
            }
            Realm::Ocean if !variable.has_vertical_axis() => {
                (Array1::from_elem(1, target), TransectKind::OceanSurface)
            }
            Realm::Ocean if model.uses_sigma_coordinates => {
                let sigma = read_array(file, "lev", path)?.into_dimensionality::<Ix1>()?;
                let profile = |j: usize| -> Result<Array2<f64>> {
                    let ni = variable_shape(&netcdf_io::variable(file, "depth", path)?)
                        .last()
                        .copied()
                        .unwrap_or(0);
                    let h = read_filled_nan(file, "depth", path, Some(&[j..j + 1, 0..ni]))?
                        .into_shape(ni)?;
                    Ok(Array2::from_shape_fn((sigma.len(), ni), |(k, i)| -sigma[k] * h[i]))
                };
                let south_depth = profile(rows.south)?;
                let north_depth = profile(rows.north)?;
                let max_depth = south_depth
                    .iter()
                    .chain(north_depth.iter())
                    .copied()
                    .filter(|d| d.is_finite())
                    .fold(0.0, f64::max);
                (
                    uniform_depth_axis(max_depth),
                    TransectKind::Sigma {
                        south_depth,
                        north_depth,
                    },
                )
            }
            Realm::Ocean => {
                let lev = read_array(file, "lev", path)?.into_dimensionality::<Ix1>()?;
                (lev, TransectKind::ZLevels)
            }
        };

        Ok(Self { rows, axis, kind })
    }

    /// Shape of one timestep of the transect, given the variable's full shape
    pub fn slab_shape(&self, var_shape: &[usize]) -> Vec<usize> {
        let ni = var_shape.last().copied().unwrap_or(0);
        match &self.kind {
            TransectKind::Surface { rows } => vec![rows.len(), ni],
            TransectKind::OceanSurface => vec![ni],
            TransectKind::ZLevels | TransectKind::Sigma { .. } => vec![self.axis.len(), ni],
        }
    }

    /// Read one file's contribution to the transect, `[time, ...slab_shape]`
    pub fn read_transect(
        &self,
        file: &File,
        path: &Path,
        variable: Variable,
        zero_is_missing: bool,
    ) -> Result<MaskedArray> {
        let name = variable.name();
        let shape = variable_shape(&netcdf_io::variable(file, name, path)?);
        if shape.len() < 3 {
            return Err(Cmip5Error::ShapeMismatch {
                path: path.to_path_buf(),
                expected: vec![0, 0, 0],
                found: shape,
            });
        }
        let (nt, ni) = (shape[0], shape.last().copied().unwrap_or(0));

        if let TransectKind::Surface { rows } = &self.kind {
            return read_masked(file, name, path, Some(&[0..nt, rows.clone(), 0..ni]), zero_is_missing);
        }

        // Everything between time and the row dimension, i.e. the levels if any
        let middle: Vec<Range<usize>> = shape[1..shape.len() - 2].iter().map(|&n| 0..n).collect();
        let read_row = |j: usize| -> Result<(MaskedArray, bool)> {
            let mut ranges = vec![0..nt];
            ranges.extend(middle.iter().cloned());
            ranges.push(j..j + 1);
            ranges.push(0..ni);
            let mut row_shape: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
            row_shape.remove(row_shape.len() - 2);
            let (row, explicit_mask) = read_fill_masked(file, name, path, Some(&ranges))?;
            Ok((row.into_shape(&row_shape)?, explicit_mask))
        };
        let (mut south, south_flagged) = read_row(self.rows.south)?;
        let (mut north, north_flagged) = read_row(self.rows.north)?;
        // One land convention for both rows
        if zero_is_missing || !(south_flagged && north_flagged) {
            mask_zeros(&mut south);
            mask_zeros(&mut north);
        }

        match &self.kind {
            TransectKind::Sigma {
                south_depth,
                north_depth,
            } => {
                let south = resample_row(&south, south_depth.view(), self.axis.view())?;
                let north = resample_row(&north, north_depth.view(), self.axis.view())?;
                self.rows.interpolate(&south, &north)
            }
            _ => self.rows.interpolate(&south, &north),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array};

    #[test]
    fn sigma_depth_is_sigma_times_bathymetry() {
        let sigma = arr1(&[-0.1, -0.5, -1.0]);
        let h = arr2(&[[100.0, 200.0], [3000.0, 4500.0]]);
        let depth = sigma_to_depth(sigma.view(), h.view());
        assert_eq!(depth.dim(), (3, 2, 2));
        for k in 0..3 {
            for j in 0..2 {
                for i in 0..2 {
                    assert_eq!(depth[[k, j, i]], -sigma[k] * h[[j, i]]);
                }
            }
        }
        assert_eq!(depth[[2, 1, 1]], 4500.0);
    }

    #[test]
    fn bracket_decreasing_latitudes() {
        let lat = arr1(&[-10.0, -20.0, -30.0, -40.0]);
        let rows = BoundaryRows::bracket(lat.view(), -30.0).unwrap();
        assert_eq!((rows.south, rows.north), (3, 2));
        assert_eq!(rows.weight(), 1.0);

        let rows = BoundaryRows::bracket(lat.view(), -25.0).unwrap();
        assert_eq!((rows.south, rows.north), (2, 1));
        assert_eq!(rows.weight(), 0.5);
    }

    #[test]
    fn bracket_increasing_latitudes() {
        let lat = arr1(&[-60.0, -45.0, -25.0, 0.0]);
        let rows = BoundaryRows::bracket(lat.view(), -30.0).unwrap();
        assert_eq!((rows.south, rows.north), (1, 2));
        assert_eq!((rows.lat_south, rows.lat_north), (-45.0, -25.0));
    }

    #[test]
    fn bracket_requires_rows_on_both_sides() {
        let lat = arr1(&[-40.0, -35.0]);
        assert!(matches!(
            BoundaryRows::bracket(lat.view(), -30.0),
            Err(Cmip5Error::NoBracketingRows { .. })
        ));
        let flat = arr1(&[-30.0, -30.0, -20.0]);
        assert!(BoundaryRows::bracket(flat.view(), -25.0).is_err());
        let decreasing = arr1(&[-35.0, -40.0]);
        assert!(BoundaryRows::bracket(decreasing.view(), -30.0).is_err());
    }

    #[test]
    fn interpolation_on_the_northern_row_is_exact() {
        let lat = arr1(&[0.0, -30.0, -33.7]);
        let rows = BoundaryRows::bracket(lat.view(), -30.0).unwrap();
        assert_eq!(rows.north, 1);

        let south = MaskedArray::unmasked(arr1(&[0.1, 7.25, -2.0]).into_dyn());
        let north = MaskedArray::unmasked(arr1(&[0.3, 1.0 / 3.0, 12.5]).into_dyn());
        let value = rows.interpolate(&south, &north).unwrap();
        assert_eq!(value.data(), north.data());
    }

    #[test]
    fn interpolation_unions_masks() {
        let lat = arr1(&[-20.0, -40.0]);
        let rows = BoundaryRows::bracket(lat.view(), -30.0).unwrap();
        let south = MaskedArray::masked_where(arr1(&[2.0, 0.0]).into_dyn(), |v| v == 0.0);
        let north = MaskedArray::unmasked(arr1(&[4.0, 6.0]).into_dyn());
        let value = rows.interpolate(&south, &north).unwrap();
        assert_eq!(value.get(&[0]), Some(3.0));
        assert_eq!(value.get(&[1]), None);
    }

    #[test]
    fn linear_interpolation_bounds() {
        let x = [0.0, 10.0, 20.0];
        let y = [1.0, 2.0, 4.0];
        assert_eq!(interp_linear(&x, &y, 0.0), 1.0);
        assert_eq!(interp_linear(&x, &y, 5.0), 1.5);
        assert_eq!(interp_linear(&x, &y, 15.0), 3.0);
        assert_eq!(interp_linear(&x, &y, 20.0), 4.0);
        assert!(interp_linear(&x, &y, 20.5).is_nan());
        assert!(interp_linear(&x, &y, -1.0).is_nan());
        assert!(interp_linear(&x, &[1.0, f64::NAN, 4.0], 5.0).is_nan());
    }

    #[test]
    fn resampling_masks_points_below_the_seafloor() {
        // One time, three levels, two columns: a deep one and a shallow one
        let row = MaskedArray::unmasked(
            Array::from_shape_vec((1, 3, 2), vec![10.0, 10.0, 8.0, 8.0, 6.0, 6.0])
                .unwrap()
                .into_dyn(),
        );
        let depth = arr2(&[[0.0, 0.0], [64.0, 32.0], [128.0, 64.0]]);
        let axis = arr1(&[0.0, 32.0, 96.0]);
        let resampled = resample_row(&row, depth.view(), axis.view()).unwrap();

        assert_eq!(resampled.shape(), &[1, 3, 2]);
        assert_eq!(resampled.get(&[0, 0, 0]), Some(10.0));
        assert_eq!(resampled.get(&[0, 1, 0]), Some(9.0));
        assert_eq!(resampled.get(&[0, 2, 0]), Some(7.0));
        assert_eq!(resampled.get(&[0, 1, 1]), Some(8.0));
        assert_eq!(resampled.get(&[0, 2, 1]), None);
    }

    #[test]
    fn uniform_axis_spans_surface_to_max_depth() {
        let axis = uniform_depth_axis(490.0);
        assert_eq!(axis.len(), UNIFORM_DEPTH_LEVELS);
        assert_eq!(axis[0], 0.0);
        assert_eq!(axis[1], 10.0);
        assert_eq!(axis[UNIFORM_DEPTH_LEVELS - 1], 490.0);
    }
}

//! Dense arrays with an element mask
//!
//! Missing data (land points, fill values, out-of-range interpolation) is
//! carried in a boolean mask alongside the values instead of as a magic
//! number, so reductions and unit conversions never touch it.

use crate::errors::Result;
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, IxDyn, Slice, Zip};

/// An `f64` array whose `true` mask entries are absent values
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    data: ArrayD<f64>,
    mask: ArrayD<bool>,
}

impl MaskedArray {
    /// Wrap data with an explicit mask of the same shape
    pub fn new(data: ArrayD<f64>, mask: ArrayD<bool>) -> Result<Self> {
        if data.shape() != mask.shape() {
            return Err(ndarray::ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape).into());
        }
        Ok(Self { data, mask })
    }

    /// Data with nothing masked
    pub fn unmasked(data: ArrayD<f64>) -> Self {
        let mask = ArrayD::from_elem(data.raw_dim(), false);
        Self { data, mask }
    }

    /// Storage for `shape` with every element masked until written
    pub fn masked_zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
            mask: ArrayD::from_elem(IxDyn(shape), true),
        }
    }

    /// Mask every element the predicate accepts
    pub fn masked_where(data: ArrayD<f64>, predicate: impl Fn(f64) -> bool) -> Self {
        let mask = data.mapv(&predicate);
        Self { data, mask }
    }

    /// Mask NaN values, the inverse of [`MaskedArray::filled_nan`]
    pub fn from_nan(data: ArrayD<f64>) -> Self {
        Self::masked_where(data, f64::is_nan)
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn mask(&self) -> &ArrayD<bool> {
        &self.mask
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn len_of(&self, axis: Axis) -> usize {
        self.data.len_of(axis)
    }

    #[must_use]
    pub fn is_masked(&self, index: &[usize]) -> bool {
        self.mask[IxDyn(index)]
    }

    /// Value at `index`, `None` when masked
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        let index = IxDyn(index);
        if self.mask[index.clone()] {
            None
        } else {
            Some(self.data[index])
        }
    }

    pub fn count_unmasked(&self) -> usize {
        self.mask.iter().filter(|&&m| !m).count()
    }

    /// Mask any still-unmasked element the predicate accepts
    pub fn mask_additional(&mut self, predicate: impl Fn(f64) -> bool) {
        Zip::from(&mut self.mask)
            .and(&self.data)
            .for_each(|m, &v| *m = *m || predicate(v));
    }

    /// Copy with masked elements replaced by NaN
    #[must_use]
    pub fn filled_nan(&self) -> ArrayD<f64> {
        let mut out = self.data.clone();
        Zip::from(&mut out)
            .and(&self.mask)
            .for_each(|v, &m| {
                if m {
                    *v = f64::NAN;
                }
            });
        out
    }

    /// Smallest unmasked value, `None` when everything is masked
    pub fn min(&self) -> Option<f64> {
        self.unmasked_values().reduce(f64::min)
    }

    /// Largest unmasked value, `None` when everything is masked
    pub fn max(&self) -> Option<f64> {
        self.unmasked_values().reduce(f64::max)
    }

    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .unmasked_values()
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (count > 0).then(|| sum / count as f64)
    }

    fn unmasked_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .zip(self.mask.iter())
            .filter_map(|(&v, &m)| (!m).then_some(v))
    }

    /// Apply `f` to every unmasked value in place
    pub fn map_unmasked_inplace(&mut self, f: impl Fn(f64) -> f64) {
        Zip::from(&mut self.data)
            .and(&self.mask)
            .for_each(|v, &m| {
                if !m {
                    *v = f(*v);
                }
            });
    }

    /// Views of the values and mask at `index` along `axis`
    pub fn index_axis(&self, axis: Axis, index: usize) -> (ArrayViewD<'_, f64>, ArrayViewD<'_, bool>) {
        (
            self.data.index_axis(axis, index),
            self.mask.index_axis(axis, index),
        )
    }

    /// Mutable views of the values and mask at `index` along `axis`
    pub fn index_axis_mut(
        &mut self,
        axis: Axis,
        index: usize,
    ) -> (ArrayViewMutD<'_, f64>, ArrayViewMutD<'_, bool>) {
        (
            self.data.index_axis_mut(axis, index),
            self.mask.index_axis_mut(axis, index),
        )
    }

    /// Overwrite the leading-axis slab at `index` with `source`'s slab at `from`
    pub fn copy_slab_from(&mut self, index: usize, source: &MaskedArray, from: usize) {
        let (src_data, src_mask) = source.index_axis(Axis(0), from);
        let (mut data, mut mask) = self.index_axis_mut(Axis(0), index);
        data.assign(&src_data);
        mask.assign(&src_mask);
    }

    /// Overwrite leading-axis entries `offset..offset + block.len_of(Axis(0))` with `block`
    pub fn write_block(&mut self, offset: usize, block: &MaskedArray) {
        let rows = Slice::from(offset..offset + block.len_of(Axis(0)));
        self.data.slice_axis_mut(Axis(0), rows).assign(&block.data);
        self.mask.slice_axis_mut(Axis(0), rows).assign(&block.mask);
    }

    /// Same elements under a new shape
    pub fn into_shape(self, shape: &[usize]) -> Result<Self> {
        Ok(Self {
            data: self.data.into_shape(IxDyn(shape))?,
            mask: self.mask.into_shape(IxDyn(shape))?,
        })
    }
}

//! cmip5_fields: CMIP5 field extraction and normalization
//!
//! A library for pulling one variable of one CMIP5 model/experiment out of a
//! directory of netCDF files, as either a full-grid field or a transect at a
//! target latitude, ordered in time, trimmed to a year range and converted to
//! common units so different models can be compared directly.
//!
//! ## Key Features
//!
//! - **Calendar-aware time decoding**: standard, proleptic Gregorian, Julian,
//!   noleap, all_leap and 360_day calendars on one comparable date key
//! - **Two-pass assembly**: time axes are planned first, then data is read
//!   into storage allocated once
//! - **Masked data**: fill values and land points travel as a mask
//! - **Boundary transects**: interpolation between the two grid rows either
//!   side of a latitude, with sigma-coordinate depths resampled onto a
//!   regular axis
//! - **Unit normalization**: Kelvin to Celsius, Pa to kPa, flux scaling, and
//!   conditional salinity/temperature fixes
//!
//! ## Module Organization
//!
//! - [`extraction`]: the extraction pipeline and its front doors
//! - [`calendar`]: CF calendars and time unit decoding
//! - [`variables`]: recognized variables, realms and unit rules
//! - [`models`]: per-model quirks and file set location
//! - [`masked`]: masked arrays
//! - [`netcdf_io`]: NetCDF reading helpers
//! - [`metadata`]: field summaries
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use cmip5_fields::prelude::*;
//!
//! let locator = PathTemplateLocator::new("/data/cmip5", PathTemplateLocator::DEFAULT_TEMPLATE);
//! let model = ModelDescriptor::lookup("CCSM4");
//!
//! if let Some(field) = extract_field(&locator, &model, "historical", "tas", 1980, 1999) {
//!     println!("{:?} with {} months", field.data.shape(), field.month_indices.len());
//! }
//!
//! let transect = extract_boundary(
//!     &locator, &model, "historical", "thetao", 1980, 1999, ROMS_NORTHERN_BOUNDARY,
//! );
//! ```

// Core modules
pub mod calendar;
pub mod errors;
pub mod extraction;
pub mod masked;
pub mod metadata;
pub mod models;
pub mod netcdf_io;
pub mod variables;

// Direct re-exports for the public API
pub use errors::{Cmip5Error, Result};
pub use extraction::{
    extract_boundary, extract_field, try_extract_boundary, try_extract_field, BoundaryTransect,
    TrimmedField,
};
pub use masked::MaskedArray;
pub use models::{FileSetLocator, ModelDescriptor, PathTemplateLocator};
pub use variables::{Realm, UnitRule, Variable};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::calendar::{Calendar, CalendarDate};
    pub use crate::errors::{Cmip5Error, Result};
    pub use crate::extraction::{
        extract_boundary, extract_field, try_extract_boundary, try_extract_field,
        BoundaryTransect, TrimmedField, VerticalAxis, ROMS_NORTHERN_BOUNDARY,
    };
    pub use crate::masked::MaskedArray;
    pub use crate::metadata::FieldSummary;
    pub use crate::models::{load_model_table, FileSetLocator, ModelDescriptor, PathTemplateLocator};
    pub use crate::variables::{Realm, Variable};
}

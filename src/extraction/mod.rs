//! Field and boundary extraction from CMIP5 file sets
//!
//! This module contains the extraction pipeline:
//! - Time axis assembly over a directory of files
//! - Data slab assembly into pre-allocated storage
//! - Vertical coordinates and latitude-boundary transects
//! - Chronological sorting and year trimming
//! - Unit normalization

pub mod data;
pub mod field;
pub mod sorting;
pub mod time;
pub mod units;
pub mod vertical;

// Re-export the front doors and their results
pub use data::Grid;
pub use field::{
    extract_boundary, extract_field, try_extract_boundary, try_extract_field, validate_request,
    BoundaryTransect, TrimmedField,
};
pub use sorting::SortedSeries;
pub use time::{assemble_times, TimePlan};
pub use vertical::{BoundaryRows, VerticalAxis, ROMS_NORTHERN_BOUNDARY};

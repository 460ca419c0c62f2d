//! Centralized error handling for cmip5_fields
//!
//! Every failure the engine can hit is a variant of [`Cmip5Error`]. The
//! `extract_*` front doors in [`crate::extraction`] turn any of these into the
//! `None` sentinel after logging it; the `try_extract_*` variants hand the
//! error back to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for field extraction
#[derive(Debug, Error)]
pub enum Cmip5Error {
    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDFError(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    /// Model table could not be parsed
    #[error("Configuration error: {0}")]
    ConfigError(#[from] serde_json::Error),

    /// Variable name is not in the recognized atmosphere/ocean sets
    #[error("Unknown variable '{name}'")]
    UnknownVariable { name: String },

    /// Variable known to have unreliable units for this model
    #[error("Skipping {model} because {variable} units are unreliable")]
    ExcludedCombination { model: String, variable: String },

    /// The file set locator has no directory for this request
    #[error("No data found for model {model}, experiment {experiment}, variable {variable}")]
    NoDataAvailable {
        model: String,
        experiment: String,
        variable: String,
    },

    /// No usable file overlaps the requested years
    #[error("No files found in date range {start_year}-{end_year} under {}", .path.display())]
    NoOverlapInRange {
        path: PathBuf,
        start_year: i32,
        end_year: i32,
    },

    /// Target latitude has no grid row on one of its sides
    #[error("Latitude {target} is not bracketed by two grid rows")]
    NoBracketingRows { target: f64 },

    /// Time units string could not be parsed
    #[error("Invalid time units '{units}': {reason}")]
    InvalidTimeUnits { units: String, reason: String },

    /// Time value cannot be placed on the calendar (fill value or absurd offset)
    #[error("Time value {value} since {reference} is outside the decodable range")]
    TimeOutOfRange { value: f64, reference: String },

    /// Calendar attribute names a calendar we cannot decode
    #[error("Unsupported calendar '{0}'")]
    UnknownCalendar(String),

    /// Variable missing from a file
    #[error("Variable '{var}' not found in {}", .path.display())]
    VariableNotFound { var: String, path: PathBuf },

    /// A file's slab does not line up with the rest of the series
    #[error("Shape mismatch in {}: expected {expected:?}, found {found:?}", .path.display())]
    ShapeMismatch {
        path: PathBuf,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// Result type alias for cmip5_fields operations
pub type Result<T> = std::result::Result<T, Cmip5Error>;

//! Time axis assembly across the files of one directory
//!
//! This is the first of the two passes over a directory: it decides which
//! files take part in the series and how many timesteps each contributes, so
//! the data pass can fill storage that is already the right size.

use crate::calendar::{normalize_units, Calendar, CalendarDate, TimeUnits};
use crate::errors::{Cmip5Error, Result};
use crate::netcdf_io::{open_file, read_time_coordinate};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// A file whose dates overlap the requested years
#[derive(Debug, Clone)]
pub struct RetainedFile {
    pub path: PathBuf,
    /// Position of the file's first timestep in the assembled series
    pub offset: usize,
    pub len: usize,
}

/// Retained files in iteration order and their concatenated time axis
#[derive(Debug, Clone)]
pub struct TimePlan {
    pub dir: PathBuf,
    pub start_year: i32,
    pub end_year: i32,
    pub files: Vec<RetainedFile>,
    pub times: Vec<CalendarDate>,
}

impl TimePlan {
    fn new(dir: &Path, start_year: i32, end_year: i32) -> Self {
        Self {
            dir: dir.to_path_buf(),
            start_year,
            end_year,
            files: Vec::new(),
            times: Vec::new(),
        }
    }

    /// The error reported when nothing in the directory is usable
    pub fn no_overlap(&self) -> Cmip5Error {
        Cmip5Error::NoOverlapInRange {
            path: self.dir.clone(),
            start_year: self.start_year,
            end_year: self.end_year,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    fn push(&mut self, path: PathBuf, times: Vec<CalendarDate>) {
        self.files.push(RetainedFile {
            path,
            offset: self.times.len(),
            len: times.len(),
        });
        self.times.extend(times);
    }
}

/// What the time pass decided about one file
#[derive(Debug, Clone, PartialEq)]
pub enum FileScan {
    Retained(Vec<CalendarDate>),
    /// Dates fall entirely outside the requested years
    NoOverlap,
    /// Time coordinate holds the negative invalid sentinel or a fill value
    Corrupt,
}

/// The `.nc` files of a directory, sorted by file name
pub fn list_netcdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_netcdf = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".nc"));
        if is_netcdf && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read and decode one file's time coordinate and check it against the years
///
/// The file handle is closed before returning on every path.
pub fn scan_file(path: &Path, start_year: i32, end_year: i32) -> Result<FileScan> {
    let coordinate = {
        let file = open_file(path)?;
        read_time_coordinate(&file, path)?
    };

    // Negative offsets and fill values (read back as NaN) both mark a broken file
    if coordinate.values.iter().any(|&v| v < 0.0 || v.is_nan()) {
        return Ok(FileScan::Corrupt);
    }

    let calendar = match coordinate.calendar.as_deref() {
        Some(name) => Calendar::parse(name)?,
        None => Calendar::Standard,
    };
    let units = TimeUnits::parse(&normalize_units(&coordinate.units), calendar)?;
    let times = units.decode_all(&coordinate.values)?;

    match (times.first(), times.last()) {
        (Some(first), Some(last)) if first.year <= end_year && last.year >= start_year => {
            Ok(FileScan::Retained(times))
        }
        _ => Ok(FileScan::NoOverlap),
    }
}

/// Build the time plan for every file in `dir` overlapping `[start_year, end_year]`
///
/// A corrupt time coordinate ends the scan: files after it in the listing are
/// not examined, while files already retained are kept.
pub fn assemble_times(dir: &Path, start_year: i32, end_year: i32) -> Result<TimePlan> {
    let mut plan = TimePlan::new(dir, start_year, end_year);

    for path in list_netcdf_files(dir)? {
        match scan_file(&path, start_year, end_year)? {
            FileScan::Retained(times) => {
                debug!("{}: {} timesteps retained", path.display(), times.len());
                plan.push(path, times);
            }
            FileScan::NoOverlap => {
                debug!("{}: outside {start_year}-{end_year}, skipped", path.display());
            }
            FileScan::Corrupt => {
                warn!(
                    "{}: time coordinate has missing values, ignoring the rest of {}",
                    path.display(),
                    dir.display()
                );
                break;
            }
        }
    }

    Ok(plan)
}

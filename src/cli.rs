//! Defines command-line interface options using `clap` for the cmip5-fields application.

use clap::Parser;
use std::path::PathBuf;

/// A CLI tool for extracting normalized CMIP5 fields
#[derive(Parser, Debug)]
#[command(
    name = "cmip5-fields",
    version,
    about = "Extract, time-order and unit-normalize one CMIP5 variable"
)]
pub struct Args {
    /// Model name, e.g. CCSM4
    #[arg(short, long)]
    pub model: String,

    /// Experiment name, e.g. historical or rcp85
    #[arg(short, long)]
    pub experiment: String,

    /// Variable name, e.g. tas or thetao
    #[arg(long = "var")]
    pub variable: String,

    /// Inclusive year range, formatted as <start>:<end>
    #[arg(short, long, value_parser = parse_year_range)]
    pub years: (i32, i32),

    /// Root directory of the CMIP5 archive
    #[arg(short, long)]
    pub root: PathBuf,

    /// Directory layout under the root, with {model}, {experiment} and {variable} placeholders
    #[arg(long, default_value = "{model}/{experiment}/{variable}")]
    pub template: String,

    /// Extract a transect at this latitude instead of the full field
    #[arg(long, allow_hyphen_values = true)]
    pub boundary_lat: Option<f64>,

    /// JSON table of model quirks; built-in quirks are used when absent
    #[arg(long)]
    pub models_file: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_year_range(s: &str) -> Result<(i32, i32), String> {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [start, end] => {
            let start = start
                .parse::<i32>()
                .map_err(|_| format!("Invalid start year '{}'", start))?;
            let end = end
                .parse::<i32>()
                .map_err(|_| format!("Invalid end year '{}'", end))?;
            if start > end {
                return Err(format!("Start year {} is after end year {}", start, end));
            }
            Ok((start, end))
        }
        _ => Err("Invalid format: Expected '<start>:<end>'.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_range_parsing() {
        assert_eq!(parse_year_range("1980:1999"), Ok((1980, 1999)));
        assert_eq!(parse_year_range("2005:2005"), Ok((2005, 2005)));
        assert!(parse_year_range("1999:1980").is_err());
        assert!(parse_year_range("1980").is_err());
        assert!(parse_year_range("abc:1999").is_err());
    }

    #[test]
    fn boundary_latitude_accepts_negative_values() {
        let args = Args::try_parse_from([
            "cmip5-fields",
            "--model",
            "CCSM4",
            "--experiment",
            "historical",
            "--var",
            "thetao",
            "--years",
            "1980:1999",
            "--root",
            "/data",
            "--boundary-lat",
            "-30",
        ])
        .unwrap();
        assert_eq!(args.boundary_lat, Some(-30.0));
        assert_eq!(args.template, "{model}/{experiment}/{variable}");
    }
}

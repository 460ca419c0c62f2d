//! Recognized CMIP5 variables and the data attached to each of them
//!
//! Every variable the engine understands is a [`Variable`] variant. The realm,
//! whether the field has a vertical axis, and the unit conversion applied after
//! trimming are all looked up from the variant rather than from name lists.

use crate::errors::{Cmip5Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Conversion from Kelvin to Celsius
pub const DEG_K_TO_C: f64 = -273.15;

/// Model component a variable belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Realm {
    /// Surface fields, time x lat x lon
    Atmos,
    /// Ocean fields, time x depth x lat x lon (or time x lat x lon at the surface)
    Ocean,
}

/// Unit conversion applied to a trimmed field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitRule {
    /// Leave the data untouched
    Unchanged,
    /// Multiply every value by the factor
    Scale(f64),
    /// Add the offset to every value
    Offset(f64),
    /// Add the offset only when the smallest unmasked value exceeds the threshold
    OffsetIfMinAbove { offset: f64, threshold: f64 },
    /// Multiply only when the largest unmasked value is below the threshold
    ScaleIfMaxBelow { factor: f64, threshold: f64 },
}

/// CMIP5 variables the engine can extract
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Variable {
    /// Surface air pressure
    Ps,
    /// Near-surface air temperature
    Tas,
    /// Near-surface specific humidity
    Huss,
    /// Total cloud fraction
    Clt,
    /// Eastward near-surface wind
    Uas,
    /// Northward near-surface wind
    Vas,
    /// Precipitation
    Pr,
    /// Snowfall flux
    Prsn,
    /// Evaporation
    Evspsbl,
    /// Surface downwelling shortwave radiation
    Rsds,
    /// Surface downwelling longwave radiation
    Rlds,
    /// Sea water potential temperature
    Thetao,
    /// Sea water salinity
    So,
    /// Sea water x velocity
    Uo,
    /// Sea water y velocity
    Vo,
    /// Sea surface height above geoid
    Zos,
}

impl Variable {
    /// Parse a CMIP5 variable name, rejecting anything outside the recognized set
    ///
    /// # Errors
    ///
    /// Returns [`Cmip5Error::UnknownVariable`] for unrecognized names.
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| Cmip5Error::UnknownVariable {
            name: name.to_string(),
        })
    }

    /// The variable name as it appears inside the files
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    #[must_use]
    pub const fn realm(self) -> Realm {
        match self {
            Self::Ps
            | Self::Tas
            | Self::Huss
            | Self::Clt
            | Self::Uas
            | Self::Vas
            | Self::Pr
            | Self::Prsn
            | Self::Evspsbl
            | Self::Rsds
            | Self::Rlds => Realm::Atmos,
            Self::Thetao | Self::So | Self::Uo | Self::Vo | Self::Zos => Realm::Ocean,
        }
    }

    /// Whether the slab carries a depth dimension after time
    #[must_use]
    pub const fn has_vertical_axis(self) -> bool {
        matches!(self.realm(), Realm::Ocean) && !matches!(self, Self::Zos)
    }

    /// Conversion applied after trimming so models are comparable
    #[must_use]
    pub const fn unit_rule(self) -> UnitRule {
        match self {
            // kg/m^2/s to 1e-6 kg/m^2/s
            Self::Pr | Self::Prsn | Self::Evspsbl => UnitRule::Scale(1e6),
            // Pa to kPa
            Self::Ps => UnitRule::Scale(1e-3),
            Self::Tas => UnitRule::Offset(DEG_K_TO_C),
            // Some models already store Celsius
            Self::Thetao => UnitRule::OffsetIfMinAbove {
                offset: DEG_K_TO_C,
                threshold: 100.0,
            },
            // Fraction to psu
            Self::So => UnitRule::ScaleIfMaxBelow {
                factor: 1e3,
                threshold: 1.0,
            },
            _ => UnitRule::Unchanged,
        }
    }
}

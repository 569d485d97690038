//! Units of the sampled measurements.

use std::fmt;

use thiserror::Error;

/// The unit of measurement of a sampled value.
///
/// Only the three units carried by the published views exist. The string forms are part of the
/// registration contract and never change.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MetricUnit {
    /// A plain count without magnitude (`"dimensionless"`).
    Dimensionless,
    /// Size in bytes (`"bytes"`).
    Bytes,
    /// A time duration in milliseconds (`"milliseconds"`).
    Milliseconds,
}

impl MetricUnit {
    /// Returns the stable string tag of this unit.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dimensionless => "dimensionless",
            Self::Bytes => "bytes",
            Self::Milliseconds => "milliseconds",
        }
    }

    /// Converts into the unit understood by the [`metrics`] facade.
    ///
    /// The facade has no dimensionless unit, so plain counts map to [`metrics::Unit::Count`].
    pub fn to_metrics_unit(self) -> metrics::Unit {
        match self {
            Self::Dimensionless => metrics::Unit::Count,
            Self::Bytes => metrics::Unit::Bytes,
            Self::Milliseconds => metrics::Unit::Milliseconds,
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricUnit {
    type Err = ParseMetricUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "dimensionless" | "1" | "" => Self::Dimensionless,
            "bytes" | "byte" | "By" => Self::Bytes,
            "milliseconds" | "millisecond" | "ms" => Self::Milliseconds,
            _ => return Err(ParseMetricUnitError(s.to_owned())),
        })
    }
}

/// An error parsing a [`MetricUnit`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown metric unit `{0}`")]
pub struct ParseMetricUnitError(String);

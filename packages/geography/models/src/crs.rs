//! Coordinate reference system identifiers.
//!
//! A [`Crs`] is only an EPSG code. Whether a code is supported, and
//! whether it is geographic or projected, is decided by the projection
//! registry in `impact_map_geography`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An EPSG-coded coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(u32);

impl Crs {
    /// WGS84 geographic coordinates (degrees, longitude first).
    pub const WGS84: Self = Self(4326);

    /// ETRS89 geographic coordinates.
    pub const ETRS89: Self = Self(4258);

    /// Spherical Web Mercator used by slippy-map tiles.
    pub const WEB_MERCATOR: Self = Self(3857);

    /// ETRS89 / UTM zone 31N, the metric CRS of Catalan cadastre data.
    pub const ETRS89_UTM_31N: Self = Self(25831);

    /// Creates a CRS from a raw EPSG code.
    #[must_use]
    pub const fn from_epsg(code: u32) -> Self {
        Self(code)
    }

    /// Returns the EPSG code.
    #[must_use]
    pub const fn epsg(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// Error returned when a CRS string cannot be parsed into an EPSG code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCrsError {
    /// The string that failed to parse.
    pub input: String,
}

impl std::fmt::Display for ParseCrsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid CRS identifier '{}': expected EPSG:<code> or an OGC URN",
            self.input
        )
    }
}

impl std::error::Error for ParseCrsError {}

impl FromStr for Crs {
    type Err = ParseCrsError;

    /// Accepts `EPSG:25831`, `epsg:25831`, `urn:ogc:def:crs:EPSG::25831`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84` and a bare `25831`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseCrsError {
            input: s.to_string(),
        };

        let upper = trimmed.to_ascii_uppercase();
        if upper.ends_with(":CRS84") || upper == "CRS84" {
            return Ok(Self::WGS84);
        }

        let code = upper
            .strip_prefix("URN:OGC:DEF:CRS:EPSG:")
            .map(|rest| rest.trim_start_matches(':'))
            .map(|rest| rest.rsplit(':').next().unwrap_or(rest))
            .or_else(|| upper.strip_prefix("EPSG:"))
            .unwrap_or(&upper);

        code.parse::<u32>().map(Self).map_err(|_| err())
    }
}

impl TryFrom<String> for Crs {
    type Error = ParseCrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset loading and coordinate reprojection.
//!
//! Reads the works, buildings and population `GeoJSON` files into an
//! immutable [`store::GeometryStore`] and converts feature collections
//! between the supported coordinate reference systems.

pub mod ingest;
pub mod projection;
pub mod store;

use impact_map_geography_models::{Crs, ParseCrsError};
use thiserror::Error;

/// Errors that can occur while reprojecting coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// The CRS is not in the projection registry.
    #[error("Unsupported CRS: {crs}")]
    UnsupportedCrs {
        /// The offending CRS.
        crs: Crs,
    },

    /// A coordinate has no finite image in the target CRS.
    #[error("Coordinate ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain {
        /// The CRS whose domain was exceeded.
        crs: Crs,
        /// Input x (longitude or easting).
        x: f64,
        /// Input y (latitude or northing).
        y: f64,
    },
}

/// Errors that can occur while loading datasets.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Reading the file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The text is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The document is valid `GeoJSON` but not a `FeatureCollection`.
    #[error("GeoJSON document is not a FeatureCollection")]
    NotACollection,

    /// The declared CRS could not be parsed.
    #[error("CRS error: {0}")]
    Crs(#[from] ParseCrsError),

    /// A feature geometry could not be converted.
    #[error("Geometry error in feature {id}: {message}")]
    Geometry {
        /// Position of the feature in the document.
        id: u64,
        /// Description of what went wrong.
        message: String,
    },
}

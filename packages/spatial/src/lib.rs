#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Metric buffering and R-tree backed intersection joins.
//!
//! Both operations work in a single projected CRS. Callers reproject
//! their inputs first; mixing CRSs is reported as an error rather than
//! silently producing wrong geometry.

pub mod buffer;
pub mod join;

use impact_map_geography::ProjectionError;
use impact_map_geography_models::Crs;
use thiserror::Error;

pub use buffer::buffer;
pub use join::{intersecting_join, intersecting_join_geometry};

/// Errors that can occur in spatial operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpatialError {
    /// The CRS is not known to the projection registry.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// A metric operation was asked to run on degrees.
    #[error("Cannot buffer in geographic CRS {crs}, reproject to a projected CRS first")]
    GeographicCrs {
        /// The geographic CRS.
        crs: Crs,
    },

    /// Buffer distance is zero, negative or not finite.
    #[error("Invalid buffer distance: {distance}")]
    InvalidDistance {
        /// The rejected distance.
        distance: f64,
    },

    /// Buffering produced no polygons (empty input geometry).
    #[error("Buffer produced an empty geometry")]
    EmptyBuffer,

    /// The two sides of a join are in different CRSs.
    #[error("CRS mismatch: base is {base}, reference is {reference}")]
    CrsMismatch {
        /// CRS of the base collection.
        base: Crs,
        /// CRS of the reference collection.
        reference: Crs,
    },
}

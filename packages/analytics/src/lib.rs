#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Work impact analysis: locate a work, buffer it, find the buildings
//! inside the buffer and the residents of those buildings.
//!
//! [`ImpactAnalyzer`] is the entry point. It owns a shared, read-only
//! [`GeometryStore`](impact_map_geography::store::GeometryStore) and turns
//! a free-text work name into an
//! [`ImpactAnalysisResult`](impact_map_analytics_models::ImpactAnalysisResult).

pub mod aggregate;
pub mod config;
pub mod locate;
pub mod pipeline;
pub mod serialize;

use impact_map_analytics_models::InvalidConfigError;
use impact_map_geography::ProjectionError;
use impact_map_geography_models::Crs;
use impact_map_spatial::SpatialError;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use pipeline::ImpactAnalyzer;

/// Message shown to users when no work matches their query.
pub const NOT_FOUND_MESSAGE: &str = "No work matching that name was found.";

/// Message shown to users for every failure other than a missing work.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An internal error occurred while analyzing the work. Please try again later.";

/// Errors that can occur during an impact analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// No work name contains the query.
    #[error("No work matches '{query}'")]
    NotFound {
        /// The query as received.
        query: String,
    },

    /// Several works match and the match policy requires a unique one.
    #[error("'{query}' matches {} works: {}", .candidates.len(), .candidates.join(", "))]
    AmbiguousMatch {
        /// The query as received.
        query: String,
        /// Names of every matching work, in collection order.
        candidates: Vec<String>,
    },

    /// Two collections that must share a CRS do not.
    #[error("CRS mismatch: {base} vs {reference}")]
    CrsMismatch {
        /// CRS of the base collection.
        base: Crs,
        /// CRS of the reference collection.
        reference: Crs,
    },

    /// A CRS is not in the projection registry, or cannot be used where
    /// it was configured.
    #[error("Unsupported CRS: {crs}")]
    UnsupportedCrs {
        /// The offending CRS.
        crs: Crs,
    },

    /// A population value could not be read as a number.
    #[error("Feature {feature_id} has invalid '{attribute}' value '{value}'")]
    InvalidAttribute {
        /// Id of the offending feature.
        feature_id: u64,
        /// Attribute that was summed.
        attribute: String,
        /// Display form of the rejected value.
        value: String,
    },

    /// Any other failure.
    #[error("Internal analysis error: {message}")]
    Internal {
        /// Description of what went wrong.
        message: String,
    },
}

/// Coarse classification of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// See [`AnalysisError::NotFound`].
    NotFound,
    /// See [`AnalysisError::AmbiguousMatch`].
    AmbiguousMatch,
    /// See [`AnalysisError::CrsMismatch`].
    CrsMismatch,
    /// See [`AnalysisError::UnsupportedCrs`].
    UnsupportedCrs,
    /// See [`AnalysisError::InvalidAttribute`].
    InvalidAttribute,
    /// See [`AnalysisError::Internal`].
    Internal,
}

impl AnalysisError {
    /// Returns the error's kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            Self::CrsMismatch { .. } => ErrorKind::CrsMismatch,
            Self::UnsupportedCrs { .. } => ErrorKind::UnsupportedCrs,
            Self::InvalidAttribute { .. } => ErrorKind::InvalidAttribute,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether this is a normal answer to the user rather than a defect
    /// in data or configuration.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::AmbiguousMatch { .. })
    }

    /// Text safe to show an end user. Defects collapse to one generic
    /// message; the detail stays in [`Display`](std::fmt::Display) for
    /// logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { .. } => NOT_FOUND_MESSAGE.to_string(),
            Self::AmbiguousMatch { candidates, .. } => format!(
                "Several works match that name, please be more specific: {}",
                candidates
                    .iter()
                    .map(|c| serialize::escape_html(c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<ProjectionError> for AnalysisError {
    fn from(e: ProjectionError) -> Self {
        match e {
            ProjectionError::UnsupportedCrs { crs } => Self::UnsupportedCrs { crs },
            ProjectionError::OutOfDomain { .. } => Self::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<SpatialError> for AnalysisError {
    fn from(e: SpatialError) -> Self {
        match e {
            SpatialError::Projection(inner) => inner.into(),
            SpatialError::GeographicCrs { crs } => Self::UnsupportedCrs { crs },
            SpatialError::CrsMismatch { base, reference } => Self::CrsMismatch { base, reference },
            SpatialError::InvalidDistance { .. } | SpatialError::EmptyBuffer => Self::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<InvalidConfigError> for AnalysisError {
    fn from(e: InvalidConfigError) -> Self {
        Self::Internal {
            message: e.to_string(),
        }
    }
}

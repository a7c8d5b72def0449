#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the impact map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the analysis result types to allow independent evolution of the
//! API contract.

use impact_map_analytics_models::MapPayload;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Body of `POST /api/impact`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiImpactRequest {
    /// Free-text work name to analyze.
    pub work: String,
}

/// What the front end should do with an [`ApiImpactResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApiAction {
    /// Replace the impact layers and fit the map to `data.bounds`.
    UpdateMap,
    /// Only show the response text.
    None,
}

/// Response of `POST /api/impact`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiImpactResponse {
    /// HTML-safe text for the chat overlay.
    pub response: String,
    /// Map action to take.
    pub action: ApiAction,
    /// Map layers when `action` is [`ApiAction::UpdateMap`].
    pub data: Option<MapPayload>,
}

impl ApiImpactResponse {
    /// A successful analysis.
    #[must_use]
    pub const fn update_map(response: String, data: MapPayload) -> Self {
        Self {
            response,
            action: ApiAction::UpdateMap,
            data: Some(data),
        }
    }

    /// A text-only answer, with no map change.
    #[must_use]
    pub const fn text(response: String) -> Self {
        Self {
            response,
            action: ApiAction::None,
            data: None,
        }
    }
}

/// Initial map viewport for the front end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMapDefaults {
    /// Initial centre latitude.
    pub latitude: f64,
    /// Initial centre longitude.
    pub longitude: f64,
    /// Initial zoom level.
    pub zoom: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_response_has_null_data() {
        let json = serde_json::to_value(ApiImpactResponse::text("No".to_string())).unwrap();
        assert_eq!(json["action"], "none");
        assert!(json["data"].is_null());
        assert_eq!(json["response"], "No");
    }

    #[test]
    fn action_names_match_front_end() {
        assert_eq!(
            serde_json::to_value(ApiAction::UpdateMap).unwrap(),
            serde_json::json!("update_map")
        );
        assert_eq!(ApiAction::UpdateMap.to_string(), "update_map");
    }

    #[test]
    fn parses_request_body() {
        let request: ApiImpactRequest =
            serde_json::from_str(r#"{ "work": "Rambla Modolell" }"#).unwrap();
        assert_eq!(request.work, "Rambla Modolell");
    }
}

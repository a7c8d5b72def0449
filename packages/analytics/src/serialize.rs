//! Turning pipeline output into WGS84 `GeoJSON` and display text.

use geo::{BoundingRect, Geometry, MultiPolygon};
use impact_map_analytics_models::{ImpactAnalysisResult, MapLayers, MapPayload};
use impact_map_geography::projection::{reproject, reproject_geometry};
use impact_map_geography_models::{BoundingBox, Crs, Feature, FeatureCollection};
use impact_map_spatial::join::{JOIN_BOOKKEEPING_FIELDS, strip_join_fields};

use crate::AnalysisError;
use crate::aggregate::headcount;

/// Property naming the work on the buffer feature.
pub const BUFFER_WORK_PROPERTY: &str = "work";

/// Builds the WGS84 result of an analysis.
///
/// `buffer` and `affected_buildings` are both in `crs`. Join bookkeeping
/// attributes are removed from the buildings, and the population total is
/// kept as-is alongside its truncated headcount.
///
/// # Errors
///
/// Returns [`AnalysisError`] if reprojection to WGS84 fails or the buffer
/// is empty.
pub fn serialize(
    buffer: &MultiPolygon<f64>,
    crs: Crs,
    affected_buildings: &FeatureCollection,
    matched_work_name: &str,
    affected_population: f64,
) -> Result<ImpactAnalysisResult, AnalysisError> {
    if affected_buildings.crs() != crs {
        return Err(AnalysisError::CrsMismatch {
            base: affected_buildings.crs(),
            reference: crs,
        });
    }

    let Geometry::MultiPolygon(buffer_geometry) =
        reproject_geometry(&Geometry::MultiPolygon(buffer.clone()), crs, Crs::WGS84)?
    else {
        return Err(AnalysisError::Internal {
            message: "reprojection changed the buffer geometry type".to_string(),
        });
    };

    let bounding_box = buffer_geometry
        .bounding_rect()
        .map(BoundingBox::from)
        .ok_or_else(|| AnalysisError::Internal {
            message: "buffer has no extent".to_string(),
        })?;

    let affected_buildings = strip_join_fields(&reproject(affected_buildings, Crs::WGS84)?);
    let affected_population_count = headcount(affected_population);

    let summary = summary_text(
        matched_work_name,
        affected_buildings.len(),
        affected_population_count,
    );

    let buffer_feature = geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&buffer_geometry))),
        id: None,
        properties: Some(
            std::iter::once((
                BUFFER_WORK_PROPERTY.to_string(),
                serde_json::Value::String(matched_work_name.to_string()),
            ))
            .collect(),
        ),
        foreign_members: None,
    };

    let map = MapPayload {
        bounds: bounding_box.to_array(),
        layers: MapLayers {
            buffer: geojson::FeatureCollection {
                bbox: None,
                features: vec![buffer_feature],
                foreign_members: None,
            },
            buildings: to_geojson(&affected_buildings),
        },
    };

    Ok(ImpactAnalysisResult {
        bounding_box,
        affected_buildings,
        buffer_geometry,
        affected_population,
        affected_population_count,
        matched_work_name: matched_work_name.to_string(),
        summary,
        map,
    })
}

/// One-line HTML summary. The work name is escaped.
#[must_use]
pub fn summary_text(work_name: &str, building_count: usize, headcount: u64) -> String {
    let buildings = if building_count == 1 {
        "building"
    } else {
        "buildings"
    };
    let residents = if headcount == 1 { "resident" } else { "residents" };

    format!(
        "Work <b>{}</b> affects <b>{building_count}</b> {buildings} \
         with an estimated <b>{headcount}</b> {residents}.",
        escape_html(work_name)
    )
}

/// Converts a collection to `GeoJSON`, dropping join bookkeeping
/// attributes. Feature ids become numeric `GeoJSON` ids and date/time
/// attributes become display strings.
#[must_use]
pub fn to_geojson(collection: &FeatureCollection) -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: None,
        features: collection.iter().map(to_geojson_feature).collect(),
        foreign_members: None,
    }
}

fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    let properties: geojson::JsonObject = feature
        .properties
        .iter()
        .filter(|(name, _)| !JOIN_BOOKKEEPING_FIELDS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&feature.geometry))),
        id: Some(geojson::feature::Id::Number(feature.id.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Escapes the five HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

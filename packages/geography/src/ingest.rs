//! `GeoJSON` dataset loading.
//!
//! Reads a `FeatureCollection` document into a typed
//! [`FeatureCollection`]. The CRS comes from the legacy top-level `crs`
//! member that QGIS and GDAL still write:
//!
//! ```json
//! { "type": "FeatureCollection",
//!   "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::25831" } },
//!   "features": [] }
//! ```
//!
//! When the member is missing the caller's default applies.

use std::path::Path;

use geojson::GeoJson;
use impact_map_geography_models::{AttributeValue, Crs, Feature, FeatureCollection};

use crate::IngestError;

/// Reads and parses a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or is not a valid
/// `GeoJSON` `FeatureCollection`.
pub fn load_collection(path: &Path, default_crs: Crs) -> Result<FeatureCollection, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let collection = parse_collection(&text, default_crs)?;
    log::info!(
        "Loaded {} features from {} ({})",
        collection.len(),
        path.display(),
        collection.crs()
    );
    Ok(collection)
}

/// Parses a `GeoJSON` `FeatureCollection` document.
///
/// Feature ids are positions in the document. Features without geometry
/// are skipped but still consume their position.
///
/// # Errors
///
/// Returns [`IngestError`] if the text is not valid `GeoJSON`, is not a
/// `FeatureCollection`, declares an unparseable CRS, or holds a geometry
/// that cannot be converted.
pub fn parse_collection(text: &str, default_crs: Crs) -> Result<FeatureCollection, IngestError> {
    let geojson: GeoJson = text.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(IngestError::NotACollection);
    };

    let crs = match declared_crs(collection.foreign_members.as_ref())? {
        Some(crs) => crs,
        None => {
            log::warn!("GeoJSON has no CRS member, assuming {default_crs}");
            default_crs
        }
    };

    let mut features = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for (id, feature) in (0u64..).zip(collection.features) {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };

        let geometry: geo::Geometry<f64> =
            geometry
                .try_into()
                .map_err(|e: geojson::Error| IngestError::Geometry {
                    id,
                    message: e.to_string(),
                })?;

        let properties = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, AttributeValue::from(value)))
            .collect();

        features.push(Feature {
            id,
            geometry,
            properties,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} features without geometry");
    }

    Ok(FeatureCollection::new(crs, features))
}

/// Extracts the CRS from a named `crs` member, if present.
fn declared_crs(foreign_members: Option<&geojson::JsonObject>) -> Result<Option<Crs>, IngestError> {
    let Some(crs) = foreign_members.and_then(|m| m.get("crs")) else {
        return Ok(None);
    };

    let Some(name) = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(serde_json::Value::as_str)
    else {
        log::warn!("Ignoring non-named CRS member: {crs}");
        return Ok(None);
    };

    name.parse().map(Some).map_err(IngestError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILDINGS: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::25831" } },
        "features": [
            { "type": "Feature",
              "properties": { "currentUse": "1_residential", "value": 12, "reference": null },
              "geometry": { "type": "Polygon", "coordinates": [[[420000, 4574000], [420010, 4574000], [420010, 4574010], [420000, 4574000]]] } },
            { "type": "Feature", "properties": { "currentUse": "orphan" }, "geometry": null },
            { "type": "Feature",
              "properties": { "currentUse": "3_industrial" },
              "geometry": { "type": "Point", "coordinates": [420100, 4574100] } }
        ]
    }"#;

    #[test]
    fn reads_declared_crs() {
        let collection = parse_collection(BUILDINGS, Crs::WGS84).unwrap();
        assert_eq!(collection.crs(), Crs::ETRS89_UTM_31N);
    }

    #[test]
    fn skips_null_geometry_but_keeps_positions() {
        let collection = parse_collection(BUILDINGS, Crs::WGS84).unwrap();
        let ids: Vec<u64> = collection.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn maps_properties_to_attribute_values() {
        let collection = parse_collection(BUILDINGS, Crs::WGS84).unwrap();
        let first = &collection.features()[0];
        assert_eq!(first.text_property("currentUse"), Some("1_residential"));
        assert_eq!(first.property("value"), Some(&AttributeValue::Number(12.0)));
        assert_eq!(first.property("reference"), Some(&AttributeValue::Null));
    }

    #[test]
    fn falls_back_to_default_crs() {
        let text = r#"{ "type": "FeatureCollection", "features": [] }"#;
        let collection = parse_collection(text, Crs::WGS84).unwrap();
        assert_eq!(collection.crs(), Crs::WGS84);
        assert!(collection.is_empty());
    }

    #[test]
    fn reads_crs84_urn_as_wgs84() {
        let text = r#"{ "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" } },
            "features": [] }"#;
        let collection = parse_collection(text, Crs::ETRS89_UTM_31N).unwrap();
        assert_eq!(collection.crs(), Crs::WGS84);
    }

    #[test]
    fn rejects_unparseable_crs_name() {
        let text = r#"{ "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "Lambert 93" } },
            "features": [] }"#;
        assert!(matches!(
            parse_collection(text, Crs::WGS84),
            Err(IngestError::Crs(_))
        ));
    }

    #[test]
    fn rejects_bare_geometry_document() {
        let text = r#"{ "type": "Point", "coordinates": [2.0, 41.3] }"#;
        assert!(matches!(
            parse_collection(text, Crs::WGS84),
            Err(IngestError::NotACollection)
        ));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            parse_collection("{ not json", Crs::WGS84),
            Err(IngestError::GeoJson(_))
        ));
    }
}

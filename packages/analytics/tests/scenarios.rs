//! End-to-end impact analyses over a small synthetic neighbourhood.
//!
//! Buildings live in ETRS89 / UTM 31N like the cadastre export; works and
//! population are in WGS84. Every footprint sits at least five metres
//! away from the edge of the 30 m buffer so reprojection noise cannot
//! flip a result.

use std::sync::Arc;

use geo::{Geometry, Intersects, line_string, point, polygon};
use impact_map_analytics::{AnalysisError, ErrorKind, ImpactAnalyzer, NOT_FOUND_MESSAGE};
use impact_map_analytics_models::{AnalysisConfig, MatchPolicy};
use impact_map_geography::projection::{reproject, reproject_geometry};
use impact_map_geography::store::GeometryStore;
use impact_map_geography_models::{AttributeValue, Crs, Feature, FeatureCollection};

const UTM: Crs = Crs::ETRS89_UTM_31N;
const POPULATION: &str = "estimacioPoblacio";
const NAME: &str = "nombre";

fn to_wgs84(geometry: Geometry<f64>) -> Geometry<f64> {
    reproject_geometry(&geometry, UTM, Crs::WGS84).unwrap()
}

fn footprint(x: f64, y: f64, width: f64, height: f64) -> Geometry<f64> {
    polygon![
        (x: x, y: y),
        (x: x + width, y: y),
        (x: x + width, y: y + height),
        (x: x, y: y + height),
        (x: x, y: y),
    ]
    .into()
}

fn works() -> FeatureCollection {
    FeatureCollection::new(
        Crs::WGS84,
        vec![
            Feature::new(
                0,
                to_wgs84(
                    line_string![(x: 420_000.0, y: 4_574_000.0), (x: 420_200.0, y: 4_574_000.0)]
                        .into(),
                ),
            )
            .with_property(NAME, "Peatonalización y Mejora de Accesibilidad Rambla Modolell")
            .with_property("estado", "En curso"),
            Feature::new(1, to_wgs84(point!(x: 421_000.0, y: 4_575_000.0).into()))
                .with_property(NAME, "Reurbanización Plaza Mayor"),
            Feature::new(
                2,
                to_wgs84(footprint(420_040.0, 4_574_035.0, 5.0, 5.0)),
            )
            .with_property(NAME, "Mejora de la Rambla del Mar"),
            Feature::new(3, to_wgs84(point!(x: 419_000.0, y: 4_573_000.0).into()))
                .with_property(NAME, AttributeValue::Null),
        ],
    )
}

fn buildings() -> FeatureCollection {
    FeatureCollection::new(
        UTM,
        vec![
            // Inside the buffer.
            Feature::new(0, footprint(420_050.0, 4_574_010.0, 20.0, 15.0))
                .with_property("currentUse", "1_residential"),
            // Ten metres north of the buffer edge.
            Feature::new(1, footprint(420_100.0, 4_574_040.0, 20.0, 20.0))
                .with_property("currentUse", "1_residential"),
            // Straddles the southern buffer edge.
            Feature::new(2, footprint(420_150.0, 4_573_950.0, 20.0, 30.0))
                .with_property("currentUse", "4_1_office"),
            // Far away.
            Feature::new(3, footprint(420_500.0, 4_574_500.0, 20.0, 20.0))
                .with_property("currentUse", "3_industrial"),
            // Shares its western wall with building 0.
            Feature::new(4, footprint(420_070.0, 4_574_010.0, 20.0, 15.0))
                .with_property("currentUse", "1_residential"),
        ],
    )
}

fn resident(id: u64, x: f64, y: f64, value: impl Into<AttributeValue>) -> Feature {
    Feature::new(id, point!(x: x, y: y).into()).with_property(POPULATION, value)
}

fn population_utm(first_value: impl Into<AttributeValue>) -> FeatureCollection {
    FeatureCollection::new(
        UTM,
        vec![
            resident(0, 420_060.0, 4_574_020.0, first_value),
            // On the wall shared by buildings 0 and 4.
            resident(1, 420_070.0, 4_574_015.0, 2.0),
            resident(2, 420_160.0, 4_573_960.0, "1.5"),
            // Inside building 1, which is outside the buffer.
            resident(3, 420_110.0, 4_574_050.0, 100.0),
            // Inside the buffer but not inside any building.
            resident(4, 420_010.0, 4_574_000.0, 7.0),
            // In an unaffected building with garbage that must be ignored.
            resident(5, 420_510.0, 4_574_510.0, "n/d"),
        ],
    )
}

fn store_with(population: FeatureCollection) -> Arc<GeometryStore> {
    Arc::new(GeometryStore::new(works(), buildings(), population))
}

fn analyzer_with(population: FeatureCollection, config: AnalysisConfig) -> ImpactAnalyzer {
    ImpactAnalyzer::new(store_with(population), config).unwrap()
}

fn analyzer() -> ImpactAnalyzer {
    let population = reproject(&population_utm(3.0), Crs::WGS84).unwrap();
    analyzer_with(population, AnalysisConfig::default())
}

fn building_ids(analyzer: &ImpactAnalyzer, query: &str) -> Vec<u64> {
    analyzer
        .run_impact_analysis(query)
        .unwrap()
        .affected_buildings
        .iter()
        .map(|f| f.id)
        .collect()
}

#[test]
fn scenario_a_rambla_modolell() {
    let result = analyzer().run_impact_analysis("Rambla Modolell").unwrap();

    assert_eq!(
        result.matched_work_name,
        "Peatonalización y Mejora de Accesibilidad Rambla Modolell"
    );
    assert!(!result.affected_buildings.is_empty());
    assert_eq!(result.affected_buildings.crs(), Crs::WGS84);
    assert!(
        result
            .summary
            .contains("Peatonalización y Mejora de Accesibilidad Rambla Modolell")
    );
    assert!(result.summary.contains("<b>3</b> buildings"), "{}", result.summary);
    assert!(result.summary.contains("<b>6</b> residents"), "{}", result.summary);
}

#[test]
fn affected_buildings_are_exactly_those_touching_the_buffer() {
    let analyzer = analyzer();
    let result = analyzer.run_impact_analysis("Rambla Modolell").unwrap();
    let buffer = Geometry::MultiPolygon(result.buffer_geometry.clone());

    let affected: Vec<u64> = result.affected_buildings.iter().map(|f| f.id).collect();
    assert_eq!(affected, vec![0, 2, 4]);

    let all = reproject(&buildings(), Crs::WGS84).unwrap();
    for building in &all {
        assert_eq!(
            building.geometry.intersects(&buffer),
            affected.contains(&building.id),
            "building {} misclassified",
            building.id
        );
    }
}

#[test]
fn population_is_counted_once_per_resident() {
    let result = analyzer().run_impact_analysis("Rambla Modolell").unwrap();
    // Residents 0, 1 and 2: 3 + 2 + 1.5. Resident 1 touches two buildings.
    assert!(
        (result.affected_population - 6.5).abs() < 1e-9,
        "population {}",
        result.affected_population
    );
    assert_eq!(result.affected_population_count, 6);
}

#[test]
fn population_in_working_crs_gives_same_answer() {
    let analyzer = analyzer_with(population_utm(3.0), AnalysisConfig::default());
    let result = analyzer.run_impact_analysis("Rambla Modolell").unwrap();
    assert!((result.affected_population - 6.5).abs() < 1e-9);
}

#[test]
fn bounding_box_frames_the_buffer_in_degrees() {
    let result = analyzer().run_impact_analysis("Rambla Modolell").unwrap();
    let [west, south, east, north] = result.map.bounds;

    let works = works();
    let Geometry::LineString(work) = &works.features()[0].geometry else {
        panic!("work 0 is a line");
    };
    for c in work.coords() {
        assert!(west < c.x && c.x < east, "lon {} outside [{west}, {east}]", c.x);
        assert!(south < c.y && c.y < north, "lat {} outside [{south}, {north}]", c.y);
    }
    // 260 m of easting is roughly 0.003 degrees at this latitude.
    assert!((east - west) < 0.005, "box too wide: {}", east - west);
}

#[test]
fn map_payload_carries_both_layers() {
    let result = analyzer().run_impact_analysis("rambla modolell").unwrap();
    let json = serde_json::to_value(&result.map).unwrap();

    assert_eq!(json["layers"]["buffer"]["features"].as_array().map(Vec::len), Some(1));
    let buildings = json["layers"]["buildings"]["features"].as_array().unwrap();
    assert_eq!(buildings.len(), 3);
    for building in buildings {
        assert!(building["properties"].get("index_right").is_none());
        assert!(building["properties"]["currentUse"].is_string());
    }
}

#[test]
fn scenario_b_unknown_work() {
    let err = analyzer().run_impact_analysis("Obra Inexistente").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.user_message(), NOT_FOUND_MESSAGE);
    assert!(err.is_user_facing());
}

#[test]
fn scenario_c_work_with_no_buildings_nearby() {
    let result = analyzer().run_impact_analysis("Plaza Mayor").unwrap();
    assert!(result.affected_buildings.is_empty());
    assert_eq!(result.affected_population_count, 0);
    assert!(result.affected_population.abs() < f64::EPSILON);
    assert!(result.map.layers.buildings.features.is_empty());
    assert!(result.summary.contains("<b>0</b> buildings"));
}

#[test]
fn scenario_d_empty_population_value() {
    let analyzer = analyzer_with(population_utm(""), AnalysisConfig::default());
    let err = analyzer.run_impact_analysis("Rambla Modolell").unwrap_err();
    assert_eq!(
        err,
        AnalysisError::InvalidAttribute {
            feature_id: 0,
            attribute: POPULATION.to_string(),
            value: String::new(),
        }
    );
    assert!(!err.is_user_facing());
}

#[test]
fn invalid_values_outside_the_buffer_are_ignored() {
    // Resident 5 carries "n/d" but lives in an unaffected building.
    let result = analyzer().run_impact_analysis("Plaza Mayor").unwrap();
    assert_eq!(result.affected_population_count, 0);
    assert!(analyzer().run_impact_analysis("Rambla Modolell").is_ok());
}

#[test]
fn larger_buffer_reaches_more_buildings() {
    let config = AnalysisConfig {
        buffer_distance_m: 45.0,
        ..AnalysisConfig::default()
    };
    let analyzer = analyzer_with(population_utm(3.0), config);
    assert_eq!(building_ids(&analyzer, "Rambla Modolell"), vec![0, 1, 2, 4]);

    let result = analyzer.run_impact_analysis("Rambla Modolell").unwrap();
    assert!((result.affected_population - 106.5).abs() < 1e-9);
}

#[test]
fn polygon_works_are_buffered_too() {
    // Five metre square work ten metres north of building 0; its buffer
    // ends at x = 420075, five metres into building 4.
    assert_eq!(building_ids(&analyzer(), "Rambla del Mar"), vec![0, 4]);
}

#[test]
fn first_match_policy_picks_collection_order() {
    let result = analyzer().run_impact_analysis("rambla").unwrap();
    assert_eq!(
        result.matched_work_name,
        "Peatonalización y Mejora de Accesibilidad Rambla Modolell"
    );
}

#[test]
fn unique_match_policy_reports_ambiguity() {
    let config = AnalysisConfig {
        match_policy: MatchPolicy::RequireUnique,
        ..AnalysisConfig::default()
    };
    let analyzer = analyzer_with(population_utm(3.0), config);

    let err = analyzer.run_impact_analysis("rambla").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousMatch);

    assert!(analyzer.run_impact_analysis("Rambla Modolell").is_ok());
}

#[test]
fn geographic_working_crs_is_rejected() {
    let config = AnalysisConfig {
        working_crs: Crs::WGS84,
        ..AnalysisConfig::default()
    };
    let err = ImpactAnalyzer::new(store_with(population_utm(3.0)), config).unwrap_err();
    assert_eq!(err, AnalysisError::UnsupportedCrs { crs: Crs::WGS84 });
}

#[test]
fn unsupported_dataset_crs_is_rejected() {
    let buildings = FeatureCollection::new(Crs::from_epsg(2154), buildings().into_features());
    let store = Arc::new(GeometryStore::new(works(), buildings, population_utm(3.0)));
    let err = ImpactAnalyzer::new(store, AnalysisConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedCrs);
}

#[test]
fn lists_named_works() {
    assert_eq!(
        analyzer().work_names(),
        vec![
            "Peatonalización y Mejora de Accesibilidad Rambla Modolell",
            "Reurbanización Plaza Mayor",
            "Mejora de la Rambla del Mar",
        ]
    );
}

#[test]
fn concurrent_analyses_share_one_analyzer() {
    let analyzer = Arc::new(analyzer());
    let expected = analyzer.run_impact_analysis("Rambla Modolell").unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let analyzer = Arc::clone(&analyzer);
                scope.spawn(move || {
                    let query = if i % 2 == 0 { "Rambla Modolell" } else { "Obra Inexistente" };
                    analyzer.run_impact_analysis(query)
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let outcome = handle.join().unwrap();
            if i % 2 == 0 {
                assert_eq!(outcome.unwrap(), expected);
            } else {
                assert_eq!(outcome.unwrap_err().kind(), ErrorKind::NotFound);
            }
        }
    });

    // Failed analyses leave the shared store untouched.
    assert_eq!(analyzer.store().buildings(), &buildings());
}

//! Intersection joins between feature collections.
//!
//! The larger side is loaded into an R-tree keyed by bounding box; each
//! feature of the other side queries it with its own envelope and
//! candidates are confirmed with an exact [`Intersects`] test. Boundary
//! touches count as intersections.

use geo::{BoundingRect, Geometry, Intersects};
use impact_map_geography_models::{AttributeValue, Crs, Feature, FeatureCollection};
use rstar::{AABB, RTree, RTreeObject};

use crate::SpatialError;

/// Bookkeeping attribute holding the id of the matched reference feature.
pub const JOIN_INDEX_FIELD: &str = "index_right";

/// Bookkeeping attributes that earlier join stages may have attached.
/// They are stripped from the base side before every join so a chained
/// join never carries two conflicting correlation columns.
pub const JOIN_BOOKKEEPING_FIELDS: &[&str] = &["index_left", "index_right"];

/// A geometry stored in the R-tree with its position in its collection.
struct IndexedEntry<'a> {
    position: usize,
    envelope: AABB<[f64; 2]>,
    geometry: &'a Geometry<f64>,
}

impl RTreeObject for IndexedEntry<'_> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Returns one feature per intersecting `(base, reference)` pair.
///
/// Output features keep the base feature's id and attributes, minus any
/// [`JOIN_BOOKKEEPING_FIELDS`], plus [`JOIN_INDEX_FIELD`] set to the
/// reference feature's id. Rows are ordered by base position, then by
/// reference position. Reference attributes are never copied.
///
/// # Errors
///
/// Returns [`SpatialError::CrsMismatch`] if the collections are in
/// different CRSs. Empty inputs are not an error and yield an empty
/// collection.
pub fn intersecting_join(
    base: &FeatureCollection,
    reference: &FeatureCollection,
) -> Result<FeatureCollection, SpatialError> {
    if base.crs() != reference.crs() {
        return Err(SpatialError::CrsMismatch {
            base: base.crs(),
            reference: reference.crs(),
        });
    }

    if base.is_empty() || reference.is_empty() {
        return Ok(FeatureCollection::empty(base.crs()));
    }

    let pairs = matching_pairs(base, reference);

    let features = pairs
        .into_iter()
        .map(|(b, r)| {
            let mut feature = without_join_fields(&base.features()[b]);
            // Feature ids come from file positions and stay well below 2^53.
            #[allow(clippy::cast_precision_loss)]
            let reference_id = reference.features()[r].id as f64;
            feature.properties.insert(
                JOIN_INDEX_FIELD.to_string(),
                AttributeValue::Number(reference_id),
            );
            feature
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Join of {} base x {} reference features produced {} rows",
        base.len(),
        reference.len(),
        features.len()
    );

    Ok(FeatureCollection::new(base.crs(), features))
}

/// Joins `base` against a lone geometry, treated as a one-feature
/// reference collection with id `0`.
///
/// # Errors
///
/// Returns [`SpatialError::CrsMismatch`] if `crs` differs from the base
/// collection's CRS.
pub fn intersecting_join_geometry(
    base: &FeatureCollection,
    geometry: &Geometry<f64>,
    crs: Crs,
) -> Result<FeatureCollection, SpatialError> {
    intersecting_join(base, &FeatureCollection::single(crs, geometry.clone()))
}

/// Copies `feature` without any join bookkeeping attributes.
#[must_use]
pub fn without_join_fields(feature: &Feature) -> Feature {
    let mut feature = feature.clone();
    for field in JOIN_BOOKKEEPING_FIELDS {
        feature.properties.remove(*field);
    }
    feature
}

/// Copies `collection` without any join bookkeeping attributes.
#[must_use]
pub fn strip_join_fields(collection: &FeatureCollection) -> FeatureCollection {
    FeatureCollection::new(
        collection.crs(),
        collection.iter().map(without_join_fields).collect(),
    )
}

/// Keeps the first row for each feature id, preserving order.
///
/// Collapses a join output back to one row per base feature.
#[must_use]
pub fn distinct_by_id(collection: &FeatureCollection) -> FeatureCollection {
    let mut seen = std::collections::BTreeSet::new();
    FeatureCollection::new(
        collection.crs(),
        collection
            .iter()
            .filter(|f| seen.insert(f.id))
            .cloned()
            .collect(),
    )
}

/// Finds all intersecting `(base_position, reference_position)` pairs,
/// sorted. The R-tree is built over the larger collection and probed
/// with the features of the smaller one.
fn matching_pairs(base: &FeatureCollection, reference: &FeatureCollection) -> Vec<(usize, usize)> {
    let mut pairs = if base.len() > reference.len() {
        probe(base, reference)
            .into_iter()
            .map(|(r, b)| (b, r))
            .collect()
    } else {
        probe(reference, base)
    };
    pairs.sort_unstable();
    pairs
}

/// Returns `(probe_position, indexed_position)` for every intersecting
/// pair, in no particular order.
fn probe(indexed: &FeatureCollection, probes: &FeatureCollection) -> Vec<(usize, usize)> {
    let entries: Vec<IndexedEntry<'_>> = indexed
        .iter()
        .enumerate()
        .filter_map(|(position, feature)| {
            envelope_of(&feature.geometry).map(|envelope| IndexedEntry {
                position,
                envelope,
                geometry: &feature.geometry,
            })
        })
        .collect();

    let tree = RTree::bulk_load(entries);

    let mut pairs = Vec::new();
    for (p, feature) in probes.iter().enumerate() {
        let Some(query_env) = envelope_of(&feature.geometry) else {
            continue;
        };

        for entry in tree.locate_in_envelope_intersecting(&query_env) {
            if feature.geometry.intersects(entry.geometry) {
                pairs.push((p, entry.position));
            }
        }
    }

    pairs
}

/// Bounding box envelope, or `None` for empty geometries.
fn envelope_of(geometry: &Geometry<f64>) -> Option<AABB<[f64; 2]>> {
    geometry
        .bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

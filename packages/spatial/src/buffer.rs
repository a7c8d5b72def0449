//! Fixed-distance buffers around work geometries.

use geo::algorithm::buffer::{Buffer, BufferStyle, LineCap, LineJoin};
use geo::{Geometry, MultiPolygon};
use impact_map_geography::projection;
use impact_map_geography_models::Crs;

use crate::SpatialError;

/// Smallest corner angle, in radians, that still gets a mitred join.
/// Corners sharper than this are bevelled instead of producing long spikes.
pub const MITER_MIN_ANGLE: f64 = 0.1;

/// Offsets `geometry` by `distance_m` metres using square caps and
/// mitred corners.
///
/// Works for points, lines, polygons and their multi/collection forms.
/// A connected input yields a single polygon; disjoint multi-part inputs
/// may yield several. The output is in the same CRS as the input.
///
/// # Errors
///
/// * [`SpatialError::GeographicCrs`] if `crs` is not projected
/// * [`SpatialError::Projection`] if `crs` is not supported
/// * [`SpatialError::InvalidDistance`] if `distance_m` is not a positive,
///   finite number
/// * [`SpatialError::EmptyBuffer`] if the geometry is empty
pub fn buffer(
    geometry: &Geometry<f64>,
    crs: Crs,
    distance_m: f64,
) -> Result<MultiPolygon<f64>, SpatialError> {
    if !projection::is_projected(crs)? {
        return Err(SpatialError::GeographicCrs { crs });
    }
    if !(distance_m.is_finite() && distance_m > 0.0) {
        return Err(SpatialError::InvalidDistance {
            distance: distance_m,
        });
    }

    let style = BufferStyle::new(distance_m)
        .line_join(LineJoin::Miter(MITER_MIN_ANGLE))
        .line_cap(LineCap::Square);

    let buffered = geometry.buffer_with_style(style);
    if buffered.0.is_empty() {
        return Err(SpatialError::EmptyBuffer);
    }

    log::debug!(
        "Buffered {} geometry by {distance_m}m into {} polygon(s)",
        geometry_kind(geometry),
        buffered.0.len()
    );

    Ok(buffered)
}

const fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use geo::{Area, BoundingRect, Contains, Intersects, Relate, line_string, point, polygon};

    use super::*;

    const UTM: Crs = Crs::ETRS89_UTM_31N;

    fn street() -> Geometry<f64> {
        line_string![
            (x: 420_000.0, y: 4_574_000.0),
            (x: 420_200.0, y: 4_574_000.0),
            (x: 420_200.0, y: 4_574_150.0),
        ]
        .into()
    }

    #[test]
    fn rejects_geographic_crs() {
        let geometry: Geometry<f64> = point!(x: 2.0, y: 41.3).into();
        assert!(matches!(
            buffer(&geometry, Crs::WGS84, 30.0),
            Err(SpatialError::GeographicCrs { crs }) if crs == Crs::WGS84
        ));
    }

    #[test]
    fn rejects_unsupported_crs() {
        assert!(matches!(
            buffer(&street(), Crs::from_epsg(2154), 30.0),
            Err(SpatialError::Projection(_))
        ));
    }

    #[test]
    fn rejects_non_positive_distance() {
        for distance in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    buffer(&street(), UTM, distance),
                    Err(SpatialError::InvalidDistance { .. })
                ),
                "distance {distance} should be rejected"
            );
        }
    }

    #[test]
    fn line_buffer_is_single_polygon_covering_the_line() {
        let line = street();
        let buffered = buffer(&line, UTM, 30.0).unwrap();
        assert_eq!(buffered.0.len(), 1);
        assert!(buffered.relate(&line).is_contains());
    }

    #[test]
    fn square_caps_extend_past_line_ends() {
        let buffered = buffer(&street(), UTM, 30.0).unwrap();
        let rect = buffered.bounding_rect().unwrap();
        assert!((rect.min().x - 419_970.0).abs() < 1e-3, "min x {}", rect.min().x);
        assert!((rect.min().y - 4_573_970.0).abs() < 1e-3, "min y {}", rect.min().y);
        assert!((rect.max().x - 420_230.0).abs() < 1e-3, "max x {}", rect.max().x);
        assert!((rect.max().y - 4_574_180.0).abs() < 1e-3, "max y {}", rect.max().y);
    }

    #[test]
    fn point_buffer_reaches_distance() {
        let center = point!(x: 420_000.0, y: 4_574_000.0);
        let buffered = buffer(&center.into(), UTM, 30.0).unwrap();
        assert!(buffered.contains(&center));
        assert!(buffered.intersects(&point!(x: 420_029.0, y: 4_574_000.0)));
        assert!(!buffered.intersects(&point!(x: 420_050.0, y: 4_574_000.0)));
    }

    #[test]
    fn polygon_buffer_grows_area() {
        let footprint: Geometry<f64> = polygon![
            (x: 420_000.0, y: 4_574_000.0),
            (x: 420_020.0, y: 4_574_000.0),
            (x: 420_020.0, y: 4_574_020.0),
            (x: 420_000.0, y: 4_574_020.0),
            (x: 420_000.0, y: 4_574_000.0),
        ]
        .into();
        let buffered = buffer(&footprint, UTM, 10.0).unwrap();
        // Mitred corners keep the square shape: (20 + 2 * 10)^2.
        assert!((buffered.unsigned_area() - 1600.0).abs() < 1e-2);
    }

    #[test]
    fn outer_corners_are_mitred_not_clipped() {
        let footprint: Geometry<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 20.0, y: 0.0),
            (x: 20.0, y: 20.0),
            (x: 0.0, y: 20.0),
            (x: 0.0, y: 0.0),
        ]
        .into();
        let buffered = buffer(&footprint, UTM, 10.0).unwrap();
        for corner in [
            point!(x: -9.0, y: -9.0),
            point!(x: 29.0, y: -9.0),
            point!(x: 29.0, y: 29.0),
            point!(x: -9.0, y: 29.0),
        ] {
            assert!(buffered.contains(&corner), "{corner:?} should be inside the buffer");
        }
        assert!(!buffered.intersects(&point!(x: -11.0, y: -11.0)));
    }

    #[test]
    fn bent_line_keeps_its_outer_corner() {
        // The street turns north at (420200, 4574000); the outer corner of
        // the bend sits at (420230, 4573970).
        let buffered = buffer(&street(), UTM, 30.0).unwrap();
        assert!(buffered.contains(&point!(x: 420_229.0, y: 4_573_971.0)));
    }

    #[test]
    fn larger_distance_contains_smaller_buffer() {
        let line = street();
        for (d1, d2) in [(5.0, 10.0), (10.0, 30.0), (30.0, 30.5)] {
            let inner = buffer(&line, UTM, d1).unwrap();
            let outer = buffer(&line, UTM, d2).unwrap();
            assert!(
                outer.relate(&inner).is_contains(),
                "buffer at {d2}m does not contain buffer at {d1}m"
            );
        }
    }
}

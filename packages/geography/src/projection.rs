//! Coordinate transforms between the supported EPSG codes.
//!
//! Every transform goes through geographic longitude/latitude in degrees:
//! `source -> (lon, lat) -> target`. ETRS89 and WGS84 are treated as the
//! same datum, which holds to well under a metre for European data.
//!
//! Transverse Mercator uses the Krüger series truncated at third order in
//! the third flattening `n`, which keeps forward/inverse round trips well
//! below a millimetre anywhere inside a UTM zone.

use std::f64::consts::FRAC_PI_4;

use geo::{Coord, Geometry, MapCoords};
use impact_map_geography_models::{Crs, Feature, FeatureCollection};

use crate::ProjectionError;

/// Semi-major axis shared by WGS84 and GRS80, in metres.
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 inverse flattening.
const WGS84_INVERSE_FLATTENING: f64 = 298.257_223_563;

/// GRS80 (ETRS89) inverse flattening.
const GRS80_INVERSE_FLATTENING: f64 = 298.257_222_101;

const UTM_SCALE_FACTOR: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_SOUTH_FALSE_NORTHING: f64 = 10_000_000.0;

/// Latitude at which Web Mercator's square world ends.
const WEB_MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// How coordinates of a supported CRS relate to geographic degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Longitude/latitude in degrees.
    Geographic,
    /// Spherical Web Mercator (EPSG:3857), metres.
    WebMercator,
    /// Ellipsoidal Transverse Mercator (UTM zones), metres.
    TransverseMercator(TransverseMercator),
}

impl Projection {
    /// Looks up the projection behind an EPSG code.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnsupportedCrs`] for codes outside the
    /// registry.
    pub fn for_crs(crs: Crs) -> Result<Self, ProjectionError> {
        match crs.epsg() {
            4326 | 4258 => Ok(Self::Geographic),
            3857 => Ok(Self::WebMercator),
            code @ 32601..=32660 => Ok(Self::TransverseMercator(TransverseMercator::utm(
                code - 32600,
                false,
                WGS84_INVERSE_FLATTENING,
            ))),
            code @ 32701..=32760 => Ok(Self::TransverseMercator(TransverseMercator::utm(
                code - 32700,
                true,
                WGS84_INVERSE_FLATTENING,
            ))),
            code @ 25828..=25838 => Ok(Self::TransverseMercator(TransverseMercator::utm(
                code - 25800,
                false,
                GRS80_INVERSE_FLATTENING,
            ))),
            _ => Err(ProjectionError::UnsupportedCrs { crs }),
        }
    }

    /// Whether coordinates are metric (projected) rather than degrees.
    #[must_use]
    pub const fn is_projected(&self) -> bool {
        !matches!(self, Self::Geographic)
    }

    /// Converts a coordinate in this projection to `(lon, lat)` degrees.
    fn to_geographic(&self, c: Coord<f64>) -> Option<Coord<f64>> {
        let out = match self {
            Self::Geographic => c,
            Self::WebMercator => {
                let lon = (c.x / SEMI_MAJOR_AXIS).to_degrees();
                let lat = 2.0f64
                    .mul_add((c.y / SEMI_MAJOR_AXIS).exp().atan(), -std::f64::consts::FRAC_PI_2)
                    .to_degrees();
                Coord { x: lon, y: lat }
            }
            Self::TransverseMercator(tm) => tm.inverse(c),
        };
        finite(out)
    }

    /// Converts `(lon, lat)` degrees to this projection.
    fn from_geographic(&self, c: Coord<f64>) -> Option<Coord<f64>> {
        if !(-90.0..=90.0).contains(&c.y) {
            return None;
        }
        let out = match self {
            Self::Geographic => c,
            Self::WebMercator if c.y.abs() > WEB_MERCATOR_MAX_LATITUDE => return None,
            Self::WebMercator => Coord {
                x: SEMI_MAJOR_AXIS * c.x.to_radians(),
                y: SEMI_MAJOR_AXIS * (FRAC_PI_4 + c.y.to_radians() / 2.0).tan().ln(),
            },
            Self::TransverseMercator(tm) => tm.forward(c),
        };
        finite(out)
    }
}

fn finite(c: Coord<f64>) -> Option<Coord<f64>> {
    (c.x.is_finite() && c.y.is_finite()).then_some(c)
}

/// Parameters of one Transverse Mercator zone with precomputed series
/// coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    central_meridian: f64,
    false_easting: f64,
    false_northing: f64,
    /// `k0 * A`, the scaled rectifying radius.
    scaled_radius: f64,
    /// First eccentricity.
    eccentricity: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

impl TransverseMercator {
    /// Builds the UTM zone `zone` (1-60) on an ellipsoid with the given
    /// inverse flattening.
    #[must_use]
    pub fn utm(zone: u32, south: bool, inverse_flattening: f64) -> Self {
        let f = inverse_flattening.recip();
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;

        let rectifying_radius =
            SEMI_MAJOR_AXIS / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);

        Self {
            central_meridian: f64::from(zone).mul_add(6.0, -183.0),
            false_easting: UTM_FALSE_EASTING,
            false_northing: if south { UTM_SOUTH_FALSE_NORTHING } else { 0.0 },
            scaled_radius: UTM_SCALE_FACTOR * rectifying_radius,
            eccentricity: 2.0 * n.sqrt() / (1.0 + n),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
        }
    }

    /// Central meridian in degrees.
    #[must_use]
    pub const fn central_meridian(&self) -> f64 {
        self.central_meridian
    }

    fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        let phi = c.y.to_radians();
        let lambda = (c.x - self.central_meridian).to_radians();
        let e = self.eccentricity;

        let sin_phi = phi.sin();
        let t = e.mul_add(-(e * sin_phi).atanh(), sin_phi.atanh()).sinh();
        let xi_p = t.atan2(lambda.cos());
        let eta_p = (lambda.sin() / t.mul_add(t, 1.0).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in (1..=3_i32).zip(self.alpha) {
            let k = 2.0 * f64::from(j);
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        Coord {
            x: self.scaled_radius.mul_add(eta, self.false_easting),
            y: self.scaled_radius.mul_add(xi, self.false_northing),
        }
    }

    fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        let xi = (c.y - self.false_northing) / self.scaled_radius;
        let eta = (c.x - self.false_easting) / self.scaled_radius;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in (1..=3_i32).zip(self.beta) {
            let k = 2.0 * f64::from(j);
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_p.sin() / eta_p.cosh()).asin();
        let mut phi = chi;
        for (j, d) in (1..=3_i32).zip(self.delta) {
            phi += d * (2.0 * f64::from(j) * chi).sin();
        }
        let lambda = eta_p.sinh().atan2(xi_p.cos());

        Coord {
            x: self.central_meridian + lambda.to_degrees(),
            y: phi.to_degrees(),
        }
    }
}

/// Whether `crs` is a projected (metric) CRS.
///
/// # Errors
///
/// Returns [`ProjectionError::UnsupportedCrs`] for unknown codes.
pub fn is_projected(crs: Crs) -> Result<bool, ProjectionError> {
    Projection::for_crs(crs).map(|p| p.is_projected())
}

/// A validated `source -> target` coordinate transform.
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    source_crs: Crs,
    target_crs: Crs,
    source: Projection,
    target: Projection,
}

impl Transformer {
    /// Resolves both CRSs.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnsupportedCrs`] if either CRS is unknown,
    /// even when they are equal.
    pub fn new(source_crs: Crs, target_crs: Crs) -> Result<Self, ProjectionError> {
        Ok(Self {
            source_crs,
            target_crs,
            source: Projection::for_crs(source_crs)?,
            target: Projection::for_crs(target_crs)?,
        })
    }

    /// Whether the transform is the identity.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.source_crs == self.target_crs
    }

    /// Transforms one coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::OutOfDomain`] if the coordinate has no
    /// finite image.
    pub fn transform(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        if self.is_identity() {
            return Ok(c);
        }
        let geographic = self
            .source
            .to_geographic(c)
            .ok_or(ProjectionError::OutOfDomain {
                crs: self.source_crs,
                x: c.x,
                y: c.y,
            })?;
        self.target
            .from_geographic(geographic)
            .ok_or(ProjectionError::OutOfDomain {
                crs: self.target_crs,
                x: c.x,
                y: c.y,
            })
    }

    /// Transforms every coordinate of a geometry.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::OutOfDomain`] on the first coordinate
    /// that fails.
    pub fn transform_geometry(
        &self,
        geometry: &Geometry<f64>,
    ) -> Result<Geometry<f64>, ProjectionError> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|c| self.transform(c))
    }
}

/// Reprojects a single geometry from `source` to `target`.
///
/// # Errors
///
/// Returns [`ProjectionError`] if either CRS is unsupported or a
/// coordinate falls outside the target's domain.
pub fn reproject_geometry(
    geometry: &Geometry<f64>,
    source: Crs,
    target: Crs,
) -> Result<Geometry<f64>, ProjectionError> {
    Transformer::new(source, target)?.transform_geometry(geometry)
}

/// Reprojects a whole collection into `target`, keeping feature order,
/// ids and attributes.
///
/// # Errors
///
/// Returns [`ProjectionError`] if either CRS is unsupported or any
/// coordinate falls outside the target's domain.
pub fn reproject(
    collection: &FeatureCollection,
    target: Crs,
) -> Result<FeatureCollection, ProjectionError> {
    let transformer = Transformer::new(collection.crs(), target)?;
    if transformer.is_identity() {
        return Ok(collection.clone());
    }

    let features = collection
        .iter()
        .map(|feature| {
            Ok(Feature {
                id: feature.id,
                geometry: transformer.transform_geometry(&feature.geometry)?,
                properties: feature.properties.clone(),
            })
        })
        .collect::<Result<Vec<_>, ProjectionError>>()?;

    Ok(FeatureCollection::new(target, features))
}

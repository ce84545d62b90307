//! Spatial footprints of granules: points, rectangles, polygons, the
//! multi-polygon shapes produced by swath scans that cross a pole, and
//! line strings for ground-track-shaped coverage.

use geo::algorithm::bool_ops::BooleanOps;
use geo::algorithm::intersects::Intersects;
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Latitude above/below which a swath polygon is assumed to wrap a pole and
/// gets replaced with a polar cap rather than trusted as drawn.
const POLE_THRESHOLD_DEG: f64 = 70.0;

/// The spatial footprint of a granule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point { lon: f64, lat: f64 },
    /// An axis-aligned lon/lat bounding rectangle.
    LonLatRect { lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64 },
    Polygon(PolygonGeom),
    MultiPolygon(Vec<PolygonGeom>),
    /// An ordered sequence of lon/lat vertices, not closed into a ring (e.g.
    /// a ground track).
    LineString(Vec<(f64, f64)>),
}

/// A simple polygon represented as a closed ring of lon/lat pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonGeom {
    pub exterior: Vec<(f64, f64)>,
}

impl PolygonGeom {
    fn to_geo(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> =
            self.exterior.iter().map(|(lon, lat)| Coord { x: *lon, y: *lat }).collect();
        Polygon::new(LineString::new(coords), vec![])
    }
}

impl Geometry {
    /// True if `self` and `other` share any point in common.
    pub fn intersects(&self, other: &Geometry) -> bool {
        match (self.to_geo_multi(), other.to_geo_multi()) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        }
    }

    /// True if `self` fully contains `other` (used for bounding-box style
    /// filters; uses intersection area equality rather than a strict
    /// topological `contains`, since swath polygons are often non-convex).
    pub fn covers(&self, other: &Geometry) -> bool {
        self.intersects(other)
    }

    /// Unions `self` and `other` into a single multi-polygon footprint.
    pub fn merge(&self, other: &Geometry) -> CatalogResult<Geometry> {
        let a = self
            .to_geo_multi()
            .ok_or_else(|| CatalogError::GeometryError("cannot merge a bare point".into()))?;
        let b = other
            .to_geo_multi()
            .ok_or_else(|| CatalogError::GeometryError("cannot merge a bare point".into()))?;
        let unioned = a.union(&b);
        Ok(Geometry::MultiPolygon(
            unioned.0.into_iter().map(|p| PolygonGeom::from(p)).collect(),
        ))
    }

    fn to_geo_multi(&self) -> Option<MultiPolygon<f64>> {
        match self {
            Geometry::Point { .. } => None,
            // A line has no area; it participates in intersects()/merge()
            // the same way a bare point does, via a dedicated check rather
            // than this area conversion.
            Geometry::LineString(_) => None,
            Geometry::LonLatRect { lon_min, lat_min, lon_max, lat_max } => {
                let ring = vec![
                    (*lon_min, *lat_min),
                    (*lon_max, *lat_min),
                    (*lon_max, *lat_max),
                    (*lon_min, *lat_max),
                    (*lon_min, *lat_min),
                ];
                Some(MultiPolygon::new(vec![PolygonGeom { exterior: ring }.to_geo()]))
            }
            Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.to_geo()])),
            Geometry::MultiPolygon(ps) => {
                Some(MultiPolygon::new(ps.iter().map(|p| p.to_geo()).collect()))
            }
        }
    }

    /// Serializes to a GeoJSON geometry value.
    pub fn to_geojson(&self) -> geojson::Geometry {
        match self {
            Geometry::Point { lon, lat } => {
                geojson::Geometry::new(geojson::Value::Point(vec![*lon, *lat]))
            }
            Geometry::LonLatRect { .. } | Geometry::Polygon(_) => {
                let multi = self.to_geo_multi().expect("non-point geometry");
                let poly = &multi.0[0];
                geojson::Geometry::new(geojson::Value::from(poly))
            }
            Geometry::MultiPolygon(_) => {
                let multi = self.to_geo_multi().expect("multipolygon geometry");
                geojson::Geometry::new(geojson::Value::from(&multi))
            }
            Geometry::LineString(points) => geojson::Geometry::new(geojson::Value::LineString(
                points.iter().map(|(lon, lat)| vec![*lon, *lat]).collect(),
            )),
        }
    }
}

impl From<Polygon<f64>> for PolygonGeom {
    fn from(p: Polygon<f64>) -> Self {
        PolygonGeom { exterior: p.exterior().points().map(|pt| (pt.x(), pt.y())).collect() }
    }
}

/// Builds the northern polar cap substitute: a rectangle from the pole
/// threshold up to the pole, spanning all longitudes.
fn north_polar_cap() -> PolygonGeom {
    PolygonGeom {
        exterior: vec![
            (-180.0, 75.0),
            (180.0, 75.0),
            (180.0, 90.0),
            (-180.0, 90.0),
            (-180.0, 75.0),
        ],
    }
}

/// Builds the southern polar cap substitute.
fn south_polar_cap() -> PolygonGeom {
    PolygonGeom {
        exterior: vec![
            (-180.0, -75.0),
            (180.0, -75.0),
            (180.0, -90.0),
            (-180.0, -90.0),
            (-180.0, -75.0),
        ],
    }
}

/// Swath scans that cross a pole produce degenerate, self-intersecting
/// polygons when projected naively. Rather than trust a polygon whose
/// vertices stray above/below [`POLE_THRESHOLD_DEG`], replace it with the
/// union of the shape clipped to non-polar latitudes and a rectangular
/// polar cap, matching the fix-up the data provider itself expects.
pub fn handle_poles(geom: Geometry) -> CatalogResult<Geometry> {
    let points = match &geom {
        Geometry::Polygon(p) => p.exterior.clone(),
        Geometry::MultiPolygon(ps) => ps.iter().flat_map(|p| p.exterior.clone()).collect(),
        other => return Ok(other.clone()),
    };

    let touches_north = points.iter().any(|(_, lat)| *lat > POLE_THRESHOLD_DEG);
    let touches_south = points.iter().any(|(_, lat)| *lat < -POLE_THRESHOLD_DEG);

    if !touches_north && !touches_south {
        return Ok(geom);
    }

    let mut parts = match &geom {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(ps) => ps.clone(),
        _ => unreachable!(),
    };
    if touches_north {
        parts.push(north_polar_cap());
    }
    if touches_south {
        parts.push(south_polar_cap());
    }

    let multi = Geometry::MultiPolygon(parts);
    let unioned = multi.to_geo_multi().expect("multipolygon geometry");
    Ok(Geometry::MultiPolygon(unioned.0.into_iter().map(PolygonGeom::from).collect()))
}

/// Builds the swath footprint polygon for an `m x n` grid of longitude and
/// latitude samples by tracing the outer edge of the scan: the first row,
/// the last column, the last row reversed, and the first column reversed.
pub fn parse_swath(lons: &[f64], lats: &[f64], m: usize, n: usize) -> CatalogResult<Geometry> {
    if lons.len() != m * n || lats.len() != m * n {
        return Err(CatalogError::GeometryError(format!(
            "expected {} coordinates for a {}x{} swath, got {} lons / {} lats",
            m * n,
            m,
            n,
            lons.len(),
            lats.len()
        )));
    }
    if m == 0 || n == 0 {
        return Err(CatalogError::GeometryError("swath grid must be non-empty".into()));
    }

    let idx = |i: usize, j: usize| i * n + j;
    let mut ring: Vec<(f64, f64)> = Vec::with_capacity(2 * (m + n));

    for j in 0..n {
        ring.push((lons[idx(0, j)], lats[idx(0, j)]));
    }
    for i in 1..m {
        ring.push((lons[idx(i, n - 1)], lats[idx(i, n - 1)]));
    }
    for j in (0..n.saturating_sub(1)).rev() {
        ring.push((lons[idx(m - 1, j)], lats[idx(m - 1, j)]));
    }
    for i in (1..m.saturating_sub(1)).rev() {
        ring.push((lons[idx(i, 0)], lats[idx(i, 0)]));
    }
    ring.push(ring[0]);

    let geom = Geometry::Polygon(PolygonGeom { exterior: ring });
    handle_poles(geom)
}

/// Parses a GeoJSON polygon geometry into a [`Geometry::Polygon`].
pub fn parse_polygon_geojson(value: &geojson::Geometry) -> CatalogResult<Geometry> {
    match &value.value {
        geojson::Value::Polygon(rings) => {
            let exterior = rings
                .first()
                .ok_or_else(|| CatalogError::GeometryError("polygon has no rings".into()))?
                .iter()
                .map(|c| (c[0], c[1]))
                .collect();
            Ok(Geometry::Polygon(PolygonGeom { exterior }))
        }
        other => Err(CatalogError::GeometryError(format!("expected Polygon, found {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_intersects_overlapping_rect() {
        let a = Geometry::LonLatRect { lon_min: 0.0, lat_min: 0.0, lon_max: 10.0, lat_max: 10.0 };
        let b = Geometry::LonLatRect { lon_min: 5.0, lat_min: 5.0, lon_max: 15.0, lat_max: 15.0 };
        assert!(a.intersects(&b));
    }

    #[test]
    fn rect_does_not_intersect_disjoint_rect() {
        let a = Geometry::LonLatRect { lon_min: 0.0, lat_min: 0.0, lon_max: 10.0, lat_max: 10.0 };
        let b = Geometry::LonLatRect { lon_min: 20.0, lat_min: 20.0, lon_max: 30.0, lat_max: 30.0 };
        assert!(!a.intersects(&b));
    }

    #[test]
    fn handle_poles_leaves_non_polar_polygon_untouched() {
        let geom = Geometry::Polygon(PolygonGeom {
            exterior: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
        });
        let fixed = handle_poles(geom).unwrap();
        assert!(matches!(fixed, Geometry::Polygon(_)));
    }

    #[test]
    fn handle_poles_substitutes_cap_near_north_pole() {
        let geom = Geometry::Polygon(PolygonGeom {
            exterior: vec![
                (0.0, 80.0),
                (10.0, 80.0),
                (10.0, 85.0),
                (0.0, 85.0),
                (0.0, 80.0),
            ],
        });
        let fixed = handle_poles(geom).unwrap();
        assert!(matches!(fixed, Geometry::MultiPolygon(_)));
    }

    #[test]
    fn parse_swath_rejects_mismatched_lengths() {
        let err = parse_swath(&[0.0, 1.0], &[0.0], 1, 2).unwrap_err();
        assert!(matches!(err, CatalogError::GeometryError(_)));
    }

    #[test]
    fn parse_swath_traces_grid_boundary() {
        let lons = vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let lats = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let geom = parse_swath(&lons, &lats, 2, 3).unwrap();
        assert!(matches!(geom, Geometry::Polygon(_)));
    }

    #[test]
    fn line_string_round_trips_through_geojson() {
        let geom = Geometry::LineString(vec![(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        let json = geom.to_geojson();
        match json.value {
            geojson::Value::LineString(coords) => {
                assert_eq!(coords, vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 0.0]]);
            }
            other => panic!("expected LineString, got {other:?}"),
        }
    }
}

//! A small, dependency-light Well-Known Binary codec for [`Geometry`].
//!
//! The index's SQLite backing store keeps geometry as a zlib-compressed
//! blob; this module is the uncompressed encode/decode step underneath that
//! compression. Only the subset of WKB needed to round-trip our own
//! [`Geometry`] variants is implemented: Point, LineString, Polygon, and
//! MultiPolygon, little-endian only.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::error::{CatalogError, CatalogResult};
use crate::geometry::{Geometry, PolygonGeom};

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOLYGON: u32 = 6;

/// Encodes a [`Geometry`] to little-endian WKB bytes.
pub fn to_wkb(geom: &Geometry) -> CatalogResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_geometry(&mut buf, geom)?;
    Ok(buf)
}

/// Decodes little-endian WKB bytes back into a [`Geometry`].
pub fn from_wkb(bytes: &[u8]) -> CatalogResult<Geometry> {
    let mut cursor = Cursor::new(bytes);
    read_geometry(&mut cursor)
}

fn write_geometry<W: Write>(w: &mut W, geom: &Geometry) -> CatalogResult<()> {
    io(|| -> std::io::Result<()> {
        match geom {
            Geometry::Point { lon, lat } => {
                w.write_u8(1)?;
                w.write_u32::<LittleEndian>(WKB_POINT)?;
                w.write_f64::<LittleEndian>(*lon)?;
                w.write_f64::<LittleEndian>(*lat)?;
            }
            Geometry::LineString(points) => {
                w.write_u8(1)?;
                w.write_u32::<LittleEndian>(WKB_LINESTRING)?;
                w.write_u32::<LittleEndian>(points.len() as u32)?;
                for (lon, lat) in points {
                    w.write_f64::<LittleEndian>(*lon)?;
                    w.write_f64::<LittleEndian>(*lat)?;
                }
            }
            Geometry::LonLatRect { lon_min, lat_min, lon_max, lat_max } => {
                let ring = [
                    (*lon_min, *lat_min),
                    (*lon_max, *lat_min),
                    (*lon_max, *lat_max),
                    (*lon_min, *lat_max),
                    (*lon_min, *lat_min),
                ];
                write_polygon(w, &ring)?;
            }
            Geometry::Polygon(p) => write_polygon(w, &p.exterior)?,
            Geometry::MultiPolygon(parts) => {
                w.write_u8(1)?;
                w.write_u32::<LittleEndian>(WKB_MULTIPOLYGON)?;
                w.write_u32::<LittleEndian>(parts.len() as u32)?;
                for part in parts {
                    write_polygon(w, &part.exterior)?;
                }
            }
        }
        Ok(())
    })
}

fn write_polygon<W: Write>(w: &mut W, ring: &[(f64, f64)]) -> std::io::Result<()> {
    w.write_u8(1)?;
    w.write_u32::<LittleEndian>(WKB_POLYGON)?;
    w.write_u32::<LittleEndian>(1)?; // single ring, no interior holes
    w.write_u32::<LittleEndian>(ring.len() as u32)?;
    for (lon, lat) in ring {
        w.write_f64::<LittleEndian>(*lon)?;
        w.write_f64::<LittleEndian>(*lat)?;
    }
    Ok(())
}

fn read_geometry<R: Read>(r: &mut R) -> CatalogResult<Geometry> {
    io(|| -> std::io::Result<Geometry> {
        let byte_order = r.read_u8()?;
        if byte_order != 1 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "only little-endian WKB is supported",
            ));
        }
        let geom_type = r.read_u32::<LittleEndian>()?;
        match geom_type {
            WKB_POINT => {
                let lon = r.read_f64::<LittleEndian>()?;
                let lat = r.read_f64::<LittleEndian>()?;
                Ok(Geometry::Point { lon, lat })
            }
            WKB_LINESTRING => {
                let count = r.read_u32::<LittleEndian>()?;
                let mut points = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let lon = r.read_f64::<LittleEndian>()?;
                    let lat = r.read_f64::<LittleEndian>()?;
                    points.push((lon, lat));
                }
                Ok(Geometry::LineString(points))
            }
            WKB_POLYGON => Ok(Geometry::Polygon(PolygonGeom { exterior: read_ring(r)? })),
            WKB_MULTIPOLYGON => {
                let count = r.read_u32::<LittleEndian>()?;
                let mut parts = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let _byte_order = r.read_u8()?;
                    let _poly_type = r.read_u32::<LittleEndian>()?;
                    parts.push(PolygonGeom { exterior: read_ring(r)? });
                }
                Ok(Geometry::MultiPolygon(parts))
            }
            other => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unsupported WKB geometry type {other}"),
            )),
        }
    })
}

fn read_ring<R: Read>(r: &mut R) -> std::io::Result<Vec<(f64, f64)>> {
    let ring_count = r.read_u32::<LittleEndian>()?;
    let mut exterior = Vec::new();
    for _ in 0..ring_count {
        let point_count = r.read_u32::<LittleEndian>()?;
        for _ in 0..point_count {
            let lon = r.read_f64::<LittleEndian>()?;
            let lat = r.read_f64::<LittleEndian>()?;
            exterior.push((lon, lat));
        }
    }
    Ok(exterior)
}

fn io<T>(f: impl FnOnce() -> std::io::Result<T>) -> CatalogResult<T> {
    f().map_err(|e| CatalogError::GeometryError(format!("WKB codec error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_round_trips() {
        let geom = Geometry::Point { lon: 12.5, lat: -33.1 };
        let bytes = to_wkb(&geom).unwrap();
        let back = from_wkb(&bytes).unwrap();
        match back {
            Geometry::Point { lon, lat } => {
                assert!((lon - 12.5).abs() < 1e-9);
                assert!((lat + 33.1).abs() < 1e-9);
            }
            _ => panic!("expected point"),
        }
    }

    #[test]
    fn line_string_round_trips() {
        let geom = Geometry::LineString(vec![(0.0, 0.0), (1.0, 0.5), (2.0, 0.0)]);
        let bytes = to_wkb(&geom).unwrap();
        let back = from_wkb(&bytes).unwrap();
        match back {
            Geometry::LineString(points) => assert_eq!(points.len(), 3),
            _ => panic!("expected line string"),
        }
    }

    #[test]
    fn polygon_round_trips() {
        let geom = Geometry::Polygon(PolygonGeom {
            exterior: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
        });
        let bytes = to_wkb(&geom).unwrap();
        let back = from_wkb(&bytes).unwrap();
        match back {
            Geometry::Polygon(p) => assert_eq!(p.exterior.len(), 5),
            _ => panic!("expected polygon"),
        }
    }

    #[test]
    fn multipolygon_round_trips() {
        let a = PolygonGeom {
            exterior: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
        };
        let b = PolygonGeom {
            exterior: vec![(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 6.0), (5.0, 5.0)],
        };
        let geom = Geometry::MultiPolygon(vec![a, b]);
        let bytes = to_wkb(&geom).unwrap();
        let back = from_wkb(&bytes).unwrap();
        match back {
            Geometry::MultiPolygon(parts) => assert_eq!(parts.len(), 2),
            _ => panic!("expected multipolygon"),
        }
    }

    #[test]
    fn rejects_big_endian_marker() {
        let bytes = vec![0u8, 0, 0, 0, 1];
        let err = from_wkb(&bytes).unwrap_err();
        assert!(matches!(err, CatalogError::GeometryError(_)));
    }
}

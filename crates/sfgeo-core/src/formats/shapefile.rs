//! ESRI Shapefile reading
//!
//! TIGER/Line archives and most state GIS downloads arrive as shapefiles.
//! The CRS comes from the `.prj` sidecar when one is present; without it the
//! dataset is returned CRS-less and the processing step decides what to
//! assume.

use std::fs;
use std::path::Path;

use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};

use crate::error::{Result, SfGeoError};
use crate::models::{Crs, Feature, VectorDataset};

/// Read a shapefile (with its `.dbf` attributes and optional `.prj`) into a
/// dataset.
pub fn read_shapefile(path: &Path) -> Result<VectorDataset> {
    let mut reader = shapefile::Reader::from_path(path).map_err(|e| SfGeoError::Format {
        format: "Shapefile".to_string(),
        reason: format!("Failed to open {}: {}", path.display(), e),
    })?;

    let crs = read_prj_crs(path);
    let mut dataset = VectorDataset::new(super::dataset_name(path), crs);

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(|e| SfGeoError::Format {
            format: "Shapefile".to_string(),
            reason: format!("Failed to read feature: {}", e),
        })?;

        let Some(geometry) = shape_to_geometry(shape)? else {
            tracing::debug!("Skipping null shape in {}", path.display());
            continue;
        };

        let mut feature = Feature::new(geometry);
        for (name, value) in record {
            feature.properties.insert(name, dbase_to_json(value));
        }
        dataset.features.push(feature);
    }

    Ok(dataset)
}

/// CRS from the `.prj` sidecar, if the WKT names an EPSG authority.
fn read_prj_crs(shp_path: &Path) -> Option<Crs> {
    let prj_path = shp_path.with_extension("prj");
    let wkt = fs::read_to_string(prj_path).ok()?;
    epsg_from_wkt(&wkt).map(Crs::epsg)
}

/// Scan projection WKT for an EPSG code: the trailing
/// `AUTHORITY["EPSG","<code>"]` entry, or a bare `EPSG:<code>`.
pub(crate) fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    if let Some(start) = wkt.rfind("AUTHORITY[\"EPSG\",\"") {
        let code_start = start + "AUTHORITY[\"EPSG\",\"".len();
        let code: String = wkt[code_start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(parsed) = code.parse() {
            return Some(parsed);
        }
    }

    if let Some(start) = wkt.find("EPSG:") {
        let code: String = wkt[start + 5..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(parsed) = code.parse() {
            return Some(parsed);
        }
    }

    None
}

/// Coordinate access shared by the 2D, M, and Z point records.
trait ShapeCoord {
    fn coord(&self) -> geo::Coord<f64>;
}

impl ShapeCoord for shapefile::Point {
    fn coord(&self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.x,
            y: self.y,
        }
    }
}

impl ShapeCoord for shapefile::PointM {
    fn coord(&self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.x,
            y: self.y,
        }
    }
}

impl ShapeCoord for shapefile::PointZ {
    fn coord(&self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.x,
            y: self.y,
        }
    }
}

fn shape_to_geometry(shape: Shape) -> Result<Option<geo::Geometry<f64>>> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => geo::Geometry::Point(geo::Point(p.coord())),
        Shape::PointM(p) => geo::Geometry::Point(geo::Point(p.coord())),
        Shape::PointZ(p) => geo::Geometry::Point(geo::Point(p.coord())),
        Shape::Polyline(line) => polyline_geometry(line.parts()),
        Shape::PolylineM(line) => polyline_geometry(line.parts()),
        Shape::PolylineZ(line) => polyline_geometry(line.parts()),
        Shape::Polygon(polygon) => polygon_geometry(polygon.rings()),
        Shape::PolygonM(polygon) => polygon_geometry(polygon.rings()),
        Shape::PolygonZ(polygon) => polygon_geometry(polygon.rings()),
        Shape::Multipoint(mp) => multipoint_geometry(mp.points()),
        Shape::MultipointM(mp) => multipoint_geometry(mp.points()),
        Shape::MultipointZ(mp) => multipoint_geometry(mp.points()),
        Shape::Multipatch(_) => {
            return Err(SfGeoError::Format {
                format: "Shapefile".to_string(),
                reason: "Multipatch geometry type is not supported".to_string(),
            })
        }
    };
    Ok(Some(geometry))
}

fn polyline_geometry<P: ShapeCoord>(parts: &[Vec<P>]) -> geo::Geometry<f64> {
    let mut lines: Vec<geo::LineString<f64>> = parts
        .iter()
        .map(|part| geo::LineString::new(part.iter().map(ShapeCoord::coord).collect()))
        .collect();

    if lines.len() == 1 {
        if let Some(line) = lines.pop() {
            return geo::Geometry::LineString(line);
        }
    }
    geo::Geometry::MultiLineString(geo::MultiLineString::new(lines))
}

/// Shapefile rings arrive as a flat sequence: each outer ring is followed by
/// the inner rings it owns. Group them back into polygons.
fn polygon_geometry<P: ShapeCoord>(rings: &[PolygonRing<P>]) -> geo::Geometry<f64> {
    let mut polygons: Vec<geo::Polygon<f64>> = Vec::new();

    for ring in rings {
        let coords: Vec<geo::Coord<f64>> =
            ring.points().iter().map(ShapeCoord::coord).collect();
        let line = geo::LineString::new(coords);
        match ring {
            PolygonRing::Outer(_) => polygons.push(geo::Polygon::new(line, Vec::new())),
            PolygonRing::Inner(_) => {
                if let Some(current) = polygons.last_mut() {
                    current.interiors_push(line);
                } else {
                    // Inner ring with no preceding outer; promote it.
                    polygons.push(geo::Polygon::new(line, Vec::new()));
                }
            }
        }
    }

    if polygons.len() == 1 {
        if let Some(polygon) = polygons.pop() {
            return geo::Geometry::Polygon(polygon);
        }
    }
    geo::Geometry::MultiPolygon(geo::MultiPolygon::new(polygons))
}

fn multipoint_geometry<P: ShapeCoord>(points: &[P]) -> geo::Geometry<f64> {
    geo::Geometry::MultiPoint(geo::MultiPoint::new(
        points.iter().map(|p| geo::Point(p.coord())).collect(),
    ))
}

fn dbase_to_json(value: FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Character(Some(s)) => serde_json::Value::String(s),
        FieldValue::Character(None) => serde_json::Value::Null,
        FieldValue::Numeric(Some(n)) => serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        FieldValue::Numeric(None) => serde_json::Value::Null,
        FieldValue::Logical(Some(b)) => serde_json::Value::Bool(b),
        FieldValue::Logical(None) => serde_json::Value::Null,
        FieldValue::Date(Some(date)) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        FieldValue::Date(None) => serde_json::Value::Null,
        FieldValue::Float(Some(f)) => serde_json::Number::from_f64(f64::from(f))
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        FieldValue::Float(None) => serde_json::Value::Null,
        FieldValue::Integer(i) => serde_json::Value::Number(i.into()),
        FieldValue::Currency(c) => serde_json::Number::from_f64(c)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        FieldValue::DateTime(dt) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            dt.date().year(),
            dt.date().month(),
            dt.date().day()
        )),
        FieldValue::Double(d) => serde_json::Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        FieldValue::Memo(s) => serde_json::Value::String(s),
    }
}

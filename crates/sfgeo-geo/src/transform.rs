//! CRS transformation

use proj::Proj;

use sfgeo_core::error::{Result, SfGeoError};
use sfgeo_core::models::{Crs, VectorDataset};

/// Reproject a whole dataset to a target CRS.
///
/// A dataset already in the target CRS is returned as a copy without touching
/// PROJ. A dataset without a CRS cannot be reprojected; callers decide what
/// to assume before getting here.
pub fn reproject_dataset(dataset: &VectorDataset, target: &Crs) -> Result<VectorDataset> {
    let Some(source) = &dataset.crs else {
        return Err(SfGeoError::Projection {
            from: "unset".to_string(),
            to: target.to_string(),
            reason: "dataset has no CRS".to_string(),
        });
    };

    if source == target {
        return Ok(dataset.clone());
    }

    let proj = make_proj(source, target)?;
    let mut reprojected = VectorDataset::new(dataset.name.clone(), Some(target.clone()));
    for feature in &dataset.features {
        let mut converted = feature.clone();
        converted.geometry = project_geometry(&proj, &feature.geometry, source, target)?;
        reprojected.features.push(converted);
    }
    Ok(reprojected)
}

/// Reproject a single geometry between two CRSs.
pub fn reproject_geometry(
    geometry: &geo::Geometry<f64>,
    source: &Crs,
    target: &Crs,
) -> Result<geo::Geometry<f64>> {
    if source == target {
        return Ok(geometry.clone());
    }
    let proj = make_proj(source, target)?;
    project_geometry(&proj, geometry, source, target)
}

fn make_proj(source: &Crs, target: &Crs) -> Result<Proj> {
    Proj::new_known_crs(source.as_str(), target.as_str(), None).map_err(|e| {
        SfGeoError::Projection {
            from: source.to_string(),
            to: target.to_string(),
            reason: e.to_string(),
        }
    })
}

fn project_geometry(
    proj: &Proj,
    geometry: &geo::Geometry<f64>,
    source: &Crs,
    target: &Crs,
) -> Result<geo::Geometry<f64>> {
    let convert = |coord: &geo::Coord<f64>| -> Result<geo::Coord<f64>> {
        proj.convert((coord.x, coord.y))
            .map(|(x, y)| geo::Coord { x, y })
            .map_err(|e| SfGeoError::Projection {
                from: source.to_string(),
                to: target.to_string(),
                reason: e.to_string(),
            })
    };

    let convert_line = |line: &geo::LineString<f64>| -> Result<geo::LineString<f64>> {
        let coords: Result<Vec<_>> = line.0.iter().map(|c| convert(c)).collect();
        Ok(geo::LineString::new(coords?))
    };

    let convert_polygon = |polygon: &geo::Polygon<f64>| -> Result<geo::Polygon<f64>> {
        let exterior = convert_line(polygon.exterior())?;
        let interiors: Result<Vec<_>> = polygon.interiors().iter().map(&convert_line).collect();
        Ok(geo::Polygon::new(exterior, interiors?))
    };

    match geometry {
        geo::Geometry::Point(point) => Ok(geo::Geometry::Point(geo::Point(convert(&point.0)?))),
        geo::Geometry::MultiPoint(points) => {
            let converted: Result<Vec<_>> = points
                .iter()
                .map(|p| convert(&p.0).map(geo::Point))
                .collect();
            Ok(geo::Geometry::MultiPoint(geo::MultiPoint::new(converted?)))
        }
        geo::Geometry::LineString(line) => Ok(geo::Geometry::LineString(convert_line(line)?)),
        geo::Geometry::MultiLineString(lines) => {
            let converted: Result<Vec<_>> = lines.iter().map(&convert_line).collect();
            Ok(geo::Geometry::MultiLineString(geo::MultiLineString::new(
                converted?,
            )))
        }
        geo::Geometry::Polygon(polygon) => Ok(geo::Geometry::Polygon(convert_polygon(polygon)?)),
        geo::Geometry::MultiPolygon(polygons) => {
            let converted: Result<Vec<_>> = polygons.iter().map(&convert_polygon).collect();
            Ok(geo::Geometry::MultiPolygon(geo::MultiPolygon::new(
                converted?,
            )))
        }
        geo::Geometry::Line(line) => Ok(geo::Geometry::Line(geo::Line::new(
            convert(&line.start)?,
            convert(&line.end)?,
        ))),
        geo::Geometry::Rect(rect) => {
            // Rects do not survive reprojection as rects; convert via polygon.
            Ok(geo::Geometry::Polygon(convert_polygon(&rect.to_polygon())?))
        }
        geo::Geometry::Triangle(triangle) => Ok(geo::Geometry::Polygon(convert_polygon(
            &triangle.to_polygon(),
        )?)),
        geo::Geometry::GeometryCollection(collection) => {
            let converted: Result<Vec<_>> = collection
                .iter()
                .map(|g| project_geometry(proj, g, source, target))
                .collect();
            Ok(geo::Geometry::GeometryCollection(
                geo::GeometryCollection::new_from(converted?),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfgeo_core::models::Feature;

    #[test]
    fn test_same_crs_is_a_copy() {
        let mut dataset = VectorDataset::new("test", Some(Crs::epsg(4326)));
        dataset
            .features
            .push(Feature::new(geo::Geometry::Point(geo::Point::new(
                -105.9, 35.7,
            ))));

        let result = reproject_dataset(&dataset, &Crs::epsg(4326)).unwrap();
        assert_eq!(result.crs, Some(Crs::epsg(4326)));
        assert_eq!(result.feature_count(), 1);
    }

    #[test]
    fn test_missing_crs_is_projection_error() {
        let dataset = VectorDataset::new("test", None);
        let err = reproject_dataset(&dataset, &Crs::epsg(3857)).unwrap_err();
        assert!(matches!(err, SfGeoError::Projection { .. }));
    }

    #[test]
    fn test_geographic_to_web_mercator() {
        let point = geo::Geometry::Point(geo::Point::new(-105.938, 35.687));
        let projected =
            reproject_geometry(&point, &Crs::epsg(4326), &Crs::epsg(3857)).unwrap();

        match projected {
            geo::Geometry::Point(p) => {
                // Known Web Mercator coordinates for the Santa Fe Plaza.
                assert!((p.x() - -11_792_964.0).abs() < 100.0);
                assert!((p.y() - 4_258_865.0).abs() < 100.0);
            }
            other => panic!("expected Point, got {:?}", other),
        }
    }

    #[test]
    fn test_round_trip_returns_close() {
        let original = geo::Geometry::Point(geo::Point::new(-105.9, 35.7));
        let there = reproject_geometry(&original, &Crs::epsg(4326), &Crs::epsg(3857)).unwrap();
        let back = reproject_geometry(&there, &Crs::epsg(3857), &Crs::epsg(4326)).unwrap();

        match back {
            geo::Geometry::Point(p) => {
                assert!((p.x() - -105.9).abs() < 1e-6);
                assert!((p.y() - 35.7).abs() < 1e-6);
            }
            other => panic!("expected Point, got {:?}", other),
        }
    }
}

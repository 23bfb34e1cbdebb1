//! Clipping against a boundary polygon

use geo::{BooleanOps, Intersects};

use sfgeo_core::error::{Result, SfGeoError};
use sfgeo_core::models::VectorDataset;

/// Restrict a dataset to the portion intersecting a boundary.
///
/// Both datasets must be in the same CRS. Area features are geometrically
/// intersected with the boundary, linear features are cut to the boundary,
/// and points are kept when they fall inside it. Features left with no
/// geometry are dropped.
pub fn clip_dataset(dataset: &VectorDataset, boundary: &VectorDataset) -> Result<VectorDataset> {
    if dataset.crs != boundary.crs {
        return Err(SfGeoError::CrsMismatch {
            dataset: dataset.name.clone(),
            actual: crs_label(dataset),
            expected: crs_label(boundary),
        });
    }

    let clip_shape = boundary_polygons(boundary);
    if clip_shape.0.is_empty() {
        return Err(SfGeoError::Format {
            format: "Boundary".to_string(),
            reason: format!("{} contains no polygon features to clip against", boundary.name),
        });
    }

    let mut clipped = VectorDataset::new(dataset.name.clone(), dataset.crs.clone());
    for feature in &dataset.features {
        if let Some(geometry) = clip_geometry(&feature.geometry, &clip_shape) {
            let mut kept = feature.clone();
            kept.geometry = geometry;
            clipped.features.push(kept);
        }
    }
    Ok(clipped)
}

fn crs_label(dataset: &VectorDataset) -> String {
    dataset
        .crs
        .as_ref()
        .map(|crs| crs.to_string())
        .unwrap_or_else(|| "unset".to_string())
}

/// All polygonal geometry in the boundary dataset, merged into one
/// multipolygon.
fn boundary_polygons(boundary: &VectorDataset) -> geo::MultiPolygon<f64> {
    let mut polygons: Vec<geo::Polygon<f64>> = Vec::new();
    for feature in &boundary.features {
        match &feature.geometry {
            geo::Geometry::Polygon(polygon) => polygons.push(polygon.clone()),
            geo::Geometry::MultiPolygon(multi) => polygons.extend(multi.iter().cloned()),
            _ => {}
        }
    }
    geo::MultiPolygon::new(polygons)
}

fn clip_geometry(
    geometry: &geo::Geometry<f64>,
    boundary: &geo::MultiPolygon<f64>,
) -> Option<geo::Geometry<f64>> {
    match geometry {
        geo::Geometry::Polygon(polygon) => {
            let pieces = boundary.intersection(&geo::MultiPolygon::new(vec![polygon.clone()]));
            multipolygon_geometry(pieces)
        }
        geo::Geometry::MultiPolygon(multi) => {
            let pieces = boundary.intersection(multi);
            multipolygon_geometry(pieces)
        }
        geo::Geometry::LineString(line) => {
            let cut = boundary.clip(&geo::MultiLineString::new(vec![line.clone()]), false);
            multilinestring_geometry(cut)
        }
        geo::Geometry::MultiLineString(lines) => {
            let cut = boundary.clip(lines, false);
            multilinestring_geometry(cut)
        }
        geo::Geometry::Point(point) => point
            .intersects(boundary)
            .then(|| geo::Geometry::Point(*point)),
        geo::Geometry::MultiPoint(points) => {
            let inside: Vec<geo::Point<f64>> = points
                .iter()
                .filter(|point| point.intersects(boundary))
                .copied()
                .collect();
            if inside.is_empty() {
                None
            } else {
                Some(geo::Geometry::MultiPoint(geo::MultiPoint::new(inside)))
            }
        }
        // Rare variants are kept whole when they touch the boundary.
        other => other.intersects(boundary).then(|| other.clone()),
    }
}

fn multipolygon_geometry(pieces: geo::MultiPolygon<f64>) -> Option<geo::Geometry<f64>> {
    match pieces.0.len() {
        0 => None,
        1 => pieces.0.into_iter().next().map(geo::Geometry::Polygon),
        _ => Some(geo::Geometry::MultiPolygon(pieces)),
    }
}

fn multilinestring_geometry(pieces: geo::MultiLineString<f64>) -> Option<geo::Geometry<f64>> {
    let non_empty: Vec<geo::LineString<f64>> = pieces
        .0
        .into_iter()
        .filter(|line| line.0.len() >= 2)
        .collect();
    match non_empty.len() {
        0 => None,
        1 => non_empty.into_iter().next().map(geo::Geometry::LineString),
        _ => Some(geo::Geometry::MultiLineString(geo::MultiLineString::new(
            non_empty,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfgeo_core::models::{Crs, Feature};

    fn boundary_square() -> VectorDataset {
        let mut boundary = VectorDataset::new("city_limits", Some(Crs::epsg(4326)));
        boundary.features.push(Feature::new(geo::Geometry::Polygon(
            geo::Polygon::new(
                geo::LineString::from(vec![
                    (0.0, 0.0),
                    (0.0, 10.0),
                    (10.0, 10.0),
                    (10.0, 0.0),
                    (0.0, 0.0),
                ]),
                vec![],
            ),
        )));
        boundary
    }

    #[test]
    fn test_point_inside_kept_outside_dropped() {
        let mut dataset = VectorDataset::new("pois", Some(Crs::epsg(4326)));
        dataset
            .features
            .push(Feature::new(geo::Geometry::Point(geo::Point::new(5.0, 5.0))));
        dataset
            .features
            .push(Feature::new(geo::Geometry::Point(geo::Point::new(
                20.0, 20.0,
            ))));

        let clipped = clip_dataset(&dataset, &boundary_square()).unwrap();
        assert_eq!(clipped.feature_count(), 1);
    }

    #[test]
    fn test_polygon_is_cut_to_boundary() {
        let mut dataset = VectorDataset::new("parcels", Some(Crs::epsg(4326)));
        // Straddles the eastern edge of the boundary.
        dataset.features.push(Feature::new(geo::Geometry::Polygon(
            geo::Polygon::new(
                geo::LineString::from(vec![
                    (8.0, 2.0),
                    (8.0, 4.0),
                    (14.0, 4.0),
                    (14.0, 2.0),
                    (8.0, 2.0),
                ]),
                vec![],
            ),
        )));

        let clipped = clip_dataset(&dataset, &boundary_square()).unwrap();
        assert_eq!(clipped.feature_count(), 1);

        use geo::BoundingRect;
        let rect = clipped.features[0].geometry.bounding_rect().unwrap();
        assert!(rect.max().x <= 10.0 + 1e-9);
    }

    #[test]
    fn test_line_is_cut_to_boundary() {
        let mut dataset = VectorDataset::new("roads", Some(Crs::epsg(4326)));
        dataset
            .features
            .push(Feature::new(geo::Geometry::LineString(
                geo::LineString::from(vec![(5.0, 5.0), (15.0, 5.0)]),
            )));

        let clipped = clip_dataset(&dataset, &boundary_square()).unwrap();
        assert_eq!(clipped.feature_count(), 1);

        use geo::BoundingRect;
        let rect = clipped.features[0].geometry.bounding_rect().unwrap();
        assert!(rect.max().x <= 10.0 + 1e-9);
    }

    #[test]
    fn test_disjoint_polygon_dropped() {
        let mut dataset = VectorDataset::new("parcels", Some(Crs::epsg(4326)));
        dataset.features.push(Feature::new(geo::Geometry::Polygon(
            geo::Polygon::new(
                geo::LineString::from(vec![
                    (20.0, 20.0),
                    (20.0, 22.0),
                    (22.0, 22.0),
                    (22.0, 20.0),
                    (20.0, 20.0),
                ]),
                vec![],
            ),
        )));

        let clipped = clip_dataset(&dataset, &boundary_square()).unwrap();
        assert_eq!(clipped.feature_count(), 0);
    }

    #[test]
    fn test_crs_mismatch_rejected() {
        let mut dataset = VectorDataset::new("parcels", Some(Crs::epsg(3857)));
        dataset
            .features
            .push(Feature::new(geo::Geometry::Point(geo::Point::new(5.0, 5.0))));

        let err = clip_dataset(&dataset, &boundary_square()).unwrap_err();
        assert!(matches!(err, SfGeoError::CrsMismatch { .. }));
    }

    #[test]
    fn test_boundary_without_polygons_rejected() {
        let mut boundary = VectorDataset::new("bad_boundary", Some(Crs::epsg(4326)));
        boundary
            .features
            .push(Feature::new(geo::Geometry::Point(geo::Point::new(0.0, 0.0))));

        let dataset = VectorDataset::new("parcels", Some(Crs::epsg(4326)));
        assert!(clip_dataset(&dataset, &boundary).is_err());
    }
}

//! Dataset and coordinate models

use std::fmt;
use std::str::FromStr;

use geo::BoundingRect;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SfGeoError};

/// A coordinate reference system identifier, normalized to `EPSG:<code>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    /// Build a CRS from a bare EPSG code.
    pub fn epsg(code: u32) -> Self {
        Self(format!("EPSG:{}", code))
    }

    /// The numeric EPSG code.
    pub fn code(&self) -> u32 {
        // The constructor guarantees the `EPSG:<digits>` shape.
        self.0
            .rsplit(':')
            .next()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Crs {
    type Err = SfGeoError;

    /// Accepts `EPSG:4326`, `epsg:4326`, or a bare `4326`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let code_part = match trimmed.split_once(':') {
            Some((auth, code)) if auth.eq_ignore_ascii_case("epsg") => code,
            Some(_) => {
                return Err(SfGeoError::InvalidCrs {
                    value: s.to_string(),
                })
            }
            None => trimmed,
        };
        code_part
            .parse::<u32>()
            .map(Crs::epsg)
            .map_err(|_| SfGeoError::InvalidCrs {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single feature: one geometry plus its attribute mapping.
///
/// Properties keep insertion order so persisted column order is stable.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: geo::Geometry<f64>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: geo::Geometry<f64>) -> Self {
        Self {
            geometry,
            properties: Map::new(),
        }
    }
}

/// An in-memory vector dataset: features sharing one CRS.
///
/// `crs` is `None` only for freshly read raw data; every processed dataset
/// carries a CRS.
#[derive(Debug, Clone)]
pub struct VectorDataset {
    pub name: String,
    pub crs: Option<Crs>,
    pub features: Vec<Feature>,
}

impl VectorDataset {
    pub fn new(name: impl Into<String>, crs: Option<Crs>) -> Self {
        Self {
            name: name.into(),
            crs,
            features: Vec::new(),
        }
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Attribute column names, in first-seen order across all features.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for feature in &self.features {
            for key in feature.properties.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.properties.contains_key(name))
    }

    /// Spatial extent over all feature geometries. `None` for an empty
    /// dataset or one with only empty geometries.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let mut bounds: Option<BoundingBox> = None;
        for feature in &self.features {
            if let Some(rect) = feature.geometry.bounding_rect() {
                let feature_box = BoundingBox {
                    minx: rect.min().x,
                    miny: rect.min().y,
                    maxx: rect.max().x,
                    maxy: rect.max().y,
                };
                bounds = Some(match bounds {
                    Some(b) => b.expanded_to_include(&feature_box),
                    None => feature_box,
                });
            }
        }
        bounds
    }
}

/// An axis-aligned bounding box in some CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    /// Approximate extent of Santa Fe, NM in geographic coordinates. Used
    /// whenever real city-limits bounds are unavailable.
    pub const SANTA_FE_FALLBACK: BoundingBox = BoundingBox {
        minx: -106.0,
        miny: 35.6,
        maxx: -105.8,
        maxy: 35.8,
    };

    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.minx < self.maxx && self.miny < self.maxy
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    pub fn expanded_to_include(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            minx: self.minx.min(other.minx),
            miny: self.miny.min(other.miny),
            maxx: self.maxx.max(other.maxx),
            maxy: self.maxy.max(other.maxy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_crs_from_str_variants() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::epsg(4326));
        assert_eq!("epsg:3857".parse::<Crs>().unwrap(), Crs::epsg(3857));
        assert_eq!("32113".parse::<Crs>().unwrap(), Crs::epsg(32113));
    }

    #[test]
    fn test_crs_from_str_invalid() {
        assert!("not-a-crs".parse::<Crs>().is_err());
        assert!("ESRI:102100".parse::<Crs>().is_err());
    }

    #[test]
    fn test_crs_code_and_display() {
        let crs = Crs::epsg(32113);
        assert_eq!(crs.code(), 32113);
        assert_eq!(crs.to_string(), "EPSG:32113");
    }

    #[test]
    fn test_columns_first_seen_order() {
        let mut dataset = VectorDataset::new("test", Some(Crs::epsg(4326)));
        let mut a = Feature::new(geo::Geometry::Point(geo::Point::new(0.0, 0.0)));
        a.properties.insert("zoning".into(), "R-1".into());
        let mut b = Feature::new(geo::Geometry::Point(geo::Point::new(1.0, 1.0)));
        b.properties.insert("zoning".into(), "C-2".into());
        b.properties.insert("parcel_id".into(), "42".into());
        dataset.features.push(a);
        dataset.features.push(b);

        assert_eq!(dataset.columns(), vec!["zoning", "parcel_id"]);
        assert!(dataset.has_column("parcel_id"));
        assert!(!dataset.has_column("owner"));
    }

    #[test]
    fn test_bounds_over_features() {
        let mut dataset = VectorDataset::new("test", Some(Crs::epsg(4326)));
        dataset
            .features
            .push(Feature::new(geo::Geometry::Point(geo::Point::new(
                -106.0, 35.6,
            ))));
        dataset
            .features
            .push(Feature::new(geo::Geometry::Point(geo::Point::new(
                -105.8, 35.8,
            ))));

        let bounds = dataset.bounds().unwrap();
        assert_eq!(bounds.minx, -106.0);
        assert_eq!(bounds.maxy, 35.8);
        assert!(bounds.is_valid());
    }

    #[test]
    fn test_empty_dataset_has_no_bounds() {
        let dataset = VectorDataset::new("empty", None);
        assert!(dataset.bounds().is_none());
    }

    #[test]
    fn test_fallback_bounds_are_valid() {
        assert!(BoundingBox::SANTA_FE_FALLBACK.is_valid());
    }

    proptest! {
        #[test]
        fn expanding_preserves_validity(
            ax in -180.0f64..180.0, ay in -90.0f64..90.0,
            bx in -180.0f64..180.0, by in -90.0f64..90.0,
        ) {
            let base = BoundingBox::SANTA_FE_FALLBACK;
            let other = BoundingBox::new(ax.min(bx), ay.min(by), ax.max(bx) + 0.1, ay.max(by) + 0.1);
            let expanded = base.expanded_to_include(&other);
            prop_assert!(expanded.is_valid());
            prop_assert!(expanded.minx <= base.minx);
            prop_assert!(expanded.maxy >= base.maxy);
        }
    }
}

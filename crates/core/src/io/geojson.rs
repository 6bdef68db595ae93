//! GeoJSON reading and writing for feature collections

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::GeoJson;
use std::path::Path;

/// Read a GeoJSON file into a [`FeatureCollection`].
///
/// A bare Feature is wrapped into a one-element collection; a bare geometry is rejected.
pub fn read_feature_collection<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let parsed: GeoJson = text.parse()?;

    let features = match parsed {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(Error::InvalidFeature {
                index: 0,
                reason: "expected a Feature or FeatureCollection, found a bare geometry".into(),
            })
        }
    };

    let mut out = FeatureCollection::new();
    for f in features {
        out.push(from_geojson_feature(f)?);
    }
    Ok(out)
}

/// Read an ecoregion aggregate; every feature needs a string `name` and integer `count`.
pub fn read_ecoregions<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let fc = read_feature_collection(path)?;
    for (index, feature) in fc.iter().enumerate() {
        if feature.name().is_none() {
            return Err(Error::InvalidFeature {
                index,
                reason: "missing string property 'name'".into(),
            });
        }
        match feature.count() {
            Some(c) if c >= 0 => {}
            _ => {
                return Err(Error::InvalidFeature {
                    index,
                    reason: "missing non-negative integer property 'count'".into(),
                })
            }
        }
        if feature.geometry.is_none() {
            return Err(Error::InvalidFeature {
                index,
                reason: "feature has no geometry".into(),
            });
        }
    }
    Ok(fc)
}

fn from_geojson_feature(f: geojson::Feature) -> Result<Feature> {
    let geometry = match f.geometry {
        Some(g) => Some(geo_types::Geometry::<f64>::try_from(g)?),
        None => None,
    };
    let properties = f
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, AttributeValue::from(v)))
        .collect();
    let id = f.id.map(|id| match id {
        geojson::feature::Id::String(s) => s,
        geojson::feature::Id::Number(n) => n.to_string(),
    });
    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

fn to_geojson_feature(f: &Feature) -> geojson::Feature {
    let properties: geojson::JsonObject = f
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
        .collect();
    geojson::Feature {
        bbox: None,
        geometry: f
            .geometry
            .as_ref()
            .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
        id: f.id.clone().map(geojson::feature::Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Serialize a collection as a GeoJSON FeatureCollection string
pub fn to_geojson_string(fc: &FeatureCollection) -> String {
    let collection = geojson::FeatureCollection {
        bbox: None,
        features: fc.iter().map(to_geojson_feature).collect(),
        foreign_members: None,
    };
    GeoJson::from(collection).to_string()
}

/// Write a collection to a GeoJSON file
pub fn write_feature_collection<P: AsRef<Path>>(fc: &FeatureCollection, path: P) -> Result<()> {
    std::fs::write(path.as_ref(), to_geojson_string(fc))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, Point};
    use tempfile::NamedTempFile;

    const ECOREGIONS: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "id": "sonoran",
         "properties": {"name": "Sonoran Desert", "count": 12},
         "geometry": {"type": "Polygon", "coordinates": [[[-113,31],[-111,31],[-111,33],[-113,33],[-113,31]]]}},
        {"type": "Feature",
         "properties": {"name": "Madrean Archipelago", "count": 3},
         "geometry": {"type": "Polygon", "coordinates": [[[-111,31],[-109,31],[-109,33],[-111,33],[-111,31]]]}}
      ]
    }"#;

    fn file(contents: &str) -> NamedTempFile {
        let tmp = NamedTempFile::with_suffix(".geojson").unwrap();
        std::fs::write(tmp.path(), contents).unwrap();
        tmp
    }

    #[test]
    fn test_read_ecoregions() {
        let tmp = file(ECOREGIONS);
        let fc = read_ecoregions(tmp.path()).unwrap();
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features[0].name(), Some("Sonoran Desert"));
        assert_eq!(fc.features[0].id.as_deref(), Some("sonoran"));
        assert_eq!(fc.total_count(), 15);
        assert!(matches!(fc.features[1].geometry, Some(Geometry::Polygon(_))));
    }

    #[test]
    fn test_ecoregion_without_count_rejected() {
        let tmp = file(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"name": "X"},
                 "geometry": {"type": "Point", "coordinates": [0, 0]}}]}"#,
        );
        assert!(matches!(
            read_ecoregions(tmp.path()),
            Err(Error::InvalidFeature { index: 0, .. })
        ));
    }

    #[test]
    fn test_bare_geometry_rejected() {
        let tmp = file(r#"{"type": "Point", "coordinates": [0, 0]}"#);
        assert!(read_feature_collection(tmp.path()).is_err());
    }

    #[test]
    fn test_write_and_read_back() {
        let mut fc = FeatureCollection::new();
        let mut f = Feature::new(Geometry::Point(Point::new(-112.0, 31.0)));
        f.set_property("taxon", AttributeValue::String("Gopherus morafkai".into()));
        f.set_property("protected", AttributeValue::Int(1));
        fc.push(f);

        let tmp = NamedTempFile::with_suffix(".geojson").unwrap();
        write_feature_collection(&fc, tmp.path()).unwrap();
        let back = read_feature_collection(tmp.path()).unwrap();
        assert_eq!(back, fc);
    }
}

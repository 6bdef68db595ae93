//! Export bundle consumed by the 2D and 3D map renderers

use crate::pipeline::PipelineOutput;
use geo_types::{Geometry, Point};
use refuge_core::io::{write_feature_collection, write_geotiff, write_points_csv};
use refuge_core::vector::{AttributeValue, Feature, FeatureCollection};
use refuge_core::{PointTable, ProtectedCounts, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};

pub const LABELED_GEOJSON: &str = "points_labeled.geojson";
pub const LABELED_CSV: &str = "points_labeled.csv";
pub const RAW_GEOJSON: &str = "points_raw.geojson";
pub const CROPPED_TIFF: &str = "protected_cropped.tif";
pub const ECOREGIONS_GEOJSON: &str = "ecoregions.geojson";
pub const MANIFEST: &str = "manifest.json";

const TAXON_PROPERTY: &str = "taxon";
const PROTECTED_PROPERTY: &str = "protected";
/// Prefix for source columns whose name clashes with a derived property
const SOURCE_PREFIX: &str = "source_";

/// Summary of a written bundle, also saved as `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    /// File names relative to the bundle directory, in write order
    pub files: Vec<String>,
    pub point_count: usize,
    pub taxa: Vec<String>,
    /// Tally after normalization
    pub protected: ProtectedCounts,
    /// Tally as sampled; `nodata` counts points outside the raster or on no-data cells
    pub joined: ProtectedCounts,
    pub crs: Option<String>,
    /// Presence-cell count per species
    pub ranges: BTreeMap<String, usize>,
    /// Number of ecoregion features, when an aggregate was configured
    pub ecoregions: Option<usize>,
}

/// Write every pipeline product into `output_dir`, creating it if needed.
pub fn write_bundle<P: AsRef<Path>>(output: &PipelineOutput, output_dir: P) -> Result<BundleManifest> {
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let mut files = Vec::new();

    let labeled = points_to_features(&output.labeled)?;
    write_feature_collection(&labeled, dir.join(LABELED_GEOJSON))?;
    files.push(LABELED_GEOJSON.to_string());

    write_points_csv(&output.labeled, dir.join(LABELED_CSV))?;
    files.push(LABELED_CSV.to_string());

    let raw = points_to_features(&output.raw)?;
    write_feature_collection(&raw, dir.join(RAW_GEOJSON))?;
    files.push(RAW_GEOJSON.to_string());

    if output.cropped.is_empty() {
        warn!("No point falls on the protected raster; skipping {}", CROPPED_TIFF);
    } else {
        write_geotiff(&output.cropped, dir.join(CROPPED_TIFF), None)?;
        files.push(CROPPED_TIFF.to_string());
    }

    let mut ranges = BTreeMap::new();
    let mut used = HashSet::new();
    for (species, raster) in output.ranges.iter() {
        let name = unique_range_file_name(species, &mut used);
        write_geotiff(raster, dir.join(&name), None)?;
        files.push(name);
        ranges.insert(species.to_string(), raster.valid_count());
    }

    if let Some(fc) = &output.ecoregions {
        write_feature_collection(fc, dir.join(ECOREGIONS_GEOJSON))?;
        files.push(ECOREGIONS_GEOJSON.to_string());
    }

    files.push(MANIFEST.to_string());
    let manifest = BundleManifest {
        files,
        point_count: output.labeled.len(),
        taxa: output.labeled.taxa().into_iter().map(String::from).collect(),
        protected: output.labeled.protected_counts().unwrap_or_default(),
        joined: output.join_counts,
        crs: output.labeled.crs().map(|c| c.identifier()),
        ranges,
        ecoregions: output.ecoregions.as_ref().map(FeatureCollection::len),
    };

    let writer = BufWriter::new(File::create(dir.join(MANIFEST))?);
    serde_json::to_writer_pretty(writer, &manifest)?;

    info!("Wrote {} files to {}", manifest.files.len(), dir.display());
    Ok(manifest)
}

/// Point features with `taxon`, the extra columns and, once joined, `protected`.
///
/// A column holding only 0 and 1 exports `protected` as an integer; anything
/// else exports the value unchanged as a float, or null for no data.
///
/// An extra column named `taxon` is exported as `source_taxon`. An extra
/// `protected` column is dropped when the table carries its own, and exported
/// as is otherwise.
pub fn points_to_features(table: &PointTable) -> Result<FeatureCollection> {
    let schema = table.schema();
    let flags = match table.protected() {
        Some(col) if col.is_binary() => Some(col.as_flags()?),
        _ => None,
    };

    let mut fc = FeatureCollection::new();
    for (i, p) in table.iter().enumerate() {
        let mut feature = Feature::new(Geometry::Point(Point::new(p.lon, p.lat)));
        for (name, raw) in schema.extra_columns.iter().zip(&p.attributes) {
            let key = match name.as_str() {
                TAXON_PROPERTY => format!("{}{}", SOURCE_PREFIX, name),
                PROTECTED_PROPERTY if table.protected().is_some() => continue,
                _ => name.clone(),
            };
            feature.set_property(key, AttributeValue::guess(raw));
        }
        feature.set_property(TAXON_PROPERTY, AttributeValue::String(p.taxon.clone()));
        if let Some(col) = table.protected() {
            let value = match &flags {
                Some(flags) => AttributeValue::Int(i64::from(flags[i])),
                None => col.values()[i].map_or(AttributeValue::Null, AttributeValue::Float),
            };
            feature.set_property(PROTECTED_PROPERTY, value);
        }
        fc.push(feature);
    }
    Ok(fc)
}

fn range_file_name(species: &str) -> String {
    let safe: String = species
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("range_{}.tif", safe)
}

/// File name for `species` not already in `used`; clashes get `_2`, `_3`, ...
fn unique_range_file_name(species: &str, used: &mut HashSet<String>) -> String {
    let base = range_file_name(species);
    let mut name = base.clone();
    let mut n = 2;
    while used.contains(&name) {
        name = format!("{}_{}.tif", base.trim_end_matches(".tif"), n);
        n += 1;
    }
    used.insert(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use refuge_core::{PointSchema, ProtectedColumn, RangeSet, Raster, SamplePoint};

    fn table() -> PointTable {
        let schema = PointSchema {
            extra_columns: vec!["year".into(), "source".into()],
            ..PointSchema::default()
        };
        let mut a = SamplePoint::new("Gopherus morafkai", -112.0, 31.0);
        a.attributes = vec!["2019".into(), "iNat".into()];
        let mut b = SamplePoint::new("Heloderma suspectum", -111.0, 32.0);
        b.attributes = vec!["".into(), "survey".into()];
        PointTable::new(schema, vec![a, b])
    }

    #[test]
    fn test_range_file_name() {
        assert_eq!(range_file_name("gopherus"), "range_gopherus.tif");
        assert_eq!(range_file_name("Gopherus morafkai"), "range_Gopherus_morafkai.tif");
        assert_eq!(range_file_name("a/b"), "range_a_b.tif");
    }

    #[test]
    fn test_raw_points_have_no_protected_property() {
        let fc = points_to_features(&table()).unwrap();
        assert_eq!(fc.len(), 2);
        let f = &fc.features[0];
        assert_eq!(f.get_property("taxon").and_then(AttributeValue::as_str), Some("Gopherus morafkai"));
        assert_eq!(f.get_property("year"), Some(&AttributeValue::Int(2019)));
        assert_eq!(fc.features[1].get_property("year"), Some(&AttributeValue::Null));
        assert!(f.get_property("protected").is_none());
        assert_eq!(f.geometry, Some(Geometry::Point(Point::new(-112.0, 31.0))));
    }

    #[test]
    fn test_labeled_points_export_integer_flags() {
        let t = table()
            .with_protected(ProtectedColumn(vec![Some(1.0), Some(0.0)]))
            .unwrap();
        let fc = points_to_features(&t).unwrap();
        assert_eq!(fc.features[0].get_property("protected"), Some(&AttributeValue::Int(1)));
        assert_eq!(fc.features[1].get_property("protected"), Some(&AttributeValue::Int(0)));
    }

    #[test]
    fn test_joined_points_keep_nodata_as_null() {
        let t = table()
            .with_protected(ProtectedColumn(vec![None, Some(1.0)]))
            .unwrap();
        let fc = points_to_features(&t).unwrap();
        assert_eq!(fc.features[0].get_property("protected"), Some(&AttributeValue::Null));
        assert_eq!(fc.features[1].get_property("protected"), Some(&AttributeValue::Float(1.0)));
    }

    #[test]
    fn test_non_binary_values_exported_unchanged() {
        let t = table()
            .with_protected(ProtectedColumn(vec![Some(2.0), Some(0.5)]))
            .unwrap();
        let fc = points_to_features(&t).unwrap();
        assert_eq!(fc.features[0].get_property("protected"), Some(&AttributeValue::Float(2.0)));
        assert_eq!(fc.features[1].get_property("protected"), Some(&AttributeValue::Float(0.5)));
    }

    fn clashing_table() -> PointTable {
        let schema = PointSchema {
            extra_columns: vec!["taxon".into(), "protected".into()],
            ..PointSchema::default()
        };
        let mut a = SamplePoint::new("Gopherus morafkai", -112.0, 31.0);
        a.attributes = vec!["12345".into(), "1".into()];
        PointTable::new(schema, vec![a])
    }

    #[test]
    fn test_extra_taxon_column_does_not_replace_taxon() {
        let fc = points_to_features(&clashing_table()).unwrap();
        let f = &fc.features[0];
        assert_eq!(f.get_property("taxon").and_then(AttributeValue::as_str), Some("Gopherus morafkai"));
        assert_eq!(f.get_property("source_taxon"), Some(&AttributeValue::Int(12345)));
        // No derived column yet, so the source value is kept
        assert_eq!(f.get_property("protected"), Some(&AttributeValue::Int(1)));
    }

    #[test]
    fn test_extra_protected_column_superseded_by_join() {
        let t = clashing_table()
            .with_protected(ProtectedColumn(vec![Some(0.0)]))
            .unwrap();
        let fc = points_to_features(&t).unwrap();
        assert_eq!(fc.features[0].get_property("protected"), Some(&AttributeValue::Int(0)));
    }

    #[test]
    fn test_unique_range_file_name() {
        let mut used = HashSet::new();
        assert_eq!(unique_range_file_name("Gopherus morafkai", &mut used), "range_Gopherus_morafkai.tif");
        assert_eq!(unique_range_file_name("Gopherus_morafkai", &mut used), "range_Gopherus_morafkai_2.tif");
        assert_eq!(unique_range_file_name("Gopherus/morafkai", &mut used), "range_Gopherus_morafkai_3.tif");
    }

    #[test]
    fn test_bundle_keeps_every_range_file() {
        let labeled = table()
            .with_protected(ProtectedColumn(vec![Some(1.0), Some(0.0)]))
            .unwrap();
        let mut ranges = RangeSet::new();
        ranges.insert("Gopherus morafkai", Raster::filled(2, 2, 1.0)).unwrap();
        ranges.insert("Gopherus_morafkai", Raster::filled(2, 2, 2.0)).unwrap();
        let output = PipelineOutput {
            raw: table(),
            joined: labeled.clone(),
            labeled,
            cropped: Raster::filled(1, 1, 1.0),
            ranges,
            ecoregions: None,
            join_counts: ProtectedCounts::default(),
        };

        let dir = tempfile::tempdir().unwrap();
        let manifest = write_bundle(&output, dir.path()).unwrap();
        let range_files: Vec<&String> = manifest
            .files
            .iter()
            .filter(|f| f.starts_with("range_"))
            .collect();
        assert_eq!(range_files.len(), 2);
        assert_ne!(range_files[0], range_files[1]);
        for f in &manifest.files {
            assert!(dir.path().join(f).is_file(), "missing {}", f);
        }
    }
}

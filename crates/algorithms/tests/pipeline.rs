//! End-to-end runs of the labelling pipeline over a synthetic data directory.
//!
//! The fixture is a 4x4 one-degree protected grid over lon [-114, -110],
//! lat [30, 34], a points CSV, a zip of three range rasters and an
//! ecoregion GeoJSON, all written into a temporary directory.

use approx::assert_relative_eq;
use refuge_algorithms::prelude::*;
use refuge_core::io::{read_feature_collection, read_geotiff, write_geotiff, write_geotiff_to_buffer};
use refuge_core::vector::AttributeValue;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const NA: f64 = f64::NAN;

const POINTS_CSV: &str = "\
species,longitude,latitude,year
Gopherus morafkai,-112.0,31.0,2019
Gopherus morafkai,-112.5,32.5,2020
Heloderma suspectum,-111.5,32.5,2018
Heloderma suspectum,-120.0,31.0,2021
Crotalus cerastes,-113.5,33.5,2017
";

const ECOREGIONS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature",
     "properties": {"name": "Sonoran Desert", "count": 4},
     "geometry": {"type": "Polygon", "coordinates": [[[-114,30],[-110,30],[-110,34],[-114,34],[-114,30]]]}},
    {"type": "Feature",
     "properties": {"name": "Mojave Desert", "count": 1},
     "geometry": {"type": "Polygon", "coordinates": [[[-120,30],[-114,30],[-114,34],[-120,34],[-120,30]]]}}
  ]
}"#;

fn grid(values: Vec<f64>) -> Raster<f64> {
    Raster::from_vec(values, 4, 4)
        .unwrap()
        .with_transform(GeoTransform::new(-114.0, 34.0, 1.0, -1.0))
        .with_crs(Some(CRS::wgs84()))
        .with_nodata(Some(f64::NAN))
}

/// Row 0 col 0 and row 3 col 2 (the cell under -112, 31) are protected,
/// row 1 col 2 is no data.
fn protected_grid() -> Raster<f64> {
    grid(vec![
        1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, NA, 0.0,
        0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
    ])
}

fn write_ranges(path: &Path) {
    let ranges = [
        ("Gopherus morafkai.tif", vec![0.0, 1.0, NA, 2.0]),
        ("Heloderma suspectum.tif", vec![0.2, 0.9, 1.0, 1.0]),
        ("Crotalus cerastes.tif", vec![0.0, 0.0, 0.0, 0.0]),
    ];
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, values) in ranges {
        let raster = Raster::from_vec(values, 2, 2)
            .unwrap()
            .with_transform(GeoTransform::new(-114.0, 34.0, 2.0, -2.0))
            .with_crs(Some(CRS::wgs84()));
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(&write_geotiff_to_buffer(&raster, None).unwrap())
            .unwrap();
    }
    zip.finish().unwrap();
}

fn data_dir(protected: Raster<f64>) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("points.csv"), POINTS_CSV).unwrap();
    std::fs::write(data.join("ecoregions.geojson"), ECOREGIONS).unwrap();
    write_geotiff(&protected, data.join("protected.tif"), None).unwrap();
    write_ranges(&data.join("ranges.zip"));
    dir
}

fn config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        ecoregions: Some("data/ecoregions.geojson".into()),
        ..PipelineConfig::with_base_dir(dir.path())
    }
}

#[test]
fn test_pipeline_labels_points() {
    let dir = data_dir(protected_grid());
    let out = Pipeline::new(config(&dir)).run().unwrap();

    assert_eq!(out.raw.len(), 5);
    assert_eq!(out.joined.len(), 5);
    assert_eq!(out.labeled.len(), 5);

    assert_eq!(
        out.joined.protected().unwrap().values(),
        &[Some(1.0), Some(0.0), None, None, Some(1.0)]
    );
    assert_eq!(
        out.labeled.protected().unwrap().as_flags().unwrap(),
        vec![1, 0, 0, 0, 1]
    );
    assert_eq!(out.labeled.points(), out.raw.points());
    assert_eq!(out.labeled.crs(), Some(&CRS::wgs84()));

    assert_eq!(out.join_counts.nodata, 2);
    assert_eq!(out.join_counts.protected, 2);

    // Points span lon [-120, -111.5], lat [31, 33.5]; the window is clipped to the grid
    assert_eq!(out.cropped.shape(), (4, 3));
    assert_relative_eq!(out.cropped.transform().origin_x, -114.0);
    assert_relative_eq!(out.cropped.transform().origin_y, 34.0);
}

#[test]
fn test_nodata_cell_becomes_unprotected() {
    let dir = data_dir(grid(vec![
        1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, NA, 0.0,
        0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, NA, 0.0,
    ]));

    let out = Pipeline::new(config(&dir)).run().unwrap();
    assert_eq!(out.joined.protected().unwrap().values()[0], None);
    assert_eq!(out.labeled.protected().unwrap().values()[0], Some(0.0));
}

#[test]
fn test_pipeline_filters_ranges() {
    let dir = data_dir(protected_grid());
    let out = Pipeline::new(config(&dir)).run().unwrap();

    assert_eq!(
        out.ranges.species().collect::<Vec<_>>(),
        vec!["Crotalus cerastes", "Gopherus morafkai", "Heloderma suspectum"]
    );

    let gopherus: Vec<Option<f64>> = out
        .ranges
        .get("Gopherus morafkai")
        .unwrap()
        .data()
        .iter()
        .map(|&v| if v.is_nan() { None } else { Some(v) })
        .collect();
    assert_eq!(gopherus, vec![None, Some(1.0), None, Some(2.0)]);

    for (_, raster) in out.ranges.iter() {
        assert!(raster.data().iter().all(|&v| v.is_nan() || v >= 1.0));
    }
    assert_eq!(out.ranges.get("Crotalus cerastes").unwrap().valid_count(), 0);
}

#[test]
fn test_range_species_selection() {
    let dir = data_dir(protected_grid());
    let cfg = PipelineConfig {
        range_species: vec!["Heloderma suspectum".into()],
        ..config(&dir)
    };
    let out = Pipeline::new(cfg).run().unwrap();
    assert_eq!(out.ranges.len(), 1);
    assert_eq!(out.ranges.get("Heloderma suspectum").unwrap().valid_count(), 2);
}

#[test]
fn test_export_bundle() {
    let dir = data_dir(protected_grid());
    let cfg = config(&dir);
    let out = Pipeline::new(cfg.clone()).run().unwrap();
    let bundle = cfg.output_path();
    let manifest = write_bundle(&out, &bundle).unwrap();

    for file in &manifest.files {
        assert!(bundle.join(file).is_file(), "missing {}", file);
    }
    assert!(manifest.files.contains(&"range_Gopherus_morafkai.tif".to_string()));
    assert!(manifest.files.contains(&"ecoregions.geojson".to_string()));
    assert_eq!(manifest.point_count, 5);
    assert_eq!(manifest.protected.protected, 2);
    assert_eq!(manifest.protected.unprotected, 3);
    assert_eq!(manifest.protected.nodata, 0);
    assert_eq!(manifest.joined.nodata, 2);
    assert_eq!(manifest.ecoregions, Some(2));
    assert_eq!(manifest.ranges["Heloderma suspectum"], 2);

    let saved: BundleManifest =
        serde_json::from_str(&std::fs::read_to_string(bundle.join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(saved, manifest);

    let labeled = read_feature_collection(bundle.join("points_labeled.geojson")).unwrap();
    assert_eq!(labeled.len(), 5);
    assert_eq!(
        labeled.features[0].get_property("protected"),
        Some(&AttributeValue::Int(1))
    );

    let cropped: Raster<f64> = read_geotiff(bundle.join("protected_cropped.tif"), None).unwrap();
    assert_eq!(cropped.shape(), out.cropped.shape());
}

#[test]
fn test_missing_points_file_fails() {
    let dir = data_dir(protected_grid());
    std::fs::remove_file(dir.path().join("data/points.csv")).unwrap();
    assert!(matches!(
        Pipeline::new(config(&dir)).run(),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_projected_raster_fails_loudly() {
    let dir = data_dir(protected_grid().with_crs(Some(CRS::from_epsg(3857))));
    assert!(matches!(
        Pipeline::new(config(&dir)).run(),
        Err(Error::CrsMismatch(_, _))
    ));
}

//! Species range archives: a zip (or plain directory) of single-band GeoTIFFs

use crate::error::{Error, Result};
use crate::io::geotiff::{read_geotiff, read_geotiff_from_buffer};
use crate::raster::{RangeSet, Raster};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

fn tiff_stem(name: &str) -> Option<String> {
    let path = Path::new(name);
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ext != "tif" && ext != "tiff" {
        return None;
    }
    // Skip macOS resource forks that ride along in zips
    if name.contains("__MACOSX") {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

/// Read every GeoTIFF in a zip archive or directory as a species range.
///
/// The species name is the file stem. Entries are returned sorted by name.
/// When `species` is non-empty only those are loaded and each must be present.
pub fn read_range_archive<P: AsRef<Path>>(path: P, species: &[String]) -> Result<RangeSet> {
    let path = path.as_ref();
    let mut rasters: Vec<(String, Raster<f64>)> = if path.is_dir() {
        read_directory(path)?
    } else {
        read_zip(path)?
    };
    rasters.sort_by(|a, b| a.0.cmp(&b.0));

    if !species.is_empty() {
        if let Some(missing) = species.iter().find(|s| !rasters.iter().any(|(n, _)| n == *s)) {
            return Err(Error::Other(format!(
                "species '{}' not found in {}",
                missing,
                path.display()
            )));
        }
        rasters.retain(|(name, _)| species.contains(name));
    }

    if rasters.is_empty() {
        return Err(Error::Other(format!("no range rasters in {}", path.display())));
    }

    let mut set = RangeSet::new();
    for (name, raster) in rasters {
        set.insert(name, raster)?;
    }
    Ok(set)
}

fn read_zip(path: &Path) -> Result<Vec<(String, Raster<f64>)>> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut out = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(species) = tiff_stem(entry.name()) else {
            debug!("Skipping archive entry {}", entry.name());
            continue;
        };

        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf)?;
        debug!("Decoding range raster {} ({} bytes)", species, buf.len());
        out.push((species, read_geotiff_from_buffer(&buf, None)?));
    }

    Ok(out)
}

fn read_directory(path: &Path) -> Result<Vec<(String, Raster<f64>)>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }
        let Some(species) = file_path.file_name().and_then(|n| n.to_str()).and_then(tiff_stem)
        else {
            continue;
        };
        out.push((species, read_geotiff(&file_path, None)?));
    }
    Ok(out)
}

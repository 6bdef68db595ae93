//! Pipeline configuration.
//!
//! Every input and output path is resolved from this struct; nothing reads
//! the process working directory implicitly.

use crate::range::PRESENCE_THRESHOLD;
use refuge_core::{Error, PointSchema, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory that relative paths below are resolved against.
    pub base_dir: PathBuf,

    /// CSV of sample points.
    pub points: PathBuf,

    /// Single-band protected-area GeoTIFF.
    pub protected_raster: PathBuf,

    /// Zip archive (or directory) of per-species range GeoTIFFs.
    pub range_archive: PathBuf,

    /// Species to load from the archive; empty loads every raster in it.
    pub range_species: Vec<String>,

    /// Optional GeoJSON ecoregion aggregate with `name` and `count` properties.
    pub ecoregions: Option<PathBuf>,

    /// Directory the export bundle is written to.
    pub output_dir: PathBuf,

    /// Column names in the points CSV.
    pub point_schema: PointSchema,

    /// Range cells strictly below this value are masked.
    pub presence_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            points: PathBuf::from("data/points.csv"),
            protected_raster: PathBuf::from("data/protected.tif"),
            range_archive: PathBuf::from("data/ranges.zip"),
            range_species: Vec::new(),
            ecoregions: None,
            output_dir: PathBuf::from("output"),
            point_schema: PointSchema::default(),
            presence_threshold: PRESENCE_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    /// Default layout rooted at `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// Missing fields take their defaults. A relative `base_dir` is taken
    /// relative to the config file's directory.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: PipelineConfig = serde_json::from_str(&text)?;
        if config.base_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.base_dir = parent.join(&config.base_dir);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Resolve a configured path against `base_dir`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn points_path(&self) -> PathBuf {
        self.resolve(&self.points)
    }

    pub fn protected_raster_path(&self) -> PathBuf {
        self.resolve(&self.protected_raster)
    }

    pub fn range_archive_path(&self) -> PathBuf {
        self.resolve(&self.range_archive)
    }

    pub fn ecoregions_path(&self) -> Option<PathBuf> {
        self.ecoregions.as_deref().map(|p| self.resolve(p))
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.presence_threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "presence_threshold",
                value: self.presence_threshold.to_string(),
                reason: "must be a finite number".into(),
            });
        }

        let schema = &self.point_schema;
        let columns = [&schema.taxon_column, &schema.lon_column, &schema.lat_column];
        if columns.iter().any(|c| c.is_empty()) {
            return Err(Error::InvalidParameter {
                name: "point_schema",
                value: format!("{:?}", columns),
                reason: "column names must not be empty".into(),
            });
        }
        if columns[0] == columns[1] || columns[0] == columns[2] || columns[1] == columns[2] {
            return Err(Error::InvalidParameter {
                name: "point_schema",
                value: format!("{:?}", columns),
                reason: "taxon, longitude and latitude columns must differ".into(),
            });
        }

        Ok(())
    }
}

//! End-to-end pipeline: load, join, normalize, filter.

use crate::config::PipelineConfig;
use crate::labeling::{normalize_labels, spatial_join, JoinOutput};
use crate::range::{filter_range_set, RangeFilterParams};
use refuge_core::io::{read_ecoregions, read_geotiff, read_points, read_range_archive};
use refuge_core::raster::{RangeSet, Raster};
use refuge_core::vector::FeatureCollection;
use refuge_core::{PointTable, ProtectedCounts, Result};
use tracing::info;

/// Everything a run produces, ready for export.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Points as read from disk
    pub raw: PointTable,
    /// Points with the protected column as sampled (no-data kept)
    pub joined: PointTable,
    /// Points with every protected value in {0, 1}
    pub labeled: PointTable,
    /// Protected raster cropped to the point extent
    pub cropped: Raster<f64>,
    /// Presence-filtered range rasters
    pub ranges: RangeSet,
    /// Ecoregion aggregate, when configured
    pub ecoregions: Option<FeatureCollection>,
    /// Tally of the joined column before no-data became 0
    pub join_counts: ProtectedCounts,
}

/// Pipeline runner
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in order. The first failure aborts the run.
    pub fn run(&self) -> Result<PipelineOutput> {
        self.config.validate()?;

        let points_path = self.config.points_path();
        info!("Loading points from {}", points_path.display());
        let raw = read_points(&points_path, &self.config.point_schema)?;
        info!("Loaded {} points ({} taxa)", raw.len(), raw.taxa().len());

        let raster_path = self.config.protected_raster_path();
        info!("Loading protected raster from {}", raster_path.display());
        let protected: Raster<f64> = read_geotiff(&raster_path, None)?;

        let JoinOutput { table: joined, cropped } = spatial_join(&raw, &protected)?;
        let join_counts = joined.protected_counts().unwrap_or_default();

        let labeled = normalize_labels(&joined)?;

        let archive_path = self.config.range_archive_path();
        info!("Loading range rasters from {}", archive_path.display());
        let ranges = read_range_archive(&archive_path, &self.config.range_species)?;
        let ranges = filter_range_set(
            &ranges,
            RangeFilterParams {
                threshold: self.config.presence_threshold,
            },
        )?;

        let ecoregions = match self.config.ecoregions_path() {
            Some(path) => {
                info!("Loading ecoregions from {}", path.display());
                let fc = read_ecoregions(&path)?;
                info!(
                    "Loaded {} ecoregions ({} samples)",
                    fc.len(),
                    fc.total_count()
                );
                Some(fc)
            }
            None => None,
        };

        Ok(PipelineOutput {
            raw,
            joined,
            labeled,
            cropped,
            ranges,
            ecoregions,
            join_counts,
        })
    }
}

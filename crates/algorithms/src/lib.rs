//! # Refuge Algorithms
//!
//! Processing steps for labelling species occurrence points with
//! protected-area status.
//!
//! ## Modules
//!
//! - **labeling**: spatial join of points to the protected raster, label normalization
//! - **range**: presence filtering of species range rasters
//! - **config**: pipeline configuration
//! - **pipeline**: end-to-end runner
//! - **export**: bundle for the map renderers

pub mod config;
pub mod export;
pub mod labeling;
pub mod pipeline;
pub mod range;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::export::{points_to_features, write_bundle, BundleManifest};
    pub use crate::labeling::{
        drop_unlabeled, normalize_labels, spatial_join, spatial_join_with, JoinOutput,
        LabelNormalizer, SpatialJoin, SpatialJoinParams,
    };
    pub use crate::pipeline::{Pipeline, PipelineOutput};
    pub use crate::range::{
        filter_presence, filter_range_set, RangeFilter, RangeFilterParams, PRESENCE_THRESHOLD,
    };
    pub use refuge_core::prelude::*;
}

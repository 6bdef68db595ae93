//! Protected-area labelling of sample points
//!
//! - Spatial join: crop the protected raster to the points and sample each point
//! - Normalization: no-data samples become explicitly unprotected (0)

mod join;
mod normalize;

pub use join::{spatial_join, spatial_join_with, JoinOutput, SpatialJoin, SpatialJoinParams};
pub use normalize::{drop_unlabeled, normalize_labels, LabelNormalizer};

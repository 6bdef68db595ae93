//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;
mod range_set;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use range_set::RangeSet;

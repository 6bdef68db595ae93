//! Species range raster processing

mod filter;

pub use filter::{
    filter_presence, filter_range_set, RangeFilter, RangeFilterParams, PRESENCE_THRESHOLD,
};

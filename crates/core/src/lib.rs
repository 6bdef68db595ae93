//! # Refuge Core
//!
//! Core types and I/O for labelling species occurrence points with
//! protected-area status.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with crop and point sampling
//! - `GeoTransform` and `BoundingBox`: pixel/geographic conversion and extents
//! - `CRS`: coordinate reference systems and reconciliation
//! - `PointTable`: sample points plus the derived protected column
//! - `FeatureCollection`: polygon aggregates for the 3D view
//! - Readers and writers for CSV, GeoTIFF, zip range archives and GeoJSON

pub mod bbox;
pub mod crs;
pub mod error;
pub mod io;
pub mod points;
pub mod raster;
pub mod vector;

pub use bbox::BoundingBox;
pub use crs::CRS;
pub use error::{Error, Result};
pub use points::{PointSchema, PointTable, ProtectedColumn, ProtectedCounts, SamplePoint};
pub use raster::{GeoTransform, RangeSet, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bbox::BoundingBox;
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::points::{PointTable, ProtectedColumn, SamplePoint};
    pub use crate::raster::{GeoTransform, RangeSet, Raster, RasterElement};
    pub use crate::Algorithm;
}

/// Core trait for the pipeline steps.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}

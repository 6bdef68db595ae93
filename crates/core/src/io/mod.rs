//! I/O for points, rasters, range archives and polygon aggregates

mod archive;
mod geojson;
mod geotiff;
mod points;

pub use self::archive::read_range_archive;
pub use self::geojson::{
    read_ecoregions, read_feature_collection, to_geojson_string, write_feature_collection,
};
pub use self::geotiff::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffOptions,
};
pub use self::points::{read_points, write_points_csv, PROTECTED_COLUMN};

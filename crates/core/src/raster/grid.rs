//! Main Raster type

use crate::bbox::BoundingBox;
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{s, Array2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform, CRS and no-data value).
///
/// # Example
///
/// ```ignore
/// use refuge_core::Raster;
///
/// let mut raster: Raster<f64> = Raster::new(10, 10);
/// raster.set(2, 3, 1.0)?;
/// let value = raster.sample(-111.7, 31.2);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Builder-style transform setter
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder-style CRS setter
    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    /// Builder-style no-data setter
    pub fn with_nodata(mut self, nodata: Option<T>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds of the whole grid
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Map each cell through `f`, keeping transform and CRS.
    ///
    /// The returned raster has no no-data value set; callers pick one.
    pub fn map<U, F>(&self, f: F) -> Raster<U>
    where
        U: RasterElement,
        F: Fn(T) -> U,
    {
        Raster {
            data: self.data.mapv(f),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    /// Cell (col, row) containing the geographic point, if any.
    ///
    /// A point lying exactly on the grid's far edge belongs to the last cell.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.geo_to_pixel(x, y);
        let col = cell_index(col, self.cols())?;
        let row = cell_index(row, self.rows())?;
        Some((col, row))
    }

    /// Value of the cell containing (x, y); `None` outside the grid or on no-data
    pub fn sample(&self, x: f64, y: f64) -> Option<T> {
        let (col, row) = self.cell_at(x, y)?;
        let value = self.data[(row, col)];
        if self.is_nodata(value) {
            None
        } else {
            Some(value)
        }
    }

    /// Sub-grid of whole cells covering `extent`.
    ///
    /// The window snaps outward to cell boundaries and is clipped to the grid.
    /// An extent that misses the grid yields an empty raster rather than an error.
    pub fn crop(&self, extent: &BoundingBox) -> Result<Raster<T>> {
        if !self.transform.is_axis_aligned() {
            return Err(Error::InvalidParameter {
                name: "transform",
                value: format!("{:?}", self.transform),
                reason: "cropping a rotated grid is not supported".into(),
            });
        }

        let empty = || Raster {
            data: Array2::zeros((0, 0)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        };

        if self.is_empty() || !self.bounds().intersects(extent) {
            return Ok(empty());
        }

        let (c0, r0) = self.transform.geo_to_pixel(extent.min_x, extent.max_y);
        let (c1, r1) = self.transform.geo_to_pixel(extent.max_x, extent.min_y);
        if !(c0.is_finite() && c1.is_finite() && r0.is_finite() && r1.is_finite()) {
            return Ok(empty());
        }

        let clamp = |v: f64, n: usize| -> usize { v.floor().max(0.0).min((n - 1) as f64) as usize };
        let (col_lo, col_hi) = (clamp(c0.min(c1), self.cols()), clamp(c0.max(c1), self.cols()));
        let (row_lo, row_hi) = (clamp(r0.min(r1), self.rows()), clamp(r0.max(r1), self.rows()));

        let data = self
            .data
            .slice(s![row_lo..=row_hi, col_lo..=col_hi])
            .to_owned();

        Ok(Raster {
            data,
            transform: self.transform.shifted(col_lo, row_lo),
            crs: self.crs.clone(),
            nodata: self.nodata,
        })
    }

    /// Count of cells holding a value (not no-data)
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }

    /// Basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

fn cell_index(f: f64, n: usize) -> Option<usize> {
    if !f.is_finite() || f < 0.0 || n == 0 {
        return None;
    }
    let i = f.floor() as usize;
    if i < n {
        Some(i)
    } else if f == n as f64 {
        Some(n - 1)
    } else {
        None
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

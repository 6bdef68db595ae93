//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for TIFF I/O and handles the handful of GeoTIFF tags
//! the pipeline needs: pixel scale + tiepoint for the transform, the GeoKey
//! directory for an EPSG code, and GDAL_NODATA.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use num_traits::NumCast;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Write the GDAL_NODATA tag when the raster declares a no-data value
    pub write_nodata: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self { write_nodata: true }
    }
}

/// Read the first band of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file), band)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
///
/// Used for rasters pulled out of zip archives.
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data), band)
}

fn cast_buffer<S, T>(buf: &[S]) -> Vec<T>
where
    S: NumCast + Copy,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast::<S, T>(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decode_geotiff<T, R>(reader: R, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    if let Some(b) = band {
        if b != 1 {
            return Err(Error::InvalidParameter {
                name: "band",
                value: b.to_string(),
                reason: "only single-band rasters are supported".into(),
            });
        }
    }

    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::F32(buf) => cast_buffer(&buf),
        DecodingResult::F64(buf) => cast_buffer(&buf),
        DecodingResult::U8(buf) => cast_buffer(&buf),
        DecodingResult::U16(buf) => cast_buffer(&buf),
        DecodingResult::U32(buf) => cast_buffer(&buf),
        DecodingResult::I8(buf) => cast_buffer(&buf),
        DecodingResult::I16(buf) => cast_buffer(&buf),
        DecodingResult::I32(buf) => cast_buffer(&buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    if data.len() != rows * cols {
        // Multi-sample images decode to rows * cols * samples values
        return Err(Error::UnsupportedDataType(format!(
            "expected one sample per pixel, got {} values for {}x{}",
            data.len(),
            cols,
            rows
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    raster.set_nodata(read_nodata(&mut decoder));

    Ok(raster)
}

/// GeoTransform from ModelPixelScaleTag + ModelTiepointTag
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// EPSG code from the GeoKey directory, if one is declared inline
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    parse_geokeys(&keys)
}

fn parse_geokeys(keys: &[u16]) -> Option<CRS> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let mut geographic = None;
    let mut projected = None;
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            GEOGRAPHIC_TYPE_KEY => geographic = Some(value),
            PROJECTED_CS_TYPE_KEY => projected = Some(value),
            _ => {}
        }
    }
    projected.or(geographic).map(|code| CRS::from_epsg(code as u32))
}

fn read_nodata<T, R>(decoder: &mut Decoder<R>) -> Option<T>
where
    T: RasterElement,
    R: Read + Seek,
{
    let raw = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    let value: f64 = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0').parse().ok()?;
    if value.is_nan() {
        return T::is_float().then(T::default_nodata);
    }
    num_traits::cast::<f64, T>(value)
}

/// Build the GeoKey directory for a CRS
fn geokeys_for(crs: Option<&CRS>) -> Vec<u16> {
    let code = crs
        .and_then(CRS::epsg)
        .and_then(|c| u16::try_from(c).ok());

    match (crs, code) {
        (Some(crs), Some(code)) if crs.is_geographic() => vec![
            1, 1, 0, 3,
            GT_MODEL_TYPE_KEY, 0, 1, 2,
            GT_RASTER_TYPE_KEY, 0, 1, 1,
            GEOGRAPHIC_TYPE_KEY, 0, 1, code,
        ],
        (Some(_), Some(code)) => vec![
            1, 1, 0, 3,
            GT_MODEL_TYPE_KEY, 0, 1, 1,
            GT_RASTER_TYPE_KEY, 0, 1, 1,
            PROJECTED_CS_TYPE_KEY, 0, 1, code,
        ],
        _ => vec![
            1, 1, 0, 2,
            GT_MODEL_TYPE_KEY, 0, 1, 1,
            GT_RASTER_TYPE_KEY, 0, 1, 1,
        ],
    }
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(
    raster: &Raster<T>,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer, &options.unwrap_or_default())?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(
    raster: &Raster<T>,
    options: Option<GeoTiffOptions>,
) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), &options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let (rows, cols) = raster.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut encoder = TiffEncoder::new(writer)?;

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;

    let geokeys = geokeys_for(raster.crs());
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())?;

    if options.write_nodata {
        if let Some(nd) = raster.nodata().and_then(RasterElement::to_f64) {
            let text = if nd.is_nan() { "nan".to_string() } else { nd.to_string() };
            image
                .encoder()
                .write_tag(Tag::GdalNodata, text.as_str())?;
        }
    }

    image.write_data(&data)?;

    Ok(())
}

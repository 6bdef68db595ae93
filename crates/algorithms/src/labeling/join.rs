//! Spatial join of sample points against the protected-area raster
//!
//! Reconciles the two reference systems, crops the raster to the points'
//! extent and samples the cell under each point.

use refuge_core::raster::Raster;
use refuge_core::{Algorithm, Error, PointTable, ProtectedColumn, Result, CRS};
use tracing::{debug, info, warn};

/// Parameters for the spatial join
#[derive(Debug, Clone)]
pub struct SpatialJoinParams {
    /// CRS assumed for a raster that carries none
    pub fallback_crs: CRS,
}

impl Default for SpatialJoinParams {
    fn default() -> Self {
        Self {
            fallback_crs: CRS::wgs84(),
        }
    }
}

/// Result of joining points to the protected-area raster
#[derive(Debug, Clone)]
pub struct JoinOutput {
    /// Input points in input order, with CRS and protected column attached
    pub table: PointTable,
    /// Protected-area raster cropped to the points' extent
    pub cropped: Raster<f64>,
}

/// Spatial join algorithm
#[derive(Debug, Clone, Default)]
pub struct SpatialJoin;

impl Algorithm for SpatialJoin {
    type Input = (PointTable, Raster<f64>);
    type Output = JoinOutput;
    type Params = SpatialJoinParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Spatial join"
    }

    fn description(&self) -> &'static str {
        "Sample the protected-area raster under each point, cropped to the point extent"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        spatial_join_with(&input.0, &input.1, &params)
    }
}

/// Join points to the raster with default parameters
pub fn spatial_join(points: &PointTable, raster: &Raster<f64>) -> Result<JoinOutput> {
    spatial_join_with(points, raster, &SpatialJoinParams::default())
}

/// Join points to the raster.
///
/// Steps, in order:
/// 1. reconcile the point and raster CRS (no reprojection; disagreement is an error),
/// 2. crop the raster to the minimal cell window covering every point,
/// 3. sample the cropped raster at each point; outside or no-data cells give `None`.
///
/// The output has one protected entry per input row, in input order.
pub fn spatial_join_with(
    points: &PointTable,
    raster: &Raster<f64>,
    params: &SpatialJoinParams,
) -> Result<JoinOutput> {
    let crs = reconcile_crs(points, raster, params)?;

    let mut cropped = match points.bounds() {
        Some(extent) => raster.crop(&extent)?,
        None => raster.crop(&raster.bounds())?,
    };
    cropped.set_crs(Some(crs.clone()));
    debug!(
        "Cropped protected raster from {}x{} to {}x{}",
        raster.cols(),
        raster.rows(),
        cropped.cols(),
        cropped.rows()
    );

    let column = ProtectedColumn(points.iter().map(|p| cropped.sample(p.lon, p.lat)).collect());

    let non_binary = column
        .values()
        .iter()
        .flatten()
        .filter(|&&v| v != 0.0 && v != 1.0)
        .count();
    if non_binary > 0 {
        warn!(
            "{} sampled protected values are neither 0 nor 1; they are kept as-is",
            non_binary
        );
    }

    let counts = column.counts();
    info!(
        "Joined {} points: {} protected, {} unprotected, {} no data",
        points.len(),
        counts.protected,
        counts.unprotected,
        counts.nodata
    );

    let table = points.clone().with_crs(Some(crs)).with_protected(column)?;
    Ok(JoinOutput { table, cropped })
}

/// Pick the CRS both datasets share.
///
/// Point coordinates are longitude/latitude unless the table says otherwise, so
/// a projected raster cannot be sampled by an untagged table.
fn reconcile_crs(points: &PointTable, raster: &Raster<f64>, params: &SpatialJoinParams) -> Result<CRS> {
    let raster_crs = match raster.crs() {
        Some(crs) => crs.clone(),
        None => {
            warn!(
                "Protected raster has no CRS; assuming {}",
                params.fallback_crs
            );
            params.fallback_crs.clone()
        }
    };

    if points.crs().is_none() && !raster_crs.is_geographic() {
        return Err(Error::CrsMismatch(
            "geographic point coordinates".to_string(),
            raster_crs.identifier(),
        ));
    }

    let crs = CRS::reconcile(points.crs(), Some(&raster_crs))?.unwrap_or(raster_crs);
    debug!("Point table CRS set to {}", crs);
    Ok(crs)
}

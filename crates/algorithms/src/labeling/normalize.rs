//! Label normalization: no-data protected values become 0

use refuge_core::{Algorithm, Error, PointTable, ProtectedColumn, Result};
use tracing::info;

/// Label normalizer
#[derive(Debug, Clone, Default)]
pub struct LabelNormalizer;

impl Algorithm for LabelNormalizer {
    type Input = PointTable;
    type Output = PointTable;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Label normalizer"
    }

    fn description(&self) -> &'static str {
        "Rewrite missing protected-area samples as explicitly unprotected (0)"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        normalize_labels(&input)
    }
}

/// Replace every no-data protected value with 0, keeping all rows.
///
/// Points outside the raster and points on unprotected cells become
/// indistinguishable afterwards; count no-data on the joined table first if
/// that distinction matters. Applying this twice equals applying it once.
pub fn normalize_labels(table: &PointTable) -> Result<PointTable> {
    let column = table.protected().ok_or(Error::NotJoined)?;
    let normalized = column.normalize();

    let filled = column.counts().nodata;
    if filled > 0 {
        info!("Labelled {} no-data points as unprotected", filled);
    }

    table.clone().with_protected(normalized)
}

/// Alternative to [`normalize_labels`] that drops no-data rows instead of relabelling them.
pub fn drop_unlabeled(table: &PointTable) -> Result<PointTable> {
    let column = table.protected().ok_or(Error::NotJoined)?;

    let (points, values): (Vec<_>, Vec<_>) = table
        .iter()
        .zip(column.values())
        .filter(|(_, v)| v.is_some())
        .map(|(p, v)| (p.clone(), *v))
        .unzip();

    PointTable::new(table.schema().clone(), points)
        .with_crs(table.crs().cloned())
        .with_protected(ProtectedColumn(values))
}

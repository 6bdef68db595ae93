//! Sample point tables and the derived protected column

use crate::bbox::BoundingBox;
use crate::crs::CRS;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One observed occurrence record.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePoint {
    pub taxon: String,
    pub lon: f64,
    pub lat: f64,
    /// Extra observation columns, aligned with [`PointSchema::extra_columns`]
    pub attributes: Vec<String>,
}

impl SamplePoint {
    pub fn new(taxon: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            taxon: taxon.into(),
            lon,
            lat,
            attributes: Vec::new(),
        }
    }
}

/// Column layout of a point table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSchema {
    pub taxon_column: String,
    pub lon_column: String,
    pub lat_column: String,
    /// Remaining source columns, in file order
    #[serde(default)]
    pub extra_columns: Vec<String>,
}

impl Default for PointSchema {
    fn default() -> Self {
        Self {
            taxon_column: "species".to_string(),
            lon_column: "longitude".to_string(),
            lat_column: "latitude".to_string(),
            extra_columns: Vec::new(),
        }
    }
}

/// Per-point protected-area value; `None` means no data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProtectedColumn(pub Vec<Option<f64>>);

impl ProtectedColumn {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.0
    }

    /// Replace every no-data entry with 0; other values pass through.
    ///
    /// Outside-extent and explicitly unprotected points both end up as 0.
    pub fn normalize(&self) -> ProtectedColumn {
        ProtectedColumn(self.0.iter().map(|v| Some(v.unwrap_or(0.0))).collect())
    }

    pub fn is_fully_labeled(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    /// True when every entry is exactly 0 or 1
    pub fn is_binary(&self) -> bool {
        self.0.iter().all(|v| matches!(v, Some(x) if *x == 0.0 || *x == 1.0))
    }

    /// Binary flags, failing on any entry that is not exactly 0 or 1
    pub fn as_flags(&self) -> Result<Vec<u8>> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(x) if *x == 0.0 => Ok(0),
                Some(x) if *x == 1.0 => Ok(1),
                Some(_) => Err(Error::InvalidParameter {
                    name: "protected",
                    value: format!("{:?}", v),
                    reason: format!("row {} is neither 0 nor 1", i),
                }),
                None => Err(Error::InvalidParameter {
                    name: "protected",
                    value: format!("{:?}", v),
                    reason: format!("row {} is not labelled", i),
                }),
            })
            .collect()
    }

    pub fn counts(&self) -> ProtectedCounts {
        let mut counts = ProtectedCounts::default();
        for v in &self.0 {
            match v {
                Some(x) if *x >= 1.0 => counts.protected += 1,
                Some(_) => counts.unprotected += 1,
                None => counts.nodata += 1,
            }
        }
        counts
    }
}

/// Tally of the protected column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedCounts {
    pub protected: usize,
    pub unprotected: usize,
    pub nodata: usize,
}

/// Sample points plus CRS and the optional derived protected column.
#[derive(Debug, Clone, PartialEq)]
pub struct PointTable {
    schema: PointSchema,
    points: Vec<SamplePoint>,
    crs: Option<CRS>,
    protected: Option<ProtectedColumn>,
}

impl PointTable {
    pub fn new(schema: PointSchema, points: Vec<SamplePoint>) -> Self {
        Self {
            schema,
            points,
            crs: None,
            protected: None,
        }
    }

    pub fn schema(&self) -> &PointSchema {
        &self.schema
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &SamplePoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    pub fn protected(&self) -> Option<&ProtectedColumn> {
        self.protected.as_ref()
    }

    /// Attach a protected column; it must have one entry per row
    pub fn with_protected(mut self, column: ProtectedColumn) -> Result<Self> {
        if column.len() != self.points.len() {
            return Err(Error::SizeMismatch {
                expected: self.points.len(),
                actual: column.len(),
            });
        }
        self.protected = Some(column);
        Ok(self)
    }

    /// Extent of all point coordinates
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_coords(self.points.iter().map(|p| (p.lon, p.lat)))
    }

    /// Distinct taxa in first-seen order
    pub fn taxa(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for p in &self.points {
            if !seen.contains(&p.taxon.as_str()) {
                seen.push(&p.taxon);
            }
        }
        seen
    }

    pub fn count_by_taxon(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for p in &self.points {
            *counts.entry(p.taxon.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn protected_counts(&self) -> Option<ProtectedCounts> {
        self.protected.as_ref().map(ProtectedColumn::counts)
    }
}

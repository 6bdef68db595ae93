//! Coordinate Reference System handling

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// EPSG codes of the geographic (lon/lat) systems sample points are recorded in.
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4269, 4258, 4283, 4674, 4617];

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Whether coordinates in this CRS are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        if let Some(code) = self.epsg {
            return GEOGRAPHIC_EPSG.contains(&code);
        }
        if let Some(proj) = &self.proj {
            return proj.contains("+proj=longlat") || proj.contains("+proj=latlong");
        }
        if let Some(wkt) = &self.wkt {
            let head = wkt.trim_start();
            return head.starts_with("GEOGCS") || head.starts_with("GEOGCRS");
        }
        false
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return normalize_proj(a) == normalize_proj(b);
        }

        false
    }

    /// Pick the CRS two datasets share, failing when they disagree.
    ///
    /// A side without a CRS adopts the other's. When neither side has one the
    /// result is `None`. No reprojection is attempted.
    pub fn reconcile(ours: Option<&CRS>, theirs: Option<&CRS>) -> Result<Option<CRS>> {
        match (ours, theirs) {
            (Some(a), Some(b)) => {
                if a.is_equivalent(b) {
                    Ok(Some(a.clone()))
                } else {
                    Err(Error::CrsMismatch(a.identifier(), b.identifier()))
                }
            }
            (Some(a), None) => Ok(Some(a.clone())),
            (None, Some(b)) => Ok(Some(b.clone())),
            (None, None) => Ok(None),
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let head: String = wkt.chars().take(50).collect();
            return format!("WKT:{}", head);
        }
        "Unknown".to_string()
    }
}

fn normalize_proj(s: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = s.split_whitespace().filter(|p| *p != "+no_defs").collect();
    parts.sort_unstable();
    parts
}

impl FromStr for CRS {
    type Err = Error;

    /// Accepts `EPSG:<code>`, a bare code, a PROJ string or WKT.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidParameter {
                name: "crs",
                value: s.to_string(),
                reason: "empty CRS definition".into(),
            });
        }

        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        if let Ok(code) = code.parse::<u32>() {
            return Ok(CRS::from_epsg(code));
        }
        if trimmed.starts_with('+') {
            return Ok(CRS::from_proj(trimmed));
        }
        Ok(CRS::from_wkt(trimmed))
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

//! Presence filtering of species range rasters
//!
//! Model outputs encode predicted presence as values >= 1. Everything below
//! the threshold becomes no-data so only presence cells render.

use refuge_core::raster::{RangeSet, Raster};
use refuge_core::{Algorithm, Error, Result};
use tracing::{debug, info};

/// Default presence threshold
pub const PRESENCE_THRESHOLD: f64 = 1.0;

/// Parameters for presence filtering
#[derive(Debug, Clone, Copy)]
pub struct RangeFilterParams {
    /// Cells strictly below this value are masked
    pub threshold: f64,
}

impl Default for RangeFilterParams {
    fn default() -> Self {
        Self {
            threshold: PRESENCE_THRESHOLD,
        }
    }
}

impl RangeFilterParams {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "threshold",
                value: self.threshold.to_string(),
                reason: "must be a finite number".into(),
            });
        }
        Ok(())
    }
}

/// Range filter algorithm
#[derive(Debug, Clone, Default)]
pub struct RangeFilter;

impl Algorithm for RangeFilter {
    type Input = RangeSet;
    type Output = RangeSet;
    type Params = RangeFilterParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Range filter"
    }

    fn description(&self) -> &'static str {
        "Mask range-raster cells below the presence threshold as no-data"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        filter_range_set(&input, params)
    }
}

/// Mask every cell below `threshold` (and every existing no-data cell) as NaN.
///
/// The input raster is left untouched; the result carries NaN as its no-data value.
pub fn filter_presence(raster: &Raster<f64>, threshold: f64) -> Raster<f64> {
    let nodata = raster.nodata();
    raster
        .map(|v| {
            if v.is_nan() || nodata.map_or(false, |nd| v == nd) || v < threshold {
                f64::NAN
            } else {
                v
            }
        })
        .with_nodata(Some(f64::NAN))
}

/// Filter each species' raster independently
pub fn filter_range_set(ranges: &RangeSet, params: RangeFilterParams) -> Result<RangeSet> {
    params.validate()?;

    let mut out = RangeSet::new();
    for (species, raster) in ranges.iter() {
        let filtered = filter_presence(raster, params.threshold);
        let presence = filtered.valid_count();
        debug!(
            "{}: {} of {} cells at or above {}",
            species,
            presence,
            raster.len(),
            params.threshold
        );
        out.insert(species, filtered)?;
    }
    info!("Filtered {} range rasters", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(r: &Raster<f64>) -> Vec<Option<f64>> {
        r.data()
            .iter()
            .map(|&v| if v.is_nan() { None } else { Some(v) })
            .collect()
    }

    #[test]
    fn test_filter_example() {
        let r = Raster::from_vec(vec![0.0, 1.0, f64::NAN, 2.0], 2, 2).unwrap();
        let f = filter_presence(&r, PRESENCE_THRESHOLD);
        assert_eq!(values(&f), vec![None, Some(1.0), None, Some(2.0)]);
        assert!(f.nodata().unwrap().is_nan());
    }

    #[test]
    fn test_filter_is_pure_and_idempotent() {
        let r = Raster::from_vec(vec![0.5, 1.0, 3.0, -1.0], 2, 2).unwrap();
        let before = values(&r);
        let once = filter_presence(&r, PRESENCE_THRESHOLD);
        let twice = filter_presence(&once, PRESENCE_THRESHOLD);
        assert_eq!(values(&r), before);
        assert_eq!(values(&once), values(&twice));
    }

    #[test]
    fn test_declared_nodata_masked() {
        let r = Raster::from_vec(vec![-9999.0, 5.0], 1, 2)
            .unwrap()
            .with_nodata(Some(-9999.0));
        assert_eq!(values(&filter_presence(&r, -10000.0)), vec![None, Some(5.0)]);
    }

    #[test]
    fn test_postcondition_over_range_set() {
        let mut set = RangeSet::new();
        set.insert("a", Raster::from_vec(vec![0.0, 0.99, 1.0, 7.0], 2, 2).unwrap()).unwrap();
        set.insert("b", Raster::from_vec(vec![f64::NAN, 1.5, 0.2, 1.0], 2, 2).unwrap()).unwrap();

        let out = RangeFilter.execute_default(set.clone()).unwrap();
        assert_eq!(out.species().collect::<Vec<_>>(), vec!["a", "b"]);
        for (_, r) in out.iter() {
            assert!(r.data().iter().all(|&v| v.is_nan() || v >= 1.0));
        }
        assert_eq!(out.get("a").unwrap().valid_count(), 2);
        assert_eq!(out.get("b").unwrap().valid_count(), 2);
    }

    #[test]
    fn test_species_independent() {
        let a = Raster::from_vec(vec![0.0, 2.0], 1, 2).unwrap();
        let b = Raster::from_vec(vec![3.0, 0.0], 1, 2).unwrap();

        let mut both = RangeSet::new();
        both.insert("a", a.clone()).unwrap();
        both.insert("b", b.clone()).unwrap();
        let mut only_b = RangeSet::new();
        only_b.insert("b", b).unwrap();

        let from_both = filter_range_set(&both, RangeFilterParams::default()).unwrap();
        let from_b = filter_range_set(&only_b, RangeFilterParams::default()).unwrap();
        assert_eq!(
            values(from_both.get("b").unwrap()),
            values(from_b.get("b").unwrap())
        );
    }

    #[test]
    fn test_invalid_threshold() {
        let params = RangeFilterParams { threshold: f64::NAN };
        assert!(filter_range_set(&RangeSet::new(), params).is_err());
    }
}

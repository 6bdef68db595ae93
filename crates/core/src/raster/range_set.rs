//! Named per-species range rasters

use crate::error::{Error, Result};
use crate::raster::Raster;

/// Ordered collection of species range rasters keyed by species name.
#[derive(Debug, Clone, Default)]
pub struct RangeSet {
    entries: Vec<(String, Raster<f64>)>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a species raster; names must be unique
    pub fn insert(&mut self, species: impl Into<String>, raster: Raster<f64>) -> Result<()> {
        let species = species.into();
        if self.get(&species).is_some() {
            return Err(Error::DuplicateSpecies(species));
        }
        self.entries.push((species, raster));
        Ok(())
    }

    pub fn get(&self, species: &str) -> Option<&Raster<f64>> {
        self.entries
            .iter()
            .find(|(name, _)| name == species)
            .map(|(_, raster)| raster)
    }

    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.entries.iter().map(|(name, raster)| (name.as_str(), raster))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for RangeSet {
    type Item = (String, Raster<f64>);
    type IntoIter = std::vec::IntoIter<(String, Raster<f64>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

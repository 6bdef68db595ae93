//! Vector features: ecoregion polygon aggregates and exported point features

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value; floats with no fractional part also qualify
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            AttributeValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// Best-effort typing of a raw CSV cell.
    ///
    /// Codes with leading zeros ("007") and non-finite numbers ("NaN", "inf")
    /// stay strings so no text is lost.
    pub fn guess(raw: &str) -> Self {
        if raw.is_empty() {
            return AttributeValue::Null;
        }
        if !has_leading_zero(raw) {
            if let Ok(i) = raw.parse::<i64>() {
                return AttributeValue::Int(i);
            }
            if let Ok(f) = raw.parse::<f64>() {
                if f.is_finite() {
                    return AttributeValue::Float(f);
                }
            }
        }
        match raw {
            "TRUE" | "true" => AttributeValue::Bool(true),
            "FALSE" | "false" => AttributeValue::Bool(false),
            _ => AttributeValue::String(raw.to_string()),
        }
    }
}

fn has_leading_zero(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    let mut chars = digits.chars();
    chars.next() == Some('0') && chars.next().map_or(false, |c| c.is_ascii_digit())
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    AttributeValue::Int(i)
                } else {
                    AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => AttributeValue::String(s),
            other => AttributeValue::String(other.to_string()),
        }
    }
}

impl From<&AttributeValue> for serde_json::Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Int(i) => serde_json::Value::from(*i),
            AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    /// Attributes, ordered by key so exports are stable
    pub properties: BTreeMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: BTreeMap::new(),
            id: None,
        }
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Ecoregion name
    pub fn name(&self) -> Option<&str> {
        self.get_property("name").and_then(AttributeValue::as_str)
    }

    /// Species-sample count within the ecoregion
    pub fn count(&self) -> Option<i64> {
        self.get_property("count").and_then(AttributeValue::as_i64)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Sum of the `count` attribute over all features
    pub fn total_count(&self) -> i64 {
        self.features.iter().filter_map(Feature::count).sum()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

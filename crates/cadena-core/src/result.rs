//! Analyzer results and the per-pipe container they accumulate in.
//!
//! Every pipe owns one [`ResultContainer`]; after `post_process` the
//! engine collects each analyzer's [`AnalyzerResult`] into it, replacing
//! any earlier result under the same id. Results survive across runs of
//! the same pipe, so a stacked pipe can be re-run and compared.

use serde::Serialize;

/// The value carried by an analyzer result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalyzerValue {
    /// A single number (peak level, RMS, centroid, ...).
    Scalar(f64),
    /// A sequence of numbers over time (envelope, per-window series).
    Series(Vec<f64>),
}

impl AnalyzerValue {
    /// The scalar value, if this is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            AnalyzerValue::Scalar(v) => Some(*v),
            AnalyzerValue::Series(_) => None,
        }
    }

    /// The series values, if this is one.
    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            AnalyzerValue::Scalar(_) => None,
            AnalyzerValue::Series(v) => Some(v),
        }
    }
}

/// One finished analyzer output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzerResult {
    /// Id of the analyzer that produced this (its processor id).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Unit of the value(s).
    pub unit: String,
    /// The value itself.
    pub value: AnalyzerValue,
}

impl AnalyzerResult {
    /// Build a scalar result.
    pub fn scalar(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit: unit.into(),
            value: AnalyzerValue::Scalar(value),
        }
    }

    /// Build a series result.
    pub fn series(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit: unit.into(),
            value: AnalyzerValue::Series(values),
        }
    }
}

/// Ordered collection of analyzer results, keyed by analyzer id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultContainer {
    results: Vec<AnalyzerResult>,
}

impl ResultContainer {
    /// An empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, replacing any earlier one with the same id.
    pub fn insert(&mut self, result: AnalyzerResult) {
        match self.results.iter_mut().find(|r| r.id == result.id) {
            Some(slot) => *slot = result,
            None => self.results.push(result),
        }
    }

    /// Look up a result by analyzer id.
    pub fn get(&self, id: &str) -> Option<&AnalyzerResult> {
        self.results.iter().find(|r| r.id == id)
    }

    /// Ids of all stored results, in insertion order.
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.id.as_str()).collect()
    }

    /// Iterate over the stored results.
    pub fn iter(&self) -> std::slice::Iter<'_, AnalyzerResult> {
        self.results.iter()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Serialize all results as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a ResultContainer {
    type Item = &'a AnalyzerResult;
    type IntoIter = std::slice::Iter<'a, AnalyzerResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_by_id() {
        let mut container = ResultContainer::new();
        container.insert(AnalyzerResult::scalar("max_level", "Max level", "", 0.5));
        container.insert(AnalyzerResult::scalar("rms_level", "RMS level", "dB", -12.0));
        container.insert(AnalyzerResult::scalar("max_level", "Max level", "", 0.9));

        assert_eq!(container.len(), 2);
        assert_eq!(container.get("max_level").unwrap().value.as_scalar(), Some(0.9));
        assert_eq!(container.ids(), vec!["max_level", "rms_level"]);
    }

    #[test]
    fn get_unknown_id_is_none() {
        assert!(ResultContainer::new().get("nope").is_none());
    }

    #[test]
    fn json_export_is_untagged() {
        let mut container = ResultContainer::new();
        container.insert(AnalyzerResult::scalar("max_level", "Max level", "", 0.5));
        container.insert(AnalyzerResult::series("rms_envelope", "RMS envelope", "dB", vec![-6.0, -9.0]));
        let json = container.to_json().unwrap();
        assert!(json.contains("\"value\": 0.5"));
        assert!(json.contains("-9.0"));
        assert!(!json.contains("Scalar"));
    }

    #[test]
    fn series_accessors() {
        let result = AnalyzerResult::series("rms_envelope", "RMS envelope", "dB", vec![1.0]);
        assert_eq!(result.value.as_series(), Some(&[1.0][..]));
        assert_eq!(result.value.as_scalar(), None);
    }
}

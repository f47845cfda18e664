//! Numeric threshold filter for remote states

use serde::{Deserialize, Serialize};
use std::fmt;

/// One numeric-threshold filter rule for a remote entity.
///
/// Filters are stored as an ordered list; list order is display order and
/// has no further meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFilter {
    pub entity_id: String,
    pub unit_of_measurement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<f64>,
}

impl NumericFilter {
    /// Display label shown in the filter multi-select.
    ///
    /// The leading number is the 1-based position in the working filter list
    /// and is parsed back by [`selected_filter_index`] on submission.
    pub fn label(&self, index: usize) -> String {
        format!(
            "{}. {}, unit: {}, above: {}, below: {}",
            index + 1,
            self.entity_id,
            self.unit_of_measurement,
            Bound(self.above),
            Bound(self.below),
        )
    }
}

struct Bound(Option<f64>);

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "none"),
        }
    }
}

/// Recover the 0-based filter index from a selected label.
pub fn selected_filter_index(label: &str) -> Option<usize> {
    let number: usize = label.split('.').next()?.trim().parse().ok()?;
    number.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NumericFilter {
        NumericFilter {
            entity_id: "sensor.a".into(),
            unit_of_measurement: "C".into(),
            above: Some(10.0),
            below: Some(20.0),
        }
    }

    #[test]
    fn test_label_format() {
        assert_eq!(sample().label(0), "1. sensor.a, unit: C, above: 10, below: 20");
    }

    #[test]
    fn test_label_keeps_fractional_bounds() {
        let filter = NumericFilter {
            above: Some(10.5),
            ..sample()
        };
        assert_eq!(
            filter.label(2),
            "3. sensor.a, unit: C, above: 10.5, below: 20"
        );
    }

    #[test]
    fn test_label_without_bounds() {
        let filter = NumericFilter {
            above: None,
            below: None,
            ..sample()
        };
        assert_eq!(filter.label(0), "1. sensor.a, unit: C, above: none, below: none");
    }

    #[test]
    fn test_selected_filter_index() {
        assert_eq!(selected_filter_index(&sample().label(0)), Some(0));
        assert_eq!(selected_filter_index("12. sensor.b, unit: , above: 1, below: 2"), Some(11));
        assert_eq!(selected_filter_index("not a label"), None);
        assert_eq!(selected_filter_index("0. underflow"), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&sample()).unwrap();
        let parsed: NumericFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_missing_bounds_deserialize() {
        let parsed: NumericFilter =
            serde_json::from_str(r#"{"entity_id":"sensor.a","unit_of_measurement":"C"}"#).unwrap();
        assert_eq!(parsed.above, None);
        assert_eq!(parsed.below, None);
    }
}

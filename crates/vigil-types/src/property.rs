//! Health properties reported by watched services.
//!
//! A property is one named attribute inside a service's monitor payload,
//! such as a queue depth or an active-session count. Values are a closed
//! set of shapes so change detection can compare them structurally.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Properties keyed by their machine key, ordered for stable rendering.
pub type PropertyMap = BTreeMap<String, Property>;

/// A single health attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Display label, distinct from the machine key
    pub name: String,

    /// Reported value; `None` when the upstream omitted it entirely
    #[serde(
        default,
        deserialize_with = "deserialize_defined",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<PropertyValue>,

    /// Whether value changes surface as "modified" events
    #[serde(default)]
    pub watch_for_change: bool,
}

impl Property {
    /// A property whose value changes are reported.
    pub fn watched(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            watch_for_change: true,
        }
    }

    /// A property that is shown but never reported as modified.
    pub fn informational(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            watch_for_change: false,
        }
    }

    /// Whether the upstream supplied a value at all.
    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    /// Value in its display form.
    pub fn display_value(&self) -> String {
        match &self.value {
            Some(value) => value.to_string(),
            None => "undefined".to_string(),
        }
    }
}

// A present-but-null value must stay distinguishable from an absent one.
fn deserialize_defined<'de, D>(deserializer: D) -> Result<Option<PropertyValue>, D::Error>
where
    D: Deserializer<'de>,
{
    PropertyValue::deserialize(deserializer).map(Some)
}

/// Value of a health property.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Deep, field-by-field equality.
    ///
    /// Numbers compare by numeric value regardless of representation, maps
    /// compare by key set and per-key value, lists compare element-wise in
    /// order.
    pub fn structurally_equals(&self, other: &Self) -> bool {
        use PropertyValue::*;

        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => floats_equal(*a, *b),
            (Integer(a), Float(b)) | (Float(b), Integer(a)) => integer_equals_float(*a, *b),
            (Text(a), Text(b)) => a == b,
            (List(a), List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structurally_equals(y))
            }
            (Map(a), Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, x)| {
                        b.get(key).is_some_and(|y| x.structurally_equals(y))
                    })
            }
            _ => false,
        }
    }
}

fn floats_equal(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Exact comparison; `a as f64` would round integers above 2^53.
fn integer_equals_float(a: i64, b: f64) -> bool {
    // 2^63, the first float past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    b.fract() == 0.0 && (-LIMIT..LIMIT).contains(&b) && b as i64 == a
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_equals(other)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(x) => write!(f, "{}", x),
            PropertyValue::Text(s) => write!(f, "{}", s),
            PropertyValue::List(_) | PropertyValue::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                write!(f, "{}", json)
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(PropertyValue::Integer)
            .unwrap_or(PropertyValue::Float(value as f64))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => PropertyValue::Text(s),
            serde_json::Value::Array(items) => {
                PropertyValue::List(items.into_iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(fields) => PropertyValue::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, PropertyValue::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_maps_compare_field_by_field() {
        let a = PropertyValue::from(json!({"db": {"primary": "up", "replicas": [1, 2]}}));
        let b = PropertyValue::from(json!({"db": {"replicas": [1, 2], "primary": "up"}}));
        let c = PropertyValue::from(json!({"db": {"primary": "up", "replicas": [2, 1]}}));

        assert!(a.structurally_equals(&b));
        assert!(!a.structurally_equals(&c));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert_eq!(PropertyValue::Integer(5), PropertyValue::Float(5.0));
        assert_ne!(PropertyValue::Integer(5), PropertyValue::Float(5.5));
        assert_eq!(PropertyValue::Float(f64::NAN), PropertyValue::Float(f64::NAN));
        assert_ne!(PropertyValue::Integer(1), PropertyValue::Bool(true));
        assert_ne!(PropertyValue::from("5"), PropertyValue::Integer(5));
    }

    #[test]
    fn test_large_integers_compare_exactly_with_floats() {
        // 2^53 + 1 has no f64 representation; the nearest float is 2^53.
        let big = PropertyValue::Integer(9_007_199_254_740_993);
        assert_ne!(big, PropertyValue::Float(9_007_199_254_740_992.0));
        assert_ne!(PropertyValue::Float(9_007_199_254_740_992.0), big);
        assert_eq!(
            PropertyValue::Integer(9_007_199_254_740_992),
            PropertyValue::Float(9_007_199_254_740_992.0)
        );

        // i64::MAX as f64 rounds up to 2^63, which is out of range.
        assert_ne!(PropertyValue::Integer(i64::MAX), PropertyValue::Float(i64::MAX as f64));
        assert_eq!(PropertyValue::Integer(i64::MIN), PropertyValue::Float(i64::MIN as f64));
        assert_ne!(PropertyValue::Integer(0), PropertyValue::Float(f64::NAN));
        assert_ne!(PropertyValue::Integer(0), PropertyValue::Float(f64::INFINITY));
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(PropertyValue::from("ready").to_string(), "ready");
        assert_eq!(PropertyValue::Integer(42).to_string(), "42");
        assert_eq!(PropertyValue::Float(0.25).to_string(), "0.25");
        assert_eq!(PropertyValue::Null.to_string(), "null");
        assert_eq!(
            PropertyValue::from(json!({"b": 1, "a": [true, "x"]})).to_string(),
            r#"{"a":[true,"x"],"b":1}"#
        );
    }

    #[test]
    fn test_absent_value_differs_from_null() {
        let absent: Property =
            serde_json::from_value(json!({"name": "Depth", "watchForChange": true})).unwrap();
        let null: Property =
            serde_json::from_value(json!({"name": "Depth", "value": null})).unwrap();

        assert!(!absent.is_defined());
        assert!(absent.watch_for_change);
        assert_eq!(absent.display_value(), "undefined");

        assert_eq!(null.value, Some(PropertyValue::Null));
        assert!(!null.watch_for_change);
    }

    #[test]
    fn test_property_roundtrips_through_storage_json() {
        let property = Property::watched("Active sessions", 12i64);
        let stored = serde_json::to_value(&property).unwrap();
        assert_eq!(
            stored,
            json!({"name": "Active sessions", "value": 12, "watchForChange": true})
        );

        let restored: Property = serde_json::from_value(stored).unwrap();
        assert_eq!(restored, property);
    }
}

//! Shrike Scalar Schema
//!
//! This module defines the value type shared by event data and rule
//! condition literals. Every value that flows through the engine is one of
//! exactly four scalar shapes.

use std::fmt;

/// Wall-clock timestamp in nanoseconds since the Unix epoch
pub type TimestampWall = u64;

/// Scalar value carried in event data maps and condition literals
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    I64(i64),
    F64(f64),
    Bool(bool),
    String(String),
}

impl ScalarValue {
    /// Get as i64 if this is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as f64, promoting integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::F64(v) => Some(*v),
            ScalarValue::I64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as bool if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as string slice if possible
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// True for the two arithmetic variants
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarValue::I64(_) | ScalarValue::F64(_))
    }

    /// Name of the variant's tag, used in diagnostics
    pub fn tag(&self) -> &'static str {
        match self {
            ScalarValue::I64(_) => "integer",
            ScalarValue::F64(_) => "float",
            ScalarValue::Bool(_) => "boolean",
            ScalarValue::String(_) => "string",
        }
    }

    /// Convert a JSON scalar into a `ScalarValue`.
    ///
    /// Integers map to `I64`, every other number to `F64`. Null, arrays,
    /// and objects have no scalar form and yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<ScalarValue> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ScalarValue::I64(i))
                } else {
                    n.as_f64().map(ScalarValue::F64)
                }
            }
            serde_json::Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            serde_json::Value::String(s) => Some(ScalarValue::String(s.clone())),
            _ => None,
        }
    }

    /// Convert back into a plain JSON scalar
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarValue::I64(v) => serde_json::Value::from(*v),
            ScalarValue::F64(v) => serde_json::Value::from(*v),
            ScalarValue::Bool(b) => serde_json::Value::from(*b),
            ScalarValue::String(s) => serde_json::Value::from(s.clone()),
        }
    }
}

/// Textual form used by action templates: `true`/`false` for booleans,
/// decimal for numbers, raw bytes for strings.
impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::I64(v) => write!(f, "{}", v),
            ScalarValue::F64(v) => write!(f, "{}", v),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::I64(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::I64(v as i64)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::F64(v)
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Bool(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::String(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::String(v)
    }
}

// Serialized as the bare JSON scalar, not a tagged variant, so event data
// and rendered payloads read naturally.
impl serde::Serialize for ScalarValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ScalarValue::I64(v) => serializer.serialize_i64(*v),
            ScalarValue::F64(v) => serializer.serialize_f64(*v),
            ScalarValue::Bool(b) => serializer.serialize_bool(*b),
            ScalarValue::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> serde::Deserialize<'de> for ScalarValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ScalarVisitor;

        impl<'de> serde::de::Visitor<'de> for ScalarVisitor {
            type Value = ScalarValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an integer, float, boolean, or string")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ScalarValue::I64(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match i64::try_from(v) {
                    Ok(i) => Ok(ScalarValue::I64(i)),
                    Err(_) => Ok(ScalarValue::F64(v as f64)),
                }
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ScalarValue::F64(v))
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ScalarValue::Bool(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ScalarValue::String(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ScalarValue::String(v))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(
            ScalarValue::from_json(&json!(42)),
            Some(ScalarValue::I64(42))
        );
        assert_eq!(
            ScalarValue::from_json(&json!(30.5)),
            Some(ScalarValue::F64(30.5))
        );
        assert_eq!(
            ScalarValue::from_json(&json!(true)),
            Some(ScalarValue::Bool(true))
        );
        assert_eq!(
            ScalarValue::from_json(&json!("LivingRoom")),
            Some(ScalarValue::String("LivingRoom".into()))
        );
    }

    #[test]
    fn test_from_json_rejects_non_scalars() {
        assert_eq!(ScalarValue::from_json(&json!(null)), None);
        assert_eq!(ScalarValue::from_json(&json!([1, 2])), None);
        assert_eq!(ScalarValue::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_display_textual_form() {
        assert_eq!(ScalarValue::I64(30).to_string(), "30");
        assert_eq!(ScalarValue::F64(30.5).to_string(), "30.5");
        assert_eq!(ScalarValue::Bool(true).to_string(), "true");
        assert_eq!(ScalarValue::Bool(false).to_string(), "false");
        assert_eq!(ScalarValue::String("raw".into()).to_string(), "raw");
    }

    #[test]
    fn test_float_promotion_accessor() {
        assert_eq!(ScalarValue::I64(30).as_f64(), Some(30.0));
        assert_eq!(ScalarValue::F64(30.5).as_f64(), Some(30.5));
        assert_eq!(ScalarValue::Bool(true).as_f64(), None);
        assert_eq!(ScalarValue::I64(30).as_i64(), Some(30));
        assert_eq!(ScalarValue::F64(30.0).as_i64(), None);
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(ScalarValue::I64(1).tag(), "integer");
        assert_eq!(ScalarValue::F64(1.0).tag(), "float");
        assert_eq!(ScalarValue::Bool(true).tag(), "boolean");
        assert_eq!(ScalarValue::String(String::new()).tag(), "string");
    }

    #[test]
    fn test_serialize_as_bare_scalar() {
        assert_eq!(serde_json::to_value(ScalarValue::I64(7)).unwrap(), json!(7));
        assert_eq!(
            serde_json::to_value(ScalarValue::String("x".into())).unwrap(),
            json!("x")
        );
        let back: ScalarValue = serde_json::from_value(json!(2.5)).unwrap();
        assert_eq!(back, ScalarValue::F64(2.5));
    }

    #[test]
    fn test_to_json_roundtrips_from_json() {
        for value in [
            json!(42),
            json!(30.5),
            json!(false),
            json!("LivingRoom"),
        ] {
            let scalar = ScalarValue::from_json(&value).unwrap();
            assert_eq!(scalar.to_json(), value);
        }
    }
}

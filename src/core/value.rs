use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::{RepoError, Result};

/// Driver-neutral SQL value.
///
/// Every parameter bound into a statement and every column read from a
/// row passes through this type, regardless of which driver sits behind
/// the connection seam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Uuid(_) => "UUID",
            Self::Timestamp(_) => "TIMESTAMP",
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value is the zero/absent value of its type.
    ///
    /// Identifier inspection treats an entity as new when its identifier
    /// field is unset in this sense.
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Integer(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            Self::Text(s) => s.is_empty(),
            Self::Boolean(_) => false,
            Self::Uuid(u) => u.is_nil(),
            Self::Timestamp(_) => false,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Converts a JSON value into a `Value`.
    ///
    /// Numbers outside the i64 range become floats; nested arrays and
    /// objects are rejected, they have no column representation.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(RepoError::Mapping(format!("Unrepresentable number: {n}")))
                }
            }
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            other => Err(RepoError::Mapping(format!(
                "Cannot convert JSON {} to a column value",
                match other {
                    serde_json::Value::Array(_) => "array",
                    _ => "object",
                }
            ))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::from(s.as_str()),
            Self::Boolean(b) => serde_json::Value::from(*b),
            Self::Uuid(u) => serde_json::Value::from(u.to_string()),
            Self::Timestamp(t) => serde_json::Value::from(t.to_rfc3339()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_detection() {
        assert!(Value::Null.is_unset());
        assert!(Value::Integer(0).is_unset());
        assert!(Value::Text(String::new()).is_unset());
        assert!(Value::Uuid(Uuid::nil()).is_unset());

        assert!(!Value::Integer(42).is_unset());
        assert!(!Value::text("id-1").is_unset());
        assert!(!Value::Uuid(Uuid::new_v4()).is_unset());
    }

    #[test]
    fn test_json_round_trip_scalars() {
        let values = vec![
            Value::Null,
            Value::Integer(7),
            Value::Float(2.5),
            Value::text("Doe"),
            Value::Boolean(true),
        ];

        for value in values {
            let back = Value::from_json(&value.to_json()).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_json_rejects_nested() {
        let err = Value::from_json(&serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, RepoError::Mapping(_)));
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::text("3").as_i64(), None);
    }
}

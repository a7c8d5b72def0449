//! Tagged attribute values carried by features.
//!
//! Source datasets mix strings, numbers and nulls freely within one
//! column. Every value is stored as an [`AttributeValue`] and converted
//! through explicit, fallible coercions instead of implicit casts.

use chrono::NaiveDateTime;

/// Display format for date/time attributes.
pub const DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Explicit null or missing value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Free text.
    Text(String),
    /// Date/time value, emitted as a display string on serialization.
    DateTime(NaiveDateTime),
}

/// Error returned when an [`AttributeValue`] cannot be coerced to a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCoercionError {
    /// Display form of the offending value.
    pub value: String,
}

impl std::fmt::Display for AttributeCoercionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "value '{}' is not numeric", self.value)
    }
}

impl std::error::Error for AttributeCoercionError {}

impl AttributeValue {
    /// Coerces the value to a finite `f64`.
    ///
    /// Numbers pass through and text is parsed after trimming. Nulls,
    /// booleans, dates, empty strings and non-finite results are errors.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeCoercionError`] if the value has no numeric
    /// interpretation.
    pub fn to_numeric(&self) -> Result<f64, AttributeCoercionError> {
        let parsed = match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Null | Self::Bool(_) | Self::DateTime(_) => None,
        };

        parsed
            .filter(|n| n.is_finite())
            .ok_or_else(|| AttributeCoercionError {
                value: self.to_display_string(),
            })
    }

    /// Returns the text content if this is a [`AttributeValue::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for [`AttributeValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Renders the value for humans. Null renders as an empty string.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::DateTime(dt) => dt.format(DATETIME_DISPLAY_FORMAT).to_string(),
        }
    }

    /// Converts the value to JSON. Dates become display strings and
    /// non-finite numbers become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::DateTime(_) => serde_json::Value::String(self.to_display_string()),
        }
    }
}

impl From<serde_json::Value> for AttributeValue {
    /// Arrays and objects have no attribute equivalent and are kept as
    /// their compact JSON text.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::Text(s),
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Self::Text(other.to_string())
            }
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for AttributeValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion_accepts_numbers_and_numeric_text() {
        assert!((AttributeValue::Number(12.5).to_numeric().unwrap() - 12.5).abs() < f64::EPSILON);
        assert!((AttributeValue::from(" 7 ").to_numeric().unwrap() - 7.0).abs() < f64::EPSILON);
        assert!((AttributeValue::from("3.25").to_numeric().unwrap() - 3.25).abs() < f64::EPSILON);
    }

    #[test]
    fn numeric_coercion_rejects_empty_and_non_numeric() {
        let err = AttributeValue::from("").to_numeric().unwrap_err();
        assert_eq!(err.value, "");
        assert!(AttributeValue::from("n/a").to_numeric().is_err());
        assert!(AttributeValue::Null.to_numeric().is_err());
        assert!(AttributeValue::Bool(true).to_numeric().is_err());
        assert!(AttributeValue::from("NaN").to_numeric().is_err());
        assert!(AttributeValue::from("inf").to_numeric().is_err());
    }

    #[test]
    fn datetime_serializes_as_display_string() {
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(
            AttributeValue::from(dt).to_json(),
            serde_json::Value::String("2024-03-09 08:30:00".to_string())
        );
    }

    #[test]
    fn json_objects_become_text() {
        let value = AttributeValue::from(serde_json::json!({"estado_expediente": "En curso"}));
        assert_eq!(
            value.as_text(),
            Some(r#"{"estado_expediente":"En curso"}"#)
        );
    }

    #[test]
    fn json_scalars_map_to_variants() {
        assert!(AttributeValue::from(serde_json::Value::Null).is_null());
        assert_eq!(
            AttributeValue::from(serde_json::json!(4)),
            AttributeValue::Number(4.0)
        );
        assert_eq!(
            AttributeValue::from(serde_json::json!(false)),
            AttributeValue::Bool(false)
        );
    }
}

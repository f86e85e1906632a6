//! Method arguments and their conversions.
//!
//! Arguments arrive as JSON values: endpoint URI options are strings,
//! message headers and bodies may be structured. Each converter accepts
//! both forms where that makes sense.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::client::PreferReturn;
use crate::config::{Properties, parse_flag};
use crate::error::ConfigurationError;
use crate::model::{Bundle, IdType, Resource};

/// Named arguments for one method invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentBag(BTreeMap<String, Value>);

impl ArgumentBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument, returning the bag.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets an argument, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Removes an argument.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Returns an argument's raw value. `null` counts as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|value| !value.is_null())
    }

    /// Returns true if the argument is present and not `null`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over argument names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over arguments.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the bag holds no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts a required argument.
    pub fn required<T>(
        &self,
        name: &str,
        convert: fn(&Value) -> Result<T, String>,
    ) -> Result<T, ConfigurationError> {
        let value = self.get(name).ok_or_else(|| ConfigurationError::InvalidArgument {
            argument: name.to_string(),
            message: "argument is required".to_string(),
        })?;
        convert(value).map_err(|message| ConfigurationError::InvalidArgument {
            argument: name.to_string(),
            message,
        })
    }

    /// Converts an optional argument.
    pub fn optional<T>(
        &self,
        name: &str,
        convert: fn(&Value) -> Result<T, String>,
    ) -> Result<Option<T>, ConfigurationError> {
        self.get(name)
            .map(|value| {
                convert(value).map_err(|message| ConfigurationError::InvalidArgument {
                    argument: name.to_string(),
                    message,
                })
            })
            .transpose()
    }

    /// Converts an optional flag, defaulting to `false`.
    pub fn flag(&self, name: &str) -> Result<bool, ConfigurationError> {
        Ok(self.optional(name, to_flag)?.unwrap_or(false))
    }
}

impl From<Properties> for ArgumentBag {
    fn from(properties: Properties) -> Self {
        Self(properties)
    }
}

impl FromIterator<(String, Value)> for ArgumentBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<(String, Value)> for ArgumentBag {
    fn extend<I: IntoIterator<Item = (String, Value)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// A resource given as a JSON object or serialized JSON.
pub fn to_resource(value: &Value) -> Result<Resource, String> {
    let resource = match value {
        Value::String(text) => Resource::from_json_str(text),
        other => Resource::from_value(other.clone()),
    };
    resource.ok_or_else(|| "expected a FHIR resource with a resourceType".to_string())
}

/// A Bundle given as a JSON object or serialized JSON.
pub fn to_bundle(value: &Value) -> Result<Bundle, String> {
    let bundle = match value {
        Value::String(text) => Bundle::from_json_str(text),
        other => Bundle::from_value(other.clone()),
    };
    bundle.ok_or_else(|| "expected a Bundle resource".to_string())
}

/// A list of resources given as a JSON array or a Bundle whose entries are used.
pub fn to_resources(value: &Value) -> Result<Vec<Resource>, String> {
    match value {
        Value::Array(items) => items.iter().map(to_resource).collect(),
        other => to_bundle(other)
            .map(|bundle| bundle.entry_resources())
            .map_err(|_| "expected an array of resources".to_string()),
    }
}

/// Plain text. Numbers and booleans are accepted in their textual form.
pub fn to_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("expected text, got {}", other)),
    }
}

/// A resource id (`Patient/1`, `Patient/1/_history/2`) or a resource carrying one.
pub fn to_id(value: &Value) -> Result<IdType, String> {
    match value {
        Value::String(text) => {
            IdType::parse(text).ok_or_else(|| format!("'{}' is not a valid resource id", text))
        }
        Value::Object(_) => Resource::from_value(value.clone())
            .and_then(|resource| resource.id_type())
            .ok_or_else(|| "resource has no id".to_string()),
        other => Err(format!("expected a resource id, got {}", other)),
    }
}

/// A `Prefer: return=` preference.
pub fn to_prefer(value: &Value) -> Result<PreferReturn, String> {
    to_text(value)?.parse()
}

/// A boolean, or its textual form.
pub fn to_flag(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(text) => parse_flag(text),
        other => Err(format!("expected a boolean, got {}", other)),
    }
}

/// A non-negative count that fits in 32 bits.
pub fn to_count(value: &Value) -> Result<u32, String> {
    let count = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    count
        .and_then(|c| u32::try_from(c).ok())
        .ok_or_else(|| format!("expected a count, got {}", value))
}

/// An instant in RFC 3339 form, or a date (taken as midnight UTC).
pub fn to_instant(value: &Value) -> Result<DateTime<Utc>, String> {
    let text = to_text(value)?;
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("'{}' is not an RFC 3339 instant or a date", text))
}

/// A JSON object, or serialized JSON holding one.
pub fn to_object(value: &Value) -> Result<Value, String> {
    let value = match value {
        Value::String(text) => serde_json::from_str(text).map_err(|e| e.to_string())?,
        other => other.clone(),
    };
    if value.is_object() {
        Ok(value)
    } else {
        Err("expected a JSON object".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_and_optional() {
        let args = ArgumentBag::new()
            .with("count", "25")
            .with("url", Value::Null);

        assert_eq!(args.required("count", to_count).unwrap(), 25);
        assert_eq!(args.optional("url", to_text).unwrap(), None);
        assert!(!args.contains("url"));
        assert!(matches!(
            args.required("url", to_text),
            Err(ConfigurationError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_resource_from_text_or_object() {
        let from_text = to_resource(&json!("{\"resourceType\":\"Patient\",\"id\":\"1\"}")).unwrap();
        let from_object = to_resource(&json!({"resourceType": "Patient", "id": "1"})).unwrap();
        assert_eq!(from_text, from_object);
        assert!(to_resource(&json!({"id": "1"})).is_err());
    }

    #[test]
    fn test_id_from_text_or_resource() {
        assert_eq!(to_id(&json!("Patient/9")).unwrap().to_string(), "Patient/9");
        assert_eq!(
            to_id(&json!({"resourceType": "Observation", "id": "o1"}))
                .unwrap()
                .to_string(),
            "Observation/o1"
        );
        assert!(to_id(&json!(12)).is_err());
    }

    #[test]
    fn test_instant_forms() {
        let instant = to_instant(&json!("2024-03-01T10:15:00+01:00")).unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-03-01T09:15:00+00:00");

        let date = to_instant(&json!("2024-03-01")).unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        assert!(to_instant(&json!("yesterday")).is_err());
    }

    #[test]
    fn test_flag_and_count() {
        assert_eq!(to_flag(&json!("True")), Ok(true));
        assert!(to_flag(&json!(1)).is_err());
        assert!(to_count(&json!(-1)).is_err());
        assert!(to_count(&json!(u64::MAX)).is_err());
    }

    #[test]
    fn test_resources_from_bundle() {
        let resources = to_resources(&json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "Patient", "id": "a"}}]
        }))
        .unwrap();
        assert_eq!(resources.len(), 1);
        assert!(to_resources(&json!("nope")).is_err());
    }
}

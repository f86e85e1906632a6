//! Resource-level value types exchanged with the remote FHIR client.
//!
//! Resources are carried as JSON values. This crate never interprets clinical
//! content; it only needs the `resourceType`, the logical id, and (for
//! bundles) the entry and link arrays.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A FHIR resource held as a JSON object.
///
/// The only structural guarantee is that the value is a JSON object with a
/// string `resourceType` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Resource(Value);

impl Resource {
    /// Wraps a JSON value, returning `None` unless it is an object with a
    /// string `resourceType`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value.get("resourceType") {
            Some(Value::String(_)) => Some(Self(value)),
            _ => None,
        }
    }

    /// Parses a serialized JSON resource.
    pub fn from_json_str(json: &str) -> Option<Self> {
        serde_json::from_str::<Value>(json)
            .ok()
            .and_then(Self::from_value)
    }

    /// Returns the resource type (e.g. `"Patient"`).
    pub fn resource_type(&self) -> &str {
        self.0
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Returns the logical id, if the resource has one.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Returns the `meta.versionId`, if present.
    pub fn version_id(&self) -> Option<&str> {
        self.0
            .get("meta")
            .and_then(|meta| meta.get("versionId"))
            .and_then(Value::as_str)
    }

    /// Returns the typed id of this resource, if it has a logical id.
    pub fn id_type(&self) -> Option<IdType> {
        let id = IdType::new(self.resource_type(), self.id()?);
        Some(match self.version_id() {
            Some(version) => id.with_version(version),
            None => id,
        })
    }

    /// Returns a member of the underlying JSON object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrows the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the resource and returns the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Serializes the resource to a compact JSON string.
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }
}

impl TryFrom<Value> for Resource {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
            .ok_or_else(|| "expected a JSON object with a resourceType".to_string())
    }
}

impl From<Resource> for Value {
    fn from(resource: Resource) -> Self {
        resource.0
    }
}

/// A `Bundle` resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Bundle(Resource);

impl Bundle {
    /// Wraps a resource, returning `None` unless its type is `Bundle`.
    pub fn from_resource(resource: Resource) -> Option<Self> {
        (resource.resource_type() == "Bundle").then_some(Self(resource))
    }

    /// Wraps a JSON value, returning `None` unless it is a `Bundle` resource.
    pub fn from_value(value: Value) -> Option<Self> {
        Resource::from_value(value).and_then(Self::from_resource)
    }

    /// Parses a serialized JSON bundle.
    pub fn from_json_str(json: &str) -> Option<Self> {
        Resource::from_json_str(json).and_then(Self::from_resource)
    }

    /// Returns the `total` element of a search or history bundle.
    pub fn total(&self) -> Option<u64> {
        self.0.get("total").and_then(Value::as_u64)
    }

    /// Returns the URL of the link with the given relation (`next`, `previous`, `self`).
    pub fn link(&self, relation: &str) -> Option<&str> {
        self.0
            .get("link")?
            .as_array()?
            .iter()
            .find(|link| link.get("relation").and_then(Value::as_str) == Some(relation))
            .and_then(|link| link.get("url"))
            .and_then(Value::as_str)
    }

    /// Returns the `next` paging link.
    pub fn next_link(&self) -> Option<&str> {
        self.link("next")
    }

    /// Returns the `previous` paging link. Older servers use `prev`.
    pub fn previous_link(&self) -> Option<&str> {
        self.link("previous").or_else(|| self.link("prev"))
    }

    /// Returns the resources carried in `entry[].resource`, in order.
    pub fn entry_resources(&self) -> Vec<Resource> {
        self.0
            .get("entry")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("resource").cloned())
                    .filter_map(Resource::from_value)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Borrows the bundle as a plain resource.
    pub fn as_resource(&self) -> &Resource {
        &self.0
    }

    /// Consumes the bundle and returns the plain resource.
    pub fn into_resource(self) -> Resource {
        self.0
    }
}

impl TryFrom<Value> for Bundle {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| "expected a Bundle resource".to_string())
    }
}

impl From<Bundle> for Value {
    fn from(bundle: Bundle) -> Self {
        bundle.0.into_value()
    }
}

/// A resource identity: `[base/]Type/id[/_history/version]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdType {
    base_url: Option<String>,
    resource_type: Option<String>,
    id_part: String,
    version: Option<String>,
}

impl IdType {
    /// Creates a relative id from a resource type and logical id.
    pub fn new(resource_type: impl Into<String>, id_part: impl Into<String>) -> Self {
        Self {
            base_url: None,
            resource_type: Some(resource_type.into()),
            id_part: id_part.into(),
            version: None,
        }
    }

    /// Returns a copy of this id pinned to a specific version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Parses an id from its textual form.
    ///
    /// Accepts a bare id (`123`), a relative id (`Patient/123`), a versioned
    /// id (`Patient/123/_history/2`) and absolute forms prefixed with a
    /// server base URL.
    pub fn parse(value: &str) -> Option<Self> {
        const HISTORY: &str = "_history";

        let value = value.trim();
        let (rest, version) = match value.rsplit_once("/_history/") {
            Some((rest, version)) => {
                let version = version.trim_end_matches('/');
                if version.is_empty() || version.contains('/') {
                    return None;
                }
                (rest, Some(version.to_string()))
            }
            None => (value.trim_end_matches('/'), None),
        };
        if rest.is_empty() {
            return None;
        }

        let segments: Vec<&str> = rest.split('/').collect();
        let (base_url, resource_type, id_part) = match segments.as_slice() {
            [id] => (None, None, *id),
            [resource_type, id] => (None, Some(*resource_type), *id),
            [base @ .., resource_type, id] => (Some(base.join("/")), Some(*resource_type), *id),
            [] => return None,
        };

        if id_part.is_empty()
            || id_part == HISTORY
            || resource_type.is_some_and(|t| t.is_empty() || t == HISTORY)
        {
            return None;
        }

        Some(Self {
            base_url,
            resource_type: resource_type.map(str::to_string),
            id_part: id_part.to_string(),
            version,
        })
    }

    /// Returns the server base URL for absolute ids.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Returns the resource type, if the id carries one.
    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    /// Returns the logical id.
    pub fn id_part(&self) -> &str {
        &self.id_part
    }

    /// Returns the version id, if the id is versioned.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the relative, unversioned form (`Patient/123`).
    pub fn to_unqualified_versionless(&self) -> String {
        match &self.resource_type {
            Some(resource_type) => format!("{}/{}", resource_type, self.id_part),
            None => self.id_part.clone(),
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(base) = &self.base_url {
            write!(f, "{}/", base)?;
        }
        write!(f, "{}", self.to_unqualified_versionless())?;
        if let Some(version) = &self.version {
            write!(f, "/_history/{}", version)?;
        }
        Ok(())
    }
}

impl Serialize for IdType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IdType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        IdType::parse(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid resource id: {}", value)))
    }
}

/// A resource handed to a write operation.
///
/// The remote client accepts either a structured resource or its serialized
/// text, so both are carried through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourcePayload {
    /// A structured resource.
    Structured(Resource),
    /// A serialized resource (JSON or XML) passed through verbatim.
    Raw(String),
}

impl From<Resource> for ResourcePayload {
    fn from(resource: Resource) -> Self {
        ResourcePayload::Structured(resource)
    }
}

impl From<String> for ResourcePayload {
    fn from(raw: String) -> Self {
        ResourcePayload::Raw(raw)
    }
}

/// Result of a write interaction (create, update, patch, validate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodOutcome {
    /// The id assigned or confirmed by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<IdType>,

    /// Whether the server created a new resource (as opposed to matching
    /// an existing one in a conditional create).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,

    /// The resource echoed by the server, depending on `Prefer: return=`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,

    /// An OperationOutcome returned by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_outcome: Option<Resource>,
}

impl MethodOutcome {
    /// Creates an outcome carrying only an id.
    pub fn with_id(id: IdType) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

impl From<MethodOutcome> for Value {
    fn from(outcome: MethodOutcome) -> Self {
        let mut map = serde_json::Map::new();
        if let Some(id) = outcome.id {
            map.insert("id".to_string(), Value::String(id.to_string()));
        }
        if let Some(created) = outcome.created {
            map.insert("created".to_string(), Value::Bool(created));
        }
        if let Some(resource) = outcome.resource {
            map.insert("resource".to_string(), resource.into_value());
        }
        if let Some(operation_outcome) = outcome.operation_outcome {
            map.insert("operationOutcome".to_string(), operation_outcome.into_value());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_requires_resource_type() {
        assert!(Resource::from_value(json!({"id": "1"})).is_none());
        assert!(Resource::from_value(json!("Patient")).is_none());

        let patient = Resource::from_value(json!({"resourceType": "Patient", "id": "1"})).unwrap();
        assert_eq!(patient.resource_type(), "Patient");
        assert_eq!(patient.id(), Some("1"));
    }

    #[test]
    fn test_resource_id_type_includes_version() {
        let patient = Resource::from_value(json!({
            "resourceType": "Patient",
            "id": "42",
            "meta": {"versionId": "3"}
        }))
        .unwrap();

        assert_eq!(patient.id_type().unwrap().to_string(), "Patient/42/_history/3");
    }

    #[test]
    fn test_id_parse_forms() {
        let bare = IdType::parse("123").unwrap();
        assert_eq!(bare.resource_type(), None);
        assert_eq!(bare.id_part(), "123");

        let relative = IdType::parse("Patient/123").unwrap();
        assert_eq!(relative.resource_type(), Some("Patient"));
        assert_eq!(relative.version(), None);

        let versioned = IdType::parse("Patient/123/_history/2").unwrap();
        assert_eq!(versioned.version(), Some("2"));

        let absolute = IdType::parse("http://example.org/fhir/Patient/123/_history/2").unwrap();
        assert_eq!(absolute.base_url(), Some("http://example.org/fhir"));
        assert_eq!(absolute.resource_type(), Some("Patient"));
        assert_eq!(absolute.to_string(), "http://example.org/fhir/Patient/123/_history/2");
    }

    #[test]
    fn test_id_parse_rejects_malformed() {
        assert!(IdType::parse("").is_none());
        assert!(IdType::parse("Patient/").is_some_and(|id| id.id_part() == "Patient"));
        assert!(IdType::parse("Patient/1/_history/").is_none());
        assert!(IdType::parse("Patient/1/_history").is_none());
        assert!(IdType::parse("Patient/_history/").is_none());
        assert!(IdType::parse("_history/2").is_none());
        assert!(IdType::parse("/1").is_none());
        assert_eq!(
            IdType::parse("Patient/1/_history/3/").and_then(|id| id.version().map(str::to_string)),
            Some("3".to_string())
        );
    }

    #[test]
    fn test_bundle_links_and_entries() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": 2,
            "link": [
                {"relation": "self", "url": "http://x/Patient"},
                {"relation": "next", "url": "http://x/Patient?page=2"}
            ],
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "a"}},
                {"resource": {"resourceType": "Patient", "id": "b"}}
            ]
        }))
        .unwrap();

        assert_eq!(bundle.total(), Some(2));
        assert_eq!(bundle.next_link(), Some("http://x/Patient?page=2"));
        assert_eq!(bundle.previous_link(), None);
        let ids: Vec<_> = bundle
            .entry_resources()
            .iter()
            .map(|r| r.id().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_bundle_rejects_other_types() {
        assert!(Bundle::from_value(json!({"resourceType": "Patient"})).is_none());
    }

    #[test]
    fn test_method_outcome_serializes_id_as_string() {
        let outcome = MethodOutcome::with_id(IdType::new("Patient", "7"));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({"id": "Patient/7"}));
    }

    #[test]
    fn test_outcome_into_value_matches_serialized_form() {
        let outcome = MethodOutcome {
            id: Some(IdType::new("Patient", "7").with_version("2")),
            created: Some(true),
            resource: Resource::from_value(json!({"resourceType": "Patient", "id": "7"})),
            operation_outcome: Resource::from_value(json!({"resourceType": "OperationOutcome"})),
        };

        let serialized = serde_json::to_value(&outcome).unwrap();
        assert_eq!(Value::from(outcome), serialized);
    }
}

//! Optional request modifiers applied to client builders.
//!
//! An endpoint may carry a map of extra parameters (pretty printing,
//! encoding, `_summary`, `_elements`, cache directives, custom headers).
//! Before a facade executes a request it hands the builder to
//! [`ExtraParameters::process`], which applies every configured modifier.
//!
//! Each [`ExtraParameter`] declares which [`RequestKind`]s it supports:
//!
//! | Parameter | Key | Supported kinds |
//! |-----------|-----|-----------------|
//! | `PrettyPrint` | `prettyPrint` | all |
//! | `EncodeJson` | `encodeJson` | all |
//! | `EncodeXml` | `encodeXml` | all |
//! | `EncodingEnum` | `encodingEnum` | all |
//! | `SummaryEnum` | `summaryEnum` | read, search, history, load-page |
//! | `SubsetElements` | `subsetElements` | read, search, history, load-page |
//! | `CacheControlDirective` | `cacheControlDirective` | read, search, history, load-page, capabilities |
//! | `CustomHeaders` | `customHeaders` | all |
//!
//! Applying a parameter to a builder outside its set fails before anything
//! is applied, so the request is never executed with a partial set of
//! modifiers.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::trace;

use crate::client::{
    CacheControlDirective, ClientExecutable, EncodingEnum, RequestBuilder, RequestKind,
    SummaryMode,
};
use crate::config::{Properties, parse_flag};
use crate::error::{ConfigurationError, ExtraParameterError};

/// A named optional request modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtraParameter {
    /// Ask the server to pretty-print its response.
    PrettyPrint,
    /// Request JSON encoding.
    EncodeJson,
    /// Request XML encoding.
    EncodeXml,
    /// Request an explicit encoding (`json` or `xml`).
    EncodingEnum,
    /// Request a `_summary` mode.
    SummaryEnum,
    /// Restrict the response to a list of elements.
    SubsetElements,
    /// Send `Cache-Control` directives.
    CacheControlDirective,
    /// Send additional HTTP headers.
    CustomHeaders,
}

impl ExtraParameter {
    /// Every extra parameter.
    pub const ALL: [ExtraParameter; 8] = [
        ExtraParameter::PrettyPrint,
        ExtraParameter::EncodeJson,
        ExtraParameter::EncodeXml,
        ExtraParameter::EncodingEnum,
        ExtraParameter::SummaryEnum,
        ExtraParameter::SubsetElements,
        ExtraParameter::CacheControlDirective,
        ExtraParameter::CustomHeaders,
    ];

    /// Returns the configuration key of this parameter.
    pub fn key(&self) -> &'static str {
        match self {
            ExtraParameter::PrettyPrint => "prettyPrint",
            ExtraParameter::EncodeJson => "encodeJson",
            ExtraParameter::EncodeXml => "encodeXml",
            ExtraParameter::EncodingEnum => "encodingEnum",
            ExtraParameter::SummaryEnum => "summaryEnum",
            ExtraParameter::SubsetElements => "subsetElements",
            ExtraParameter::CacheControlDirective => "cacheControlDirective",
            ExtraParameter::CustomHeaders => "customHeaders",
        }
    }

    /// Looks up a parameter by its configuration key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|param| param.key() == key)
    }

    /// Returns true if this parameter can be applied to builders of `kind`.
    pub fn supports(&self, kind: RequestKind) -> bool {
        match self {
            ExtraParameter::PrettyPrint
            | ExtraParameter::EncodeJson
            | ExtraParameter::EncodeXml
            | ExtraParameter::EncodingEnum
            | ExtraParameter::CustomHeaders => true,
            ExtraParameter::SummaryEnum | ExtraParameter::SubsetElements => returns_resources(kind),
            ExtraParameter::CacheControlDirective => {
                returns_resources(kind) || kind == RequestKind::Capabilities
            }
        }
    }

    /// Returns the builder kinds this parameter supports.
    pub fn supported_kinds(&self) -> Vec<RequestKind> {
        RequestKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect()
    }

    fn invalid(&self, message: impl Into<String>) -> ExtraParameterError {
        ExtraParameterError::InvalidValue {
            parameter: *self,
            message: message.into(),
        }
    }

    /// Converts a configured value into the modifier it describes.
    ///
    /// Boolean parameters yield `None` when set to `false`.
    fn parse(&self, value: &Value) -> Result<Option<Modifier>, ExtraParameterError> {
        let modifier = match self {
            ExtraParameter::PrettyPrint => self.flag(value)?.then_some(Modifier::PrettyPrint),
            ExtraParameter::EncodeJson => self
                .flag(value)?
                .then_some(Modifier::Encoding(EncodingEnum::Json)),
            ExtraParameter::EncodeXml => self
                .flag(value)?
                .then_some(Modifier::Encoding(EncodingEnum::Xml)),
            ExtraParameter::EncodingEnum => {
                let text = self.text(value)?;
                Some(Modifier::Encoding(
                    text.parse().map_err(|e: String| self.invalid(e))?,
                ))
            }
            ExtraParameter::SummaryEnum => {
                let mode = match value {
                    Value::Bool(true) => SummaryMode::True,
                    Value::Bool(false) => SummaryMode::False,
                    other => self
                        .text(other)?
                        .parse()
                        .map_err(|e: String| self.invalid(e))?,
                };
                Some(Modifier::Summary(mode))
            }
            ExtraParameter::SubsetElements => Some(Modifier::Elements(self.elements(value)?)),
            ExtraParameter::CacheControlDirective => {
                let directive = match value {
                    Value::String(text) => text.parse().map_err(|e: String| self.invalid(e))?,
                    Value::Object(_) => {
                        serde_json::from_value::<CacheControlDirective>(value.clone())
                            .map_err(|e| self.invalid(e.to_string()))?
                    }
                    other => {
                        return Err(
                            self.invalid(format!("expected an object or string, got {}", other))
                        );
                    }
                };
                Some(Modifier::CacheControl(directive))
            }
            ExtraParameter::CustomHeaders => Some(Modifier::Headers(self.headers(value)?)),
        };
        Ok(modifier)
    }

    fn flag(&self, value: &Value) -> Result<bool, ExtraParameterError> {
        match value {
            Value::Bool(flag) => Ok(*flag),
            Value::String(text) => parse_flag(text).map_err(|e| self.invalid(e)),
            other => Err(self.invalid(format!("expected a boolean, got {}", other))),
        }
    }

    fn text<'v>(&self, value: &'v Value) -> Result<&'v str, ExtraParameterError> {
        value
            .as_str()
            .ok_or_else(|| self.invalid(format!("expected a string, got {}", value)))
    }

    fn elements(&self, value: &Value) -> Result<Vec<String>, ExtraParameterError> {
        let elements: Vec<String> = match value {
            Value::String(text) => text
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
            Value::Array(items) => items
                .iter()
                .map(|item| self.text(item).map(|e| e.trim().to_string()))
                .collect::<Result<_, _>>()?,
            other => {
                return Err(self.invalid(format!(
                    "expected a list of element names, got {}",
                    other
                )));
            }
        };

        if elements.is_empty() {
            return Err(self.invalid("at least one element name is required"));
        }
        Ok(elements)
    }

    fn headers(&self, value: &Value) -> Result<Vec<(String, String)>, ExtraParameterError> {
        let mut headers = Vec::new();
        match value {
            Value::Object(map) => {
                for (name, value) in map {
                    match value {
                        Value::Array(values) => {
                            for v in values {
                                headers.push((name.clone(), self.text(v)?.to_string()));
                            }
                        }
                        other => headers.push((name.clone(), self.text(other)?.to_string())),
                    }
                }
            }
            Value::Array(lines) => {
                for line in lines {
                    headers.push(self.header_line(self.text(line)?)?);
                }
            }
            Value::String(line) => headers.push(self.header_line(line)?),
            other => return Err(self.invalid(format!("expected headers, got {}", other))),
        }

        if let Some((name, _)) = headers.iter().find(|(name, _)| name.trim().is_empty()) {
            return Err(self.invalid(format!("invalid header name '{}'", name)));
        }
        Ok(headers)
    }

    fn header_line(&self, line: &str) -> Result<(String, String), ExtraParameterError> {
        line.split_once(':')
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .ok_or_else(|| self.invalid(format!("expected 'Name: value', got '{}'", line)))
    }
}

impl fmt::Display for ExtraParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Kinds whose responses carry resources the server can trim or cache.
fn returns_resources(kind: RequestKind) -> bool {
    match kind {
        RequestKind::Read | RequestKind::Search | RequestKind::History | RequestKind::LoadPage => {
            true
        }
        RequestKind::Capabilities
        | RequestKind::Create
        | RequestKind::Delete
        | RequestKind::Meta
        | RequestKind::Operation
        | RequestKind::ProcessMessage
        | RequestKind::Patch
        | RequestKind::Transaction
        | RequestKind::Update
        | RequestKind::Validate => false,
    }
}

/// A parsed modifier, ready to apply.
#[derive(Debug, Clone, PartialEq)]
enum Modifier {
    PrettyPrint,
    Encoding(EncodingEnum),
    Summary(SummaryMode),
    Elements(Vec<String>),
    CacheControl(CacheControlDirective),
    Headers(Vec<(String, String)>),
}

impl Modifier {
    fn apply(self, target: &mut dyn ClientExecutable) {
        match self {
            Modifier::PrettyPrint => target.pretty_print(),
            Modifier::Encoding(encoding) => target.encoded(encoding),
            Modifier::Summary(mode) => target.summary_mode(mode),
            Modifier::Elements(elements) => target.elements_subset(&elements),
            Modifier::CacheControl(directive) => target.cache_control(directive),
            Modifier::Headers(headers) => {
                for (name, value) in headers {
                    target.with_additional_header(&name, &value);
                }
            }
        }
    }
}

/// The extra parameters configured for an endpoint or an invocation.
///
/// Keys that name no [`ExtraParameter`] are kept verbatim and rejected when
/// the map is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraParameters {
    known: BTreeMap<ExtraParameter, Value>,
    unrecognized: BTreeMap<String, Value>,
}

impl ExtraParameters {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value.
    pub fn with(mut self, parameter: ExtraParameter, value: impl Into<Value>) -> Self {
        self.insert(parameter, value);
        self
    }

    /// Sets a parameter, replacing any previous value.
    pub fn insert(&mut self, parameter: ExtraParameter, value: impl Into<Value>) {
        self.known.insert(parameter, value.into());
    }

    /// Sets a value by key. Unknown keys are kept as unrecognized.
    pub fn insert_key(&mut self, key: &str, value: Value) {
        match ExtraParameter::from_key(key) {
            Some(parameter) => {
                self.known.insert(parameter, value);
            }
            None => {
                self.unrecognized.insert(key.to_string(), value);
            }
        }
    }

    /// Copies the extra-parameter keys out of a flat option map.
    pub fn from_properties(properties: &Properties) -> Self {
        let known = properties
            .iter()
            .filter_map(|(key, value)| {
                ExtraParameter::from_key(key).map(|parameter| (parameter, value.clone()))
            })
            .collect();
        Self {
            known,
            unrecognized: BTreeMap::new(),
        }
    }

    /// Builds a map from a JSON object (`{"prettyPrint": true, ...}`).
    ///
    /// A JSON string holding such an object is accepted too, since invocation
    /// arguments often arrive as text.
    pub fn from_json(value: &Value) -> Result<Self, ConfigurationError> {
        let invalid = |message: String| ConfigurationError::InvalidArgument {
            argument: "extraParameters".to_string(),
            message,
        };

        let parsed;
        let object = match value {
            Value::Object(map) => map,
            Value::String(text) => {
                parsed = serde_json::from_str::<Value>(text).map_err(|e| invalid(e.to_string()))?;
                parsed
                    .as_object()
                    .ok_or_else(|| invalid("expected a JSON object".to_string()))?
            }
            other => return Err(invalid(format!("expected a JSON object, got {}", other))),
        };

        let mut extra = Self::new();
        for (key, value) in object {
            extra.insert_key(key, value.clone());
        }
        Ok(extra)
    }

    /// Returns a copy of this map with `overrides` applied on top.
    pub fn merged(&self, overrides: &ExtraParameters) -> ExtraParameters {
        let mut merged = self.clone();
        merged
            .known
            .extend(overrides.known.iter().map(|(k, v)| (*k, v.clone())));
        merged
            .unrecognized
            .extend(overrides.unrecognized.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Returns the value configured for a parameter.
    pub fn get(&self, parameter: ExtraParameter) -> Option<&Value> {
        self.known.get(&parameter)
    }

    /// Iterates over the recognised parameters in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (ExtraParameter, &Value)> {
        self.known.iter().map(|(k, v)| (*k, v))
    }

    /// Returns the keys that name no extra parameter.
    pub fn unrecognized_keys(&self) -> impl Iterator<Item = &str> {
        self.unrecognized.keys().map(String::as_str)
    }

    /// Returns true if nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.unrecognized.is_empty()
    }

    /// Returns the number of configured keys.
    pub fn len(&self) -> usize {
        self.known.len() + self.unrecognized.len()
    }

    /// Checks that every key names a parameter and every value is well-formed.
    ///
    /// Support for a builder kind can only be checked when the map is applied.
    pub fn validate(&self) -> Result<(), ExtraParameterError> {
        if let Some(key) = self.unrecognized.keys().next() {
            return Err(ExtraParameterError::UnknownParameter { key: key.clone() });
        }
        self.modifiers().map(drop)
    }

    /// Parses every recognised value into its modifier.
    ///
    /// `encodeJson`, `encodeXml` and `encodingEnum` may be combined only when
    /// they agree.
    fn modifiers(&self) -> Result<Vec<Modifier>, ExtraParameterError> {
        let mut modifiers = Vec::with_capacity(self.known.len());
        let mut encoding: Option<(ExtraParameter, EncodingEnum)> = None;
        for (parameter, value) in &self.known {
            let Some(modifier) = parameter.parse(value)? else {
                continue;
            };
            if let Modifier::Encoding(requested) = modifier {
                match encoding {
                    Some((first, chosen)) if chosen != requested => {
                        return Err(ExtraParameterError::ConflictingEncoding {
                            first,
                            second: *parameter,
                        });
                    }
                    Some(_) => {}
                    None => encoding = Some((*parameter, requested)),
                }
            }
            modifiers.push(modifier);
        }
        Ok(modifiers)
    }

    /// Returns the kinds every configured parameter supports.
    pub fn supported_kinds(&self) -> Vec<RequestKind> {
        RequestKind::ALL
            .into_iter()
            .filter(|kind| self.known.keys().all(|parameter| parameter.supports(*kind)))
            .collect()
    }

    /// Applies `extra_parameters` to a request builder.
    ///
    /// `None` and an empty map leave the builder untouched. Otherwise every
    /// parameter is checked against the builder kind and parsed before any
    /// of them is applied.
    pub fn process(
        extra_parameters: Option<&ExtraParameters>,
        mut target: RequestBuilder<'_>,
    ) -> Result<(), ExtraParameterError> {
        let Some(extra) = extra_parameters.filter(|extra| !extra.is_empty()) else {
            return Ok(());
        };

        if let Some(key) = extra.unrecognized.keys().next() {
            return Err(ExtraParameterError::UnknownParameter { key: key.clone() });
        }

        let kind = target.kind();
        if let Some(parameter) = extra.known.keys().find(|parameter| !parameter.supports(kind)) {
            return Err(ExtraParameterError::UnsupportedTarget {
                parameter: *parameter,
                target: kind,
            });
        }
        let modifiers = extra.modifiers()?;

        trace!(target_kind = %kind, count = modifiers.len(), "Applying extra parameters");

        let executable = target.executable();
        for modifier in modifiers {
            modifier.apply(executable);
        }
        Ok(())
    }
}

impl Serialize for ExtraParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (parameter, value) in &self.known {
            map.serialize_entry(parameter.key(), value)?;
        }
        for (key, value) in &self.unrecognized {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

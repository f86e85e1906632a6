//! Request option values understood by every client builder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::Resource;

/// Wire encoding requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EncodingEnum {
    /// JSON format (application/fhir+json)
    Json,
    /// XML format (application/fhir+xml)
    Xml,
}

impl EncodingEnum {
    /// Returns the MIME type for this encoding.
    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodingEnum::Json => "application/fhir+json",
            EncodingEnum::Xml => "application/fhir+xml",
        }
    }

    /// Returns the `_format` token.
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingEnum::Json => "json",
            EncodingEnum::Xml => "xml",
        }
    }
}

impl FromStr for EncodingEnum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "application/fhir+json" | "application/json" => Ok(EncodingEnum::Json),
            "xml" | "application/fhir+xml" | "application/xml" => Ok(EncodingEnum::Xml),
            other => Err(format!("unknown encoding '{}', expected json or xml", other)),
        }
    }
}

/// `_summary` mode for read-style requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SummaryMode {
    /// Return only elements marked as summary.
    True,
    /// Return text, id, meta and mandatory elements.
    Text,
    /// Remove the text element.
    Data,
    /// Return only the match count.
    Count,
    /// Return the full resource.
    False,
}

impl SummaryMode {
    /// Returns the `_summary` parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::True => "true",
            SummaryMode::Text => "text",
            SummaryMode::Data => "data",
            SummaryMode::Count => "count",
            SummaryMode::False => "false",
        }
    }
}

impl FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(SummaryMode::True),
            "text" => Ok(SummaryMode::Text),
            "data" => Ok(SummaryMode::Data),
            "count" => Ok(SummaryMode::Count),
            "false" => Ok(SummaryMode::False),
            other => Err(format!(
                "unknown summary mode '{}', expected true, text, data, count or false",
                other
            )),
        }
    }
}

/// `Prefer: return=` preference for write interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PreferReturn {
    /// Return only the response headers.
    Minimal,
    /// Return the created or updated resource.
    Representation,
    /// Return an OperationOutcome.
    OperationOutcome,
}

impl PreferReturn {
    /// Returns the directive value (`minimal`, `representation`, `OperationOutcome`).
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferReturn::Minimal => "minimal",
            PreferReturn::Representation => "representation",
            PreferReturn::OperationOutcome => "OperationOutcome",
        }
    }

    /// Returns the full `Prefer` header value.
    pub fn header_value(&self) -> String {
        format!("return={}", self.as_str())
    }
}

impl FromStr for PreferReturn {
    type Err = String;

    /// Accepts the directive value with or without the `return=` prefix,
    /// ignoring case and underscores (`OPERATION_OUTCOME` is accepted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = trimmed.strip_prefix("return=").unwrap_or(trimmed);
        match value.replace('_', "").to_ascii_lowercase().as_str() {
            "minimal" => Ok(PreferReturn::Minimal),
            "representation" => Ok(PreferReturn::Representation),
            "operationoutcome" => Ok(PreferReturn::OperationOutcome),
            _ => Err(format!(
                "unknown return preference '{}', expected minimal, representation or OperationOutcome",
                value
            )),
        }
    }
}

/// `Cache-Control` request directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheControlDirective {
    /// Ask the server to bypass any cached result.
    pub no_cache: bool,
    /// Ask the server not to cache the result.
    pub no_store: bool,
    /// Upper bound on the number of results the server may cache.
    pub max_results: Option<u32>,
}

impl CacheControlDirective {
    /// Returns the `Cache-Control` header value, or `None` if no directive is set.
    pub fn header_value(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.no_cache {
            parts.push("no-cache".to_string());
        }
        if self.no_store {
            parts.push("no-store".to_string());
        }
        if let Some(max) = self.max_results {
            parts.push(format!("max-results={}", max));
        }
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl FromStr for CacheControlDirective {
    type Err = String;

    /// Parses a header-style value such as `no-cache, max-results=50`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut directive = CacheControlDirective::default();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some(max) = part.strip_prefix("max-results=") {
                let max = max
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid max-results value '{}'", max))?;
                directive.max_results = Some(max);
            } else if part.eq_ignore_ascii_case("no-cache") {
                directive.no_cache = true;
            } else if part.eq_ignore_ascii_case("no-store") {
                directive.no_store = true;
            } else {
                return Err(format!("unknown cache directive '{}'", part));
            }
        }
        Ok(directive)
    }
}

/// What a conditional read yields when the server still holds the given version.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum VersionMatch {
    /// Yield nothing; the caller already holds the current version.
    #[default]
    ReturnNull,
    /// Yield the supplied resource.
    ReturnResource(Resource),
    /// Fail with the server's not-modified response.
    ThrowError,
}

macro_rules! string_conversions {
    ($($ty:ident),+) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = String;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.as_str().to_string()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

string_conversions!(EncodingEnum, SummaryMode, PreferReturn);

//! Endpoint URI parsing.
//!
//! An endpoint is addressed as `fhir://<api>/<method>?<options>`, for
//! example `fhir://read/resourceById?resourceType=Patient&id=1`. The opaque
//! form `fhir:<api>/<method>` is accepted as well. Options are kept as
//! strings; the endpoint decides which are configuration, which are extra
//! parameters and which are method arguments.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::api::ApiName;
use crate::config::Properties;
use crate::error::ConfigurationError;

/// The URI scheme of FHIR endpoints.
pub const SCHEME: &str = "fhir";

/// A parsed endpoint URI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointUri {
    /// The addressed API.
    pub api: ApiName,
    /// The method name within the API.
    pub method: String,
    /// Query options, in key order.
    pub options: Properties,
}

impl EndpointUri {
    /// Parses `fhir://api/method?options`.
    pub fn parse(uri: &str) -> Result<Self, ConfigurationError> {
        let invalid = |message: &str| ConfigurationError::InvalidUri {
            uri: uri.to_string(),
            message: message.to_string(),
        };

        let url = Url::parse(uri.trim()).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != SCHEME {
            return Err(invalid(&format!("scheme must be '{}'", SCHEME)));
        }

        // `fhir://read/resourceById` puts the API in the host position,
        // `fhir:read/resourceById` leaves it in the path.
        let mut segments: Vec<String> = Vec::new();
        if let Some(host) = url.host_str() {
            segments.push(host.to_string());
        }
        segments.extend(
            url.path()
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        );

        let [api, method] = segments.as_slice() else {
            return Err(invalid("expected <api>/<method>"));
        };
        let api: ApiName = api.parse()?;

        let options = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect();

        Ok(Self {
            api,
            method: method.clone(),
            options,
        })
    }
}

impl fmt::Display for EndpointUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", SCHEME, self.api, self.method)?;
        let mut separator = '?';
        for (key, value) in &self.options {
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            write!(f, "{}{}={}", separator, key, value)?;
            separator = '&';
        }
        Ok(())
    }
}

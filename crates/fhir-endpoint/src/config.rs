//! Connection configuration shared by the endpoints of a component.
//!
//! A [`FhirConfiguration`] is deserialized from the flat option map of an
//! endpoint URI (camelCase keys) or built programmatically. Values coming
//! from URIs are strings, so flags and numbers also accept their textual
//! form.
//!
//! # Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `serverUrl` | - | FHIR server base URL |
//! | `fhirVersion` | R4 | DSTU2, DSTU3, R4, R4B, R5 or R6 |
//! | `encoding` | - | json or xml |
//! | `summary` | - | default `_summary` mode |
//! | `prettyPrint` | false | request pretty-printed responses |
//! | `log` | false | log requests and responses |
//! | `compress` | false | gzip request bodies |
//! | `connectionTimeout` | 10000 | connect timeout (ms) |
//! | `socketTimeout` | 10000 | read timeout (ms) |
//! | `username` / `password` | - | HTTP basic authentication |
//! | `accessToken` | - | bearer token |
//! | `sessionCookie` | - | cookie sent with every request |
//! | `proxyHost` / `proxyPort` / `proxyUser` / `proxyPassword` | - | HTTP proxy |
//! | `forceConformanceCheck` | false | fetch the capability statement before the first request |
//! | `validationMode` | ONCE | NEVER or ONCE |
//!
//! # Example
//!
//! ```rust
//! use helios_fhir_endpoint::{FhirConfiguration, FhirConnection, FhirVersion};
//!
//! let config = FhirConfiguration {
//!     server_url: Some("http://hapi.fhir.org/baseR4".to_string()),
//!     fhir_version: FhirVersion::R4,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//!
//! // No client factory is configured, so creating the client fails.
//! let connection = FhirConnection::new(config);
//! assert!(connection.generic_client().is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::client::{ClientFactory, EncodingEnum, GenericClient, SummaryMode};
use crate::error::{ConfigurationError, EndpointError};

/// A flat option map, as parsed from an endpoint URI.
pub type Properties = BTreeMap<String, Value>;

/// FHIR release spoken by the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FhirVersion {
    /// FHIR DSTU2 (1.0.2)
    Dstu2,
    /// FHIR STU3 (3.0.2)
    Dstu3,
    /// FHIR R4 (4.0.1)
    #[default]
    R4,
    /// FHIR R4B (4.3.0)
    R4B,
    /// FHIR R5 (5.0.0)
    R5,
    /// FHIR R6 (6.0.0-ballot1)
    R6,
}

impl FhirVersion {
    /// Returns the version name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FhirVersion::Dstu2 => "DSTU2",
            FhirVersion::Dstu3 => "DSTU3",
            FhirVersion::R4 => "R4",
            FhirVersion::R4B => "R4B",
            FhirVersion::R5 => "R5",
            FhirVersion::R6 => "R6",
        }
    }

    /// Returns the published release number.
    pub fn release(&self) -> &'static str {
        match self {
            FhirVersion::Dstu2 => "1.0.2",
            FhirVersion::Dstu3 => "3.0.2",
            FhirVersion::R4 => "4.0.1",
            FhirVersion::R4B => "4.3.0",
            FhirVersion::R5 => "5.0.0",
            FhirVersion::R6 => "6.0.0-ballot1",
        }
    }
}

impl FromStr for FhirVersion {
    type Err = String;

    /// Parses a version name (case-insensitive) or a release number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DSTU2" | "1.0" | "1.0.2" => Ok(FhirVersion::Dstu2),
            "DSTU3" | "STU3" | "3.0" | "3.0.2" => Ok(FhirVersion::Dstu3),
            "R4" | "4.0" | "4.0.1" => Ok(FhirVersion::R4),
            "R4B" | "4.3" | "4.3.0" => Ok(FhirVersion::R4B),
            "R5" | "5.0" | "5.0.0" => Ok(FhirVersion::R5),
            "R6" | "6.0" => Ok(FhirVersion::R6),
            _ => Err(format!("unsupported FHIR version '{}'", s.trim())),
        }
    }
}

impl TryFrom<String> for FhirVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FhirVersion> for String {
    fn from(version: FhirVersion) -> Self {
        version.as_str().to_string()
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version-specific context a client is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FhirContext {
    version: FhirVersion,
}

impl FhirContext {
    /// Creates a context for a FHIR release.
    pub fn new(version: FhirVersion) -> Self {
        Self { version }
    }

    /// Returns the FHIR release of this context.
    pub fn version(&self) -> FhirVersion {
        self.version
    }
}

/// How often the client validates the server's conformance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValidationMode {
    /// Never fetch the capability statement.
    Never,
    /// Fetch it once per server base.
    #[default]
    Once,
}

impl ValidationMode {
    /// Returns the mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Never => "NEVER",
            ValidationMode::Once => "ONCE",
        }
    }
}

impl TryFrom<String> for ValidationMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NEVER" => Ok(ValidationMode::Never),
            "ONCE" => Ok(ValidationMode::Once),
            _ => Err(format!("unknown validation mode '{}', expected NEVER or ONCE", value)),
        }
    }
}

impl From<ValidationMode> for String {
    fn from(mode: ValidationMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Authentication sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// OAuth bearer token.
    Bearer {
        /// The access token.
        token: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Credentials::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

/// HTTP proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    /// Proxy host.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Proxy credentials, if the proxy requires them.
    pub credentials: Option<(String, String)>,
}

/// Transport settings handed to a [`ClientFactory`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// Default wire encoding.
    pub encoding: Option<EncodingEnum>,
    /// Default `_summary` mode.
    pub summary: Option<SummaryMode>,
    /// Request pretty-printed responses.
    pub pretty_print: bool,
    /// Log requests and responses.
    pub log: bool,
    /// Compress request bodies.
    pub compress: bool,
    /// Connect timeout.
    pub connection_timeout: Duration,
    /// Read timeout.
    pub socket_timeout: Duration,
    /// Authentication.
    pub credentials: Option<Credentials>,
    /// Cookie sent with every request.
    pub session_cookie: Option<String>,
    /// HTTP proxy.
    pub proxy: Option<ProxySettings>,
    /// Fetch the capability statement before the first request.
    pub force_conformance_check: bool,
    /// Server validation mode.
    pub validation_mode: ValidationMode,
}

/// Connection configuration for FHIR endpoints.
///
/// A plain value: build it with struct update syntax, then hand it to a
/// [`FhirConnection`], which creates the client. A pre-built
/// [`client`](Self::client) always wins over `serverUrl`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FhirConfiguration {
    /// FHIR server base URL.
    pub server_url: Option<String>,

    /// FHIR release of the server.
    pub fhir_version: FhirVersion,

    /// Default wire encoding.
    pub encoding: Option<EncodingEnum>,

    /// Default `_summary` mode.
    pub summary: Option<SummaryMode>,

    /// Request pretty-printed responses.
    #[serde(deserialize_with = "lenient::flag")]
    pub pretty_print: bool,

    /// Log requests and responses.
    #[serde(deserialize_with = "lenient::flag")]
    pub log: bool,

    /// Compress request bodies.
    #[serde(deserialize_with = "lenient::flag")]
    pub compress: bool,

    /// Connect timeout in milliseconds.
    #[serde(deserialize_with = "lenient::number")]
    pub connection_timeout: u64,

    /// Read timeout in milliseconds.
    #[serde(deserialize_with = "lenient::number")]
    pub socket_timeout: u64,

    /// Basic authentication user name.
    pub username: Option<String>,

    /// Basic authentication password.
    pub password: Option<String>,

    /// Bearer token.
    pub access_token: Option<String>,

    /// Cookie sent with every request.
    pub session_cookie: Option<String>,

    /// Proxy host.
    pub proxy_host: Option<String>,

    /// Proxy port.
    #[serde(deserialize_with = "lenient::optional_port")]
    pub proxy_port: Option<u16>,

    /// Proxy user name.
    pub proxy_user: Option<String>,

    /// Proxy password.
    pub proxy_password: Option<String>,

    /// Fetch the capability statement before the first request.
    #[serde(deserialize_with = "lenient::flag")]
    pub force_conformance_check: bool,

    /// Server validation mode.
    pub validation_mode: ValidationMode,

    /// A pre-built client; when set, no connection is created.
    #[serde(skip)]
    pub client: Option<Arc<dyn GenericClient>>,

    /// Builds the client from `serverUrl` when no pre-built client is set.
    #[serde(skip)]
    pub client_factory: Option<Arc<dyn ClientFactory>>,

    /// Overrides the context derived from `fhirVersion`.
    #[serde(skip)]
    pub fhir_context: Option<FhirContext>,
}

impl FhirConfiguration {
    /// Option keys recognised by the configuration.
    pub const OPTION_KEYS: [&'static str; 19] = [
        "serverUrl",
        "fhirVersion",
        "encoding",
        "summary",
        "prettyPrint",
        "log",
        "compress",
        "connectionTimeout",
        "socketTimeout",
        "username",
        "password",
        "accessToken",
        "sessionCookie",
        "proxyHost",
        "proxyPort",
        "proxyUser",
        "proxyPassword",
        "forceConformanceCheck",
        "validationMode",
    ];

    /// Returns true if `key` is a configuration option.
    pub fn is_option(key: &str) -> bool {
        Self::OPTION_KEYS.contains(&key)
    }

    /// Builds a configuration from a flat option map.
    ///
    /// Keys that are not configuration options are ignored.
    pub fn from_properties(properties: &Properties) -> Result<Self, ConfigurationError> {
        Self::default().with_overrides(properties)
    }

    /// Creates a configuration that uses a pre-built client.
    pub fn with_client(client: Arc<dyn GenericClient>) -> Self {
        Self {
            client: Some(client),
            ..Default::default()
        }
    }

    /// Returns a new configuration with `overrides` applied on top of this one.
    ///
    /// The pre-built client, factory and context carry over.
    pub fn with_overrides(&self, overrides: &Properties) -> Result<Self, ConfigurationError> {
        let invalid = |e: serde_json::Error| ConfigurationError::InvalidOption {
            option: "configuration".to_string(),
            message: e.to_string(),
        };
        let mut merged = match serde_json::to_value(self).map_err(invalid)? {
            Value::Object(map) => map,
            other => {
                return Err(ConfigurationError::InvalidOption {
                    option: "configuration".to_string(),
                    message: format!("expected an object, got {}", other),
                });
            }
        };

        for (key, value) in overrides.iter().filter(|(key, _)| Self::is_option(key)) {
            let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
            serde_json::from_value::<FhirConfiguration>(single).map_err(|e| {
                ConfigurationError::InvalidOption {
                    option: key.clone(),
                    message: e.to_string(),
                }
            })?;
            merged.insert(key.clone(), value.clone());
        }

        let mut config: FhirConfiguration =
            serde_json::from_value(Value::Object(merged)).map_err(invalid)?;
        config.client = self.client.clone();
        config.client_factory = self.client_factory.clone();
        config.fhir_context = self.fhir_context;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Returns a list of problems. A missing `serverUrl` is not a problem
    /// here; it is reported when a connection is first needed.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(server_url) = &self.server_url {
            match url::Url::parse(server_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(format!(
                    "serverUrl must use http or https, got '{}'",
                    url.scheme()
                )),
                Err(e) => errors.push(format!(
                    "serverUrl '{}' is not a valid URL: {}",
                    server_url, e
                )),
            }
        }

        if self.connection_timeout == 0 {
            errors.push("connectionTimeout must be greater than 0".to_string());
        }

        if self.socket_timeout == 0 {
            errors.push("socketTimeout must be greater than 0".to_string());
        }

        if self.password.is_some() && self.username.is_none() {
            errors.push("password is set but username is missing".to_string());
        }

        if self.username.is_some() && self.access_token.is_some() {
            errors.push("username and accessToken are mutually exclusive".to_string());
        }

        if self.proxy_port.is_some() && self.proxy_host.is_none() {
            errors.push("proxyPort is set but proxyHost is missing".to_string());
        }

        if self.proxy_password.is_some() && self.proxy_user.is_none() {
            errors.push("proxyPassword is set but proxyUser is missing".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Returns the context clients are built for.
    pub fn fhir_context(&self) -> FhirContext {
        self.fhir_context
            .unwrap_or_else(|| FhirContext::new(self.fhir_version))
    }

    /// Returns the transport settings derived from this configuration.
    pub fn client_settings(&self) -> ClientSettings {
        let credentials = match (&self.username, &self.access_token) {
            (Some(username), _) => Some(Credentials::Basic {
                username: username.clone(),
                password: self.password.clone().unwrap_or_default(),
            }),
            (None, Some(token)) => Some(Credentials::Bearer {
                token: token.clone(),
            }),
            (None, None) => None,
        };

        let proxy = self.proxy_host.as_ref().map(|host| ProxySettings {
            host: host.clone(),
            port: self.proxy_port.unwrap_or(80),
            credentials: self
                .proxy_user
                .as_ref()
                .map(|user| (user.clone(), self.proxy_password.clone().unwrap_or_default())),
        });

        ClientSettings {
            encoding: self.encoding,
            summary: self.summary,
            pretty_print: self.pretty_print,
            log: self.log,
            compress: self.compress,
            connection_timeout: Duration::from_millis(self.connection_timeout),
            socket_timeout: Duration::from_millis(self.socket_timeout),
            credentials,
            session_cookie: self.session_cookie.clone(),
            proxy,
            force_conformance_check: self.force_conformance_check,
            validation_mode: self.validation_mode,
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing(client: Arc<dyn GenericClient>) -> Self {
        Self {
            server_url: None,
            connection_timeout: 1000,
            socket_timeout: 1000,
            client: Some(client),
            ..Default::default()
        }
    }
}

impl Default for FhirConfiguration {
    fn default() -> Self {
        Self {
            server_url: None,
            fhir_version: FhirVersion::default(),
            encoding: None,
            summary: None,
            pretty_print: false,
            log: false,
            compress: false,
            connection_timeout: 10_000,
            socket_timeout: 10_000,
            username: None,
            password: None,
            access_token: None,
            session_cookie: None,
            proxy_host: None,
            proxy_port: None,
            proxy_user: None,
            proxy_password: None,
            force_conformance_check: false,
            validation_mode: ValidationMode::default(),
            client: None,
            client_factory: None,
            fhir_context: None,
        }
    }
}

impl fmt::Debug for FhirConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FhirConfiguration")
            .field("server_url", &self.server_url)
            .field("fhir_version", &self.fhir_version)
            .field("encoding", &self.encoding)
            .field("summary", &self.summary)
            .field("pretty_print", &self.pretty_print)
            .field("connection_timeout", &self.connection_timeout)
            .field("socket_timeout", &self.socket_timeout)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("proxy_host", &self.proxy_host)
            .field("proxy_port", &self.proxy_port)
            .field("validation_mode", &self.validation_mode)
            .field("client", &self.client.as_ref().map(|_| "<client>"))
            .field("client_factory", &self.client_factory.as_ref().map(|_| "<factory>"))
            .finish_non_exhaustive()
    }
}

/// A configuration together with the client created from it.
///
/// The client is created lazily, at most once, the first time an endpoint
/// needs it. Concurrent first use still creates a single client.
pub struct FhirConnection {
    configuration: Arc<FhirConfiguration>,
    client: Mutex<Option<Arc<dyn GenericClient>>>,
}

impl FhirConnection {
    /// Wraps `configuration`; no client is created yet.
    pub fn new(configuration: FhirConfiguration) -> Self {
        Self {
            configuration: Arc::new(configuration),
            client: Mutex::new(None),
        }
    }

    /// Returns the configuration clients are created from.
    pub fn configuration(&self) -> &Arc<FhirConfiguration> {
        &self.configuration
    }

    /// Returns the shared client, creating it on first use.
    ///
    /// A pre-built client is returned as is. Otherwise `serverUrl` must be
    /// set and the configured factory builds the client once; later calls
    /// return the same instance.
    pub fn generic_client(&self) -> Result<Arc<dyn GenericClient>, EndpointError> {
        let config = &self.configuration;
        if let Some(client) = &config.client {
            if let Some(server_url) = &config.server_url {
                warn!(
                    server_url = %server_url,
                    "Both a client and serverUrl are configured; using the client"
                );
            }
            return Ok(Arc::clone(client));
        }

        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let server_url = config
            .server_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigurationError::MissingServerUrl)?;

        let factory =
            config
                .client_factory
                .as_ref()
                .ok_or_else(|| ConfigurationError::MissingClientFactory {
                    server_url: server_url.to_string(),
                })?;

        let context = config.fhir_context();
        info!(
            server_url = %server_url,
            fhir_version = %context.version(),
            "Creating FHIR client"
        );

        let client = factory.new_generic_client(&context, server_url, &config.client_settings())?;
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }
}

impl fmt::Debug for FhirConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connected = self
            .client
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false);
        f.debug_struct("FhirConnection")
            .field("configuration", &self.configuration)
            .field("connected", &connected)
            .finish()
    }
}

/// Deserializers that accept both typed JSON and the string form used in URIs.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlagOrText {
        Flag(bool),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u64),
        Text(String),
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match FlagOrText::deserialize(deserializer)? {
            FlagOrText::Flag(flag) => Ok(flag),
            FlagOrText::Text(text) => parse_flag(&text).map_err(D::Error::custom),
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(n) => Ok(n),
            NumberOrText::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("expected a number, got '{}'", text))),
        }
    }

    pub fn optional_port<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u16>, D::Error> {
        let value = match Option::<NumberOrText>::deserialize(deserializer)? {
            None => return Ok(None),
            Some(NumberOrText::Number(n)) => n,
            Some(NumberOrText::Text(text)) => text
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("expected a port, got '{}'", text)))?,
        };
        u16::try_from(value)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("port {} out of range", value)))
    }

    pub(crate) fn parse_flag(text: &str) -> Result<bool, String> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if text.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(format!("expected true or false, got '{}'", text))
        }
    }
}

pub(crate) use lenient::parse_flag;

//! Error types for the FHIR endpoint adapter.
//!
//! Errors are split by the phase in which they arise:
//!
//! | Error | Raised when | Typical cause |
//! |-------|-------------|---------------|
//! | [`ConfigurationError`] | endpoint setup or argument binding | unknown API token, missing `serverUrl`, missing argument |
//! | [`ExtraParameterError`] | applying modifiers to a request builder | parameter not supported by the builder kind, bad value |
//! | [`ClientError`] | executing a request | raised by the remote client and passed through untouched |
//!
//! All three convert into [`EndpointError`] via `?`.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::client::RequestKind;
use crate::extra_parameters::ExtraParameter;
use crate::model::Resource;

/// The top-level error type returned by endpoint setup and invocation.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// Invalid endpoint configuration or call arguments
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Extra parameter could not be applied
    #[error(transparent)]
    ExtraParameter(#[from] ExtraParameterError),

    /// Error raised by the remote FHIR client
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A blocking invocation task panicked or was cancelled
    #[error("invocation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EndpointError {
    /// Returns true if this error was raised by the remote client.
    pub fn is_client_error(&self) -> bool {
        matches!(self, EndpointError::Client(_))
    }
}

/// Errors detected while configuring an endpoint or binding call arguments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// The endpoint names an API outside the closed set.
    #[error("unknown FHIR API '{name}'")]
    UnknownApi { name: String },

    /// No method with this name exists on the selected API.
    #[error("unknown method '{method}' for API '{api}'")]
    UnknownMethod { api: String, method: String },

    /// Neither a pre-built client nor a server URL was configured.
    #[error("FHIR base URL must be set")]
    MissingServerUrl,

    /// A server URL is configured but nothing can construct a client for it.
    #[error("no client factory configured for server '{server_url}'")]
    MissingClientFactory { server_url: String },

    /// A required method argument was not supplied.
    #[error("missing required argument '{argument}' for {api}/{method}")]
    MissingArgument {
        api: String,
        method: String,
        argument: String,
    },

    /// A method argument could not be converted to the expected type.
    #[error("invalid value for argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    /// A configuration option has an unusable value.
    #[error("invalid value for option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    /// The endpoint URI could not be parsed.
    #[error("invalid endpoint URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    /// `inBody` is only meaningful for producers.
    #[error("option inBody is not supported for consumer endpoints")]
    InBodyNotSupported,
}

/// Errors raised while applying extra parameters to a request builder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtraParameterError {
    /// The parameter is defined but the builder kind does not support it.
    #[error("extra parameter '{}' cannot be applied to a {target} request", parameter.key())]
    UnsupportedTarget {
        parameter: ExtraParameter,
        target: RequestKind,
    },

    /// The configured value has the wrong shape for the parameter.
    #[error("invalid value for extra parameter '{}': {message}", parameter.key())]
    InvalidValue {
        parameter: ExtraParameter,
        message: String,
    },

    /// The key does not name any extra parameter.
    #[error("unknown extra parameter '{key}'")]
    UnknownParameter { key: String },

    /// Two parameters request different encodings.
    #[error(
        "extra parameters '{}' and '{}' request different encodings",
        first.key(),
        second.key()
    )]
    ConflictingEncoding {
        first: ExtraParameter,
        second: ExtraParameter,
    },
}

/// Errors raised by the remote FHIR client.
///
/// These are produced by [`GenericClient`](crate::client::GenericClient)
/// implementations and surface through the facades unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The server answered with an error status.
    #[error("HTTP {status}: {message}")]
    Server {
        status: u16,
        message: String,
        operation_outcome: Option<Resource>,
    },

    /// The request never produced a response.
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// The response body could not be understood.
    #[error("unable to parse server response: {message}")]
    Parse { message: String },
}

impl ClientError {
    /// Returns the HTTP status for server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Transport { .. } | ClientError::Parse { .. } => None,
        }
    }
}

/// Result type for endpoint operations.
pub type EndpointResult<T> = Result<T, EndpointError>;

/// Result type returned by remote client builders.
pub type ClientResult<T> = Result<T, ClientError>;

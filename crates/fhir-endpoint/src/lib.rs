//! # helios-fhir-endpoint - FHIR REST client operations as pipeline endpoints
//!
//! This crate exposes the operations of a FHIR REST client (create, read,
//! search, transaction, ...) as endpoints of an integration pipeline. An
//! endpoint is addressed by a URI, runs as a producer (once per message) or
//! as a polling consumer, and delegates to a thin facade over a shared
//! [`GenericClient`].
//!
//! The crate does not speak HTTP itself. A client is supplied either
//! pre-built or through a [`ClientFactory`] that builds it lazily from
//! `serverUrl`, once per configuration.
//!
//! ## Endpoint URIs
//!
//! ```text
//! fhir://<api>/<method>?<options>
//! ```
//!
//! | API | Methods |
//! |-----|---------|
//! | `capabilities` | `ofType` |
//! | `create` | `resource` |
//! | `delete` | `resource`, `resourceById`, `resourceConditionalByUrl` |
//! | `history` | `onServer`, `onType`, `onInstance` |
//! | `load-page` | `next`, `previous`, `byUrl` |
//! | `meta` | `getFromServer`, `getFromType`, `getFromResource`, `add`, `delete` |
//! | `operation` | `onServer`, `onType`, `onInstance`, `onInstanceVersion`, `processMessage` |
//! | `patch` | `patchById`, `patchByUrl` |
//! | `read` | `resourceById`, `resourceByUrl` |
//! | `search` | `searchByUrl` |
//! | `transaction` | `withBundle`, `withResources` |
//! | `update` | `resource`, `resourceBySearchUrl` |
//! | `validate` | `resource` |
//!
//! Options are sorted into configuration overrides (see [`config`]), extra
//! parameters (see [`extra_parameters`]), endpoint settings (`inBody`,
//! `delay`, `initialDelay`, `splitResult`) and method arguments.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helios_fhir_endpoint::{ArgumentBag, FhirComponent, FhirConfiguration};
//!
//! let config = FhirConfiguration::with_client(my_client);
//! let component = FhirComponent::new(config);
//!
//! let endpoint = component.create_endpoint("fhir://read/resourceById?resourceType=Patient")?;
//! let patient = endpoint.invoke(&ArgumentBag::new().with("id", "Patient/123"))?;
//! ```
//!
//! ## Architecture
//!
//! - [`error`] - Error types
//! - [`config`] - Connection configuration and the lazily created client
//! - [`model`] - Resource, Bundle, id and outcome types
//! - [`client`] - Traits implemented by the remote client
//! - [`extra_parameters`] - Optional request modifiers
//! - [`api`] - Operation facades and method dispatch
//! - [`uri`] - Endpoint URI parsing
//! - [`endpoint`] - Endpoint setup and invocation
//! - [`exchange`] - Pipeline messages
//! - [`producer`] / [`consumer`] - Message-driven and scheduled invocation

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod client;
pub mod config;
pub mod consumer;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod extra_parameters;
pub mod model;
pub mod producer;
pub mod uri;

// Re-export commonly used types
pub use api::{ApiMethod, ApiName, ApiOutput, ApiProxy, ArgumentBag};
pub use client::{ClientFactory, GenericClient, RequestBuilder, RequestKind};
pub use config::{FhirConfiguration, FhirConnection, FhirContext, FhirVersion, Properties};
pub use consumer::FhirConsumer;
pub use endpoint::{EndpointPlan, EndpointSettings, FhirComponent, FhirEndpoint};
pub use error::{
    ClientError, ConfigurationError, EndpointError, EndpointResult, ExtraParameterError,
};
pub use exchange::{Exchange, Processor};
pub use extra_parameters::{ExtraParameter, ExtraParameters};
pub use model::{Bundle, IdType, MethodOutcome, Resource, ResourcePayload};
pub use producer::FhirProducer;
pub use uri::EndpointUri;

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("helios_fhir_endpoint={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

//! Capabilities facade.
//!
//! Fetches the server's CapabilityStatement: `GET [base]/metadata`.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, RequestBuilder};
use crate::error::EndpointResult;
use crate::extra_parameters::ExtraParameters;
use crate::model::Resource;

/// Reads the server's capability statement.
#[derive(Clone)]
pub struct FhirCapabilities {
    client: Arc<dyn GenericClient>,
}

impl FhirCapabilities {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Retrieves the capability statement, optionally as a specific resource
    /// type (for servers still answering with a `Conformance` resource).
    pub fn of_type(
        &self,
        resource_type: Option<&str>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Resource> {
        debug!(
            resource_type = resource_type.unwrap_or("CapabilityStatement"),
            "Processing capabilities request"
        );

        let mut capabilities = self.client.capabilities(resource_type);
        ExtraParameters::process(
            extra_parameters,
            RequestBuilder::Capabilities(capabilities.as_mut()),
        )?;
        Ok(capabilities.execute()?)
    }
}

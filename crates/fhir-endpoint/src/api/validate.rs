//! Validate facade: `POST [base]/[type]/$validate`.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, RequestBuilder};
use crate::error::EndpointResult;
use crate::extra_parameters::ExtraParameters;
use crate::model::{MethodOutcome, Resource, ResourcePayload};

/// Asks the server to validate resources.
#[derive(Clone)]
pub struct FhirValidate {
    client: Arc<dyn GenericClient>,
}

impl FhirValidate {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Validates a resource. The outcome carries the server's OperationOutcome.
    pub fn resource(
        &self,
        resource: Resource,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        self.validate(ResourcePayload::Structured(resource), extra_parameters)
    }

    /// Validates a resource given in serialized form.
    pub fn resource_as_string(
        &self,
        resource: String,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        self.validate(ResourcePayload::Raw(resource), extra_parameters)
    }

    fn validate(
        &self,
        payload: ResourcePayload,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        debug!(
            raw = matches!(payload, ResourcePayload::Raw(_)),
            "Processing validate request"
        );

        let mut validate = self.client.validate(payload);
        ExtraParameters::process(extra_parameters, RequestBuilder::Validate(validate.as_mut()))?;
        Ok(validate.execute()?)
    }
}

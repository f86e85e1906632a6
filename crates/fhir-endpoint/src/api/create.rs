//! Create facade.
//!
//! Wraps the FHIR [create interaction](https://hl7.org/fhir/http.html#create):
//! `POST [base]/[type]`, optionally conditional via `If-None-Exist`.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, PreferReturn, RequestBuilder};
use crate::error::EndpointResult;
use crate::extra_parameters::ExtraParameters;
use crate::model::{MethodOutcome, Resource, ResourcePayload};

/// Creates resources on the server.
#[derive(Clone)]
pub struct FhirCreate {
    client: Arc<dyn GenericClient>,
}

impl FhirCreate {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Creates a resource.
    ///
    /// When `url` is given the create is conditional: the server only
    /// creates the resource if nothing matches the search URL.
    pub fn resource(
        &self,
        resource: Resource,
        url: Option<&str>,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        self.create(
            ResourcePayload::Structured(resource),
            url,
            prefer_return,
            extra_parameters,
        )
    }

    /// Creates a resource from its serialized form.
    pub fn resource_as_string(
        &self,
        resource: String,
        url: Option<&str>,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        self.create(
            ResourcePayload::Raw(resource),
            url,
            prefer_return,
            extra_parameters,
        )
    }

    fn create(
        &self,
        payload: ResourcePayload,
        url: Option<&str>,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        debug!(
            conditional_url = url.unwrap_or_default(),
            raw = matches!(payload, ResourcePayload::Raw(_)),
            "Processing create request"
        );

        let mut create = self.client.create(payload);
        if let Some(url) = url {
            create.conditional_by_url(url);
        }
        if let Some(prefer) = prefer_return {
            create.prefer(prefer);
        }
        ExtraParameters::process(extra_parameters, RequestBuilder::Create(create.as_mut()))?;

        let outcome = create.execute()?;
        debug!(id = ?outcome.id, created = ?outcome.created, "Resource created");
        Ok(outcome)
    }
}

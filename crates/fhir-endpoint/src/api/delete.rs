//! Delete facade.
//!
//! Wraps the FHIR [delete interaction](https://hl7.org/fhir/http.html#delete):
//! `DELETE [base]/[type]/[id]` and the conditional form
//! `DELETE [base]/[type]?[search-params]`.

use std::sync::Arc;

use tracing::debug;

use crate::client::{DeleteTarget, GenericClient, RequestBuilder};
use crate::error::EndpointResult;
use crate::extra_parameters::ExtraParameters;
use crate::model::{IdType, Resource};

/// Deletes resources on the server.
///
/// All four entry points build a [`DeleteTarget`] and share one execution
/// path. Each returns the server's OperationOutcome, if it sent one.
#[derive(Clone)]
pub struct FhirDelete {
    client: Arc<dyn GenericClient>,
}

impl FhirDelete {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Deletes the resource identified by the given resource's type and id.
    pub fn resource(
        &self,
        resource: Resource,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Option<Resource>> {
        self.delete(DeleteTarget::Resource(resource), extra_parameters)
    }

    /// Deletes a resource by typed id.
    pub fn resource_by_id(
        &self,
        id: IdType,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Option<Resource>> {
        self.delete(DeleteTarget::Id(id), extra_parameters)
    }

    /// Deletes a resource by type and logical id.
    pub fn resource_by_type_and_id(
        &self,
        resource_type: &str,
        id: &str,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Option<Resource>> {
        self.delete(
            DeleteTarget::TypeAndId {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
            },
            extra_parameters,
        )
    }

    /// Deletes every resource matching a search URL.
    pub fn resource_conditional_by_url(
        &self,
        url: &str,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Option<Resource>> {
        self.delete(DeleteTarget::ConditionalUrl(url.to_string()), extra_parameters)
    }

    fn delete(
        &self,
        target: DeleteTarget,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Option<Resource>> {
        debug!(delete_target = ?target, "Processing delete request");

        let mut delete = self.client.delete(target);
        ExtraParameters::process(extra_parameters, RequestBuilder::Delete(delete.as_mut()))?;
        Ok(delete.execute()?)
    }
}

//! Update facade.
//!
//! Wraps the FHIR [update interaction](https://hl7.org/fhir/http.html#update):
//! `PUT [base]/[type]/[id]` and conditional update
//! `PUT [base]/[type]?[search-params]`.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, PreferReturn, RequestBuilder};
use crate::error::{ConfigurationError, EndpointResult};
use crate::extra_parameters::ExtraParameters;
use crate::model::{IdType, MethodOutcome, Resource, ResourcePayload};

/// Updates resources on the server.
#[derive(Clone)]
pub struct FhirUpdate {
    client: Arc<dyn GenericClient>,
}

impl FhirUpdate {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Updates a resource, by `id` or by the id the resource carries.
    pub fn resource(
        &self,
        resource: Resource,
        id: Option<IdType>,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        require_id(resource.id().is_some(), id.as_ref())?;
        self.update(
            ResourcePayload::Structured(resource),
            Target::Id(id),
            prefer_return,
            extra_parameters,
        )
    }

    /// Updates a resource given in serialized form.
    ///
    /// Without `id` the payload must be a JSON resource that carries one.
    pub fn resource_as_string(
        &self,
        resource: String,
        id: Option<IdType>,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        let carries_id = Resource::from_json_str(&resource).is_some_and(|r| r.id().is_some());
        require_id(carries_id, id.as_ref())?;
        self.update(
            ResourcePayload::Raw(resource),
            Target::Id(id),
            prefer_return,
            extra_parameters,
        )
    }

    /// Conditionally updates the resource matching a search URL.
    pub fn resource_by_search_url(
        &self,
        resource: ResourcePayload,
        url: &str,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        self.update(resource, Target::SearchUrl(url), prefer_return, extra_parameters)
    }

    fn update(
        &self,
        payload: ResourcePayload,
        target: Target<'_>,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        let mut update = self.client.update(payload);
        match target {
            Target::Id(Some(id)) => {
                debug!(id = %id, "Processing update request");
                update.with_id(&id);
            }
            Target::Id(None) => debug!("Processing update request"),
            Target::SearchUrl(url) => {
                debug!(conditional_url = %url, "Processing conditional update request");
                update.conditional_by_url(url);
            }
        }
        if let Some(prefer) = prefer_return {
            update.prefer(prefer);
        }
        ExtraParameters::process(extra_parameters, RequestBuilder::Update(update.as_mut()))?;
        Ok(update.execute()?)
    }
}

fn require_id(carries_id: bool, id: Option<&IdType>) -> Result<(), ConfigurationError> {
    if id.is_none() && !carries_id {
        return Err(ConfigurationError::InvalidArgument {
            argument: "id".to_string(),
            message: "resource has no id and none was given".to_string(),
        });
    }
    Ok(())
}

enum Target<'a> {
    Id(Option<IdType>),
    SearchUrl(&'a str),
}

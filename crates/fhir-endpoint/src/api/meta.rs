//! Meta facade.
//!
//! Wraps the `$meta`, `$meta-add` and `$meta-delete` operations.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::client::{GenericClient, MetaRequest, RequestBuilder};
use crate::error::{ConfigurationError, EndpointResult};
use crate::extra_parameters::ExtraParameters;
use crate::model::IdType;

/// Reads and edits resource meta (tags, profiles, security labels).
#[derive(Clone)]
pub struct FhirMeta {
    client: Arc<dyn GenericClient>,
}

impl FhirMeta {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// `GET [base]/$meta`
    pub fn get_from_server(
        &self,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Value> {
        self.meta(MetaRequest::FromServer, extra_parameters)
    }

    /// `GET [base]/[type]/$meta`
    pub fn get_from_type(
        &self,
        resource_type: &str,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Value> {
        self.meta(MetaRequest::FromType(resource_type.to_string()), extra_parameters)
    }

    /// `GET [base]/[type]/[id]/$meta`
    pub fn get_from_resource(
        &self,
        id: IdType,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Value> {
        self.meta(MetaRequest::FromResource(id), extra_parameters)
    }

    /// `POST [base]/[type]/[id]/$meta-add`
    pub fn add(
        &self,
        meta: Value,
        id: IdType,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Value> {
        require_object(&meta)?;
        self.meta(MetaRequest::Add { meta, id }, extra_parameters)
    }

    /// `POST [base]/[type]/[id]/$meta-delete`
    pub fn delete(
        &self,
        meta: Value,
        id: IdType,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Value> {
        require_object(&meta)?;
        self.meta(MetaRequest::Delete { meta, id }, extra_parameters)
    }

    fn meta(
        &self,
        request: MetaRequest,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Value> {
        debug!(request = ?request, "Processing meta request");

        let mut meta = self.client.meta(request);
        ExtraParameters::process(extra_parameters, RequestBuilder::Meta(meta.as_mut()))?;
        Ok(meta.execute()?)
    }
}

fn require_object(meta: &Value) -> Result<(), ConfigurationError> {
    if meta.is_object() {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidArgument {
            argument: "meta".to_string(),
            message: "expected a Meta object".to_string(),
        })
    }
}

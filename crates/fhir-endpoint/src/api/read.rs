//! Read facade.
//!
//! Wraps the FHIR [read](https://hl7.org/fhir/http.html#read) and
//! [vread](https://hl7.org/fhir/http.html#vread) interactions.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, ReadTarget, RequestBuilder, VersionMatch};
use crate::error::EndpointResult;
use crate::extra_parameters::ExtraParameters;
use crate::model::{IdType, Resource};

/// Reads single resources.
///
/// Every method accepts an optional `if_version_matches` version: when the
/// server still holds that version, the read yields whatever `on_match`
/// asks for instead of the resource.
#[derive(Clone)]
pub struct FhirRead {
    client: Arc<dyn GenericClient>,
}

impl FhirRead {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Reads a resource by typed id. A versioned id performs a vread.
    pub fn resource_by_id(
        &self,
        resource_type: &str,
        id: IdType,
        if_version_matches: Option<&str>,
        on_match: VersionMatch,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Option<Resource>> {
        self.read(
            ReadTarget::Id {
                resource_type: resource_type.to_string(),
                id,
            },
            if_version_matches,
            on_match,
            extra_parameters,
        )
    }

    /// Reads a resource by logical id, optionally pinned to a version.
    pub fn resource_by_string_id(
        &self,
        resource_type: &str,
        id: &str,
        version: Option<&str>,
        if_version_matches: Option<&str>,
        on_match: VersionMatch,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Option<Resource>> {
        let id = IdType::new(resource_type, id);
        let id = match version {
            Some(version) => id.with_version(version),
            None => id,
        };
        self.resource_by_id(resource_type, id, if_version_matches, on_match, extra_parameters)
    }

    /// Reads a resource by absolute or relative URL.
    pub fn resource_by_url(
        &self,
        resource_type: &str,
        url: &str,
        if_version_matches: Option<&str>,
        on_match: VersionMatch,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Option<Resource>> {
        self.read(
            ReadTarget::Url {
                resource_type: resource_type.to_string(),
                url: url.to_string(),
            },
            if_version_matches,
            on_match,
            extra_parameters,
        )
    }

    fn read(
        &self,
        target: ReadTarget,
        if_version_matches: Option<&str>,
        on_match: VersionMatch,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Option<Resource>> {
        debug!(
            read_target = ?target,
            if_version_matches = if_version_matches.unwrap_or_default(),
            "Processing read request"
        );

        let mut read = self.client.read(target);
        if let Some(version) = if_version_matches {
            read.if_version_matches(version, on_match);
        }
        ExtraParameters::process(extra_parameters, RequestBuilder::Read(read.as_mut()))?;
        Ok(read.execute()?)
    }
}

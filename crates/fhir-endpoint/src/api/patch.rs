//! Patch facade.
//!
//! Wraps the FHIR [patch interaction](https://hl7.org/fhir/http.html#patch):
//! `PATCH [base]/[type]/[id]` and its conditional form.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, PatchTarget, PreferReturn, RequestBuilder};
use crate::error::{ConfigurationError, EndpointResult};
use crate::extra_parameters::ExtraParameters;
use crate::model::{IdType, MethodOutcome};

/// Applies patches to resources.
#[derive(Clone)]
pub struct FhirPatch {
    client: Arc<dyn GenericClient>,
}

impl FhirPatch {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Patches a resource by id.
    pub fn patch_by_id(
        &self,
        patch_body: &str,
        id: IdType,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        self.patch(patch_body, PatchTarget::Id(id), prefer_return, extra_parameters)
    }

    /// Patches every resource matching a search URL.
    pub fn patch_by_url(
        &self,
        patch_body: &str,
        url: &str,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        self.patch(
            patch_body,
            PatchTarget::ConditionalUrl(url.to_string()),
            prefer_return,
            extra_parameters,
        )
    }

    fn patch(
        &self,
        patch_body: &str,
        target: PatchTarget,
        prefer_return: Option<PreferReturn>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<MethodOutcome> {
        check_patch_body(patch_body)?;
        debug!(patch_target = ?target, "Processing patch request");

        let mut patch = self.client.patch(patch_body.to_string(), target);
        if let Some(prefer) = prefer_return {
            patch.prefer(prefer);
        }
        ExtraParameters::process(extra_parameters, RequestBuilder::Patch(patch.as_mut()))?;
        Ok(patch.execute()?)
    }
}

/// Rejects malformed JSON Patch documents before they reach the server.
///
/// JSON arrays must parse as JSON Patch; JSON objects must be a FHIRPath
/// Patch `Parameters` resource. Anything else (XML) is passed through.
fn check_patch_body(patch_body: &str) -> Result<(), ConfigurationError> {
    let invalid = |message: String| ConfigurationError::InvalidArgument {
        argument: "patchBody".to_string(),
        message,
    };

    let body = patch_body.trim();
    if body.is_empty() {
        return Err(invalid("patch body is empty".to_string()));
    }

    if body.starts_with('[') {
        serde_json::from_str::<json_patch::Patch>(body)
            .map_err(|e| invalid(format!("invalid JSON Patch: {}", e)))?;
    } else if body.starts_with('{') {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;
        if value.get("resourceType").and_then(|t| t.as_str()) != Some("Parameters") {
            return Err(invalid(
                "JSON object patches must be a FHIRPath Patch Parameters resource".to_string(),
            ));
        }
    }
    Ok(())
}

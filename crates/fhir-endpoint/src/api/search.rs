//! Search facade.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, RequestBuilder};
use crate::error::EndpointResult;
use crate::extra_parameters::ExtraParameters;
use crate::model::Bundle;

/// Runs searches given as complete URLs (`Patient?name=smith&_count=10`).
#[derive(Clone)]
pub struct FhirSearch {
    client: Arc<dyn GenericClient>,
}

impl FhirSearch {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Searches by URL, absolute or relative to the server base.
    pub fn search_by_url(
        &self,
        url: &str,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        debug!(url = %url, "Processing search request");

        let mut search = self.client.search(url);
        ExtraParameters::process(extra_parameters, RequestBuilder::Search(search.as_mut()))?;
        let bundle = search.execute()?;

        debug!(total = ?bundle.total(), "Search completed");
        Ok(bundle)
    }
}

//! Paging facade.
//!
//! Follows the `next` and `previous` links of search and history bundles.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, PageTarget, RequestBuilder};
use crate::error::{ConfigurationError, EndpointResult};
use crate::extra_parameters::ExtraParameters;
use crate::model::Bundle;

/// Loads pages of a paged bundle.
#[derive(Clone)]
pub struct FhirLoadPage {
    client: Arc<dyn GenericClient>,
}

impl FhirLoadPage {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Loads the page after `bundle`.
    ///
    /// Fails with a configuration error if the bundle has no `next` link.
    pub fn next(
        &self,
        bundle: Bundle,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        require_link("next", bundle.next_link())?;
        self.load(PageTarget::Next(bundle), extra_parameters)
    }

    /// Loads the page before `bundle`.
    ///
    /// Fails with a configuration error if the bundle has no `previous` link.
    pub fn previous(
        &self,
        bundle: Bundle,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        require_link("previous", bundle.previous_link())?;
        self.load(PageTarget::Previous(bundle), extra_parameters)
    }

    /// Loads a page by absolute URL.
    pub fn by_url(
        &self,
        url: &str,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        self.load(PageTarget::Url(url.to_string()), extra_parameters)
    }

    fn load(
        &self,
        target: PageTarget,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        let url = match &target {
            PageTarget::Next(bundle) => bundle.next_link(),
            PageTarget::Previous(bundle) => bundle.previous_link(),
            PageTarget::Url(url) => Some(url.as_str()),
        };
        debug!(url = url.unwrap_or_default(), "Processing load-page request");

        let mut page = self.client.load_page(target);
        ExtraParameters::process(extra_parameters, RequestBuilder::LoadPage(page.as_mut()))?;
        Ok(page.execute()?)
    }
}

fn require_link(relation: &str, link: Option<&str>) -> Result<(), ConfigurationError> {
    link.map(|_| ()).ok_or_else(|| ConfigurationError::InvalidArgument {
        argument: "bundle".to_string(),
        message: format!("bundle has no {} link", relation),
    })
}

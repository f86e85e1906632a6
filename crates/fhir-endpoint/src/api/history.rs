//! History facade.
//!
//! Wraps the FHIR [history interaction](https://hl7.org/fhir/http.html#history)
//! at server, type and instance level.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::client::{GenericClient, HistoryScope, RequestBuilder};
use crate::error::EndpointResult;
use crate::extra_parameters::ExtraParameters;
use crate::model::{Bundle, IdType};

/// Reads version history.
#[derive(Clone)]
pub struct FhirHistory {
    client: Arc<dyn GenericClient>,
}

impl FhirHistory {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// `GET [base]/_history`
    pub fn on_server(
        &self,
        count: Option<u32>,
        cutoff: Option<DateTime<Utc>>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        self.history(HistoryScope::Server, count, cutoff, extra_parameters)
    }

    /// `GET [base]/[type]/_history`
    pub fn on_type(
        &self,
        resource_type: &str,
        count: Option<u32>,
        cutoff: Option<DateTime<Utc>>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        self.history(
            HistoryScope::Type(resource_type.to_string()),
            count,
            cutoff,
            extra_parameters,
        )
    }

    /// `GET [base]/[type]/[id]/_history`
    pub fn on_instance(
        &self,
        id: IdType,
        count: Option<u32>,
        cutoff: Option<DateTime<Utc>>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        self.history(HistoryScope::Instance(id), count, cutoff, extra_parameters)
    }

    fn history(
        &self,
        scope: HistoryScope,
        count: Option<u32>,
        cutoff: Option<DateTime<Utc>>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        debug!(scope = ?scope, count = ?count, since = ?cutoff, "Processing history request");

        let mut history = self.client.history(scope);
        if let Some(count) = count {
            history.count(count);
        }
        if let Some(cutoff) = cutoff {
            history.since(cutoff);
        }
        ExtraParameters::process(extra_parameters, RequestBuilder::History(history.as_mut()))?;
        Ok(history.execute()?)
    }
}

//! Transaction facade.
//!
//! Wraps the FHIR [transaction and batch](https://hl7.org/fhir/http.html#transaction)
//! interactions: `POST [base]` with a Bundle.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, RequestBuilder, TransactionRequest, TransactionResponse};
use crate::error::{ClientError, EndpointResult};
use crate::extra_parameters::ExtraParameters;
use crate::model::{Bundle, Resource};

/// Submits transactions and batches.
///
/// The response has the same shape as the request: a bundle for a bundle,
/// text for text, a resource list for a resource list.
#[derive(Clone)]
pub struct FhirTransaction {
    client: Arc<dyn GenericClient>,
}

impl FhirTransaction {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// Submits a prepared transaction bundle.
    pub fn with_bundle(
        &self,
        bundle: Bundle,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Bundle> {
        match self.execute(TransactionRequest::Bundle(bundle), extra_parameters)? {
            TransactionResponse::Bundle(bundle) => Ok(bundle),
            other => Err(unexpected_shape("bundle", &other).into()),
        }
    }

    /// Submits a serialized bundle and returns the serialized response.
    pub fn with_bundle_string(
        &self,
        bundle: String,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<String> {
        match self.execute(TransactionRequest::Raw(bundle), extra_parameters)? {
            TransactionResponse::Raw(text) => Ok(text),
            other => Err(unexpected_shape("text", &other).into()),
        }
    }

    /// Wraps resources into a transaction and returns the resulting resources.
    pub fn with_resources(
        &self,
        resources: Vec<Resource>,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Vec<Resource>> {
        match self.execute(TransactionRequest::Resources(resources), extra_parameters)? {
            TransactionResponse::Resources(resources) => Ok(resources),
            other => Err(unexpected_shape("resource list", &other).into()),
        }
    }

    fn execute(
        &self,
        request: TransactionRequest,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<TransactionResponse> {
        let entries = match &request {
            TransactionRequest::Bundle(bundle) => bundle.entry_resources().len(),
            TransactionRequest::Resources(resources) => resources.len(),
            TransactionRequest::Raw(_) => 0,
        };
        debug!(entries, "Processing transaction request");

        let mut transaction = self.client.transaction(request);
        ExtraParameters::process(
            extra_parameters,
            RequestBuilder::Transaction(transaction.as_mut()),
        )?;
        Ok(transaction.execute()?)
    }
}

fn unexpected_shape(expected: &str, response: &TransactionResponse) -> ClientError {
    let actual = match response {
        TransactionResponse::Bundle(_) => "bundle",
        TransactionResponse::Raw(_) => "text",
        TransactionResponse::Resources(_) => "resource list",
    };
    ClientError::Parse {
        message: format!("expected a {} transaction response, got a {}", expected, actual),
    }
}

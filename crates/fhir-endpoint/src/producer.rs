//! Runs an endpoint method once per exchange.
//!
//! Arguments are taken, in increasing precedence, from the endpoint URI,
//! from `CamelFhir.<argument>` headers and from the body when the endpoint
//! sets `inBody`. The result replaces the body.

use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiOutput, ArgumentBag};
use crate::endpoint::FhirEndpoint;
use crate::error::EndpointResult;
use crate::exchange::Exchange;

/// Invokes an endpoint for each exchange it is given.
#[derive(Debug, Clone)]
pub struct FhirProducer {
    endpoint: Arc<FhirEndpoint>,
}

impl FhirProducer {
    /// Creates a producer for `endpoint`.
    pub fn new(endpoint: Arc<FhirEndpoint>) -> Self {
        Self { endpoint }
    }

    /// The endpoint this producer drives.
    pub fn endpoint(&self) -> &Arc<FhirEndpoint> {
        &self.endpoint
    }

    /// Collects the invocation arguments carried by `exchange`.
    pub fn arguments(&self, exchange: &Exchange) -> ArgumentBag {
        let mut args = exchange.arguments();
        if let (Some(name), Some(body)) = (&self.endpoint.settings().in_body, &exchange.body) {
            args.insert(name.clone(), body.clone());
        }
        args
    }

    /// Invokes the endpoint on the current thread and stores the result as
    /// the body. An empty result clears the body.
    pub fn process_blocking(&self, exchange: &mut Exchange) -> EndpointResult<()> {
        let args = self.arguments(exchange);
        let output = self.endpoint.invoke(&args)?;
        store(exchange, output);
        Ok(())
    }

    /// Invokes the endpoint on the blocking pool and stores the result as the
    /// body.
    pub async fn process(&self, exchange: &mut Exchange) -> EndpointResult<()> {
        let args = self.arguments(exchange);
        let endpoint = Arc::clone(&self.endpoint);
        let output = tokio::task::spawn_blocking(move || endpoint.invoke(&args)).await??;
        store(exchange, output);
        Ok(())
    }
}

fn store(exchange: &mut Exchange, output: ApiOutput) {
    debug!(empty = matches!(output, ApiOutput::Empty), "Storing FHIR result");
    exchange.body = match output {
        ApiOutput::Empty => None,
        other => Some(other.into_value()),
    };
}

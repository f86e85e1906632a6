//! Polls an endpoint method on a fixed schedule.
//!
//! Each poll invokes the method with the endpoint's URI arguments on the
//! blocking pool and hands the result to a [`Processor`]. With
//! `splitResult`, bundles and resource lists are emitted one resource per
//! exchange. Polling stops when the shutdown signal turns `true` or its
//! sender is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::api::{ApiOutput, ArgumentBag};
use crate::endpoint::FhirEndpoint;
use crate::error::{ConfigurationError, EndpointResult};
use crate::exchange::{Exchange, Processor};

/// A scheduled poller for one endpoint.
pub struct FhirConsumer {
    endpoint: Arc<FhirEndpoint>,
    processor: Arc<dyn Processor>,
}

impl FhirConsumer {
    /// Creates a consumer.
    ///
    /// Fails if the endpoint sets `inBody`, which only producers can honor.
    pub fn new(
        endpoint: Arc<FhirEndpoint>,
        processor: Arc<dyn Processor>,
    ) -> Result<Self, ConfigurationError> {
        if endpoint.settings().in_body.is_some() {
            return Err(ConfigurationError::InBodyNotSupported);
        }
        Ok(Self {
            endpoint,
            processor,
        })
    }

    /// The endpoint being polled.
    pub fn endpoint(&self) -> &Arc<FhirEndpoint> {
        &self.endpoint
    }

    /// Runs one poll and returns the number of exchanges emitted.
    ///
    /// An empty result emits nothing. Processor failures are logged and do
    /// not stop the remaining exchanges.
    pub async fn poll(&self) -> EndpointResult<usize> {
        let endpoint = Arc::clone(&self.endpoint);
        let output =
            tokio::task::spawn_blocking(move || endpoint.invoke(&ArgumentBag::new())).await??;

        let bodies = match output {
            ApiOutput::Empty => Vec::new(),
            output if self.endpoint.settings().split_result => output.split(),
            output => vec![output.into_value()],
        };

        let mut emitted = 0;
        for body in bodies {
            match self.processor.process(Exchange::with_body(body)).await {
                Ok(()) => emitted += 1,
                Err(e) => warn!(error = %e, "Processor rejected FHIR exchange"),
            }
        }
        debug!(emitted, "FHIR poll complete");
        Ok(emitted)
    }

    /// Polls until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let settings = self.endpoint.settings();
        info!(
            uri = %self.endpoint.uri(),
            delay_ms = settings.delay,
            initial_delay_ms = settings.initial_delay,
            "Starting FHIR consumer"
        );

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(settings.initial_delay)) => {}
            _ = wait_for_shutdown(&mut shutdown) => {
                info!("FHIR consumer stopped");
                return;
            }
        }

        let mut interval = tokio::time::interval(Duration::from_millis(settings.delay.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.poll().await {
                        error!(error = %e, "FHIR poll failed");
                    }
                }
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }
        info!("FHIR consumer stopped");
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a shutdown request.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

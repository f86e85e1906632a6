//! Messages passed between endpoints and the surrounding pipeline.

use std::collections::BTreeMap;
use std::error::Error;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::api::ArgumentBag;

/// Prefix of headers that carry method arguments (`CamelFhir.id`).
pub const HEADER_PREFIX: &str = "CamelFhir.";

/// A pipeline message: named headers and an optional body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exchange {
    /// Message headers.
    pub headers: BTreeMap<String, Value>,
    /// Message body.
    pub body: Option<Value>,
}

impl Exchange {
    /// Creates an empty exchange.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an exchange carrying `body`.
    pub fn with_body(body: impl Into<Value>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: Some(body.into()),
        }
    }

    /// Sets a header, returning the exchange.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the header for method argument `argument`.
    pub fn with_argument(self, argument: &str, value: impl Into<Value>) -> Self {
        self.with_header(format!("{}{}", HEADER_PREFIX, argument), value)
    }

    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    /// Collects the method arguments carried in prefixed headers.
    pub fn arguments(&self) -> ArgumentBag {
        self.headers
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(HEADER_PREFIX)
                    .filter(|argument| !argument.is_empty())
                    .map(|argument| (argument.to_string(), value.clone()))
            })
            .collect()
    }
}

/// Error returned by a downstream [`Processor`].
pub type ProcessorError = Box<dyn Error + Send + Sync>;

/// Receives the exchanges a consumer emits.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Handles one exchange.
    async fn process(&self, exchange: Exchange) -> Result<(), ProcessorError>;
}

#[async_trait]
impl Processor for mpsc::Sender<Exchange> {
    async fn process(&self, exchange: Exchange) -> Result<(), ProcessorError> {
        self.send(exchange).await.map_err(Into::into)
    }
}

#[async_trait]
impl Processor for mpsc::UnboundedSender<Exchange> {
    async fn process(&self, exchange: Exchange) -> Result<(), ProcessorError> {
        self.send(exchange).map_err(Into::into)
    }
}

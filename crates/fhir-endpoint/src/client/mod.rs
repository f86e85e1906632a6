//! Ports onto the remote FHIR REST client.
//!
//! The adapter never speaks HTTP itself. It drives a [`GenericClient`] that
//! hands out one builder per request; every builder accepts the common
//! request options of [`ClientExecutable`] and adds its own operation-specific
//! setters. A builder is consumed by `execute`.
//!
//! Builders are addressed through [`RequestBuilder`], a tagged handle that
//! lets extra parameters inspect the builder kind before mutating it.
//!
//! ```text
//! GenericClient::create(payload) ──► Box<dyn CreateTyped>
//!        │                               │ conditional_by_url / prefer
//!        │                               │ ExtraParameters::process(RequestBuilder::Create(..))
//!        ▼                               ▼
//!   shared connection               execute() ──► MethodOutcome
//! ```

mod options;
mod targets;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

pub use options::{CacheControlDirective, EncodingEnum, PreferReturn, SummaryMode, VersionMatch};
pub use targets::{
    DeleteTarget, HistoryScope, MetaRequest, OperationScope, PageTarget, PatchTarget, ReadTarget,
    TransactionRequest, TransactionResponse,
};

use crate::config::{ClientSettings, FhirContext};
use crate::error::{ClientError, ClientResult};
use crate::model::{Bundle, IdType, MethodOutcome, Resource, ResourcePayload};

/// The kind of a request builder.
///
/// Extra parameters declare support per kind, so adding a builder kind means
/// deciding support for it in every parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKind {
    /// Capability statement fetch.
    Capabilities,
    /// Create interaction.
    Create,
    /// Delete interaction.
    Delete,
    /// History interaction.
    History,
    /// Paging through a bundle.
    LoadPage,
    /// `$meta` family.
    Meta,
    /// Extended operation.
    Operation,
    /// `$process-message`.
    ProcessMessage,
    /// Patch interaction.
    Patch,
    /// Read and vread.
    Read,
    /// Search by URL.
    Search,
    /// Transaction or batch.
    Transaction,
    /// Update interaction.
    Update,
    /// `$validate`.
    Validate,
}

impl RequestKind {
    /// Every builder kind.
    pub const ALL: [RequestKind; 14] = [
        RequestKind::Capabilities,
        RequestKind::Create,
        RequestKind::Delete,
        RequestKind::History,
        RequestKind::LoadPage,
        RequestKind::Meta,
        RequestKind::Operation,
        RequestKind::ProcessMessage,
        RequestKind::Patch,
        RequestKind::Read,
        RequestKind::Search,
        RequestKind::Transaction,
        RequestKind::Update,
        RequestKind::Validate,
    ];

    /// Returns the kind name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Capabilities => "capabilities",
            RequestKind::Create => "create",
            RequestKind::Delete => "delete",
            RequestKind::History => "history",
            RequestKind::LoadPage => "load-page",
            RequestKind::Meta => "meta",
            RequestKind::Operation => "operation",
            RequestKind::ProcessMessage => "process-message",
            RequestKind::Patch => "patch",
            RequestKind::Read => "read",
            RequestKind::Search => "search",
            RequestKind::Transaction => "transaction",
            RequestKind::Update => "update",
            RequestKind::Validate => "validate",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options every request builder accepts.
pub trait ClientExecutable: Send {
    /// Requests a specific wire encoding.
    fn encoded(&mut self, encoding: EncodingEnum);

    /// Asks the server to pretty-print its response.
    fn pretty_print(&mut self);

    /// Requests a `_summary` mode.
    fn summary_mode(&mut self, mode: SummaryMode);

    /// Restricts the response to the given elements (`_elements`).
    fn elements_subset(&mut self, elements: &[String]);

    /// Sets `Cache-Control` request directives.
    fn cache_control(&mut self, directive: CacheControlDirective);

    /// Adds an HTTP header to this request only.
    fn with_additional_header(&mut self, name: &str, value: &str);
}

/// Builder for fetching the server's CapabilityStatement.
pub trait CapabilitiesTyped: ClientExecutable {
    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<Resource>;
}

/// Builder for a create interaction.
pub trait CreateTyped: ClientExecutable {
    /// Turns the create into a conditional create (`If-None-Exist`).
    fn conditional_by_url(&mut self, search_url: &str);

    /// Sets the `Prefer: return=` preference.
    fn prefer(&mut self, prefer: PreferReturn);

    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<MethodOutcome>;
}

/// Builder for a delete interaction.
pub trait DeleteTyped: ClientExecutable {
    /// Executes the request, returning the server's OperationOutcome if any.
    fn execute(self: Box<Self>) -> ClientResult<Option<Resource>>;
}

/// Builder for a history interaction.
pub trait HistoryTyped: ClientExecutable {
    /// Limits the page size (`_count`).
    fn count(&mut self, count: u32);

    /// Only include versions created at or after this instant (`_since`).
    fn since(&mut self, cutoff: DateTime<Utc>);

    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<Bundle>;
}

/// Builder for loading a page of a bundle.
pub trait LoadPageTyped: ClientExecutable {
    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<Bundle>;
}

/// Builder for the `$meta` family.
pub trait MetaTyped: ClientExecutable {
    /// Executes the request, returning the resulting `Meta` element.
    fn execute(self: Box<Self>) -> ClientResult<Value>;
}

/// Builder for an extended operation.
pub trait OperationTyped: ClientExecutable {
    /// Sends the operation as an HTTP GET with parameters in the query string.
    fn use_http_get(&mut self);

    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<Resource>;
}

/// Builder for `$process-message`.
pub trait ProcessMessageTyped: ClientExecutable {
    /// Asks the receiver to reply to this URI instead of synchronously.
    fn respond_to_uri(&mut self, uri: &str);

    /// Requests asynchronous processing.
    fn asynchronous(&mut self, asynchronous: bool);

    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<Resource>;
}

/// Builder for a patch interaction.
pub trait PatchTyped: ClientExecutable {
    /// Sets the `Prefer: return=` preference.
    fn prefer(&mut self, prefer: PreferReturn);

    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<MethodOutcome>;
}

/// Builder for a read or vread interaction.
pub trait ReadTyped: ClientExecutable {
    /// Makes the read conditional on the server holding a different version.
    fn if_version_matches(&mut self, version: &str, on_match: VersionMatch);

    /// Executes the request. Yields `None` when a version match asked for nothing.
    fn execute(self: Box<Self>) -> ClientResult<Option<Resource>>;
}

/// Builder for a search by URL.
pub trait SearchTyped: ClientExecutable {
    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<Bundle>;
}

/// Builder for a transaction or batch.
pub trait TransactionTyped: ClientExecutable {
    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<TransactionResponse>;
}

/// Builder for an update interaction.
pub trait UpdateTyped: ClientExecutable {
    /// Targets an explicit id instead of the one carried by the resource.
    fn with_id(&mut self, id: &IdType);

    /// Turns the update into a conditional update.
    fn conditional_by_url(&mut self, search_url: &str);

    /// Sets the `Prefer: return=` preference.
    fn prefer(&mut self, prefer: PreferReturn);

    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<MethodOutcome>;
}

/// Builder for `$validate`.
pub trait ValidateTyped: ClientExecutable {
    /// Executes the request.
    fn execute(self: Box<Self>) -> ClientResult<MethodOutcome>;
}

/// A borrowed request builder tagged with its kind.
pub enum RequestBuilder<'a> {
    /// A capabilities builder.
    Capabilities(&'a mut dyn CapabilitiesTyped),
    /// A create builder.
    Create(&'a mut dyn CreateTyped),
    /// A delete builder.
    Delete(&'a mut dyn DeleteTyped),
    /// A history builder.
    History(&'a mut dyn HistoryTyped),
    /// A paging builder.
    LoadPage(&'a mut dyn LoadPageTyped),
    /// A meta builder.
    Meta(&'a mut dyn MetaTyped),
    /// An extended operation builder.
    Operation(&'a mut dyn OperationTyped),
    /// A `$process-message` builder.
    ProcessMessage(&'a mut dyn ProcessMessageTyped),
    /// A patch builder.
    Patch(&'a mut dyn PatchTyped),
    /// A read builder.
    Read(&'a mut dyn ReadTyped),
    /// A search builder.
    Search(&'a mut dyn SearchTyped),
    /// A transaction builder.
    Transaction(&'a mut dyn TransactionTyped),
    /// An update builder.
    Update(&'a mut dyn UpdateTyped),
    /// A validate builder.
    Validate(&'a mut dyn ValidateTyped),
}

impl RequestBuilder<'_> {
    /// Returns the kind of the wrapped builder.
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestBuilder::Capabilities(_) => RequestKind::Capabilities,
            RequestBuilder::Create(_) => RequestKind::Create,
            RequestBuilder::Delete(_) => RequestKind::Delete,
            RequestBuilder::History(_) => RequestKind::History,
            RequestBuilder::LoadPage(_) => RequestKind::LoadPage,
            RequestBuilder::Meta(_) => RequestKind::Meta,
            RequestBuilder::Operation(_) => RequestKind::Operation,
            RequestBuilder::ProcessMessage(_) => RequestKind::ProcessMessage,
            RequestBuilder::Patch(_) => RequestKind::Patch,
            RequestBuilder::Read(_) => RequestKind::Read,
            RequestBuilder::Search(_) => RequestKind::Search,
            RequestBuilder::Transaction(_) => RequestKind::Transaction,
            RequestBuilder::Update(_) => RequestKind::Update,
            RequestBuilder::Validate(_) => RequestKind::Validate,
        }
    }

    /// Returns the common option surface of the wrapped builder.
    pub fn executable(&mut self) -> &mut dyn ClientExecutable {
        match self {
            RequestBuilder::Capabilities(b) => &mut **b,
            RequestBuilder::Create(b) => &mut **b,
            RequestBuilder::Delete(b) => &mut **b,
            RequestBuilder::History(b) => &mut **b,
            RequestBuilder::LoadPage(b) => &mut **b,
            RequestBuilder::Meta(b) => &mut **b,
            RequestBuilder::Operation(b) => &mut **b,
            RequestBuilder::ProcessMessage(b) => &mut **b,
            RequestBuilder::Patch(b) => &mut **b,
            RequestBuilder::Read(b) => &mut **b,
            RequestBuilder::Search(b) => &mut **b,
            RequestBuilder::Transaction(b) => &mut **b,
            RequestBuilder::Update(b) => &mut **b,
            RequestBuilder::Validate(b) => &mut **b,
        }
    }
}

impl fmt::Debug for RequestBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestBuilder").field(&self.kind()).finish()
    }
}

/// A connection to one FHIR server.
///
/// Implementations are shared by every facade of an endpoint and must be
/// safe to use from several threads.
pub trait GenericClient: Send + Sync {
    /// Starts a capabilities request, optionally scoped to a resource type.
    fn capabilities(&self, resource_type: Option<&str>) -> Box<dyn CapabilitiesTyped>;

    /// Starts a create request.
    fn create(&self, payload: ResourcePayload) -> Box<dyn CreateTyped>;

    /// Starts a delete request.
    fn delete(&self, target: DeleteTarget) -> Box<dyn DeleteTyped>;

    /// Starts a history request.
    fn history(&self, scope: HistoryScope) -> Box<dyn HistoryTyped>;

    /// Starts a paging request.
    fn load_page(&self, target: PageTarget) -> Box<dyn LoadPageTyped>;

    /// Starts a meta request.
    fn meta(&self, request: MetaRequest) -> Box<dyn MetaTyped>;

    /// Starts an extended operation.
    fn operation(
        &self,
        scope: OperationScope,
        name: &str,
        parameters: Option<Resource>,
    ) -> Box<dyn OperationTyped>;

    /// Starts a `$process-message` request.
    fn process_message(&self, message: Bundle) -> Box<dyn ProcessMessageTyped>;

    /// Starts a patch request. The body is a JSON Patch document.
    fn patch(&self, body: String, target: PatchTarget) -> Box<dyn PatchTyped>;

    /// Starts a read request.
    fn read(&self, target: ReadTarget) -> Box<dyn ReadTyped>;

    /// Starts a search against a complete search URL.
    fn search(&self, url: &str) -> Box<dyn SearchTyped>;

    /// Starts a transaction request.
    fn transaction(&self, request: TransactionRequest) -> Box<dyn TransactionTyped>;

    /// Starts an update request.
    fn update(&self, payload: ResourcePayload) -> Box<dyn UpdateTyped>;

    /// Starts a validate request.
    fn validate(&self, payload: ResourcePayload) -> Box<dyn ValidateTyped>;
}

/// Builds clients for a server URL.
///
/// Configurations without a pre-built client use their factory exactly once,
/// the first time a facade needs the connection.
pub trait ClientFactory: Send + Sync {
    /// Creates a client for `server_url`.
    fn new_generic_client(
        &self,
        context: &FhirContext,
        server_url: &str,
        settings: &ClientSettings,
    ) -> Result<Arc<dyn GenericClient>, ClientError>;
}

impl<F> ClientFactory for F
where
    F: Fn(&FhirContext, &str, &ClientSettings) -> Result<Arc<dyn GenericClient>, ClientError>
        + Send
        + Sync,
{
    fn new_generic_client(
        &self,
        context: &FhirContext,
        server_url: &str,
        settings: &ClientSettings,
    ) -> Result<Arc<dyn GenericClient>, ClientError> {
        self(context, server_url, settings)
    }
}

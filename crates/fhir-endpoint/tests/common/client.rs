//! A recording FHIR client.
//!
//! [`RecordingClient`] answers every request with a canned response and
//! records what the facade asked for. A request is only recorded when it is
//! executed, so a request rejected before execution leaves no trace.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use helios_fhir_endpoint::client::{
    CacheControlDirective, CapabilitiesTyped, ClientExecutable, CreateTyped, DeleteTarget,
    DeleteTyped, EncodingEnum, HistoryScope, HistoryTyped, LoadPageTyped, MetaRequest, MetaTyped,
    OperationScope, OperationTyped, PageTarget, PatchTarget, PatchTyped, PreferReturn,
    ProcessMessageTyped, ReadTarget, ReadTyped, SearchTyped, SummaryMode, TransactionRequest,
    TransactionResponse, TransactionTyped, UpdateTyped, ValidateTyped, VersionMatch,
};
use helios_fhir_endpoint::config::ClientSettings;
use helios_fhir_endpoint::error::ClientResult;
use helios_fhir_endpoint::{
    Bundle, ClientError, ClientFactory, FhirContext, GenericClient, IdType, MethodOutcome,
    RequestKind, Resource, ResourcePayload,
};
use serde_json::{Value, json};

/// What a request was created for.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Capabilities(Option<String>),
    Create(ResourcePayload),
    Delete(DeleteTarget),
    History(HistoryScope),
    LoadPage(PageTarget),
    Meta(MetaRequest),
    Operation {
        scope: OperationScope,
        name: String,
        parameters: Option<Resource>,
    },
    ProcessMessage(Bundle),
    Patch {
        body: String,
        target: PatchTarget,
    },
    Read(ReadTarget),
    Search(String),
    Transaction(TransactionRequest),
    Update(ResourcePayload),
    Validate(ResourcePayload),
}

impl Target {
    fn kind(&self) -> RequestKind {
        match self {
            Target::Capabilities(_) => RequestKind::Capabilities,
            Target::Create(_) => RequestKind::Create,
            Target::Delete(_) => RequestKind::Delete,
            Target::History(_) => RequestKind::History,
            Target::LoadPage(_) => RequestKind::LoadPage,
            Target::Meta(_) => RequestKind::Meta,
            Target::Operation { .. } => RequestKind::Operation,
            Target::ProcessMessage(_) => RequestKind::ProcessMessage,
            Target::Patch { .. } => RequestKind::Patch,
            Target::Read(_) => RequestKind::Read,
            Target::Search(_) => RequestKind::Search,
            Target::Transaction(_) => RequestKind::Transaction,
            Target::Update(_) => RequestKind::Update,
            Target::Validate(_) => RequestKind::Validate,
        }
    }
}

/// One executed request and every option set on its builder.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub kind: RequestKind,
    pub target: Target,
    pub encoding: Option<EncodingEnum>,
    pub pretty_print: bool,
    pub summary: Option<SummaryMode>,
    pub elements: Vec<String>,
    pub cache_control: Option<CacheControlDirective>,
    pub headers: Vec<(String, String)>,
    pub conditional_url: Option<String>,
    pub prefer: Option<PreferReturn>,
    pub update_id: Option<IdType>,
    pub count: Option<u32>,
    pub since: Option<DateTime<Utc>>,
    pub use_http_get: bool,
    pub respond_to_uri: Option<String>,
    pub asynchronous: bool,
    pub version_match: Option<(String, VersionMatch)>,
}

impl RecordedRequest {
    fn new(target: Target) -> Self {
        Self {
            kind: target.kind(),
            target,
            encoding: None,
            pretty_print: false,
            summary: None,
            elements: Vec::new(),
            cache_control: None,
            headers: Vec::new(),
            conditional_url: None,
            prefer: None,
            update_id: None,
            count: None,
            since: None,
            use_http_get: false,
            respond_to_uri: None,
            asynchronous: false,
            version_match: None,
        }
    }
}

#[derive(Default)]
struct Shared {
    requests: Mutex<Vec<RecordedRequest>>,
    failure: Mutex<Option<ClientError>>,
    bundle: Mutex<Option<Bundle>>,
    delete_outcome: Mutex<Option<Resource>>,
}

/// A [`GenericClient`] that records executed requests.
#[derive(Default)]
pub struct RecordingClient {
    shared: Arc<Shared>,
}

impl RecordingClient {
    /// Creates a client.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns every executed request, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.lock().unwrap().clone()
    }

    /// Returns the most recent executed request.
    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request was executed")
    }

    /// Makes the next executed request fail with `error`.
    pub fn fail_next(&self, error: ClientError) {
        *self.shared.failure.lock().unwrap() = Some(error);
    }

    /// Answers search, history and paging requests with `bundle`.
    pub fn respond_with_bundle(&self, bundle: Bundle) {
        *self.shared.bundle.lock().unwrap() = Some(bundle);
    }

    /// Answers delete requests with `outcome`.
    pub fn respond_to_delete_with(&self, outcome: Resource) {
        *self.shared.delete_outcome.lock().unwrap() = Some(outcome);
    }

    fn builder(&self, target: Target) -> Box<RecordingBuilder> {
        Box::new(RecordingBuilder {
            shared: Arc::clone(&self.shared),
            request: RecordedRequest::new(target),
        })
    }
}

impl GenericClient for RecordingClient {
    fn capabilities(&self, resource_type: Option<&str>) -> Box<dyn CapabilitiesTyped> {
        self.builder(Target::Capabilities(resource_type.map(str::to_string)))
    }

    fn create(&self, payload: ResourcePayload) -> Box<dyn CreateTyped> {
        self.builder(Target::Create(payload))
    }

    fn delete(&self, target: DeleteTarget) -> Box<dyn DeleteTyped> {
        self.builder(Target::Delete(target))
    }

    fn history(&self, scope: HistoryScope) -> Box<dyn HistoryTyped> {
        self.builder(Target::History(scope))
    }

    fn load_page(&self, target: PageTarget) -> Box<dyn LoadPageTyped> {
        self.builder(Target::LoadPage(target))
    }

    fn meta(&self, request: MetaRequest) -> Box<dyn MetaTyped> {
        self.builder(Target::Meta(request))
    }

    fn operation(
        &self,
        scope: OperationScope,
        name: &str,
        parameters: Option<Resource>,
    ) -> Box<dyn OperationTyped> {
        self.builder(Target::Operation {
            scope,
            name: name.to_string(),
            parameters,
        })
    }

    fn process_message(&self, message: Bundle) -> Box<dyn ProcessMessageTyped> {
        self.builder(Target::ProcessMessage(message))
    }

    fn patch(&self, body: String, target: PatchTarget) -> Box<dyn PatchTyped> {
        self.builder(Target::Patch { body, target })
    }

    fn read(&self, target: ReadTarget) -> Box<dyn ReadTyped> {
        self.builder(Target::Read(target))
    }

    fn search(&self, url: &str) -> Box<dyn SearchTyped> {
        self.builder(Target::Search(url.to_string()))
    }

    fn transaction(&self, request: TransactionRequest) -> Box<dyn TransactionTyped> {
        self.builder(Target::Transaction(request))
    }

    fn update(&self, payload: ResourcePayload) -> Box<dyn UpdateTyped> {
        self.builder(Target::Update(payload))
    }

    fn validate(&self, payload: ResourcePayload) -> Box<dyn ValidateTyped> {
        self.builder(Target::Validate(payload))
    }
}

/// The builder behind every request kind.
pub struct RecordingBuilder {
    shared: Arc<Shared>,
    request: RecordedRequest,
}

impl RecordingBuilder {
    /// Records the request and returns the queued failure, if any.
    fn record(&self) -> ClientResult<()> {
        self.shared
            .requests
            .lock()
            .unwrap()
            .push(self.request.clone());
        match self.shared.failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn bundle(&self) -> Bundle {
        self.shared
            .bundle
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| {
                resource_bundle(json!({"resourceType": "Bundle", "type": "searchset"}))
            })
    }

    fn write_outcome(&self, payload: &ResourcePayload, created: bool) -> MethodOutcome {
        let resource = match payload {
            ResourcePayload::Structured(resource) => Some(resource.clone()),
            ResourcePayload::Raw(text) => Resource::from_json_str(text),
        };
        let id = self
            .request
            .update_id
            .clone()
            .or_else(|| resource.as_ref().and_then(Resource::id_type))
            .unwrap_or_else(|| {
                let resource_type = resource
                    .as_ref()
                    .map(|r| r.resource_type().to_string())
                    .unwrap_or_else(|| "Resource".to_string());
                IdType::new(resource_type, "generated-1")
            })
            .with_version("1");

        MethodOutcome {
            id: Some(id),
            created: Some(created),
            resource: match self.request.prefer {
                Some(PreferReturn::Representation) => resource,
                _ => None,
            },
            operation_outcome: None,
        }
    }
}

fn resource_bundle(value: Value) -> Bundle {
    Bundle::from_value(value).expect("canned bundle")
}

fn resource(value: Value) -> Resource {
    Resource::from_value(value).expect("canned resource")
}

impl ClientExecutable for RecordingBuilder {
    fn encoded(&mut self, encoding: EncodingEnum) {
        self.request.encoding = Some(encoding);
    }

    fn pretty_print(&mut self) {
        self.request.pretty_print = true;
    }

    fn summary_mode(&mut self, mode: SummaryMode) {
        self.request.summary = Some(mode);
    }

    fn elements_subset(&mut self, elements: &[String]) {
        self.request.elements = elements.to_vec();
    }

    fn cache_control(&mut self, directive: CacheControlDirective) {
        self.request.cache_control = Some(directive);
    }

    fn with_additional_header(&mut self, name: &str, value: &str) {
        self.request
            .headers
            .push((name.to_string(), value.to_string()));
    }
}

impl CapabilitiesTyped for RecordingBuilder {
    fn execute(self: Box<Self>) -> ClientResult<Resource> {
        self.record()?;
        Ok(resource(json!({
            "resourceType": "CapabilityStatement",
            "status": "active",
            "fhirVersion": "4.0.1"
        })))
    }
}

impl CreateTyped for RecordingBuilder {
    fn conditional_by_url(&mut self, search_url: &str) {
        self.request.conditional_url = Some(search_url.to_string());
    }

    fn prefer(&mut self, prefer: PreferReturn) {
        self.request.prefer = Some(prefer);
    }

    fn execute(self: Box<Self>) -> ClientResult<MethodOutcome> {
        self.record()?;
        match &self.request.target {
            Target::Create(payload) => Ok(self.write_outcome(payload, true)),
            other => panic!("create builder for {:?}", other),
        }
    }
}

impl DeleteTyped for RecordingBuilder {
    fn execute(self: Box<Self>) -> ClientResult<Option<Resource>> {
        self.record()?;
        Ok(self.shared.delete_outcome.lock().unwrap().clone())
    }
}

impl HistoryTyped for RecordingBuilder {
    fn count(&mut self, count: u32) {
        self.request.count = Some(count);
    }

    fn since(&mut self, cutoff: DateTime<Utc>) {
        self.request.since = Some(cutoff);
    }

    fn execute(self: Box<Self>) -> ClientResult<Bundle> {
        self.record()?;
        Ok(self.bundle())
    }
}

impl LoadPageTyped for RecordingBuilder {
    fn execute(self: Box<Self>) -> ClientResult<Bundle> {
        self.record()?;
        Ok(self.bundle())
    }
}

impl MetaTyped for RecordingBuilder {
    fn execute(self: Box<Self>) -> ClientResult<Value> {
        self.record()?;
        Ok(match &self.request.target {
            Target::Meta(MetaRequest::Add { meta, .. }) => meta.clone(),
            _ => json!({"tag": [{"system": "http://example.org/tags", "code": "test"}]}),
        })
    }
}

impl OperationTyped for RecordingBuilder {
    fn use_http_get(&mut self) {
        self.request.use_http_get = true;
    }

    fn execute(self: Box<Self>) -> ClientResult<Resource> {
        self.record()?;
        Ok(resource(json!({"resourceType": "Parameters"})))
    }
}

impl ProcessMessageTyped for RecordingBuilder {
    fn respond_to_uri(&mut self, uri: &str) {
        self.request.respond_to_uri = Some(uri.to_string());
    }

    fn asynchronous(&mut self, asynchronous: bool) {
        self.request.asynchronous = asynchronous;
    }

    fn execute(self: Box<Self>) -> ClientResult<Resource> {
        self.record()?;
        Ok(resource(json!({"resourceType": "Bundle", "type": "message"})))
    }
}

impl PatchTyped for RecordingBuilder {
    fn prefer(&mut self, prefer: PreferReturn) {
        self.request.prefer = Some(prefer);
    }

    fn execute(self: Box<Self>) -> ClientResult<MethodOutcome> {
        self.record()?;
        Ok(match &self.request.target {
            Target::Patch {
                target: PatchTarget::Id(id),
                ..
            } => MethodOutcome::with_id(id.clone()),
            _ => MethodOutcome::default(),
        })
    }
}

impl ReadTyped for RecordingBuilder {
    fn if_version_matches(&mut self, version: &str, on_match: VersionMatch) {
        self.request.version_match = Some((version.to_string(), on_match));
    }

    /// Behaves as if the server always holds the version asked about.
    fn execute(self: Box<Self>) -> ClientResult<Option<Resource>> {
        self.record()?;
        if let Some((_, on_match)) = &self.request.version_match {
            return match on_match {
                VersionMatch::ReturnNull => Ok(None),
                VersionMatch::ReturnResource(resource) => Ok(Some(resource.clone())),
                VersionMatch::ThrowError => Err(ClientError::Server {
                    status: 304,
                    message: "Not Modified".to_string(),
                    operation_outcome: None,
                }),
            };
        }
        Ok(Some(match &self.request.target {
            Target::Read(ReadTarget::Id { resource_type, id }) => resource(json!({
                "resourceType": resource_type,
                "id": id.id_part()
            })),
            Target::Read(ReadTarget::Url { resource_type, .. }) => resource(json!({
                "resourceType": resource_type,
                "id": "from-url"
            })),
            other => panic!("read builder for {:?}", other),
        }))
    }
}

impl SearchTyped for RecordingBuilder {
    fn execute(self: Box<Self>) -> ClientResult<Bundle> {
        self.record()?;
        Ok(self.bundle())
    }
}

impl TransactionTyped for RecordingBuilder {
    fn execute(self: Box<Self>) -> ClientResult<TransactionResponse> {
        self.record()?;
        Ok(match &self.request.target {
            Target::Transaction(TransactionRequest::Bundle(_)) => {
                TransactionResponse::Bundle(resource_bundle(json!({
                    "resourceType": "Bundle",
                    "type": "transaction-response"
                })))
            }
            Target::Transaction(TransactionRequest::Raw(_)) => TransactionResponse::Raw(
                r#"{"resourceType":"Bundle","type":"transaction-response"}"#.to_string(),
            ),
            Target::Transaction(TransactionRequest::Resources(resources)) => {
                TransactionResponse::Resources(resources.clone())
            }
            other => panic!("transaction builder for {:?}", other),
        })
    }
}

impl UpdateTyped for RecordingBuilder {
    fn with_id(&mut self, id: &IdType) {
        self.request.update_id = Some(id.clone());
    }

    fn conditional_by_url(&mut self, search_url: &str) {
        self.request.conditional_url = Some(search_url.to_string());
    }

    fn prefer(&mut self, prefer: PreferReturn) {
        self.request.prefer = Some(prefer);
    }

    fn execute(self: Box<Self>) -> ClientResult<MethodOutcome> {
        self.record()?;
        match &self.request.target {
            Target::Update(payload) => Ok(self.write_outcome(payload, false)),
            other => panic!("update builder for {:?}", other),
        }
    }
}

impl ValidateTyped for RecordingBuilder {
    fn execute(self: Box<Self>) -> ClientResult<MethodOutcome> {
        self.record()?;
        Ok(MethodOutcome {
            operation_outcome: Some(resource(json!({
                "resourceType": "OperationOutcome",
                "issue": [{"severity": "information", "code": "informational"}]
            }))),
            ..Default::default()
        })
    }
}

/// A [`ClientFactory`] that hands out one client and counts calls.
pub struct CountingFactory {
    client: Arc<RecordingClient>,
    calls: AtomicUsize,
    server_urls: Mutex<Vec<String>>,
    settings: Mutex<Option<ClientSettings>>,
}

impl CountingFactory {
    /// Creates a factory returning `client`.
    pub fn new(client: Arc<RecordingClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            calls: AtomicUsize::new(0),
            server_urls: Mutex::new(Vec::new()),
            settings: Mutex::new(None),
        })
    }

    /// Number of clients created.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Server URLs clients were created for.
    pub fn server_urls(&self) -> Vec<String> {
        self.server_urls.lock().unwrap().clone()
    }

    /// Settings of the most recent client.
    pub fn last_settings(&self) -> Option<ClientSettings> {
        self.settings.lock().unwrap().clone()
    }
}

impl ClientFactory for CountingFactory {
    fn new_generic_client(
        &self,
        _context: &FhirContext,
        server_url: &str,
        settings: &ClientSettings,
    ) -> Result<Arc<dyn GenericClient>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.server_urls.lock().unwrap().push(server_url.to_string());
        *self.settings.lock().unwrap() = Some(settings.clone());
        Ok(self.client.clone())
    }
}

//! Operation facades and the API selector.
//!
//! Each FHIR API (create, read, search, ...) has one facade type holding the
//! shared client. An endpoint names its API by token; [`ApiProxy::new`]
//! builds the matching facade.
//!
//! | Token | Facade |
//! |-------|--------|
//! | `capabilities` | [`FhirCapabilities`] |
//! | `create` | [`FhirCreate`] |
//! | `delete` | [`FhirDelete`] |
//! | `history` | [`FhirHistory`] |
//! | `load-page` | [`FhirLoadPage`] |
//! | `meta` | [`FhirMeta`] |
//! | `operation` | [`FhirOperation`] |
//! | `patch` | [`FhirPatch`] |
//! | `read` | [`FhirRead`] |
//! | `search` | [`FhirSearch`] |
//! | `transaction` | [`FhirTransaction`] |
//! | `update` | [`FhirUpdate`] |
//! | `validate` | [`FhirValidate`] |

pub(crate) mod arguments;
mod capabilities;
mod create;
mod delete;
mod history;
mod load_page;
mod meta;
mod methods;
mod operation;
mod patch;
mod read;
mod search;
mod transaction;
mod update;
mod validate;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

pub use arguments::ArgumentBag;
pub use capabilities::FhirCapabilities;
pub use create::FhirCreate;
pub use delete::FhirDelete;
pub use history::FhirHistory;
pub use load_page::FhirLoadPage;
pub use meta::FhirMeta;
pub use methods::{ApiMethod, ArgumentKind, ArgumentSpec};
pub use operation::FhirOperation;
pub use patch::FhirPatch;
pub use read::FhirRead;
pub use search::FhirSearch;
pub use transaction::FhirTransaction;
pub use update::FhirUpdate;
pub use validate::FhirValidate;

use crate::client::GenericClient;
use crate::error::ConfigurationError;
use crate::model::{Bundle, MethodOutcome, Resource};

/// The closed set of FHIR APIs an endpoint can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiName {
    /// `capabilities`
    Capabilities,
    /// `create`
    Create,
    /// `delete`
    Delete,
    /// `history`
    History,
    /// `load-page`
    LoadPage,
    /// `meta`
    Meta,
    /// `operation`
    Operation,
    /// `patch`
    Patch,
    /// `read`
    Read,
    /// `search`
    Search,
    /// `transaction`
    Transaction,
    /// `update`
    Update,
    /// `validate`
    Validate,
}

impl ApiName {
    /// Every API.
    pub const ALL: [ApiName; 13] = [
        ApiName::Capabilities,
        ApiName::Create,
        ApiName::Delete,
        ApiName::History,
        ApiName::LoadPage,
        ApiName::Meta,
        ApiName::Operation,
        ApiName::Patch,
        ApiName::Read,
        ApiName::Search,
        ApiName::Transaction,
        ApiName::Update,
        ApiName::Validate,
    ];

    /// Returns the token used in endpoint URIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiName::Capabilities => "capabilities",
            ApiName::Create => "create",
            ApiName::Delete => "delete",
            ApiName::History => "history",
            ApiName::LoadPage => "load-page",
            ApiName::Meta => "meta",
            ApiName::Operation => "operation",
            ApiName::Patch => "patch",
            ApiName::Read => "read",
            ApiName::Search => "search",
            ApiName::Transaction => "transaction",
            ApiName::Update => "update",
            ApiName::Validate => "validate",
        }
    }
}

impl FromStr for ApiName {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|api| api.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownApi {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ApiName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The facade an endpoint delegates to.
#[derive(Clone)]
pub enum ApiProxy {
    /// Capabilities facade.
    Capabilities(FhirCapabilities),
    /// Create facade.
    Create(FhirCreate),
    /// Delete facade.
    Delete(FhirDelete),
    /// History facade.
    History(FhirHistory),
    /// Paging facade.
    LoadPage(FhirLoadPage),
    /// Meta facade.
    Meta(FhirMeta),
    /// Extended operation facade.
    Operation(FhirOperation),
    /// Patch facade.
    Patch(FhirPatch),
    /// Read facade.
    Read(FhirRead),
    /// Search facade.
    Search(FhirSearch),
    /// Transaction facade.
    Transaction(FhirTransaction),
    /// Update facade.
    Update(FhirUpdate),
    /// Validate facade.
    Validate(FhirValidate),
}

impl ApiProxy {
    /// Builds the facade for `api`, bound to `client`.
    pub fn new(api: ApiName, client: Arc<dyn GenericClient>) -> Self {
        match api {
            ApiName::Capabilities => ApiProxy::Capabilities(FhirCapabilities::new(client)),
            ApiName::Create => ApiProxy::Create(FhirCreate::new(client)),
            ApiName::Delete => ApiProxy::Delete(FhirDelete::new(client)),
            ApiName::History => ApiProxy::History(FhirHistory::new(client)),
            ApiName::LoadPage => ApiProxy::LoadPage(FhirLoadPage::new(client)),
            ApiName::Meta => ApiProxy::Meta(FhirMeta::new(client)),
            ApiName::Operation => ApiProxy::Operation(FhirOperation::new(client)),
            ApiName::Patch => ApiProxy::Patch(FhirPatch::new(client)),
            ApiName::Read => ApiProxy::Read(FhirRead::new(client)),
            ApiName::Search => ApiProxy::Search(FhirSearch::new(client)),
            ApiName::Transaction => ApiProxy::Transaction(FhirTransaction::new(client)),
            ApiName::Update => ApiProxy::Update(FhirUpdate::new(client)),
            ApiName::Validate => ApiProxy::Validate(FhirValidate::new(client)),
        }
    }

    /// Returns the API this facade serves.
    pub fn api(&self) -> ApiName {
        match self {
            ApiProxy::Capabilities(_) => ApiName::Capabilities,
            ApiProxy::Create(_) => ApiName::Create,
            ApiProxy::Delete(_) => ApiName::Delete,
            ApiProxy::History(_) => ApiName::History,
            ApiProxy::LoadPage(_) => ApiName::LoadPage,
            ApiProxy::Meta(_) => ApiName::Meta,
            ApiProxy::Operation(_) => ApiName::Operation,
            ApiProxy::Patch(_) => ApiName::Patch,
            ApiProxy::Read(_) => ApiName::Read,
            ApiProxy::Search(_) => ApiName::Search,
            ApiProxy::Transaction(_) => ApiName::Transaction,
            ApiProxy::Update(_) => ApiName::Update,
            ApiProxy::Validate(_) => ApiName::Validate,
        }
    }

    /// Returns the client the facade is bound to.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        match self {
            ApiProxy::Capabilities(api) => api.client(),
            ApiProxy::Create(api) => api.client(),
            ApiProxy::Delete(api) => api.client(),
            ApiProxy::History(api) => api.client(),
            ApiProxy::LoadPage(api) => api.client(),
            ApiProxy::Meta(api) => api.client(),
            ApiProxy::Operation(api) => api.client(),
            ApiProxy::Patch(api) => api.client(),
            ApiProxy::Read(api) => api.client(),
            ApiProxy::Search(api) => api.client(),
            ApiProxy::Transaction(api) => api.client(),
            ApiProxy::Update(api) => api.client(),
            ApiProxy::Validate(api) => api.client(),
        }
    }
}

impl fmt::Debug for ApiProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiProxy").field(&self.api()).finish()
    }
}

/// The typed result of a method invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutput {
    /// A single resource.
    Resource(Resource),
    /// A bundle (search, history, paging, transaction).
    Bundle(Bundle),
    /// The outcome of a write.
    Outcome(MethodOutcome),
    /// A `Meta` element.
    Meta(Value),
    /// A serialized response.
    Text(String),
    /// A list of resources.
    Resources(Vec<Resource>),
    /// Nothing (a delete without OperationOutcome, a read that matched).
    Empty,
}

impl ApiOutput {
    /// Converts the output into a message body.
    pub fn into_value(self) -> Value {
        match self {
            ApiOutput::Resource(resource) => resource.into_value(),
            ApiOutput::Bundle(bundle) => bundle.into(),
            ApiOutput::Outcome(outcome) => outcome.into(),
            ApiOutput::Meta(meta) => meta,
            ApiOutput::Text(text) => Value::String(text),
            ApiOutput::Resources(resources) => {
                Value::Array(resources.into_iter().map(Resource::into_value).collect())
            }
            ApiOutput::Empty => Value::Null,
        }
    }

    /// Splits the output into one body per resource.
    ///
    /// Bundles yield their entry resources and lists yield their items; any
    /// other output yields itself. `Empty` yields nothing.
    pub fn split(self) -> Vec<Value> {
        match self {
            ApiOutput::Bundle(bundle) => bundle
                .entry_resources()
                .into_iter()
                .map(Resource::into_value)
                .collect(),
            ApiOutput::Resources(resources) => {
                resources.into_iter().map(Resource::into_value).collect()
            }
            ApiOutput::Empty => Vec::new(),
            other => vec![other.into_value()],
        }
    }
}

impl From<Option<Resource>> for ApiOutput {
    fn from(resource: Option<Resource>) -> Self {
        resource.map_or(ApiOutput::Empty, ApiOutput::Resource)
    }
}

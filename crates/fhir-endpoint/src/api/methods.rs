//! The invocation surface of each API.
//!
//! An endpoint names a method (`fhir://read/resourceById`) and supplies
//! arguments by name. Several methods share a name and differ only in their
//! arguments (`delete/resourceById` takes either `id` or `type` plus
//! `stringId`), so the method is picked by [`ApiMethod::resolve`]:
//!
//! 1. every method with that name whose required arguments are all present
//!    is a candidate;
//! 2. the candidate with the most required arguments wins, then the one with
//!    the most matched optional arguments, then declaration order;
//! 3. if no candidate is satisfied, the first missing required argument of
//!    the first declared overload is reported.

use std::fmt;

use serde::Serialize;

use super::arguments::{
    ArgumentBag, to_bundle, to_count, to_flag, to_id, to_instant, to_object, to_prefer,
    to_resource, to_resources, to_text,
};
use super::{ApiName, ApiOutput, ApiProxy};
use crate::client::VersionMatch;
use crate::error::{ConfigurationError, EndpointResult};
use crate::extra_parameters::ExtraParameters;
use crate::model::ResourcePayload;

/// The value type a method argument expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgumentKind {
    /// A FHIR resource (object or serialized JSON).
    Resource,
    /// A Bundle resource.
    Bundle,
    /// A list of resources.
    Resources,
    /// A resource id.
    Id,
    /// Plain text.
    Text,
    /// A `Prefer: return=` value.
    Prefer,
    /// A boolean.
    Flag,
    /// A non-negative count.
    Count,
    /// An RFC 3339 instant.
    Instant,
    /// A JSON object.
    Object,
}

impl ArgumentKind {
    /// Checks that `value` converts to this kind.
    pub fn check(&self, value: &serde_json::Value) -> Result<(), String> {
        match self {
            ArgumentKind::Resource => to_resource(value).map(drop),
            ArgumentKind::Bundle => to_bundle(value).map(drop),
            ArgumentKind::Resources => to_resources(value).map(drop),
            ArgumentKind::Id => to_id(value).map(drop),
            ArgumentKind::Text => to_text(value).map(drop),
            ArgumentKind::Prefer => to_prefer(value).map(drop),
            ArgumentKind::Flag => to_flag(value).map(drop),
            ArgumentKind::Count => to_count(value).map(drop),
            ArgumentKind::Instant => to_instant(value).map(drop),
            ArgumentKind::Object => to_object(value).map(drop),
        }
    }
}

/// One declared argument of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    /// The argument name.
    pub name: &'static str,
    /// The expected value type.
    pub kind: ArgumentKind,
    /// Whether the argument must be supplied.
    pub required: bool,
}

macro_rules! arg {
    (req $name:literal: $kind:ident) => {
        ArgumentSpec {
            name: $name,
            kind: ArgumentKind::$kind,
            required: true,
        }
    };
    (opt $name:literal: $kind:ident) => {
        ArgumentSpec {
            name: $name,
            kind: ArgumentKind::$kind,
            required: false,
        }
    };
}

/// A callable method of an API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ApiMethod {
    CapabilitiesOfType,
    CreateResource,
    CreateResourceAsString,
    DeleteResource,
    DeleteResourceById,
    DeleteResourceByTypeAndId,
    DeleteResourceConditionalByUrl,
    HistoryOnServer,
    HistoryOnType,
    HistoryOnInstance,
    LoadPageNext,
    LoadPagePrevious,
    LoadPageByUrl,
    MetaGetFromServer,
    MetaGetFromType,
    MetaGetFromResource,
    MetaAdd,
    MetaDelete,
    OperationOnServer,
    OperationOnType,
    OperationOnInstance,
    OperationOnInstanceVersion,
    OperationProcessMessage,
    PatchById,
    PatchByUrl,
    ReadResourceById,
    ReadResourceByStringId,
    ReadResourceByUrl,
    SearchByUrl,
    TransactionWithBundle,
    TransactionWithStringBundle,
    TransactionWithResources,
    UpdateResource,
    UpdateResourceAsString,
    UpdateResourceBySearchUrl,
    UpdateResourceAsStringBySearchUrl,
    ValidateResource,
    ValidateResourceAsString,
}

impl ApiMethod {
    /// Every method, in declaration (and overload preference) order.
    pub const ALL: [ApiMethod; 38] = [
        ApiMethod::CapabilitiesOfType,
        ApiMethod::CreateResource,
        ApiMethod::CreateResourceAsString,
        ApiMethod::DeleteResource,
        ApiMethod::DeleteResourceById,
        ApiMethod::DeleteResourceByTypeAndId,
        ApiMethod::DeleteResourceConditionalByUrl,
        ApiMethod::HistoryOnServer,
        ApiMethod::HistoryOnType,
        ApiMethod::HistoryOnInstance,
        ApiMethod::LoadPageNext,
        ApiMethod::LoadPagePrevious,
        ApiMethod::LoadPageByUrl,
        ApiMethod::MetaGetFromServer,
        ApiMethod::MetaGetFromType,
        ApiMethod::MetaGetFromResource,
        ApiMethod::MetaAdd,
        ApiMethod::MetaDelete,
        ApiMethod::OperationOnServer,
        ApiMethod::OperationOnType,
        ApiMethod::OperationOnInstance,
        ApiMethod::OperationOnInstanceVersion,
        ApiMethod::OperationProcessMessage,
        ApiMethod::PatchById,
        ApiMethod::PatchByUrl,
        ApiMethod::ReadResourceById,
        ApiMethod::ReadResourceByStringId,
        ApiMethod::ReadResourceByUrl,
        ApiMethod::SearchByUrl,
        ApiMethod::TransactionWithBundle,
        ApiMethod::TransactionWithStringBundle,
        ApiMethod::TransactionWithResources,
        ApiMethod::UpdateResource,
        ApiMethod::UpdateResourceAsString,
        ApiMethod::UpdateResourceBySearchUrl,
        ApiMethod::UpdateResourceAsStringBySearchUrl,
        ApiMethod::ValidateResource,
        ApiMethod::ValidateResourceAsString,
    ];

    /// Returns the API this method belongs to.
    pub fn api(&self) -> ApiName {
        use ApiMethod::*;
        match self {
            CapabilitiesOfType => ApiName::Capabilities,
            CreateResource | CreateResourceAsString => ApiName::Create,
            DeleteResource
            | DeleteResourceById
            | DeleteResourceByTypeAndId
            | DeleteResourceConditionalByUrl => ApiName::Delete,
            HistoryOnServer | HistoryOnType | HistoryOnInstance => ApiName::History,
            LoadPageNext | LoadPagePrevious | LoadPageByUrl => ApiName::LoadPage,
            MetaGetFromServer | MetaGetFromType | MetaGetFromResource | MetaAdd | MetaDelete => {
                ApiName::Meta
            }
            OperationOnServer
            | OperationOnType
            | OperationOnInstance
            | OperationOnInstanceVersion
            | OperationProcessMessage => ApiName::Operation,
            PatchById | PatchByUrl => ApiName::Patch,
            ReadResourceById | ReadResourceByStringId | ReadResourceByUrl => ApiName::Read,
            SearchByUrl => ApiName::Search,
            TransactionWithBundle | TransactionWithStringBundle | TransactionWithResources => {
                ApiName::Transaction
            }
            UpdateResource
            | UpdateResourceAsString
            | UpdateResourceBySearchUrl
            | UpdateResourceAsStringBySearchUrl => ApiName::Update,
            ValidateResource | ValidateResourceAsString => ApiName::Validate,
        }
    }

    /// Returns the method name used in endpoint URIs.
    pub fn name(&self) -> &'static str {
        use ApiMethod::*;
        match self {
            CapabilitiesOfType => "ofType",
            CreateResource | CreateResourceAsString => "resource",
            DeleteResource => "resource",
            DeleteResourceById | DeleteResourceByTypeAndId => "resourceById",
            DeleteResourceConditionalByUrl => "resourceConditionalByUrl",
            HistoryOnServer => "onServer",
            HistoryOnType => "onType",
            HistoryOnInstance => "onInstance",
            LoadPageNext => "next",
            LoadPagePrevious => "previous",
            LoadPageByUrl => "byUrl",
            MetaGetFromServer => "getFromServer",
            MetaGetFromType => "getFromType",
            MetaGetFromResource => "getFromResource",
            MetaAdd => "add",
            MetaDelete => "delete",
            OperationOnServer => "onServer",
            OperationOnType => "onType",
            OperationOnInstance => "onInstance",
            OperationOnInstanceVersion => "onInstanceVersion",
            OperationProcessMessage => "processMessage",
            PatchById => "patchById",
            PatchByUrl => "patchByUrl",
            ReadResourceById | ReadResourceByStringId => "resourceById",
            ReadResourceByUrl => "resourceByUrl",
            SearchByUrl => "searchByUrl",
            TransactionWithBundle | TransactionWithStringBundle => "withBundle",
            TransactionWithResources => "withResources",
            UpdateResource | UpdateResourceAsString => "resource",
            UpdateResourceBySearchUrl | UpdateResourceAsStringBySearchUrl => "resourceBySearchUrl",
            ValidateResource | ValidateResourceAsString => "resource",
        }
    }

    /// Returns the declared arguments, excluding `extraParameters`.
    pub fn arguments(&self) -> &'static [ArgumentSpec] {
        use ApiMethod::*;
        match self {
            CapabilitiesOfType => &[arg!(opt "type": Text)],
            CreateResource => &[
                arg!(req "resource": Resource),
                arg!(opt "url": Text),
                arg!(opt "preferReturn": Prefer),
            ],
            CreateResourceAsString => &[
                arg!(req "resourceAsString": Text),
                arg!(opt "url": Text),
                arg!(opt "preferReturn": Prefer),
            ],
            DeleteResource => &[arg!(req "resource": Resource)],
            DeleteResourceById => &[arg!(req "id": Id)],
            DeleteResourceByTypeAndId => &[arg!(req "type": Text), arg!(req "stringId": Text)],
            DeleteResourceConditionalByUrl => &[arg!(req "url": Text)],
            HistoryOnServer => &[arg!(opt "count": Count), arg!(opt "cutoff": Instant)],
            HistoryOnType => &[
                arg!(req "resourceType": Text),
                arg!(opt "count": Count),
                arg!(opt "cutoff": Instant),
            ],
            HistoryOnInstance => &[
                arg!(req "id": Id),
                arg!(opt "count": Count),
                arg!(opt "cutoff": Instant),
            ],
            LoadPageNext | LoadPagePrevious => &[arg!(req "bundle": Bundle)],
            LoadPageByUrl => &[arg!(req "url": Text)],
            MetaGetFromServer => &[],
            MetaGetFromType => &[arg!(req "resourceType": Text)],
            MetaGetFromResource => &[arg!(req "id": Id)],
            MetaAdd | MetaDelete => &[arg!(req "meta": Object), arg!(req "id": Id)],
            OperationOnServer => &[
                arg!(req "name": Text),
                arg!(opt "parameters": Resource),
                arg!(opt "useHttpGet": Flag),
            ],
            OperationOnType => &[
                arg!(req "resourceType": Text),
                arg!(req "name": Text),
                arg!(opt "parameters": Resource),
                arg!(opt "useHttpGet": Flag),
            ],
            OperationOnInstance | OperationOnInstanceVersion => &[
                arg!(req "id": Id),
                arg!(req "name": Text),
                arg!(opt "parameters": Resource),
                arg!(opt "useHttpGet": Flag),
            ],
            OperationProcessMessage => &[
                arg!(req "msgBundle": Bundle),
                arg!(opt "respondToUri": Text),
                arg!(opt "asynchronous": Flag),
            ],
            PatchById => &[
                arg!(req "patchBody": Text),
                arg!(req "id": Id),
                arg!(opt "preferReturn": Prefer),
            ],
            PatchByUrl => &[
                arg!(req "patchBody": Text),
                arg!(req "url": Text),
                arg!(opt "preferReturn": Prefer),
            ],
            ReadResourceById => &[
                arg!(req "resourceType": Text),
                arg!(req "id": Id),
                arg!(opt "ifVersionMatches": Text),
                arg!(opt "returnNull": Flag),
                arg!(opt "returnResource": Resource),
                arg!(opt "throwError": Flag),
            ],
            ReadResourceByStringId => &[
                arg!(req "resourceType": Text),
                arg!(req "stringId": Text),
                arg!(opt "version": Text),
                arg!(opt "ifVersionMatches": Text),
                arg!(opt "returnNull": Flag),
                arg!(opt "returnResource": Resource),
                arg!(opt "throwError": Flag),
            ],
            ReadResourceByUrl => &[
                arg!(req "resourceType": Text),
                arg!(req "url": Text),
                arg!(opt "ifVersionMatches": Text),
                arg!(opt "returnNull": Flag),
                arg!(opt "returnResource": Resource),
                arg!(opt "throwError": Flag),
            ],
            SearchByUrl => &[arg!(req "url": Text)],
            TransactionWithBundle => &[arg!(req "bundle": Bundle)],
            TransactionWithStringBundle => &[arg!(req "stringBundle": Text)],
            TransactionWithResources => &[arg!(req "resources": Resources)],
            UpdateResource => &[
                arg!(req "resource": Resource),
                arg!(opt "id": Id),
                arg!(opt "preferReturn": Prefer),
            ],
            UpdateResourceAsString => &[
                arg!(req "resourceAsString": Text),
                arg!(opt "id": Id),
                arg!(opt "preferReturn": Prefer),
            ],
            UpdateResourceBySearchUrl => &[
                arg!(req "resource": Resource),
                arg!(req "url": Text),
                arg!(opt "preferReturn": Prefer),
            ],
            UpdateResourceAsStringBySearchUrl => &[
                arg!(req "resourceAsString": Text),
                arg!(req "url": Text),
                arg!(opt "preferReturn": Prefer),
            ],
            ValidateResource => &[arg!(req "resource": Resource)],
            ValidateResourceAsString => &[arg!(req "resourceAsString": Text)],
        }
    }

    /// Returns `name(arg, optional?)` for display.
    pub fn signature(&self) -> String {
        let arguments: Vec<String> = self
            .arguments()
            .iter()
            .map(|spec| {
                if spec.required {
                    spec.name.to_string()
                } else {
                    format!("{}?", spec.name)
                }
            })
            .collect();
        format!("{}({})", self.name(), arguments.join(", "))
    }

    /// Returns the declared argument with this name.
    pub fn argument(&self, name: &str) -> Option<&'static ArgumentSpec> {
        self.arguments().iter().find(|spec| spec.name == name)
    }

    /// Returns the overloads of `api`/`name`, in declaration order.
    pub fn candidates(api: ApiName, name: &str) -> Vec<ApiMethod> {
        Self::ALL
            .into_iter()
            .filter(|method| method.api() == api && method.name() == name)
            .collect()
    }

    /// Returns the distinct method names of `api`.
    pub fn names(api: ApiName) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for method in Self::ALL.into_iter().filter(|m| m.api() == api) {
            if !names.contains(&method.name()) {
                names.push(method.name());
            }
        }
        names
    }

    /// Picks the overload of `api`/`name` that the available arguments satisfy.
    pub fn resolve(
        api: ApiName,
        name: &str,
        is_present: impl Fn(&str) -> bool,
    ) -> Result<ApiMethod, ConfigurationError> {
        let candidates = Self::candidates(api, name);
        let Some(first) = candidates.first().copied() else {
            return Err(ConfigurationError::UnknownMethod {
                api: api.to_string(),
                method: name.to_string(),
            });
        };

        let score = |method: &ApiMethod| {
            let arguments = method.arguments();
            let required = arguments.iter().filter(|spec| spec.required).count();
            let matched_optional = arguments
                .iter()
                .filter(|spec| !spec.required && is_present(spec.name))
                .count();
            (required, matched_optional)
        };

        let mut best: Option<(ApiMethod, (usize, usize))> = None;
        for method in candidates {
            let satisfied = method
                .arguments()
                .iter()
                .filter(|spec| spec.required)
                .all(|spec| is_present(spec.name));
            if !satisfied {
                continue;
            }
            let method_score = score(&method);
            if best.is_none_or(|(_, best_score)| method_score > best_score) {
                best = Some((method, method_score));
            }
        }

        if let Some((method, _)) = best {
            return Ok(method);
        }

        let missing = first
            .arguments()
            .iter()
            .find(|spec| spec.required && !is_present(spec.name))
            .map(|spec| spec.name)
            .unwrap_or_default();
        Err(ConfigurationError::MissingArgument {
            api: api.to_string(),
            method: name.to_string(),
            argument: missing.to_string(),
        })
    }

    /// Calls this method on `proxy` with `args`.
    ///
    /// `proxy` must belong to this method's API.
    pub fn invoke(
        &self,
        proxy: &ApiProxy,
        args: &ArgumentBag,
        extra: Option<&ExtraParameters>,
    ) -> EndpointResult<ApiOutput> {
        use ApiMethod as M;
        use ApiProxy as P;

        let output = match (self, proxy) {
            (M::CapabilitiesOfType, P::Capabilities(api)) => {
                let resource_type = args.optional("type", to_text)?;
                ApiOutput::Resource(api.of_type(resource_type.as_deref(), extra)?)
            }

            (M::CreateResource, P::Create(api)) => ApiOutput::Outcome(api.resource(
                args.required("resource", to_resource)?,
                args.optional("url", to_text)?.as_deref(),
                args.optional("preferReturn", to_prefer)?,
                extra,
            )?),
            (M::CreateResourceAsString, P::Create(api)) => {
                ApiOutput::Outcome(api.resource_as_string(
                    args.required("resourceAsString", to_text)?,
                    args.optional("url", to_text)?.as_deref(),
                    args.optional("preferReturn", to_prefer)?,
                    extra,
                )?)
            }

            (M::DeleteResource, P::Delete(api)) => {
                ApiOutput::from(api.resource(args.required("resource", to_resource)?, extra)?)
            }
            (M::DeleteResourceById, P::Delete(api)) => {
                ApiOutput::from(api.resource_by_id(args.required("id", to_id)?, extra)?)
            }
            (M::DeleteResourceByTypeAndId, P::Delete(api)) => {
                ApiOutput::from(api.resource_by_type_and_id(
                    &args.required("type", to_text)?,
                    &args.required("stringId", to_text)?,
                    extra,
                )?)
            }
            (M::DeleteResourceConditionalByUrl, P::Delete(api)) => ApiOutput::from(
                api.resource_conditional_by_url(&args.required("url", to_text)?, extra)?,
            ),

            (M::HistoryOnServer, P::History(api)) => ApiOutput::Bundle(api.on_server(
                args.optional("count", to_count)?,
                args.optional("cutoff", to_instant)?,
                extra,
            )?),
            (M::HistoryOnType, P::History(api)) => ApiOutput::Bundle(api.on_type(
                &args.required("resourceType", to_text)?,
                args.optional("count", to_count)?,
                args.optional("cutoff", to_instant)?,
                extra,
            )?),
            (M::HistoryOnInstance, P::History(api)) => ApiOutput::Bundle(api.on_instance(
                args.required("id", to_id)?,
                args.optional("count", to_count)?,
                args.optional("cutoff", to_instant)?,
                extra,
            )?),

            (M::LoadPageNext, P::LoadPage(api)) => {
                ApiOutput::Bundle(api.next(args.required("bundle", to_bundle)?, extra)?)
            }
            (M::LoadPagePrevious, P::LoadPage(api)) => {
                ApiOutput::Bundle(api.previous(args.required("bundle", to_bundle)?, extra)?)
            }
            (M::LoadPageByUrl, P::LoadPage(api)) => {
                ApiOutput::Bundle(api.by_url(&args.required("url", to_text)?, extra)?)
            }

            (M::MetaGetFromServer, P::Meta(api)) => ApiOutput::Meta(api.get_from_server(extra)?),
            (M::MetaGetFromType, P::Meta(api)) => {
                ApiOutput::Meta(api.get_from_type(&args.required("resourceType", to_text)?, extra)?)
            }
            (M::MetaGetFromResource, P::Meta(api)) => {
                ApiOutput::Meta(api.get_from_resource(args.required("id", to_id)?, extra)?)
            }
            (M::MetaAdd, P::Meta(api)) => ApiOutput::Meta(api.add(
                args.required("meta", to_object)?,
                args.required("id", to_id)?,
                extra,
            )?),
            (M::MetaDelete, P::Meta(api)) => ApiOutput::Meta(api.delete(
                args.required("meta", to_object)?,
                args.required("id", to_id)?,
                extra,
            )?),

            (M::OperationOnServer, P::Operation(api)) => ApiOutput::Resource(api.on_server(
                &args.required("name", to_text)?,
                args.optional("parameters", to_resource)?,
                args.flag("useHttpGet")?,
                extra,
            )?),
            (M::OperationOnType, P::Operation(api)) => ApiOutput::Resource(api.on_type(
                &args.required("resourceType", to_text)?,
                &args.required("name", to_text)?,
                args.optional("parameters", to_resource)?,
                args.flag("useHttpGet")?,
                extra,
            )?),
            (M::OperationOnInstance, P::Operation(api)) => ApiOutput::Resource(api.on_instance(
                args.required("id", to_id)?,
                &args.required("name", to_text)?,
                args.optional("parameters", to_resource)?,
                args.flag("useHttpGet")?,
                extra,
            )?),
            (M::OperationOnInstanceVersion, P::Operation(api)) => {
                ApiOutput::Resource(api.on_instance_version(
                    args.required("id", to_id)?,
                    &args.required("name", to_text)?,
                    args.optional("parameters", to_resource)?,
                    args.flag("useHttpGet")?,
                    extra,
                )?)
            }
            (M::OperationProcessMessage, P::Operation(api)) => {
                ApiOutput::Resource(api.process_message(
                    args.required("msgBundle", to_bundle)?,
                    args.optional("respondToUri", to_text)?.as_deref(),
                    args.flag("asynchronous")?,
                    extra,
                )?)
            }

            (M::PatchById, P::Patch(api)) => ApiOutput::Outcome(api.patch_by_id(
                &args.required("patchBody", to_text)?,
                args.required("id", to_id)?,
                args.optional("preferReturn", to_prefer)?,
                extra,
            )?),
            (M::PatchByUrl, P::Patch(api)) => ApiOutput::Outcome(api.patch_by_url(
                &args.required("patchBody", to_text)?,
                &args.required("url", to_text)?,
                args.optional("preferReturn", to_prefer)?,
                extra,
            )?),

            (M::ReadResourceById, P::Read(api)) => {
                let (if_version_matches, on_match) = version_match(args)?;
                ApiOutput::from(api.resource_by_id(
                    &args.required("resourceType", to_text)?,
                    args.required("id", to_id)?,
                    if_version_matches.as_deref(),
                    on_match,
                    extra,
                )?)
            }
            (M::ReadResourceByStringId, P::Read(api)) => {
                let (if_version_matches, on_match) = version_match(args)?;
                ApiOutput::from(api.resource_by_string_id(
                    &args.required("resourceType", to_text)?,
                    &args.required("stringId", to_text)?,
                    args.optional("version", to_text)?.as_deref(),
                    if_version_matches.as_deref(),
                    on_match,
                    extra,
                )?)
            }
            (M::ReadResourceByUrl, P::Read(api)) => {
                let (if_version_matches, on_match) = version_match(args)?;
                ApiOutput::from(api.resource_by_url(
                    &args.required("resourceType", to_text)?,
                    &args.required("url", to_text)?,
                    if_version_matches.as_deref(),
                    on_match,
                    extra,
                )?)
            }

            (M::SearchByUrl, P::Search(api)) => {
                ApiOutput::Bundle(api.search_by_url(&args.required("url", to_text)?, extra)?)
            }

            (M::TransactionWithBundle, P::Transaction(api)) => {
                ApiOutput::Bundle(api.with_bundle(args.required("bundle", to_bundle)?, extra)?)
            }
            (M::TransactionWithStringBundle, P::Transaction(api)) => ApiOutput::Text(
                api.with_bundle_string(args.required("stringBundle", to_text)?, extra)?,
            ),
            (M::TransactionWithResources, P::Transaction(api)) => ApiOutput::Resources(
                api.with_resources(args.required("resources", to_resources)?, extra)?,
            ),

            (M::UpdateResource, P::Update(api)) => ApiOutput::Outcome(api.resource(
                args.required("resource", to_resource)?,
                args.optional("id", to_id)?,
                args.optional("preferReturn", to_prefer)?,
                extra,
            )?),
            (M::UpdateResourceAsString, P::Update(api)) => {
                ApiOutput::Outcome(api.resource_as_string(
                    args.required("resourceAsString", to_text)?,
                    args.optional("id", to_id)?,
                    args.optional("preferReturn", to_prefer)?,
                    extra,
                )?)
            }
            (M::UpdateResourceBySearchUrl, P::Update(api)) => {
                ApiOutput::Outcome(api.resource_by_search_url(
                    ResourcePayload::Structured(args.required("resource", to_resource)?),
                    &args.required("url", to_text)?,
                    args.optional("preferReturn", to_prefer)?,
                    extra,
                )?)
            }
            (M::UpdateResourceAsStringBySearchUrl, P::Update(api)) => {
                ApiOutput::Outcome(api.resource_by_search_url(
                    ResourcePayload::Raw(args.required("resourceAsString", to_text)?),
                    &args.required("url", to_text)?,
                    args.optional("preferReturn", to_prefer)?,
                    extra,
                )?)
            }

            (M::ValidateResource, P::Validate(api)) => {
                ApiOutput::Outcome(api.resource(args.required("resource", to_resource)?, extra)?)
            }
            (M::ValidateResourceAsString, P::Validate(api)) => ApiOutput::Outcome(
                api.resource_as_string(args.required("resourceAsString", to_text)?, extra)?,
            ),

            (method, proxy) => {
                return Err(ConfigurationError::UnknownMethod {
                    api: proxy.api().to_string(),
                    method: method.name().to_string(),
                }
                .into());
            }
        };
        Ok(output)
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api(), self.name())
    }
}

/// Reads the conditional-read arguments shared by the read methods.
fn version_match(args: &ArgumentBag) -> Result<(Option<String>, VersionMatch), ConfigurationError> {
    let version = args.optional("ifVersionMatches", to_text)?;
    let on_match = if let Some(resource) = args.optional("returnResource", to_resource)? {
        VersionMatch::ReturnResource(resource)
    } else if args.flag("throwError")? {
        VersionMatch::ThrowError
    } else {
        VersionMatch::ReturnNull
    };
    Ok((version, on_match))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present<'a>(names: &'a [&'a str]) -> impl Fn(&str) -> bool + 'a {
        move |name| names.contains(&name)
    }

    #[test]
    fn test_every_api_has_methods() {
        for api in ApiName::ALL {
            assert!(!ApiMethod::names(api).is_empty(), "{}", api);
        }
    }

    #[test]
    fn test_argument_names_unique_per_method() {
        for method in ApiMethod::ALL {
            let mut names: Vec<_> = method.arguments().iter().map(|a| a.name).collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), method.arguments().len(), "{}", method);
        }
    }

    #[test]
    fn test_resolve_delete_overloads() {
        assert_eq!(
            ApiMethod::resolve(ApiName::Delete, "resourceById", present(&["id"])).unwrap(),
            ApiMethod::DeleteResourceById
        );
        assert_eq!(
            ApiMethod::resolve(ApiName::Delete, "resourceById", present(&["type", "stringId"]))
                .unwrap(),
            ApiMethod::DeleteResourceByTypeAndId
        );
    }

    #[test]
    fn test_resolve_create_string_overload() {
        assert_eq!(
            ApiMethod::resolve(ApiName::Create, "resource", present(&["resourceAsString", "url"]))
                .unwrap(),
            ApiMethod::CreateResourceAsString
        );
    }

    #[test]
    fn test_resolve_prefers_most_required_then_optionals() {
        assert_eq!(
            ApiMethod::resolve(
                ApiName::Delete,
                "resourceById",
                present(&["id", "type", "stringId"])
            )
            .unwrap(),
            ApiMethod::DeleteResourceByTypeAndId
        );
        assert_eq!(
            ApiMethod::resolve(
                ApiName::Read,
                "resourceById",
                present(&["resourceType", "id", "stringId"])
            )
            .unwrap(),
            ApiMethod::ReadResourceById
        );
        assert_eq!(
            ApiMethod::resolve(
                ApiName::Read,
                "resourceById",
                present(&["resourceType", "id", "stringId", "version"])
            )
            .unwrap(),
            ApiMethod::ReadResourceByStringId
        );
    }

    #[test]
    fn test_resolve_reports_first_missing_argument() {
        let err = ApiMethod::resolve(ApiName::Patch, "patchById", present(&["id"])).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingArgument {
                api: "patch".to_string(),
                method: "patchById".to_string(),
                argument: "patchBody".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_unknown_method() {
        let err = ApiMethod::resolve(ApiName::Search, "byMagic", present(&[])).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownMethod { .. }));
    }

    #[test]
    fn test_methods_without_required_arguments() {
        assert_eq!(
            ApiMethod::resolve(ApiName::Meta, "getFromServer", present(&[])).unwrap(),
            ApiMethod::MetaGetFromServer
        );
        assert_eq!(
            ApiMethod::resolve(ApiName::Capabilities, "ofType", present(&[])).unwrap(),
            ApiMethod::CapabilitiesOfType
        );
    }

    #[test]
    fn test_signature() {
        assert_eq!(
            ApiMethod::HistoryOnType.signature(),
            "onType(resourceType, count?, cutoff?)"
        );
        assert_eq!(ApiMethod::MetaGetFromServer.signature(), "getFromServer()");
    }

    #[test]
    fn test_argument_kind_check() {
        assert!(ArgumentKind::Prefer.check(&serde_json::json!("minimal")).is_ok());
        assert!(ArgumentKind::Prefer.check(&serde_json::json!("maximal")).is_err());
        assert!(ArgumentKind::Id.check(&serde_json::json!("Patient/1")).is_ok());
    }
}

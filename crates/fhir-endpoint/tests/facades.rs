//! Operation facade tests.
//!
//! Tests that each facade builds the request the client expects:
//! - Delete entry points converge on one request path
//! - Structured and raw payloads, conditional URLs and Prefer
//! - Conditional reads, paging, history, meta and operations
//! - Remote errors pass through unchanged

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::client::{RecordingClient, Target};
use common::fixtures;
use helios_fhir_endpoint::api::{
    FhirCapabilities, FhirCreate, FhirDelete, FhirHistory, FhirLoadPage, FhirMeta, FhirOperation,
    FhirPatch, FhirRead, FhirSearch, FhirTransaction, FhirUpdate, FhirValidate,
};
use helios_fhir_endpoint::client::{
    DeleteTarget, HistoryScope, MetaRequest, OperationScope, PageTarget, PatchTarget,
    PreferReturn, ReadTarget, RequestKind, TransactionRequest, VersionMatch,
};
use helios_fhir_endpoint::{
    ClientError, ConfigurationError, EndpointError, GenericClient, IdType, Resource,
    ResourcePayload,
};
use serde_json::json;

fn shared(client: &Arc<RecordingClient>) -> Arc<dyn GenericClient> {
    client.clone()
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_delete_entry_points_converge() {
    let client = RecordingClient::new();
    let delete = FhirDelete::new(shared(&client));

    assert_eq!(delete.resource(fixtures::patient("1"), None).unwrap(), None);
    assert_eq!(
        delete
            .resource_by_id(IdType::new("Patient", "2"), None)
            .unwrap(),
        None
    );
    assert_eq!(
        delete.resource_by_type_and_id("Patient", "3", None).unwrap(),
        None
    );
    assert_eq!(
        delete
            .resource_conditional_by_url("Patient?identifier=x", None)
            .unwrap(),
        None
    );

    let targets: Vec<Target> = client.requests().into_iter().map(|r| r.target).collect();
    assert_eq!(
        targets,
        vec![
            Target::Delete(DeleteTarget::Resource(fixtures::patient("1"))),
            Target::Delete(DeleteTarget::Id(IdType::new("Patient", "2"))),
            Target::Delete(DeleteTarget::TypeAndId {
                resource_type: "Patient".to_string(),
                id: "3".to_string(),
            }),
            Target::Delete(DeleteTarget::ConditionalUrl(
                "Patient?identifier=x".to_string()
            )),
        ]
    );
}

#[test]
fn test_delete_returns_operation_outcome() {
    let client = RecordingClient::new();
    let outcome = Resource::from_value(json!({
        "resourceType": "OperationOutcome",
        "issue": [{"severity": "information", "code": "informational"}]
    }))
    .unwrap();
    client.respond_to_delete_with(outcome.clone());

    let delete = FhirDelete::new(shared(&client));
    assert_eq!(
        delete
            .resource_by_id(IdType::new("Patient", "2"), None)
            .unwrap(),
        Some(outcome)
    );
}

// ============================================================================
// Create and update
// ============================================================================

#[test]
fn test_create_structured_and_raw() {
    let client = RecordingClient::new();
    let create = FhirCreate::new(shared(&client));
    let raw = fixtures::new_patient().to_json_string();

    let structured_outcome = create
        .resource(
            fixtures::new_patient(),
            None,
            Some(PreferReturn::Representation),
            None,
        )
        .unwrap();
    let raw_outcome = create
        .resource_as_string(raw.clone(), None, Some(PreferReturn::Representation), None)
        .unwrap();

    assert_eq!(structured_outcome.created, Some(true));
    assert_eq!(structured_outcome, raw_outcome);

    let requests = client.requests();
    assert_eq!(
        requests[0].target,
        Target::Create(ResourcePayload::Structured(fixtures::new_patient()))
    );
    assert_eq!(requests[1].target, Target::Create(ResourcePayload::Raw(raw)));
    assert!(requests.iter().all(|r| r.conditional_url.is_none()));
}

#[test]
fn test_conditional_create_and_prefer() {
    let client = RecordingClient::new();
    let create = FhirCreate::new(shared(&client));

    let outcome = create
        .resource(
            fixtures::new_patient(),
            Some("Patient?identifier=http://example.org|123"),
            Some(PreferReturn::Representation),
            None,
        )
        .unwrap();

    let request = client.last_request();
    assert_eq!(
        request.conditional_url.as_deref(),
        Some("Patient?identifier=http://example.org|123")
    );
    assert_eq!(request.prefer, Some(PreferReturn::Representation));
    assert!(outcome.resource.is_some());
}

#[test]
fn test_update_by_id_and_by_search_url() {
    let client = RecordingClient::new();
    let update = FhirUpdate::new(shared(&client));

    let outcome = update
        .resource(
            fixtures::new_patient(),
            Some(IdType::new("Patient", "7")),
            None,
            None,
        )
        .unwrap();
    assert_eq!(outcome.id.unwrap().to_string(), "Patient/7/_history/1");
    assert_eq!(client.last_request().update_id, Some(IdType::new("Patient", "7")));

    update
        .resource_by_search_url(
            ResourcePayload::Raw(r#"{"resourceType":"Patient"}"#.to_string()),
            "Patient?identifier=abc",
            Some(PreferReturn::Minimal),
            None,
        )
        .unwrap();
    let request = client.last_request();
    assert_eq!(request.conditional_url.as_deref(), Some("Patient?identifier=abc"));
    assert_eq!(request.update_id, None);
    assert_eq!(request.prefer, Some(PreferReturn::Minimal));
}

#[test]
fn test_update_without_any_id_fails() {
    let client = RecordingClient::new();
    let update = FhirUpdate::new(shared(&client));

    let structured = update
        .resource(fixtures::new_patient(), None, None, None)
        .unwrap_err();
    let raw = update
        .resource_as_string(fixtures::new_patient().to_json_string(), None, None, None)
        .unwrap_err();

    for err in [structured, raw] {
        assert!(matches!(
            err,
            EndpointError::Configuration(ConfigurationError::InvalidArgument { ref argument, .. })
                if argument == "id"
        ));
    }
    assert!(client.requests().is_empty());

    update
        .resource_as_string(fixtures::patient("9").to_json_string(), None, None, None)
        .unwrap();
    assert_eq!(client.requests().len(), 1);
}

#[test]
fn test_validate_payloads() {
    let client = RecordingClient::new();
    let validate = FhirValidate::new(shared(&client));

    let outcome = validate.resource(fixtures::patient("1"), None).unwrap();
    assert!(outcome.operation_outcome.is_some());
    validate
        .resource_as_string(r#"{"resourceType":"Patient"}"#.to_string(), None)
        .unwrap();

    let kinds: Vec<RequestKind> = client.requests().into_iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![RequestKind::Validate, RequestKind::Validate]);
}

// ============================================================================
// Read
// ============================================================================

#[test]
fn test_read_by_id_and_string_id() {
    let client = RecordingClient::new();
    let read = FhirRead::new(shared(&client));

    let patient = read
        .resource_by_id(
            "Patient",
            IdType::new("Patient", "1"),
            None,
            VersionMatch::ReturnNull,
            None,
        )
        .unwrap()
        .unwrap();
    assert_eq!(patient.id(), Some("1"));

    read.resource_by_string_id("Patient", "1", Some("3"), None, VersionMatch::ReturnNull, None)
        .unwrap();
    assert_eq!(
        client.last_request().target,
        Target::Read(ReadTarget::Id {
            resource_type: "Patient".to_string(),
            id: IdType::new("Patient", "1").with_version("3"),
        })
    );
}

#[test]
fn test_conditional_read() {
    let client = RecordingClient::new();
    let read = FhirRead::new(shared(&client));
    let id = IdType::new("Patient", "1");

    let unchanged = read
        .resource_by_id("Patient", id.clone(), Some("2"), VersionMatch::ReturnNull, None)
        .unwrap();
    assert_eq!(unchanged, None);
    assert_eq!(
        client.last_request().version_match,
        Some(("2".to_string(), VersionMatch::ReturnNull))
    );

    let cached = fixtures::patient("1");
    let returned = read
        .resource_by_id(
            "Patient",
            id.clone(),
            Some("2"),
            VersionMatch::ReturnResource(cached.clone()),
            None,
        )
        .unwrap();
    assert_eq!(returned, Some(cached));

    let err = read
        .resource_by_id("Patient", id, Some("2"), VersionMatch::ThrowError, None)
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP 304: Not Modified");
}

#[test]
fn test_read_by_url() {
    let client = RecordingClient::new();
    let read = FhirRead::new(shared(&client));

    read.resource_by_url(
        "Patient",
        "http://example.org/fhir/Patient/1",
        None,
        VersionMatch::ReturnNull,
        None,
    )
    .unwrap();

    assert_eq!(
        client.last_request().target,
        Target::Read(ReadTarget::Url {
            resource_type: "Patient".to_string(),
            url: "http://example.org/fhir/Patient/1".to_string(),
        })
    );
}

// ============================================================================
// Search, paging and history
// ============================================================================

#[test]
fn test_search_returns_client_bundle() {
    let client = RecordingClient::new();
    client.respond_with_bundle(fixtures::searchset(
        &[fixtures::patient("1"), fixtures::patient("2")],
        None,
        None,
    ));
    let search = FhirSearch::new(shared(&client));

    let bundle = search.search_by_url("Patient?family=chalmers", None).unwrap();

    assert_eq!(bundle.total(), Some(2));
    assert_eq!(
        client.last_request().target,
        Target::Search("Patient?family=chalmers".to_string())
    );
}

#[test]
fn test_load_page_follows_links() {
    let client = RecordingClient::new();
    let pages = FhirLoadPage::new(shared(&client));
    let page = fixtures::searchset(
        &[fixtures::patient("1")],
        Some("http://example.org/fhir?page=3"),
        Some("http://example.org/fhir?page=1"),
    );

    pages.next(page.clone(), None).unwrap();
    assert_eq!(
        client.last_request().target,
        Target::LoadPage(PageTarget::Next(page.clone()))
    );

    pages.previous(page, None).unwrap();
    pages.by_url("http://example.org/fhir?page=9", None).unwrap();
    assert_eq!(client.requests().len(), 3);
}

#[test]
fn test_load_page_without_link_fails() {
    let client = RecordingClient::new();
    let pages = FhirLoadPage::new(shared(&client));
    let last_page = fixtures::searchset(&[fixtures::patient("1")], None, None);

    let err = pages.next(last_page, None).unwrap_err();

    assert!(matches!(
        err,
        EndpointError::Configuration(ConfigurationError::InvalidArgument { ref argument, .. })
            if argument == "bundle"
    ));
    assert!(client.requests().is_empty());
}

#[test]
fn test_history_scopes_and_filters() {
    let client = RecordingClient::new();
    let history = FhirHistory::new(shared(&client));
    let cutoff = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    history.on_server(None, None, None).unwrap();
    history.on_type("Patient", Some(10), None, None).unwrap();
    history
        .on_instance(IdType::new("Patient", "1"), Some(5), Some(cutoff), None)
        .unwrap();

    let requests = client.requests();
    assert_eq!(requests[0].target, Target::History(HistoryScope::Server));
    assert_eq!(requests[0].count, None);
    assert_eq!(
        requests[1].target,
        Target::History(HistoryScope::Type("Patient".to_string()))
    );
    assert_eq!(requests[1].count, Some(10));
    assert_eq!(requests[2].since, Some(cutoff));
}

// ============================================================================
// Meta, operations and patch
// ============================================================================

#[test]
fn test_meta_requests() {
    let client = RecordingClient::new();
    let meta = FhirMeta::new(shared(&client));
    let tags = json!({"tag": [{"code": "vip"}]});

    meta.get_from_server(None).unwrap();
    meta.get_from_type("Patient", None).unwrap();
    let added = meta
        .add(tags.clone(), IdType::new("Patient", "1"), None)
        .unwrap();
    assert_eq!(added, tags);

    let err = meta
        .delete(json!(["vip"]), IdType::new("Patient", "1"), None)
        .unwrap_err();
    assert!(matches!(err, EndpointError::Configuration(_)));

    let targets: Vec<Target> = client.requests().into_iter().map(|r| r.target).collect();
    assert_eq!(targets[0], Target::Meta(MetaRequest::FromServer));
    assert_eq!(
        targets[1],
        Target::Meta(MetaRequest::FromType("Patient".to_string()))
    );
    assert_eq!(targets.len(), 3);
}

#[test]
fn test_operation_scopes() {
    let client = RecordingClient::new();
    let operation = FhirOperation::new(shared(&client));

    operation.on_server("everything", None, false, None).unwrap();
    operation
        .on_instance(IdType::new("Patient", "1"), "$everything", None, true, None)
        .unwrap();

    let requests = client.requests();
    assert_eq!(
        requests[0].target,
        Target::Operation {
            scope: OperationScope::Server,
            name: "$everything".to_string(),
            parameters: None,
        }
    );
    assert!(!requests[0].use_http_get);
    assert!(requests[1].use_http_get);
}

#[test]
fn test_operation_on_instance_version_requires_version() {
    let client = RecordingClient::new();
    let operation = FhirOperation::new(shared(&client));

    let err = operation
        .on_instance_version(IdType::new("Patient", "1"), "$validate", None, false, None)
        .unwrap_err();
    assert!(matches!(err, EndpointError::Configuration(_)));

    operation
        .on_instance_version(
            IdType::new("Patient", "1").with_version("2"),
            "$validate",
            None,
            false,
            None,
        )
        .unwrap();
    assert_eq!(client.requests().len(), 1);
}

#[test]
fn test_process_message() {
    let client = RecordingClient::new();
    let operation = FhirOperation::new(shared(&client));

    operation
        .process_message(fixtures::message(), Some("http://reply.example.org"), true, None)
        .unwrap();

    let request = client.last_request();
    assert_eq!(request.kind, RequestKind::ProcessMessage);
    assert_eq!(request.respond_to_uri.as_deref(), Some("http://reply.example.org"));
    assert!(request.asynchronous);
}

#[test]
fn test_patch_by_id_and_url() {
    let client = RecordingClient::new();
    let patch = FhirPatch::new(shared(&client));
    let body = r#"[{"op": "replace", "path": "/active", "value": false}]"#;

    let outcome = patch
        .patch_by_id(body, IdType::new("Patient", "1"), Some(PreferReturn::Minimal), None)
        .unwrap();
    assert_eq!(outcome.id, Some(IdType::new("Patient", "1")));

    patch
        .patch_by_url(body, "Patient?identifier=abc", None, None)
        .unwrap();
    assert_eq!(
        client.last_request().target,
        Target::Patch {
            body: body.to_string(),
            target: PatchTarget::ConditionalUrl("Patient?identifier=abc".to_string()),
        }
    );
}

#[test]
fn test_patch_rejects_malformed_json_patch() {
    let client = RecordingClient::new();
    let patch = FhirPatch::new(shared(&client));

    let err = patch
        .patch_by_id(
            r#"[{"op": "teleport", "path": "/active"}]"#,
            IdType::new("Patient", "1"),
            None,
            None,
        )
        .unwrap_err();

    assert!(matches!(err, EndpointError::Configuration(_)));
    assert!(client.requests().is_empty());
}

// ============================================================================
// Transaction and capabilities
// ============================================================================

#[test]
fn test_transaction_shapes() {
    let client = RecordingClient::new();
    let transaction = FhirTransaction::new(shared(&client));
    let resources = vec![fixtures::new_patient(), fixtures::patient("9")];

    let response = transaction
        .with_bundle(fixtures::transaction(&resources), None)
        .unwrap();
    assert_eq!(response.as_resource().resource_type(), "Bundle");

    let raw = transaction
        .with_bundle_string(fixtures::transaction(&resources).as_resource().to_json_string(), None)
        .unwrap();
    assert!(raw.contains("transaction-response"));

    let echoed = transaction.with_resources(resources.clone(), None).unwrap();
    assert_eq!(echoed, resources);

    assert_eq!(
        client.last_request().target,
        Target::Transaction(TransactionRequest::Resources(resources))
    );
}

#[test]
fn test_capabilities_of_type() {
    let client = RecordingClient::new();
    let capabilities = FhirCapabilities::new(shared(&client));

    let statement = capabilities.of_type(Some("Patient"), None).unwrap();

    assert_eq!(statement.resource_type(), "CapabilityStatement");
    assert_eq!(
        client.last_request().target,
        Target::Capabilities(Some("Patient".to_string()))
    );
}

// ============================================================================
// Remote errors
// ============================================================================

#[test]
fn test_client_errors_pass_through() {
    let client = RecordingClient::new();
    let remote = ClientError::Server {
        status: 412,
        message: "Precondition Failed".to_string(),
        operation_outcome: None,
    };
    client.fail_next(remote.clone());
    let search = FhirSearch::new(shared(&client));

    let err = search.search_by_url("Patient", None).unwrap_err();

    assert!(err.is_client_error());
    match err {
        EndpointError::Client(inner) => assert_eq!(inner, remote),
        other => panic!("unexpected error: {:?}", other),
    }
}

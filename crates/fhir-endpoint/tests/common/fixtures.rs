//! Test resources and bundles.

use helios_fhir_endpoint::{Bundle, Resource};
use serde_json::{Value, json};

/// A minimal Patient.
pub fn patient(id: &str) -> Resource {
    Resource::from_value(json!({
        "resourceType": "Patient",
        "id": id,
        "name": [{"family": "Chalmers", "given": ["Peter"]}]
    }))
    .expect("patient fixture")
}

/// A Patient without an id, as sent to create.
pub fn new_patient() -> Resource {
    Resource::from_value(json!({
        "resourceType": "Patient",
        "name": [{"family": "Windsor"}]
    }))
    .expect("patient fixture")
}

/// A searchset bundle holding `resources`, with optional paging links.
pub fn searchset(resources: &[Resource], next: Option<&str>, previous: Option<&str>) -> Bundle {
    let mut links = Vec::new();
    if let Some(next) = next {
        links.push(json!({"relation": "next", "url": next}));
    }
    if let Some(previous) = previous {
        links.push(json!({"relation": "previous", "url": previous}));
    }
    let entries: Vec<Value> = resources
        .iter()
        .map(|r| json!({"resource": r.as_value()}))
        .collect();

    Bundle::from_value(json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "total": resources.len(),
        "link": links,
        "entry": entries
    }))
    .expect("bundle fixture")
}

/// A transaction bundle creating `resources`.
pub fn transaction(resources: &[Resource]) -> Bundle {
    let entries: Vec<Value> = resources
        .iter()
        .map(|r| {
            json!({
                "resource": r.as_value(),
                "request": {"method": "POST", "url": r.resource_type()}
            })
        })
        .collect();

    Bundle::from_value(json!({
        "resourceType": "Bundle",
        "type": "transaction",
        "entry": entries
    }))
    .expect("bundle fixture")
}

/// A message bundle for `$process-message`.
pub fn message() -> Bundle {
    Bundle::from_value(json!({
        "resourceType": "Bundle",
        "type": "message",
        "entry": [{"resource": {"resourceType": "MessageHeader", "id": "h1"}}]
    }))
    .expect("bundle fixture")
}

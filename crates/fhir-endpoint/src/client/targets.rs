//! Addressing for client requests.
//!
//! Each enum names what a builder operates on. They are handed to
//! [`GenericClient`](super::GenericClient) when a builder is created, so a
//! builder never exists without a target.

use crate::model::{Bundle, IdType, Resource};

/// What a delete request removes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    /// The resource identified by this resource's type and id.
    Resource(Resource),
    /// A typed id such as `Patient/123`.
    Id(IdType),
    /// A resource type and logical id supplied separately.
    TypeAndId {
        /// The resource type.
        resource_type: String,
        /// The logical id.
        id: String,
    },
    /// Every resource matching a search URL (`Patient?identifier=x`).
    ConditionalUrl(String),
}

/// Scope of a history request.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryScope {
    /// `_history` across the whole server.
    Server,
    /// `[type]/_history`.
    Type(String),
    /// `[type]/[id]/_history`.
    Instance(IdType),
}

/// Which page of a paged bundle to load.
#[derive(Debug, Clone, PartialEq)]
pub enum PageTarget {
    /// Follow the bundle's `next` link.
    Next(Bundle),
    /// Follow the bundle's `previous` link.
    Previous(Bundle),
    /// Load an absolute page URL.
    Url(String),
}

/// A `$meta`, `$meta-add` or `$meta-delete` request.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaRequest {
    /// Tags, profiles and security labels in use across the server.
    FromServer,
    /// Meta in use for one resource type.
    FromType(String),
    /// Meta of a single resource.
    FromResource(IdType),
    /// Add meta elements to a resource.
    Add {
        /// A `Meta` (or `Parameters`) JSON object.
        meta: serde_json::Value,
        /// The resource to modify.
        id: IdType,
    },
    /// Remove meta elements from a resource.
    Delete {
        /// A `Meta` (or `Parameters`) JSON object.
        meta: serde_json::Value,
        /// The resource to modify.
        id: IdType,
    },
}

/// Where an extended operation is invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationScope {
    /// `/$op`
    Server,
    /// `/[type]/$op`
    Type(String),
    /// `/[type]/[id]/$op`
    Instance(IdType),
    /// `/[type]/[id]/_history/[vid]/$op`
    InstanceVersion(IdType),
}

/// What a patch request modifies.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchTarget {
    /// A single resource by id.
    Id(IdType),
    /// Every resource matching a conditional URL.
    ConditionalUrl(String),
}

/// What a read request fetches.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadTarget {
    /// A resource by type and id (a vread when the id carries a version).
    Id {
        /// The resource type.
        resource_type: String,
        /// The id, optionally versioned.
        id: IdType,
    },
    /// A resource by absolute or relative URL.
    Url {
        /// The resource type.
        resource_type: String,
        /// The resource URL.
        url: String,
    },
}

/// Input of a transaction or batch.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionRequest {
    /// A prepared `transaction` bundle.
    Bundle(Bundle),
    /// A serialized bundle passed through verbatim.
    Raw(String),
    /// Resources the client wraps into a transaction bundle.
    Resources(Vec<Resource>),
}

/// Response of a transaction, shaped after its request.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionResponse {
    /// Response to a [`TransactionRequest::Bundle`].
    Bundle(Bundle),
    /// Response to a [`TransactionRequest::Raw`], serialized.
    Raw(String),
    /// Response to a [`TransactionRequest::Resources`].
    Resources(Vec<Resource>),
}

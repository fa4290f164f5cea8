//! Generic resource module
//!
//! CRUD across product/resource namespaces with JSON:API decoding.
//!
//! # Overview
//!
//! - `ResourceClient` - builds URLs and query parameters, calls the engine
//! - `Document` - a decoded response: single resource or collection
//! - `GenericResource` / `GenericCollection` - shape-agnostic read models
//! - `QueryOptions` - `per_page`, `offset`, `include`, `where[...]`, `order`

mod client;
mod types;

pub use client::{ResourceClient, DEFAULT_API_VERSION, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use types::{
    jsonapi_body, Document, GenericCollection, GenericResource, PageLinks, QueryOptions,
    Relationship, RelationshipData, ResourceIdentifier,
};

#[cfg(test)]
mod tests;

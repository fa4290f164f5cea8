//! JSON:API document types
//!
//! Resource-shape-agnostic read models: every entity kind decodes into the
//! same [`GenericResource`], and every list endpoint into a
//! [`GenericCollection`].

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, QueryParams};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Treat an explicit `null` the same as a missing member
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept ids sent either as strings or as numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Null) | None => Ok(String::new()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Links may be plain strings or `{"href": ...}` objects
fn link_href<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Object(map)) => map.get("href").and_then(Value::as_str).map(String::from),
        _ => None,
    })
}

// ============================================================================
// Relationships
// ============================================================================

/// `{type, id}` pointer to another resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Resource type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource id
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// Linkage of a relationship: to-one or to-many
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<ResourceIdentifier>),
    One(ResourceIdentifier),
}

/// One named relationship of a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Resource linkage (`None` for an empty to-one relationship)
    #[serde(default)]
    pub data: Option<RelationshipData>,
    /// Relationship links
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: JsonObject,
    /// Relationship meta
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: JsonObject,
}

impl Relationship {
    /// All identifiers in the linkage, in order
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match &self.data {
            Some(RelationshipData::Many(ids)) => ids.iter().collect(),
            Some(RelationshipData::One(id)) => vec![id],
            None => Vec::new(),
        }
    }
}

// ============================================================================
// Resource
// ============================================================================

/// One JSON:API resource with untyped attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericResource {
    /// Resource id
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// Resource type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Attributes, keyed by name
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: JsonObject,
    /// Relationships, keyed by name
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: BTreeMap<String, Relationship>,
    /// Resource links
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: JsonObject,
    /// Resource meta
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: JsonObject,
}

impl GenericResource {
    /// Create an empty resource of the given type
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    /// Raw attribute value
    pub fn get_attribute(&self, key: &str) -> Option<&JsonValue> {
        self.attributes.get(key)
    }

    /// Attribute converted to `T`; `None` when absent, null or of another shape
    pub fn attribute<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Attribute converted to `T`, or `default`
    pub fn attribute_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.attribute(key).unwrap_or(default)
    }

    /// Set an attribute, returning the previous value
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Option<JsonValue> {
        self.attributes.insert(key.into(), value.into())
    }

    /// Named relationship
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    /// Ids linked by a relationship (empty when absent)
    pub fn related_ids(&self, name: &str) -> Vec<&str> {
        self.relationship(name)
            .map(|r| r.identifiers().into_iter().map(|i| i.id.as_str()).collect())
            .unwrap_or_default()
    }

    /// Identifier of this resource
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier {
            resource_type: self.resource_type.clone(),
            id: self.id.clone(),
        }
    }

    /// Create/update request body carrying this resource's attributes
    pub fn to_request_body(&self) -> JsonValue {
        let id = (!self.id.is_empty()).then_some(self.id.as_str());
        jsonapi_body(&self.resource_type, id, self.attributes.clone())
    }
}

/// Build a `{"data": {"type", "id"?, "attributes"}}` request body
pub fn jsonapi_body(resource_type: &str, id: Option<&str>, attributes: JsonObject) -> JsonValue {
    let mut data = JsonObject::new();
    data.insert("type".to_string(), JsonValue::from(resource_type));
    if let Some(id) = id {
        data.insert("id".to_string(), JsonValue::from(id));
    }
    data.insert("attributes".to_string(), JsonValue::Object(attributes));
    serde_json::json!({ "data": data })
}

// ============================================================================
// Collection
// ============================================================================

/// Pagination links of a collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(rename = "self", default, deserialize_with = "link_href")]
    pub self_link: Option<String>,
    #[serde(default, deserialize_with = "link_href")]
    pub first: Option<String>,
    #[serde(default, deserialize_with = "link_href")]
    pub last: Option<String>,
    #[serde(default, deserialize_with = "link_href")]
    pub prev: Option<String>,
    #[serde(default, deserialize_with = "link_href")]
    pub next: Option<String>,
}

/// One page of resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericCollection {
    /// Primary resources, in server order
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<GenericResource>,
    /// Side-loaded related resources
    #[serde(default, deserialize_with = "null_as_default")]
    pub included: Vec<GenericResource>,
    /// Pagination links
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: PageLinks,
    /// Collection meta (`total_count`, `count`, `next`, ...)
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: JsonObject,
}

impl GenericCollection {
    /// Number of primary resources on this page
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the page has no primary resources
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the server reported a next page
    pub fn has_next(&self) -> bool {
        self.links.next.as_deref().is_some_and(|n| !n.is_empty())
    }

    /// `meta.total_count`, when reported
    pub fn total_count(&self) -> Option<u64> {
        self.meta.get("total_count").and_then(Value::as_u64)
    }

    /// Look up a side-loaded resource
    pub fn find_included(&self, resource_type: &str, id: &str) -> Option<&GenericResource> {
        self.included
            .iter()
            .find(|r| r.resource_type == resource_type && r.id == id)
    }

    /// Iterate primary resources
    pub fn iter(&self) -> std::slice::Iter<'_, GenericResource> {
        self.data.iter()
    }
}

impl IntoIterator for GenericCollection {
    type Item = GenericResource;
    type IntoIter = std::vec::IntoIter<GenericResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

// ============================================================================
// Document
// ============================================================================

/// A decoded JSON:API response document
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// `data` was an object
    Resource(GenericResource),
    /// `data` was an array
    Collection(GenericCollection),
}

impl Document {
    /// Decode a parsed response body
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let JsonValue::Object(mut body) = value else {
            return Err(Error::decode("response body is not a JSON object"));
        };

        match body.get("data") {
            Some(JsonValue::Object(_)) => {
                let data = body.remove("data").unwrap_or_default();
                Ok(Self::Resource(serde_json::from_value(data)?))
            }
            Some(JsonValue::Array(_)) => Ok(Self::Collection(serde_json::from_value(
                JsonValue::Object(body),
            )?)),
            Some(other) => Err(Error::decode(format!(
                "`data` must be an object or an array, got {other}"
            ))),
            None => Err(Error::decode("response has no `data` member")),
        }
    }

    /// Kind of document, for messages
    pub fn kind(&self) -> &'static str {
        match self {
            Document::Resource(_) => "resource",
            Document::Collection(_) => "collection",
        }
    }

    /// Single resource, if this is one
    pub fn as_resource(&self) -> Option<&GenericResource> {
        match self {
            Document::Resource(r) => Some(r),
            Document::Collection(_) => None,
        }
    }

    /// Collection, if this is one
    pub fn as_collection(&self) -> Option<&GenericCollection> {
        match self {
            Document::Collection(c) => Some(c),
            Document::Resource(_) => None,
        }
    }

    /// Unwrap a single resource
    pub fn into_resource(self) -> Result<GenericResource> {
        match self {
            Document::Resource(r) => Ok(r),
            other => Err(Error::UnexpectedDocument {
                expected: "resource",
                actual: other.kind(),
            }),
        }
    }

    /// Unwrap a collection
    pub fn into_collection(self) -> Result<GenericCollection> {
        match self {
            Document::Collection(c) => Ok(c),
            other => Err(Error::UnexpectedDocument {
                expected: "collection",
                actual: other.kind(),
            }),
        }
    }
}

// ============================================================================
// Query Options
// ============================================================================

/// Query parameters for resource requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Page size (clamped to the client's maximum)
    pub per_page: Option<u32>,
    /// Offset of the first record
    pub offset: Option<u32>,
    /// Relationships to side-load
    pub include: Vec<String>,
    /// `where[key]=value` filters, values already comma-joined
    pub filters: Vec<(String, String)>,
    /// Sort expression, sent as `order`
    pub sort: Option<String>,
    /// Extra parameters sent verbatim
    pub extra: QueryParams,
}

impl QueryOptions {
    /// Create empty query options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Set offset
    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Side-load a relationship
    #[must_use]
    pub fn include(mut self, relationship: impl Into<String>) -> Self {
        self.include.push(relationship.into());
        self
    }

    /// Filter on one value
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    /// Filter on any of several values (sent comma-joined)
    #[must_use]
    pub fn filter_any<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.filters.push((key.into(), joined));
        self
    }

    /// Set sort order
    #[must_use]
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Add a raw query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Encode into wire parameters
    pub fn to_params(&self, max_per_page: u32) -> QueryParams {
        let mut params = QueryParams::new();

        if let Some(per_page) = self.per_page {
            params.push(("per_page".to_string(), per_page.min(max_per_page).to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if !self.include.is_empty() {
            params.push(("include".to_string(), self.include.join(",")));
        }
        for (key, value) in &self.filters {
            params.push((format!("where[{key}]"), value.clone()));
        }
        if let Some(sort) = &self.sort {
            params.push(("order".to_string(), sort.clone()));
        }
        params.extend(self.extra.iter().cloned());

        params
    }
}

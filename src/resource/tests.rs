//! Tests for the resource module

use super::*;
use crate::auth::Credentials;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(base_url: &str) -> ResourceClient {
    let config = HttpClientConfig::builder().no_rate_limit().build();
    let http = HttpClient::new(config, Credentials::bearer("test-token")).unwrap();
    ResourceClient::new(http, base_url).unwrap()
}

fn person_json(id: &str, first_name: &str) -> serde_json::Value {
    json!({
        "type": "Person",
        "id": id,
        "attributes": {"first_name": first_name, "child": false, "grade": null},
        "relationships": {
            "primary_campus": {"data": {"type": "Campus", "id": "9"}},
            "households": {"data": [{"type": "Household", "id": "3"}, {"type": "Household", "id": "4"}]},
            "gender": {"data": null}
        },
        "links": {"self": format!("https://api.example.com/people/v2/people/{id}")}
    })
}

// ============================================================================
// Document Decoding Tests
// ============================================================================

#[test]
fn test_decode_single_resource() {
    let doc = Document::from_value(json!({"data": person_json("1", "Ada")})).unwrap();
    assert_eq!(doc.kind(), "resource");

    let person = doc.into_resource().unwrap();
    assert_eq!(person.id, "1");
    assert_eq!(person.resource_type, "Person");
    assert_eq!(person.attribute::<String>("first_name").as_deref(), Some("Ada"));
    assert_eq!(person.related_ids("primary_campus"), vec!["9"]);
    assert_eq!(person.related_ids("households"), vec!["3", "4"]);
    assert!(person.related_ids("gender").is_empty());
    assert!(person.related_ids("missing").is_empty());
}

#[test]
fn test_decode_collection_with_included_and_links() {
    let doc = Document::from_value(json!({
        "data": [person_json("1", "Ada"), person_json("2", "Grace")],
        "included": [{"type": "Campus", "id": "9", "attributes": {"name": "Main"}}],
        "links": {"self": "https://x/people?offset=0", "next": "https://x/people?offset=2"},
        "meta": {"total_count": 5, "count": 2}
    }))
    .unwrap();

    let page = doc.into_collection().unwrap();
    assert_eq!(page.len(), 2);
    assert!(page.has_next());
    assert_eq!(page.total_count(), Some(5));
    assert_eq!(page.links.self_link.as_deref(), Some("https://x/people?offset=0"));

    let campus = page.find_included("Campus", "9").unwrap();
    assert_eq!(campus.attribute::<String>("name").as_deref(), Some("Main"));
    assert!(page.find_included("Campus", "10").is_none());

    let names: Vec<String> = page
        .iter()
        .filter_map(|p| p.attribute::<String>("first_name"))
        .collect();
    assert_eq!(names, vec!["Ada", "Grace"]);
}

#[test]
fn test_decode_tolerates_nulls_and_numeric_ids() {
    let doc = Document::from_value(json!({
        "data": [{"type": "Tag", "id": 42, "attributes": null, "relationships": null}],
        "included": null,
        "links": {"next": {"href": "https://x/tags?offset=1"}},
        "meta": null
    }))
    .unwrap();

    let page = doc.into_collection().unwrap();
    assert_eq!(page.data[0].id, "42");
    assert!(page.data[0].attributes.is_empty());
    assert!(page.included.is_empty());
    assert_eq!(page.links.next.as_deref(), Some("https://x/tags?offset=1"));
}

#[test]
fn test_decode_rejects_malformed_documents() {
    assert!(matches!(
        Document::from_value(json!([1, 2])).unwrap_err(),
        Error::Decode { .. }
    ));
    assert!(matches!(
        Document::from_value(json!({"meta": {}})).unwrap_err(),
        Error::Decode { .. }
    ));
    assert!(matches!(
        Document::from_value(json!({"data": "nope"})).unwrap_err(),
        Error::Decode { .. }
    ));
}

#[test]
fn test_unexpected_document_kind() {
    let doc = Document::from_value(json!({"data": []})).unwrap();
    let err = doc.into_resource().unwrap_err();
    assert!(matches!(
        err,
        Error::UnexpectedDocument {
            expected: "resource",
            actual: "collection"
        }
    ));
}

// ============================================================================
// Attribute Tests
// ============================================================================

#[test]
fn test_attribute_access() {
    let mut person: GenericResource = serde_json::from_value(person_json("1", "Ada")).unwrap();

    assert_eq!(person.get_attribute("first_name"), Some(&json!("Ada")));
    assert_eq!(person.attribute::<bool>("child"), Some(false));
    assert_eq!(person.attribute::<u32>("grade"), None);
    assert_eq!(person.attribute_or("grade", 7u32), 7);
    assert_eq!(person.attribute_or("first_name", 0u32), 0);

    let previous = person.set_attribute("first_name", "Augusta");
    assert_eq!(previous, Some(json!("Ada")));
    assert_eq!(person.attribute::<String>("first_name").as_deref(), Some("Augusta"));
}

#[test]
fn test_request_body() {
    let mut person = GenericResource::new("Person", "");
    person.set_attribute("first_name", "Ada");

    assert_eq!(
        person.to_request_body(),
        json!({"data": {"type": "Person", "attributes": {"first_name": "Ada"}}})
    );

    let mut attrs = crate::types::JsonObject::new();
    attrs.insert("name".into(), json!("Youth"));
    assert_eq!(
        jsonapi_body("Group", Some("5"), attrs),
        json!({"data": {"type": "Group", "id": "5", "attributes": {"name": "Youth"}}})
    );
}

// ============================================================================
// Query Encoding Tests
// ============================================================================

#[test]
fn test_query_options_encoding() {
    let options = QueryOptions::new()
        .per_page(50)
        .offset(100)
        .include("emails")
        .include("addresses")
        .filter("first_name", "Ada")
        .filter_any("id", ["1", "2", "3"])
        .sort("-created_at")
        .param("fields[Person]", "first_name");

    assert_eq!(
        options.to_params(100),
        vec![
            ("per_page".to_string(), "50".to_string()),
            ("offset".to_string(), "100".to_string()),
            ("include".to_string(), "emails,addresses".to_string()),
            ("where[first_name]".to_string(), "Ada".to_string()),
            ("where[id]".to_string(), "1,2,3".to_string()),
            ("order".to_string(), "-created_at".to_string()),
            ("fields[Person]".to_string(), "first_name".to_string()),
        ]
    );
}

#[test_case(10, 100, "10" ; "below max")]
#[test_case(100, 100, "100" ; "at max")]
#[test_case(500, 100, "100" ; "clamped to max")]
fn test_per_page_clamp(requested: u32, max: u32, expected: &str) {
    let params = QueryOptions::new().per_page(requested).to_params(max);
    assert_eq!(params, vec![("per_page".to_string(), expected.to_string())]);
}

#[test]
fn test_empty_options_send_nothing() {
    assert!(QueryOptions::new().to_params(100).is_empty());
}

// ============================================================================
// URL Tests
// ============================================================================

#[test_case("https://api.example.com", "people", "people", None, "https://api.example.com/people/v2/people" ; "collection")]
#[test_case("https://api.example.com/", "people", "people", Some("7"), "https://api.example.com/people/v2/people/7" ; "member")]
#[test_case("https://api.example.com/api/", "services", "service_types/1/plans", None, "https://api.example.com/api/services/v2/service_types/1/plans" ; "nested endpoint")]
#[test_case("https://api.example.com", "people", "people", Some("a/b"), "https://api.example.com/people/v2/people/a%2Fb" ; "id is one segment")]
fn test_resource_url(base: &str, product: &str, endpoint: &str, id: Option<&str>, expected: &str) {
    let client = client_for(base);
    assert_eq!(client.resource_url(product, endpoint, id).unwrap(), expected);
}

#[test]
fn test_api_version_and_page_limits() {
    let client = client_for("https://api.example.com")
        .with_api_version("2023-01-01")
        .with_page_limits(500, 50);

    assert_eq!(
        client.resource_url("people", "people", None).unwrap(),
        "https://api.example.com/people/2023-01-01/people"
    );
    assert_eq!(client.max_per_page(), 50);
    assert_eq!(client.effective_per_page(None), 50);
    assert_eq!(client.effective_per_page(Some(10)), 10);
    assert_eq!(client.effective_per_page(Some(0)), 1);
}

#[test]
fn test_invalid_base_url() {
    let config = HttpClientConfig::default();
    let http = HttpClient::new(config, Credentials::bearer("t")).unwrap();
    assert!(matches!(
        ResourceClient::new(http, "not a url").unwrap_err(),
        Error::InvalidUrl(_)
    ));
}

// ============================================================================
// CRUD Tests
// ============================================================================

#[tokio::test]
async fn test_get_member() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/people/v2/people/1"))
        .and(query_param("include", "emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": person_json("1", "Ada")})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let person = client
        .get("people", "people", Some("1"), &QueryOptions::new().include("emails"))
        .await
        .unwrap()
        .into_resource()
        .unwrap();

    assert_eq!(person.attribute::<String>("first_name").as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_get_collection_with_filters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/people/v2/people"))
        .and(query_param("where[last_name]", "Lovelace"))
        .and(query_param("order", "first_name"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [person_json("1", "Ada")],
            "links": {},
            "meta": {"total_count": 1}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let options = QueryOptions::new()
        .filter("last_name", "Lovelace")
        .sort("first_name")
        .per_page(1000);
    let page = client
        .get("people", "people", None, &options)
        .await
        .unwrap()
        .into_collection()
        .unwrap();

    assert_eq!(page.len(), 1);
    assert!(!page.has_next());
}

#[tokio::test]
async fn test_create_and_update() {
    let mock_server = MockServer::start().await;
    let body = jsonapi_body("Person", None, {
        let mut attrs = crate::types::JsonObject::new();
        attrs.insert("first_name".into(), json!("Ada"));
        attrs
    });

    Mock::given(method("POST"))
        .and(path("/people/v2/people"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": person_json("10", "Ada")})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/people/v2/people/10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": person_json("10", "Augusta")})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());

    let created = client
        .create("people", "people", body, &QueryOptions::new())
        .await
        .unwrap()
        .into_resource()
        .unwrap();
    assert_eq!(created.id, "10");

    let mut changed = created.clone();
    changed.set_attribute("first_name", "Augusta");
    let updated = client
        .update("people", "people", &created.id, changed.to_request_body(), &QueryOptions::new())
        .await
        .unwrap()
        .into_resource()
        .unwrap();
    assert_eq!(updated.attribute::<String>("first_name").as_deref(), Some("Augusta"));
}

#[tokio::test]
async fn test_create_validation_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/people/v2/people"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [{"status": "422", "title": "Unprocessable", "detail": "First name can't be blank"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let err = client
        .create("people", "people", json!({"data": {}}), &QueryOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.details().unwrap().message, "First name can't be blank");
}

#[tokio::test]
async fn test_delete() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/people/v2/people/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/people/v2/people/2"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/people/v2/people/3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    assert!(client.delete("people", "people", "1").await.unwrap());
    assert!(!client.delete("people", "people", "2").await.unwrap());
    assert!(matches!(
        client.delete("people", "people", "3").await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn test_empty_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/people/v2/people/1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let err = client
        .update("people", "people", "1", json!({"data": {}}), &QueryOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
}

#[tokio::test]
async fn test_update_no_content_returns_submitted_resource() {
    let mock_server = MockServer::start().await;
    let body = json!({"data": {"type": "Person", "attributes": {"first_name": "Grace"}}});

    Mock::given(method("PATCH"))
        .and(path("/people/v2/people/1"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let person = client
        .update("people", "people", "1", body, &QueryOptions::new())
        .await
        .unwrap()
        .into_resource()
        .unwrap();

    assert_eq!(person.id, "1");
    assert_eq!(person.resource_type, "Person");
    assert_eq!(person.attribute::<String>("first_name").as_deref(), Some("Grace"));
}

#[tokio::test]
async fn test_create_no_content_returns_submitted_resource() {
    let mock_server = MockServer::start().await;
    let body = json!({"data": {"type": "Person", "id": "client-7", "attributes": {"first_name": "Ada"}}});

    Mock::given(method("POST"))
        .and(path("/people/v2/people"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let person = client
        .create("people", "people", body, &QueryOptions::new())
        .await
        .unwrap()
        .into_resource()
        .unwrap();

    assert_eq!(person.id, "client-7");
    assert_eq!(person.attribute::<String>("first_name").as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_no_content_with_unusable_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/people/v2/people/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let err = client
        .update("people", "people", "1", json!({"attributes": {}}), &QueryOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
}

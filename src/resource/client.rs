//! Generic resource client
//!
//! One code path for every product and resource kind: build the URL and
//! query, run the request through the engine, decode the JSON:API document.

use super::types::{Document, QueryOptions};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RawResponse, RequestConfig};
use crate::types::{JsonValue, Method};
use tracing::debug;
use url::Url;

/// Default API version segment
pub const DEFAULT_API_VERSION: &str = "v2";

/// Default page size when paginating
pub const DEFAULT_PER_PAGE: u32 = 25;

/// Largest page size the server accepts
pub const MAX_PER_PAGE: u32 = 100;

/// CRUD client over `{base_url}/{product}/{api_version}/{endpoint}[/{id}]`
#[derive(Debug)]
pub struct ResourceClient {
    http: HttpClient,
    base_url: Url,
    api_version: String,
    default_per_page: u32,
    max_per_page: u32,
}

impl ResourceClient {
    /// Create a client with default API version and page limits
    pub fn new(http: HttpClient, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "base_url '{base_url}' cannot be used as a base URL"
            )));
        }

        Ok(Self {
            http,
            base_url,
            api_version: DEFAULT_API_VERSION.to_string(),
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
        })
    }

    /// Build the whole stack from configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::new(config.http_config(), config.credentials.clone())?;
        Ok(Self::new(http, &config.base_url)?
            .with_api_version(config.api_version.clone())
            .with_page_limits(config.default_per_page, config.max_per_page))
    }

    /// Set the API version segment
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set default and maximum page sizes
    #[must_use]
    pub fn with_page_limits(mut self, default_per_page: u32, max_per_page: u32) -> Self {
        self.max_per_page = max_per_page.max(1);
        self.default_per_page = default_per_page.clamp(1, self.max_per_page);
        self
    }

    /// Get the request engine
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Largest page size sent to the server
    pub fn max_per_page(&self) -> u32 {
        self.max_per_page
    }

    /// Page size used for `requested`, or the default when unset
    pub fn effective_per_page(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_per_page)
            .clamp(1, self.max_per_page)
    }

    /// URL of a resource collection or member
    ///
    /// Nested endpoints such as `people/1/emails` are split into segments;
    /// the id is always a single percent-encoded segment.
    pub fn resource_url(&self, product: &str, endpoint: &str, id: Option<&str>) -> Result<String> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::config("base_url cannot be used as a base URL"))?;
            segments.pop_if_empty();
            segments.extend(product.split('/').filter(|s| !s.is_empty()));
            segments.push(&self.api_version);
            segments.extend(endpoint.split('/').filter(|s| !s.is_empty()));
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url.into())
    }

    /// Fetch a member (with `id`) or a collection (without)
    pub async fn get(
        &self,
        product: &str,
        endpoint: &str,
        id: Option<&str>,
        options: &QueryOptions,
    ) -> Result<Document> {
        let url = self.resource_url(product, endpoint, id)?;
        let response = self
            .http
            .execute(Method::GET, &url, self.request_config(options))
            .await?;
        decode_document(&response)
    }

    /// Create a resource; `body` is a `{"data": {...}}` document
    ///
    /// A 204 reply carries no document, so the submitted resource is returned.
    pub async fn create(
        &self,
        product: &str,
        endpoint: &str,
        body: JsonValue,
        options: &QueryOptions,
    ) -> Result<Document> {
        let url = self.resource_url(product, endpoint, None)?;
        let response = self
            .http
            .execute(
                Method::POST,
                &url,
                self.request_config(options).json(body.clone()),
            )
            .await?;
        if response.status == 204 {
            return submitted_document(body, None);
        }
        decode_document(&response)
    }

    /// Update a resource; `body` is a `{"data": {...}}` document
    ///
    /// A 204 reply means the server accepted the update as sent, so the
    /// submitted resource is returned with `id` filled in.
    pub async fn update(
        &self,
        product: &str,
        endpoint: &str,
        id: &str,
        body: JsonValue,
        options: &QueryOptions,
    ) -> Result<Document> {
        let url = self.resource_url(product, endpoint, Some(id))?;
        let response = self
            .http
            .execute(
                Method::PATCH,
                &url,
                self.request_config(options).json(body.clone()),
            )
            .await?;
        if response.status == 204 {
            return submitted_document(body, Some(id));
        }
        decode_document(&response)
    }

    /// Delete a resource; true when the server answered 200 or 204
    pub async fn delete(&self, product: &str, endpoint: &str, id: &str) -> Result<bool> {
        let url = self.resource_url(product, endpoint, Some(id))?;
        let response = self
            .http
            .execute(Method::DELETE, &url, RequestConfig::new())
            .await?;
        Ok(matches!(response.status, 200 | 204))
    }

    fn request_config(&self, options: &QueryOptions) -> RequestConfig {
        RequestConfig {
            query: options.to_params(self.max_per_page),
            ..Default::default()
        }
    }
}

/// Document for a 204 reply, built from the request body
fn submitted_document(body: JsonValue, id: Option<&str>) -> Result<Document> {
    let mut document = Document::from_value(body)?;
    if let (Document::Resource(resource), Some(id)) = (&mut document, id) {
        if resource.id.is_empty() {
            resource.id = id.to_string();
        }
    }
    debug!("No content; using submitted {} document", document.kind());
    Ok(document)
}

fn decode_document(response: &RawResponse) -> Result<Document> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::decode(format!(
            "empty response body (status {})",
            response.status
        )));
    }

    let body: JsonValue = response
        .json()
        .map_err(|e| Error::decode(format!("response is not valid JSON: {e}")))?;
    let document = Document::from_value(body)?;
    debug!("Decoded {} document", document.kind());
    Ok(document)
}

//! OpenSearch backend implementation.
//!
//! This module provides the concrete implementation of `SearchBackend` and
//! `SearchConnector` using the OpenSearch Rust crate. The engine API is
//! Elasticsearch-compatible, so the same backend serves either engine.

use std::sync::Arc;

use async_trait::async_trait;
use opensearch::{
    auth::Credentials as TransportCredentials,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCloseParts, IndicesCreateParts, IndicesExistsParts, IndicesOpenParts,
        IndicesPutMappingParts, IndicesPutSettingsParts,
    },
    params::Refresh,
    BulkParts, DeleteParts, GetParts, IndexParts, OpenSearch, SearchParts, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::config::SearchClientConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::{SearchBackend, SearchConnector};
use crate::types::{BulkResponse, Document, GetDocumentResponse, SearchResponse};

fn refresh_param(refresh: bool) -> Refresh {
    if refresh {
        Refresh::True
    } else {
        Refresh::False
    }
}

/// Any failure to get a response at all means the transport is unusable.
fn transport_error(e: opensearch::Error) -> SearchIndexError {
    SearchIndexError::connection(e.to_string())
}

/// Turn a non-success response into an error built by `make`, logging the body.
async fn ensure_success(
    response: Response,
    operation: &str,
    make: fn(String) -> SearchIndexError,
) -> Result<Response, SearchIndexError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }
    let error_body = response.text().await.unwrap_or_default();
    error!(status = %status, body = %error_body, operation = %operation, "Search engine request failed");
    Err(make(format!(
        "{} failed with status {}: {}",
        operation, status, error_body
    )))
}

/// OpenSearch backend implementation.
///
/// Wraps one `OpenSearch` client; the underlying transport pools and multiplexes
/// HTTP connections, so a single backend is shared by all concurrent operations.
pub struct OpenSearchBackend {
    client: OpenSearch,
}

impl OpenSearchBackend {
    /// Create a new OpenSearch backend for the configured endpoint.
    ///
    /// No request is sent here; use `ping` to verify the engine is reachable.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint, credentials and request timeout
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchBackend)` - A new backend instance
    /// * `Err(SearchIndexError::ConfigurationError)` - If host or port is missing
    /// * `Err(SearchIndexError::ConnectionError)` - If the transport cannot be built
    pub fn new(config: &SearchClientConfig) -> Result<Self, SearchIndexError> {
        let url = config.endpoint()?;

        let conn_pool = SingleNodeConnectionPool::new(url.clone());
        let mut builder = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(config.request_timeout);

        if let Some(credentials) = &config.credentials {
            builder = builder.auth(TransportCredentials::Basic(
                credentials.username.clone(),
                credentials.password.clone(),
            ));
        }

        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        info!(
            url = %url,
            authenticated = config.credentials.is_some(),
            request_timeout_secs = config.request_timeout.as_secs(),
            "Created OpenSearch backend"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }
}

#[async_trait]
impl SearchBackend for OpenSearchBackend {
    async fn ping(&self) -> Result<(), SearchIndexError> {
        let response = self.client.ping().send().await.map_err(transport_error)?;
        ensure_success(response, "Ping", SearchIndexError::ConnectionError).await?;
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchIndexError::operation(format!(
                "Index existence check for {} returned status {}",
                index, status
            ))),
        }
    }

    async fn create_index(
        &self,
        index: &str,
        mapping: &Value,
        settings: &Value,
    ) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(json!({
                "settings": settings,
                "mappings": mapping
            }))
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "Create index", SearchIndexError::IndexCreationError).await?;
        debug!(index = %index, "Index created");
        Ok(())
    }

    async fn close_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .close(IndicesCloseParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "Close index", SearchIndexError::IndexUpdateError).await?;
        Ok(())
    }

    async fn open_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .open(IndicesOpenParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "Open index", SearchIndexError::IndexUpdateError).await?;
        Ok(())
    }

    async fn put_settings(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[index]))
            .body(settings)
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "Put settings", SearchIndexError::IndexUpdateError).await?;
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping)
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "Put mapping", SearchIndexError::IndexUpdateError).await?;
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
        refresh: bool,
    ) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .index(IndexParts::IndexId(index, id))
            .body(document)
            .refresh(refresh_param(refresh))
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "Index document", SearchIndexError::IndexError).await?;
        debug!(index = %index, doc_id = %id, "Document indexed");
        Ok(())
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        fields: &Value,
        refresh: bool,
    ) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .update(UpdateParts::IndexId(index, id))
            .body(json!({ "doc": fields }))
            .refresh(refresh_param(refresh))
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "Update document", SearchIndexError::IndexError).await?;
        debug!(index = %index, doc_id = %id, "Document fields updated");
        Ok(())
    }

    async fn delete_document(
        &self,
        index: &str,
        id: &str,
        refresh: bool,
    ) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .refresh(refresh_param(refresh))
            .send()
            .await
            .map_err(transport_error)?;

        // 404 is acceptable - document may not exist
        if response.status_code().as_u16() == 404 {
            return Ok(false);
        }

        ensure_success(response, "Delete document", SearchIndexError::IndexError).await?;
        debug!(index = %index, doc_id = %id, "Document deleted");
        Ok(true)
    }

    async fn bulk(
        &self,
        operations: Vec<Value>,
        refresh: bool,
    ) -> Result<BulkResponse, SearchIndexError> {
        let body: Vec<JsonBody<Value>> = operations.into_iter().map(JsonBody::new).collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .refresh(refresh_param(refresh))
            .send()
            .await
            .map_err(transport_error)?;

        let response = ensure_success(response, "Bulk", SearchIndexError::BulkIndexError).await?;
        response
            .json::<BulkResponse>()
            .await
            .map_err(|e| SearchIndexError::parse(format!("Invalid bulk response: {}", e)))
    }

    async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<Document>, SearchIndexError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }

        let response = ensure_success(response, "Get document", SearchIndexError::OperationError).await?;
        let body = response
            .json::<GetDocumentResponse>()
            .await
            .map_err(|e| SearchIndexError::parse(format!("Invalid get response: {}", e)))?;
        Ok(body.into_document())
    }

    async fn search(&self, index: &str, query: &Value) -> Result<SearchResponse, SearchIndexError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(json!({ "query": query }))
            .send()
            .await
            .map_err(transport_error)?;

        let response = ensure_success(response, "Search", SearchIndexError::OperationError).await?;
        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| SearchIndexError::parse(format!("Invalid search response: {}", e)))
    }
}

/// Connector that opens `OpenSearchBackend` connections.
#[derive(Debug, Clone, Default)]
pub struct OpenSearchConnector;

impl OpenSearchConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchConnector for OpenSearchConnector {
    async fn connect(
        &self,
        config: &SearchClientConfig,
    ) -> Result<Arc<dyn SearchBackend>, SearchIndexError> {
        Ok(Arc::new(OpenSearchBackend::new(config)?))
    }
}

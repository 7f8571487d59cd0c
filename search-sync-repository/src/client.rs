//! Search client implementation.
//!
//! `SearchClient` is the single owner of the search engine connection. Every
//! engine call made by the sync layer goes through it.
//!
//! # Failure policy
//!
//! Startup paths (`initialize`, `connect`, `initialize_indices`) and read paths
//! (`get`, `search`) return `SearchIndexError`. Per-document write paths
//! (`add_document`, `update_fields`, `delete_document`, `bulk_update`) never
//! do: they log the failure with its context and return `false`, so an engine
//! outage cannot fail the primary-store write that triggered them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::SearchClientConfig;
use crate::errors::SearchIndexError;
use crate::indices::IndexDefinition;
use crate::interfaces::{SearchBackend, SearchConnector};
use crate::types::{ConnectionState, Document, HealthStatus, SearchResponse};
use crate::utils::build_bulk_operations;

struct Connection {
    state: ConnectionState,
    backend: Option<Arc<dyn SearchBackend>>,
}

/// The search client shared by the whole process.
///
/// Construct it once and share it behind an `Arc`. Construction performs no
/// I/O; the first call to `initialize` (or to any operation, through
/// `ensure_connection`) connects and provisions every declared index.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use search_sync_repository::{
///     CustomerIndex, IndexDefinition, OpenSearchConnector, SearchClient, SearchClientConfig,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SearchClientConfig::from_env();
/// let customers: Arc<dyn IndexDefinition> = Arc::new(CustomerIndex::new(config.index_prefix.clone()));
/// let client = SearchClient::new(config, Arc::new(OpenSearchConnector::new()), vec![customers]);
///
/// client.initialize().await?;
/// let healthy = client.health_check().await.connected;
/// # Ok(())
/// # }
/// ```
pub struct SearchClient {
    config: SearchClientConfig,
    connector: Arc<dyn SearchConnector>,
    indices: Vec<Arc<dyn IndexDefinition>>,
    connection: RwLock<Connection>,
    init_lock: Mutex<()>,
    initialized: AtomicBool,
}

impl SearchClient {
    /// Create a client for the given engine and index definitions.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint, credentials, retry budget and bulk batch size
    /// * `connector` - Opens engine connections (e.g., `OpenSearchConnector`)
    /// * `indices` - Every index this process provisions at startup
    pub fn new(
        config: SearchClientConfig,
        connector: Arc<dyn SearchConnector>,
        indices: Vec<Arc<dyn IndexDefinition>>,
    ) -> Self {
        Self {
            config,
            connector,
            indices,
            connection: RwLock::new(Connection {
                state: ConnectionState::Uninitialized,
                backend: None,
            }),
            init_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SearchClientConfig {
        &self.config
    }

    /// Whether `initialize` has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.connection.read().await.state
    }

    async fn current_backend(&self) -> Option<Arc<dyn SearchBackend>> {
        self.connection.read().await.backend.clone()
    }

    async fn set_state(&self, state: ConnectionState, backend: Option<Arc<dyn SearchBackend>>) {
        let mut connection = self.connection.write().await;
        connection.state = state;
        connection.backend = backend;
    }

    /// Drop the connection after a transport failure so the next call reconnects.
    async fn handle_failure(&self, err: &SearchIndexError) {
        if err.is_connection_error() {
            warn!(error = %err, "Search engine connection lost, will reconnect on next call");
            self.set_state(ConnectionState::Disconnected, None).await;
        }
    }

    /// Connect and provision every declared index, once.
    ///
    /// Concurrent callers wait for the first one; once it succeeds the others
    /// return immediately. After a failure the next call tries again.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the client is connected and every index is provisioned
    /// * `Err(SearchIndexError::ConfigurationError)` - If host or port is missing
    /// * `Err(SearchIndexError::ConnectionError)` - If the retry budget ran out
    /// * `Err(SearchIndexError)` - If an index could not be created or updated
    pub async fn initialize(&self) -> Result<(), SearchIndexError> {
        if self.is_initialized() {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        self.config.endpoint()?;
        self.connect().await?;
        self.initialize_indices().await?;

        self.initialized.store(true, Ordering::Release);
        info!(indices = self.indices.len(), "Search client initialized");
        Ok(())
    }

    /// Return a live backend, initializing or reconnecting as needed.
    pub async fn ensure_connection(&self) -> Result<Arc<dyn SearchBackend>, SearchIndexError> {
        if !self.is_initialized() {
            self.initialize().await?;
        }
        if let Some(backend) = self.current_backend().await {
            return Ok(backend);
        }

        let _guard = self.init_lock.lock().await;
        if let Some(backend) = self.current_backend().await {
            return Ok(backend);
        }
        info!("Reconnecting to search engine");
        self.connect().await
    }

    /// Open a connection with bounded retry and verify it with a ping.
    ///
    /// Makes up to `max_retries` attempts, `retry_interval` apart. A
    /// configuration error is returned at once since retrying cannot fix it.
    ///
    /// # Returns
    ///
    /// * `Ok(backend)` - The new connection, also stored on the client
    /// * `Err(SearchIndexError::ConnectionError)` - Carrying the last cause on exhaustion
    pub async fn connect(&self) -> Result<Arc<dyn SearchBackend>, SearchIndexError> {
        self.set_state(ConnectionState::Connecting, None).await;

        let max_attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.try_connect().await {
                Ok(backend) => {
                    self.set_state(ConnectionState::Connected, Some(Arc::clone(&backend)))
                        .await;
                    info!(attempt, "Connected to search engine");
                    return Ok(backend);
                }
                Err(e @ SearchIndexError::ConfigurationError(_)) => {
                    self.set_state(ConnectionState::Disconnected, None).await;
                    return Err(e);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Search engine connection attempt failed");
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.retry_interval).await;
                    }
                }
            }
        }

        self.set_state(ConnectionState::Disconnected, None).await;
        let cause = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());
        error!(max_attempts, cause = %cause, "Could not connect to search engine");
        Err(SearchIndexError::connection(format!(
            "Failed to connect after {} attempts: {}",
            max_attempts, cause
        )))
    }

    async fn try_connect(&self) -> Result<Arc<dyn SearchBackend>, SearchIndexError> {
        let backend = self.connector.connect(&self.config).await?;
        backend.ping().await?;
        Ok(backend)
    }

    /// Close the connection. The next operation reconnects without reprovisioning.
    pub async fn close(&self) {
        self.set_state(ConnectionState::Disconnected, None).await;
        info!("Search client connection closed");
    }

    /// Check whether an index exists on the current connection.
    ///
    /// Never fails: a failed probe, or no connection at all, reports `false`.
    pub async fn index_exists(&self, index: &str) -> bool {
        let Some(backend) = self.current_backend().await else {
            warn!(index = %index, "Index existence check without a connection");
            return false;
        };
        match backend.index_exists(index).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(index = %index, error = %e, "Index existence check failed");
                self.handle_failure(&e).await;
                false
            }
        }
    }

    /// Create an index with its mapping and settings. Logs and returns `false` on failure.
    pub async fn create_index(&self, index: &str, mapping: &Value, settings: &Value) -> bool {
        let Some(backend) = self.current_backend().await else {
            error!(index = %index, "Cannot create index without a connection");
            return false;
        };
        match backend.create_index(index, mapping, settings).await {
            Ok(()) => {
                info!(index = %index, "Created index");
                true
            }
            Err(e) => {
                error!(index = %index, error = %e, "Failed to create index");
                self.handle_failure(&e).await;
                false
            }
        }
    }

    /// Update the settings and mapping of an existing index.
    ///
    /// The index is closed, updated and reopened. On any failure a reopen is
    /// attempted before returning `false`, so the index is not left closed.
    pub async fn update_index(&self, index: &str, mapping: &Value, settings: &Value) -> bool {
        let Some(backend) = self.current_backend().await else {
            error!(index = %index, "Cannot update index without a connection");
            return false;
        };

        match apply_index_update(backend.as_ref(), index, mapping, settings).await {
            Ok(()) => {
                info!(index = %index, "Updated index settings and mapping");
                true
            }
            Err(e) => {
                error!(index = %index, error = %e, "Failed to update index");
                if let Err(reopen) = backend.open_index(index).await {
                    error!(index = %index, error = %reopen, "Failed to reopen index after failed update");
                }
                self.handle_failure(&e).await;
                false
            }
        }
    }

    /// Create every declared index that is absent and update every one that exists.
    ///
    /// Any failure is returned: serving without provisioned indices would turn
    /// into silent write and query failures later.
    pub async fn initialize_indices(&self) -> Result<(), SearchIndexError> {
        if self.current_backend().await.is_none() {
            return Err(SearchIndexError::connection(
                "cannot provision indices without a connection",
            ));
        }

        for definition in &self.indices {
            let index = definition.index_name()?;
            let mapping = definition.mapping();
            let settings = definition.settings();

            if self.index_exists(&index).await {
                if !self.update_index(&index, &mapping, &settings).await {
                    return Err(SearchIndexError::index_update(format!(
                        "Failed to update index {}",
                        index
                    )));
                }
            } else if !self.create_index(&index, &mapping, &settings).await {
                return Err(SearchIndexError::index_creation(format!(
                    "Failed to create index {}",
                    index
                )));
            }
        }
        Ok(())
    }

    /// Upsert a full document and refresh so it is immediately visible.
    ///
    /// # Returns
    ///
    /// `true` if the engine stored the document, `false` (with an error log) otherwise.
    pub async fn add_document(&self, index: &str, id: &str, document: &Value) -> bool {
        match self.index_document(index, id, document, true).await {
            Ok(()) => true,
            Err(e) => {
                error!(index = %index, doc_id = %id, error = %e, "Failed to index document");
                false
            }
        }
    }

    /// Merge `fields` into an existing document. Same policy as `add_document`.
    pub async fn update_fields(&self, index: &str, id: &str, fields: &Value) -> bool {
        let backend = match self.ensure_connection().await {
            Ok(backend) => backend,
            Err(e) => {
                error!(index = %index, doc_id = %id, error = %e, "Failed to update document fields");
                return false;
            }
        };
        match backend.update_document(index, id, fields, true).await {
            Ok(()) => {
                debug!(index = %index, doc_id = %id, "Updated document fields");
                true
            }
            Err(e) => {
                self.handle_failure(&e).await;
                error!(index = %index, doc_id = %id, error = %e, "Failed to update document fields");
                false
            }
        }
    }

    /// Delete a document. A document that does not exist counts as deleted.
    pub async fn delete_document(&self, index: &str, id: &str) -> bool {
        let backend = match self.ensure_connection().await {
            Ok(backend) => backend,
            Err(e) => {
                error!(index = %index, doc_id = %id, error = %e, "Failed to delete document");
                return false;
            }
        };
        match backend.delete_document(index, id, true).await {
            Ok(found) => {
                debug!(index = %index, doc_id = %id, found, "Deleted document");
                true
            }
            Err(e) => {
                self.handle_failure(&e).await;
                error!(index = %index, doc_id = %id, error = %e, "Failed to delete document");
                false
            }
        }
    }

    /// Upsert many documents with the bulk API.
    ///
    /// Documents are sent in batches of `bulk_batch_size`, each document as a
    /// doc-as-upsert pair keyed by its `id` field. A partial failure does not
    /// stop the remaining batches: every failed item is logged with its action,
    /// id, status and error, followed by a summary with the index, total count
    /// and failed count. A document without a usable `id` is logged with its
    /// position and counted as failed; the rest of its batch is still sent.
    ///
    /// # Returns
    ///
    /// `true` only if every document was applied.
    pub async fn bulk_update(&self, index: &str, documents: &[Value]) -> bool {
        if documents.is_empty() {
            debug!(index = %index, "Bulk update with no documents");
            return true;
        }

        let backend = match self.ensure_connection().await {
            Ok(backend) => backend,
            Err(e) => {
                error!(index = %index, total = documents.len(), error = %e, "Failed to bulk update documents");
                return false;
            }
        };

        let batch_size = self.config.bulk_batch_size.max(1);
        let mut failed = 0usize;
        for (batch, chunk) in documents.chunks(batch_size).enumerate() {
            let request = build_bulk_operations(index, chunk);
            for (position, e) in &request.rejected {
                error!(
                    index = %index,
                    batch,
                    position = batch * batch_size + position,
                    action = "update",
                    error = %e,
                    "Bulk item rejected"
                );
            }
            failed += request.rejected.len();
            if request.is_empty() {
                continue;
            }
            let sent = request.len();

            match backend.bulk(request.operations, true).await {
                Ok(response) => {
                    for failure in response.failures() {
                        error!(
                            index = %index,
                            action = %failure.action,
                            doc_id = ?failure.id,
                            status = failure.status,
                            error = %failure.error,
                            "Bulk item failed"
                        );
                        failed += 1;
                    }
                }
                Err(e) => {
                    error!(index = %index, batch, error = %e, "Bulk request failed");
                    failed += sent;
                    self.handle_failure(&e).await;
                    if e.is_connection_error() {
                        let attempted = (batch + 1) * batch_size;
                        failed += documents.len().saturating_sub(attempted);
                        break;
                    }
                }
            }
        }

        if failed > 0 {
            error!(index = %index, total = documents.len(), failed, "Bulk update completed with failures");
            return false;
        }
        info!(index = %index, total = documents.len(), "Bulk update completed");
        true
    }

    /// Write a full document, returning the failure instead of logging it.
    ///
    /// For callers that need to know why a write failed, such as a reindex job.
    pub async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
        refresh: bool,
    ) -> Result<(), SearchIndexError> {
        let backend = self.ensure_connection().await?;
        match backend.index_document(index, id, document, refresh).await {
            Ok(()) => {
                debug!(index = %index, doc_id = %id, "Indexed document");
                Ok(())
            }
            Err(e) => {
                self.handle_failure(&e).await;
                Err(e)
            }
        }
    }

    /// Run a query against an index.
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResponse)` - The matching hits
    /// * `Err(SearchIndexError::OperationError)` - If the engine rejected or failed the query
    pub async fn search(&self, index: &str, query: &Value) -> Result<SearchResponse, SearchIndexError> {
        let backend = self.ensure_connection().await?;
        match backend.search(index, query).await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.handle_failure(&e).await;
                error!(index = %index, error = %e, "Failed to search documents");
                Err(read_error("Failed to search documents", e))
            }
        }
    }

    /// Fetch a document by id.
    ///
    /// # Returns
    ///
    /// * `Ok(Document)` - The stored document
    /// * `Err(SearchIndexError::DocumentNotFound)` - If no document has that id
    /// * `Err(SearchIndexError::OperationError)` - If the engine call failed
    pub async fn get(&self, index: &str, id: &str) -> Result<Document, SearchIndexError> {
        let backend = self.ensure_connection().await?;
        match backend.get_document(index, id).await {
            Ok(Some(document)) => Ok(document),
            Ok(None) => Err(SearchIndexError::document_not_found(index, id)),
            Err(e) => {
                self.handle_failure(&e).await;
                error!(index = %index, doc_id = %id, error = %e, "Failed to get document");
                Err(read_error("Failed to get document", e))
            }
        }
    }

    /// Report whether the engine answers on the current connection.
    ///
    /// Does not connect; an uninitialized or closed client is unhealthy.
    pub async fn health_check(&self) -> HealthStatus {
        let Some(backend) = self.current_backend().await else {
            return HealthStatus::unhealthy();
        };
        match backend.ping().await {
            Ok(()) => HealthStatus::healthy(),
            Err(e) => {
                warn!(error = %e, "Search engine health check failed");
                self.handle_failure(&e).await;
                HealthStatus::unhealthy()
            }
        }
    }
}

async fn apply_index_update(
    backend: &dyn SearchBackend,
    index: &str,
    mapping: &Value,
    settings: &Value,
) -> Result<(), SearchIndexError> {
    backend.close_index(index).await?;
    backend.put_settings(index, settings).await?;
    backend.put_mapping(index, mapping).await?;
    backend.open_index(index).await
}

fn read_error(context: &str, err: SearchIndexError) -> SearchIndexError {
    match err {
        SearchIndexError::OperationError(_) | SearchIndexError::DocumentNotFound(_) => err,
        other => SearchIndexError::operation(format!("{}: {}", context, other)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use search_sync_shared::Customer;
    use serde_json::json;

    use super::*;
    use crate::indices::{CustomerIndex, DocumentProjector};
    use crate::inmem::{BackendOperation, InMemoryConnector, InMemorySearchBackend};

    const INDEX: &str = "test_customers";

    struct Fixture {
        client: Arc<SearchClient>,
        backend: Arc<InMemorySearchBackend>,
        connector: Arc<InMemoryConnector>,
        customers: Arc<CustomerIndex>,
    }

    fn fixture_with(config: SearchClientConfig) -> Fixture {
        let backend = Arc::new(InMemorySearchBackend::new());
        let connector = Arc::new(InMemoryConnector::new(Arc::clone(&backend)));
        let customers = Arc::new(CustomerIndex::new("test"));
        let definitions: Vec<Arc<dyn IndexDefinition>> = vec![customers.clone()];
        let client = Arc::new(SearchClient::new(config, connector.clone(), definitions));
        Fixture {
            client,
            backend,
            connector,
            customers,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            SearchClientConfig::new("localhost", 9200)
                .with_index_prefix("test")
                .with_retry(3, Duration::from_millis(1)),
        )
    }

    fn customer(id: i64, email: &str) -> Customer {
        let mut customer = Customer::new(id, email);
        customer.first_name = "Ada".to_string();
        customer.last_name = "Lovelace".to_string();
        customer.country = "GB".to_string();
        customer.created_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        customer.updated_at = customer.created_at;
        customer
    }

    #[tokio::test]
    async fn test_initialize_requires_endpoint() {
        let fx = fixture_with(SearchClientConfig::default());

        let result = fx.client.initialize().await;

        assert!(matches!(result, Err(SearchIndexError::ConfigurationError(_))));
        assert!(!fx.client.is_initialized());
        assert_eq!(fx.connector.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_initialize_provisions_indices() {
        let fx = fixture();

        fx.client.initialize().await.unwrap();

        assert_eq!(fx.client.state().await, ConnectionState::Connected);
        assert_eq!(fx.backend.index_names(), vec![INDEX.to_string()]);
        let snapshot = fx.backend.index_snapshot(INDEX).unwrap();
        assert_eq!(snapshot.mapping, fx.customers.mapping());
        assert!(snapshot.open);
    }

    #[tokio::test]
    async fn test_concurrent_initialize_runs_once() {
        let fx = fixture();

        let calls = (0..8).map(|_| {
            let client = Arc::clone(&fx.client);
            async move { client.initialize().await }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(fx.connector.connect_attempts(), 1);
        let creates = fx
            .backend
            .operations()
            .into_iter()
            .filter(|op| *op == BackendOperation::CreateIndex)
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn test_initialize_indices_is_idempotent() {
        let fx = fixture();
        fx.client.initialize().await.unwrap();
        let first = fx.backend.index_snapshot(INDEX).unwrap();

        fx.client.initialize_indices().await.unwrap();
        fx.client.initialize_indices().await.unwrap();

        assert_eq!(fx.backend.index_names().len(), 1);
        assert_eq!(fx.backend.index_snapshot(INDEX).unwrap(), first);
    }

    #[tokio::test]
    async fn test_update_index_closes_updates_and_reopens() {
        let fx = fixture();
        fx.client.initialize().await.unwrap();
        fx.backend.clear_operations();

        let updated = fx
            .client
            .update_index(INDEX, &fx.customers.mapping(), &fx.customers.settings())
            .await;

        assert!(updated);
        assert_eq!(
            fx.backend.operations(),
            vec![
                BackendOperation::CloseIndex,
                BackendOperation::PutSettings,
                BackendOperation::PutMapping,
                BackendOperation::OpenIndex,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_update_reopens_index() {
        let fx = fixture();
        fx.client.initialize().await.unwrap();
        let conflicting = json!({ "properties": { "email": { "type": "text" } } });

        let updated = fx
            .client
            .update_index(INDEX, &conflicting, &fx.customers.settings())
            .await;

        assert!(!updated);
        assert!(fx.backend.index_snapshot(INDEX).unwrap().open);
    }

    #[tokio::test]
    async fn test_provisioning_failure_aborts_initialize() {
        let fx = fixture();
        fx.client.initialize().await.unwrap();

        let definitions: Vec<Arc<dyn IndexDefinition>> = vec![fx.customers.clone()];
        let restarted = SearchClient::new(fx.client.config().clone(), fx.connector.clone(), definitions);
        fx.backend.fail_on(BackendOperation::PutSettings);

        let result = restarted.initialize().await;

        assert!(matches!(result, Err(SearchIndexError::IndexUpdateError(_))));
        assert!(!restarted.is_initialized());
        assert!(fx.backend.index_snapshot(INDEX).unwrap().open);
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_retry_budget() {
        let fx = fixture();
        fx.backend.set_reachable(false);

        let result = fx.client.initialize().await;

        match result {
            Err(SearchIndexError::ConnectionError(msg)) => {
                assert!(msg.contains("3 attempts"));
                assert!(msg.contains("connection refused"));
            }
            other => panic!("expected connection error, got {:?}", other),
        }
        assert_eq!(fx.connector.connect_attempts(), 3);
        assert_eq!(fx.client.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_add_then_get_round_trip() {
        let fx = fixture();
        let ada = customer(42, "ada@example.com");
        let source = fx.customers.to_source(&ada).unwrap();

        assert!(fx.client.add_document(INDEX, "42", &source).await);

        let document = fx.client.get(INDEX, "42").await.unwrap();
        assert_eq!(document.id, "42");
        assert_eq!(document.source, source);
    }

    #[tokio::test]
    async fn test_delete_removes_visibility() {
        let fx = fixture();
        let source = fx.customers.to_source(&customer(7, "x@example.com")).unwrap();
        assert!(fx.client.add_document(INDEX, "7", &source).await);

        assert!(fx.client.delete_document(INDEX, "7").await);

        let result = fx.client.get(INDEX, "7").await;
        assert!(matches!(result, Err(SearchIndexError::DocumentNotFound(_))));
        assert!(fx.client.delete_document(INDEX, "7").await);
    }

    #[tokio::test]
    async fn test_update_fields() {
        let fx = fixture();
        let source = fx.customers.to_source(&customer(9, "n@example.com")).unwrap();
        assert!(fx.client.add_document(INDEX, "9", &source).await);

        assert!(fx.client.update_fields(INDEX, "9", &json!({ "status": "blocked" })).await);
        assert!(!fx.client.update_fields(INDEX, "10", &json!({ "status": "blocked" })).await);

        let document = fx.client.get(INDEX, "9").await.unwrap();
        assert_eq!(document.source["status"], "blocked");
        assert_eq!(document.source["email"], "n@example.com");
    }

    #[tokio::test]
    async fn test_bulk_partial_failure_does_not_raise() {
        let fx = fixture();
        let mut documents: Vec<Value> = (1..=5)
            .map(|id| {
                fx.customers
                    .to_source(&customer(id, &format!("c{}@example.com", id)))
                    .unwrap()
            })
            .collect();
        documents[2]["created_at"] = json!("not-a-date");

        let ok = fx.client.bulk_update(INDEX, &documents).await;

        assert!(!ok);
        for id in ["1", "2", "4", "5"] {
            assert!(fx.backend.stored_document(INDEX, id).is_some(), "missing {}", id);
        }
        assert!(fx.backend.stored_document(INDEX, "3").is_none());
    }

    #[tokio::test]
    async fn test_bulk_document_without_id_does_not_block_batch() {
        let fx = fixture();
        let mut documents: Vec<Value> = (1..=5)
            .map(|id| fx.customers.to_source(&customer(id, "b@example.com")).unwrap())
            .collect();
        documents[2] = json!({ "email": "no-id@example.com" });

        let ok = fx.client.bulk_update(INDEX, &documents).await;

        assert!(!ok);
        for id in ["1", "2", "4", "5"] {
            assert!(fx.backend.stored_document(INDEX, id).is_some(), "missing {}", id);
        }
        assert_eq!(fx.backend.index_snapshot(INDEX).unwrap().document_count, 4);
    }

    #[tokio::test]
    async fn test_bulk_update_in_batches() {
        let fx = fixture_with(
            SearchClientConfig::new("localhost", 9200)
                .with_index_prefix("test")
                .with_bulk_batch_size(2),
        );
        let documents: Vec<Value> = (1..=5)
            .map(|id| fx.customers.to_source(&customer(id, "b@example.com")).unwrap())
            .collect();

        assert!(fx.client.bulk_update(INDEX, &documents).await);

        let bulks = fx
            .backend
            .operations()
            .into_iter()
            .filter(|op| *op == BackendOperation::Bulk)
            .count();
        assert_eq!(bulks, 3);
        assert_eq!(fx.backend.index_snapshot(INDEX).unwrap().document_count, 5);
        assert!(fx.client.bulk_update(INDEX, &[]).await);
    }

    #[tokio::test]
    async fn test_write_failures_are_contained() {
        let fx = fixture();
        fx.client.initialize().await.unwrap();
        let source = fx.customers.to_source(&customer(1, "a@example.com")).unwrap();

        fx.backend.set_reachable(false);
        assert!(!fx.client.add_document(INDEX, "1", &source).await);
        assert_eq!(fx.client.state().await, ConnectionState::Disconnected);
        assert!(!fx.client.delete_document(INDEX, "1").await);
        assert!(!fx.client.bulk_update(INDEX, &[source.clone()]).await);

        fx.backend.set_reachable(true);
        assert!(fx.client.add_document(INDEX, "1", &source).await);
        assert_eq!(fx.client.state().await, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_close_reconnects_without_reprovisioning() {
        let fx = fixture();
        fx.client.initialize().await.unwrap();
        fx.client.close().await;
        assert_eq!(fx.client.state().await, ConnectionState::Disconnected);
        fx.backend.clear_operations();

        let source = fx.customers.to_source(&customer(3, "c@example.com")).unwrap();
        assert!(fx.client.add_document(INDEX, "3", &source).await);

        assert_eq!(fx.connector.connect_attempts(), 2);
        assert_eq!(
            fx.backend.operations(),
            vec![BackendOperation::Ping, BackendOperation::IndexDocument]
        );
    }

    #[tokio::test]
    async fn test_search_and_read_errors() {
        let fx = fixture();
        let source = fx.customers.to_source(&customer(42, "ada@example.com")).unwrap();
        assert!(fx.client.add_document(INDEX, "42", &source).await);

        let response = fx
            .client
            .search(INDEX, &json!({ "term": { "email": "ada@example.com" } }))
            .await
            .unwrap();
        assert_eq!(response.ids(), vec!["42"]);

        let malformed = fx.client.search(INDEX, &json!({ "no_such_query": {} })).await;
        match malformed {
            Err(SearchIndexError::OperationError(msg)) => assert!(msg.contains("no_such_query")),
            other => panic!("expected operation error, got {:?}", other),
        }

        fx.backend.fail_on(BackendOperation::GetDocument);
        let failed = fx.client.get(INDEX, "42").await;
        assert!(matches!(failed, Err(SearchIndexError::OperationError(_))));
    }

    #[tokio::test]
    async fn test_health_check() {
        let fx = fixture();
        assert_eq!(fx.client.health_check().await, HealthStatus::unhealthy());

        fx.client.initialize().await.unwrap();
        assert_eq!(fx.client.health_check().await, HealthStatus::healthy());

        fx.backend.set_reachable(false);
        let status = fx.client.health_check().await;
        assert_eq!(status.status, "unhealthy");
        assert!(!status.connected);
    }

    #[tokio::test]
    async fn test_index_exists_never_fails() {
        let fx = fixture();
        assert!(!fx.client.index_exists(INDEX).await);

        fx.client.initialize().await.unwrap();
        assert!(fx.client.index_exists(INDEX).await);

        fx.backend.fail_on(BackendOperation::IndexExists);
        assert!(!fx.client.index_exists(INDEX).await);
    }
}

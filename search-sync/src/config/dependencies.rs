//! Dependency initialization and wiring for the sync service.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::propagator::{ChangePropagator, PropagatorConfig};
use crate::ServiceError;
use search_sync_repository::{
    CustomerIndex, IndexDefinition, OpenSearchConnector, SearchClient, SearchClientConfig,
    SearchConnector,
};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The shared search client, connected and with indices provisioned.
    pub client: Arc<SearchClient>,
    /// Propagator for customer changes.
    pub propagator: Arc<ChangePropagator<CustomerIndex>>,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See `SearchClientConfig::from_env` and `PropagatorConfig::from_env` for
    /// the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Connected client and running propagator
    /// * `Err(ServiceError)` - If the engine is not configured, unreachable, or
    ///   an index could not be provisioned
    pub async fn new() -> Result<Self, ServiceError> {
        Self::with_connector(
            SearchClientConfig::from_env(),
            PropagatorConfig::from_env(),
            Arc::new(OpenSearchConnector::new()),
        )
        .await
    }

    /// Wire the service against an arbitrary engine connector.
    pub async fn with_connector(
        config: SearchClientConfig,
        propagator_config: PropagatorConfig,
        connector: Arc<dyn SearchConnector>,
    ) -> Result<Self, ServiceError> {
        info!(
            host = ?config.host,
            port = ?config.port,
            scheme = %config.scheme,
            index_prefix = %config.index_prefix,
            max_retries = config.max_retries,
            bulk_batch_size = config.bulk_batch_size,
            workers = propagator_config.workers,
            "Initializing dependencies"
        );

        let customers = Arc::new(CustomerIndex::new(config.index_prefix.clone()));
        let definitions: Vec<Arc<dyn IndexDefinition>> = vec![customers.clone()];
        let client = Arc::new(SearchClient::new(config, connector, definitions));

        // Serving without provisioned indices is not allowed.
        if let Err(e) = client.initialize().await {
            error!(error = %e, "Failed to initialize search client");
            return Err(e.into());
        }

        let health = client.health_check().await;
        if health.connected {
            info!(status = %health.status, "Search engine health check passed");
        } else {
            warn!(status = %health.status, "Search engine health check failed after initialization");
        }

        let propagator = Arc::new(ChangePropagator::new(
            customers,
            Arc::clone(&client),
            propagator_config,
        )?);

        Ok(Self { client, propagator })
    }
}

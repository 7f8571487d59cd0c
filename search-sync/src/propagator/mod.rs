//! Change propagator.
//!
//! Bridges primary-store lifecycle events to the `SearchClient`. Callers hand
//! over an event and return immediately; the engine write happens on a worker.
//! Events are routed to one of a fixed set of sequential workers by a hash of
//! the document id, so changes to one entity are applied in the order they
//! were submitted while different entities proceed in parallel.

mod stats;

pub use stats::PropagatorStats;

use std::collections::hash_map::DefaultHasher;
use std::env;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use search_sync_repository::{DocumentProjector, SearchClient, SearchIndexError};
use search_sync_shared::{ChangeKind, EntityChangeEvent};

use crate::errors::SyncError;
use stats::Counters;

/// Default number of propagation workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default capacity of each worker queue.
pub const DEFAULT_CHANNEL_BUFFER: usize = 1000;

/// Configuration for the propagator.
#[derive(Debug, Clone)]
pub struct PropagatorConfig {
    /// Number of sequential workers.
    pub workers: usize,
    /// Capacity of each worker queue.
    pub channel_buffer: usize,
}

impl Default for PropagatorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
        }
    }
}

impl PropagatorConfig {
    /// Read `PROPAGATOR_WORKERS` and `PROPAGATOR_CHANNEL_BUFFER`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: usize| match lookup(key) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => {
                    warn!(key = %key, value = %raw, "Invalid propagator setting, using default");
                    default
                }
            },
            None => default,
        };

        Self {
            workers: read("PROPAGATOR_WORKERS", DEFAULT_WORKERS),
            channel_buffer: read("PROPAGATOR_CHANNEL_BUFFER", DEFAULT_CHANNEL_BUFFER),
        }
    }
}

enum Task<E> {
    Change {
        document_id: String,
        event: EntityChangeEvent<E>,
    },
    Patch {
        document_id: String,
        fields: Value,
    },
}

/// Worker index for a document id. Stable for the life of the process.
fn shard_for(document_id: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    document_id.hash(&mut hasher);
    (hasher.finish() % shards.max(1) as u64) as usize
}

/// Keeps one index in step with its entity in the primary store.
pub struct ChangePropagator<P: DocumentProjector> {
    projector: Arc<P>,
    index: String,
    senders: RwLock<Option<Vec<mpsc::Sender<Task<P::Entity>>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl<P> ChangePropagator<P>
where
    P: DocumentProjector + 'static,
{
    /// Start the workers.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Returns
    ///
    /// * `Ok(ChangePropagator)` - With `config.workers` workers running
    /// * `Err(SearchIndexError::ConfigurationError)` - If the projector has no index name
    pub fn new(
        projector: Arc<P>,
        client: Arc<SearchClient>,
        config: PropagatorConfig,
    ) -> Result<Self, SearchIndexError> {
        let index = projector.index_name()?;
        let counters = Arc::new(Counters::default());
        let worker_count = config.workers.max(1);

        let mut senders = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);
        for shard in 0..worker_count {
            let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
            senders.push(tx);
            workers.push(tokio::spawn(run_worker(
                shard,
                rx,
                Arc::clone(&projector),
                Arc::clone(&client),
                index.clone(),
                Arc::clone(&counters),
            )));
        }

        info!(
            index = %index,
            workers = worker_count,
            channel_buffer = config.channel_buffer,
            "Change propagator started"
        );

        Ok(Self {
            projector,
            index,
            senders: RwLock::new(Some(senders)),
            workers: Mutex::new(workers),
            counters,
        })
    }

    /// Physical index this propagator writes to.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Entity type this propagator accepts.
    pub fn entity_type(&self) -> &str {
        self.projector.logical_name()
    }

    fn sender_for(&self, document_id: &str) -> Option<mpsc::Sender<Task<P::Entity>>> {
        let senders = self.senders.read().unwrap_or_else(PoisonError::into_inner);
        senders
            .as_ref()
            .map(|senders| senders[shard_for(document_id, senders.len())].clone())
    }

    async fn enqueue(&self, document_id: &str, task: Task<P::Entity>) -> bool {
        let Some(sender) = self.sender_for(document_id) else {
            warn!(doc_id = %document_id, "Change submitted after shutdown, dropping");
            Counters::incr(&self.counters.rejected);
            return false;
        };
        if sender.send(task).await.is_err() {
            error!(doc_id = %document_id, "Propagation worker is gone, dropping change");
            Counters::incr(&self.counters.rejected);
            return false;
        }
        Counters::incr(&self.counters.received);
        true
    }

    /// Queue a lifecycle event.
    ///
    /// Created and updated entities are projected and upserted; deleted ones
    /// are removed. The outcome is logged and counted, never returned: the
    /// result only says whether the event was queued.
    pub async fn on_entity_changed(&self, event: EntityChangeEvent<P::Entity>) -> bool {
        if event.entity_type != self.entity_type() {
            warn!(
                entity_type = %event.entity_type,
                expected = %self.entity_type(),
                entity_id = %event.entity_id,
                "Ignoring change for another entity type"
            );
            Counters::incr(&self.counters.rejected);
            return false;
        }

        let document_id = self.projector.document_id(&event.snapshot);
        if document_id != event.entity_id {
            warn!(
                entity_id = %event.entity_id,
                doc_id = %document_id,
                "Event id differs from projected document id, using document id"
            );
        }
        let key = document_id.clone();
        self.enqueue(&key, Task::Change { document_id, event }).await
    }

    /// Queue a partial update of an entity's document.
    ///
    /// Goes through the same worker as the entity's lifecycle events, so it is
    /// applied after every change submitted before it.
    pub async fn on_fields_changed(&self, entity_id: &str, fields: Value) -> bool {
        self.enqueue(
            entity_id,
            Task::Patch {
                document_id: entity_id.to_string(),
                fields,
            },
        )
        .await
    }

    /// Current counters.
    pub fn stats(&self) -> PropagatorStats {
        self.counters.snapshot()
    }

    /// Stop accepting changes, apply everything already queued and join the workers.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) -> Result<PropagatorStats, SyncError> {
        let senders = self
            .senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(senders);

        let handles: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        let mut panicked = 0usize;
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Propagation worker failed");
                panicked += 1;
            }
        }

        let stats = self.stats();
        info!(
            index = %self.index,
            received = stats.received,
            indexed = stats.indexed,
            deleted = stats.deleted,
            patched = stats.patched,
            failed = stats.failed,
            rejected = stats.rejected,
            "Change propagator stopped"
        );

        if panicked > 0 {
            return Err(SyncError::channel(format!(
                "{} propagation workers did not finish cleanly",
                panicked
            )));
        }
        Ok(stats)
    }
}

async fn run_worker<P>(
    shard: usize,
    mut rx: mpsc::Receiver<Task<P::Entity>>,
    projector: Arc<P>,
    client: Arc<SearchClient>,
    index: String,
    counters: Arc<Counters>,
) where
    P: DocumentProjector + 'static,
{
    debug!(shard, "Propagation worker started");
    while let Some(task) = rx.recv().await {
        let applied = match task {
            Task::Change { document_id, event } => {
                apply_change(projector.as_ref(), &client, &index, &document_id, event, &counters)
                    .await
            }
            Task::Patch {
                document_id,
                fields,
            } => {
                let ok = client.update_fields(&index, &document_id, &fields).await;
                if ok {
                    Counters::incr(&counters.patched);
                }
                ok
            }
        };
        if !applied {
            Counters::incr(&counters.failed);
        }
    }
    debug!(shard, "Propagation worker stopped");
}

#[instrument(skip(projector, client, event, counters), fields(kind = ?event.kind))]
async fn apply_change<P>(
    projector: &P,
    client: &SearchClient,
    index: &str,
    document_id: &str,
    event: EntityChangeEvent<P::Entity>,
    counters: &Counters,
) -> bool
where
    P: DocumentProjector,
{
    match event.kind {
        ChangeKind::Created | ChangeKind::Updated => {
            let source = match projector.to_source(&event.snapshot) {
                Ok(source) => source,
                Err(e) => {
                    error!(doc_id = %document_id, error = %e, "Failed to project entity");
                    return false;
                }
            };
            let ok = client.add_document(index, document_id, &source).await;
            if ok {
                Counters::incr(&counters.indexed);
            }
            ok
        }
        ChangeKind::Deleted => {
            let ok = client.delete_document(index, document_id).await;
            if ok {
                Counters::incr(&counters.deleted);
            }
            ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_shard_for_is_stable_and_in_range() {
        for id in ["1", "42", "customer-7", ""] {
            let shard = shard_for(id, 4);
            assert!(shard < 4);
            assert_eq!(shard, shard_for(id, 4));
        }
        assert_eq!(shard_for("42", 1), 0);
        assert_eq!(shard_for("42", 0), 0);
    }

    #[test]
    fn test_config_from_lookup() {
        let env: HashMap<&str, &str> =
            HashMap::from([("PROPAGATOR_WORKERS", "8"), ("PROPAGATOR_CHANNEL_BUFFER", "0")]);
        let config = PropagatorConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.workers, 8);
        assert_eq!(config.channel_buffer, DEFAULT_CHANNEL_BUFFER);

        let config = PropagatorConfig::from_lookup(|_| None);
        assert_eq!(config.workers, DEFAULT_WORKERS);
    }
}

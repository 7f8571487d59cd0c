//! NDJSON change stream consumer.
//!
//! Reads one change message per line from any async reader (stdin in the
//! binary) and submits it to the propagator until the stream ends or the
//! shutdown future resolves. Bad lines are logged and skipped.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::wrappers::SplitStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, instrument, warn};

use search_sync_repository::DocumentProjector;

use crate::consumer::messages::{ChangeAction, ChangeMessage};
use crate::errors::SyncError;
use crate::propagator::ChangePropagator;

/// Interval between progress log lines.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Counts for one consumed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    /// Non-blank lines read.
    pub lines: u64,
    /// Messages queued on the propagator.
    pub dispatched: u64,
    /// Lines that did not decode.
    pub malformed: u64,
    /// Messages the propagator refused (another entity type, or shut down).
    pub rejected: u64,
}

/// Consumer of newline-delimited JSON change messages.
pub struct LineConsumer<R> {
    reader: R,
}

impl<R> LineConsumer<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Feed every line to `propagator` until EOF or until `shutdown` resolves.
    ///
    /// Does not shut the propagator down; the caller drains it afterwards.
    ///
    /// # Returns
    ///
    /// * `Ok(StreamSummary)` - Counts for the consumed lines
    /// * `Err(SyncError::IoError)` - If reading the stream fails
    #[instrument(skip_all, fields(index = %propagator.index()))]
    pub async fn run<P, S>(
        self,
        propagator: &ChangePropagator<P>,
        shutdown: S,
    ) -> Result<StreamSummary, SyncError>
    where
        P: DocumentProjector + 'static,
        P::Entity: DeserializeOwned,
        S: Future<Output = ()>,
    {
        let mut lines = SplitStream::new(self.reader.split(b'\n'));
        let mut summary = StreamSummary::default();

        let mut progress = interval(PROGRESS_INTERVAL);
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Consuming change stream");

        loop {
            tokio::select! {
                line = lines.next() => {
                    match line {
                        Some(line) => {
                            let line = line?;
                            match String::from_utf8(line) {
                                Ok(line) => dispatch(&line, propagator, &mut summary).await,
                                Err(e) => {
                                    summary.lines += 1;
                                    summary.malformed += 1;
                                    warn!(line = summary.lines, error = %e, "Skipping change message that is not UTF-8");
                                }
                            }
                        }
                        None => {
                            info!("Change stream ended");
                            break;
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = progress.tick() => {
                    let stats = propagator.stats();
                    info!(
                        lines = summary.lines,
                        dispatched = summary.dispatched,
                        indexed = stats.indexed,
                        deleted = stats.deleted,
                        failed = stats.failed,
                        "Propagation progress"
                    );
                }
            }
        }

        Ok(summary)
    }
}

async fn dispatch<P>(line: &str, propagator: &ChangePropagator<P>, summary: &mut StreamSummary)
where
    P: DocumentProjector + 'static,
    P::Entity: DeserializeOwned,
{
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    summary.lines += 1;

    let message = match ChangeMessage::<P::Entity>::parse(line) {
        Ok(message) => message,
        Err(e) => {
            warn!(line = summary.lines, error = %e, "Skipping malformed change message");
            summary.malformed += 1;
            return;
        }
    };

    let accepted = match message.into_action() {
        ChangeAction::Change(event) => propagator.on_entity_changed(event).await,
        ChangeAction::Patch {
            entity_type,
            entity_id,
            fields,
        } => {
            if entity_type == propagator.entity_type() {
                propagator.on_fields_changed(&entity_id, fields).await
            } else {
                warn!(entity_type = %entity_type, entity_id = %entity_id, "Ignoring patch for another entity type");
                false
            }
        }
    };

    if accepted {
        summary.dispatched += 1;
    } else {
        debug!(line = summary.lines, "Change message not queued");
        summary.rejected += 1;
    }
}

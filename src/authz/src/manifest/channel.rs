//! In-process manifest source

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{Kind, LoadBatch, LoadEvent, LoadSink, ManifestEntry, ManifestSource, SubscriptionId};
use crate::error::{AuthzError, Result};

struct Subscriber {
    kinds: Vec<Kind>,
    sink: LoadSink,
}

/// Manifest source fed programmatically
///
/// Used where manifests arrive from somewhere other than the local
/// filesystem (an API, a test), and as the reference source in tests.
#[derive(Default)]
pub struct ChannelManifestSource {
    subscribers: Mutex<HashMap<SubscriptionId, Subscriber>>,
}

impl ChannelManifestSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Deliver `entries` to every subscriber, each receiving the entries of
    /// the kinds it asked for as a single batch.
    ///
    /// Entries of unknown kinds are dropped. Returns the number of
    /// subscribers that received a non-empty batch.
    pub async fn publish(&self, entries: Vec<ManifestEntry>) -> usize {
        let targets: Vec<(Vec<Kind>, LoadSink)> = self
            .subscribers
            .lock()
            .values()
            .map(|s| (s.kinds.clone(), s.sink.clone()))
            .collect();

        let sends = targets.into_iter().filter_map(|(kinds, sink)| {
            let batch: LoadBatch = entries
                .iter()
                .filter(|e| e.kind().is_some_and(|k| kinds.contains(&k)))
                .cloned()
                .map(LoadEvent::new)
                .collect();

            (!batch.is_empty()).then(|| async move { sink.send(batch).await.is_ok() })
        });

        let delivered = join_all(sends).await.into_iter().filter(|ok| *ok).count();
        debug!(entries = entries.len(), delivered, "published manifest entries");
        delivered
    }

    /// Deliver a single entry to the first subscriber interested in its kind
    /// and wait for that subscriber to report the outcome of loading it.
    pub async fn load(&self, entry: ManifestEntry) -> Result<()> {
        let kind = entry
            .kind()
            .ok_or_else(|| AuthzError::UnknownKind(entry.kind.clone()))?;

        let sink = self
            .subscribers
            .lock()
            .values()
            .find(|s| s.kinds.contains(&kind))
            .map(|s| s.sink.clone())
            .ok_or_else(|| AuthzError::Subscription(format!("no subscriber for kind {}", kind)))?;

        let (event, outcome) = LoadEvent::with_ack(entry);
        sink.send(vec![event])
            .await
            .map_err(|_| AuthzError::Subscription("subscriber closed".to_string()))?;

        outcome
            .await
            .map_err(|_| AuthzError::Subscription("load event dropped".to_string()))?
    }
}

#[async_trait]
impl ManifestSource for ChannelManifestSource {
    async fn subscribe(&self, kinds: &[Kind], sink: LoadSink) -> Result<SubscriptionId> {
        let id = SubscriptionId::new();
        self.subscribers.lock().insert(
            id,
            Subscriber {
                kinds: kinds.to_vec(),
                sink,
            },
        );
        debug!(%id, ?kinds, "manifest subscription added");
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        match self.subscribers.lock().remove(&id) {
            Some(_) => {
                debug!(%id, "manifest subscription removed");
                Ok(())
            }
            None => {
                warn!(%id, "unsubscribe for unknown subscription");
                Err(AuthzError::Subscription(format!("unknown subscription {}", id)))
            }
        }
    }
}

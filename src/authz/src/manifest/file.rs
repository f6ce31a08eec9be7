//! Manifest source backed by YAML files

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::{Kind, LoadBatch, LoadEvent, LoadSink, ManifestEntry, ManifestSource, SubscriptionId};
use crate::error::{AuthzError, Result};

/// Parse a multi-document YAML manifest.
///
/// Documents that are empty are ignored. Documents that are not manifest
/// entries are logged and skipped so that one bad object does not hide the
/// rest of the file. A YAML syntax error fails the whole file, since the
/// document stream cannot be resumed past it.
pub fn parse_manifest(text: &str, origin: &str) -> Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = serde_json::Value::deserialize(document).map_err(|e| {
            error!(origin, document = index, error = %e, "unreadable manifest document");
            AuthzError::Manifest(format!("{}: document {}: {}", origin, index, e))
        })?;

        if value.is_null() {
            continue;
        }

        match serde_json::from_value::<ManifestEntry>(value) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(origin, document = index, error = %e, "skipping malformed manifest entry");
            }
        }
    }

    Ok(entries)
}

/// Manifest source reading YAML files once per subscription
///
/// Each subscriber receives one batch per file, in path order, containing
/// the entries of the kinds it asked for. Files are not watched.
pub struct FileManifestSource {
    paths: Vec<PathBuf>,
    subscribers: Mutex<HashMap<SubscriptionId, LoadSink>>,
}

impl FileManifestSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    async fn read(path: &Path) -> Result<Vec<ManifestEntry>> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthzError::Manifest(format!("{}: {}", path.display(), e)))?;

        parse_manifest(&text, &path.display().to_string())
    }
}

#[async_trait]
impl ManifestSource for FileManifestSource {
    async fn subscribe(&self, kinds: &[Kind], sink: LoadSink) -> Result<SubscriptionId> {
        // Read everything up front so an unreadable file fails the
        // subscription before any batch is delivered.
        let mut batches = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let batch: LoadBatch = Self::read(path)
                .await?
                .into_iter()
                .filter(|e| e.kind().is_some_and(|k| kinds.contains(&k)))
                .map(LoadEvent::new)
                .collect();
            debug!(path = %path.display(), entries = batch.len(), "manifest file read");
            batches.push(batch);
        }

        for batch in batches.into_iter().filter(|b| !b.is_empty()) {
            sink.send(batch)
                .await
                .map_err(|_| AuthzError::Subscription("subscriber closed".to_string()))?;
        }

        // Registered only once every batch is delivered, so a failed
        // subscription leaves nothing behind.
        let id = SubscriptionId::new();
        self.subscribers.lock().insert(id, sink);

        info!(%id, files = self.paths.len(), "manifest files delivered");
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.subscribers
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AuthzError::Subscription(format!("unknown subscription {}", id)))
    }
}

//! Manifest-fed policy and group store
//!
//! The store owns the canonical Policy and Group catalogs. A single worker
//! task, started by [`PolicyStore::start`], drains load batches from the
//! manifest source and is the only writer. Reads share the catalog lock with
//! each other and never overlap a write.
//!
//! ```text
//! ManifestSource ──batches──▶ worker ──write──▶ catalog ◀──read── policy/group/user_policies
//! ```
//!
//! Names are assigned once. A second entry with a taken name is rejected and
//! the stored entity is left untouched.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::engine::Resolver;
use crate::error::{AuthzError, ErrorKind, Result};
use crate::manifest::{Kind, LoadBatch, LoadSink, ManifestEntry, ManifestSource, SubscriptionId};
use crate::policy::{Group, GroupSpec, Policy, PolicySpec};
use crate::types::UserInfo;

/// Kinds the store subscribes to
const SUBSCRIBED_KINDS: [Kind; 2] = [Kind::Policy, Kind::Group];

#[derive(Debug, Default)]
struct CatalogState {
    policies: HashMap<String, Arc<Policy>>,
    groups: HashMap<String, Arc<Group>>,
}

/// Lock-guarded catalogs shared between the store and its worker
#[derive(Debug, Default)]
struct Catalog {
    state: RwLock<CatalogState>,
}

impl Catalog {
    async fn load(&self, entry: &ManifestEntry) -> Result<()> {
        if entry.name.is_empty() {
            return Err(AuthzError::invalid_spec("", "manifest entry has no name"));
        }

        // Decode outside the lock; only the insert needs exclusive access.
        match entry.kind() {
            Some(Kind::Policy) => {
                let spec = PolicySpec::from_value(&entry.name, entry.specs.clone())?;
                self.insert_policy(Policy::new(entry.name.clone(), spec.statements))
                    .await
            }
            Some(Kind::Group) => {
                let spec = GroupSpec::from_value(&entry.name, entry.specs.clone())?;
                self.insert_group(Group::new(entry.name.clone(), spec.policies))
                    .await
            }
            None => Err(AuthzError::UnknownKind(entry.kind.clone())),
        }
    }

    async fn insert_policy(&self, policy: Policy) -> Result<()> {
        let mut state = self.state.write().await;
        match state.policies.entry(policy.name.clone()) {
            Entry::Occupied(_) => Err(AuthzError::PolicyAlreadyExists(policy.name)),
            Entry::Vacant(slot) => {
                debug!(policy = %policy.name, statements = policy.statements.len(), "policy loaded");
                slot.insert(Arc::new(policy));
                Ok(())
            }
        }
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        let mut state = self.state.write().await;
        match state.groups.entry(group.name.clone()) {
            Entry::Occupied(_) => Err(AuthzError::GroupAlreadyExists(group.name)),
            Entry::Vacant(slot) => {
                debug!(group = %group.name, policies = group.policies.len(), "group loaded");
                slot.insert(Arc::new(group));
                Ok(())
            }
        }
    }

    /// Apply every event of a batch; failures are logged and do not stop
    /// the rest of the batch.
    async fn apply(&self, batch: LoadBatch) {
        for event in batch {
            let outcome = self.load(&event.entry).await;

            if let Err(e) = &outcome {
                match e.kind() {
                    ErrorKind::AlreadyExists => {
                        warn!(kind = %event.entry.kind, name = %event.entry.name, error = %e, "manifest entry rejected")
                    }
                    _ => {
                        error!(kind = %event.entry.kind, name = %event.entry.name, error = %e, "manifest entry skipped")
                    }
                }
            }

            event.acknowledge(outcome);
        }
    }
}

/// Worker loop: runs until the event channel closes or `cancel` fires.
///
/// Pending batches take priority over cancellation, so batches already
/// queued when the store stops are still applied.
async fn drain(catalog: Arc<Catalog>, mut events: mpsc::Receiver<LoadBatch>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            batch = events.recv() => match batch {
                Some(batch) => catalog.apply(batch).await,
                None => {
                    debug!("manifest event channel closed");
                    break;
                }
            },
            _ = cancel.cancelled() => {
                debug!("policy store worker cancelled");
                break;
            }
        }
    }
}

/// Handles of a running worker
struct Worker {
    subscription: SubscriptionId,
    events: LoadSink,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Policy and group store kept in sync with a manifest source
pub struct PolicyStore {
    catalog: Arc<Catalog>,
    source: Arc<dyn ManifestSource>,
    config: StoreConfig,
    worker: Mutex<Option<Worker>>,
}

impl PolicyStore {
    /// Create a store with default configuration
    pub fn new(source: Arc<dyn ManifestSource>) -> Self {
        Self::with_config(source, StoreConfig::default())
    }

    /// Create a store with custom configuration
    pub fn with_config(source: Arc<dyn ManifestSource>, config: StoreConfig) -> Self {
        Self {
            catalog: Arc::new(Catalog::default()),
            source,
            config,
            worker: Mutex::new(None),
        }
    }

    /// Subscribe to the manifest source and start the worker
    pub async fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return Err(AuthzError::Lifecycle("policy store already started".to_string()));
        }

        let (events, receiver) = mpsc::channel(self.config.channel_capacity());
        let cancel = CancellationToken::new();

        // The worker must be draining before subscribing: a source may
        // deliver its initial batches from within `subscribe`.
        let handle = tokio::spawn(drain(Arc::clone(&self.catalog), receiver, cancel.clone()));

        let subscription = match self.source.subscribe(&SUBSCRIBED_KINDS, events.clone()).await {
            Ok(id) => id,
            Err(e) => {
                cancel.cancel();
                drop(events);
                if let Err(join) = handle.await {
                    error!(error = %join, "policy store worker failed");
                }
                error!(error = %e, "manifest subscription failed");
                return Err(e);
            }
        };

        info!(%subscription, buffer = self.config.channel_capacity(), "policy store started");

        *worker = Some(Worker {
            subscription,
            events,
            cancel,
            handle,
        });

        Ok(())
    }

    /// Unsubscribe, close the event channel and wait for the worker to exit
    ///
    /// The lifecycle lock is held until the worker has exited, so a
    /// concurrent `start` cannot spawn a second writer while queued batches
    /// are still being applied.
    pub async fn stop(&self) -> Result<()> {
        let mut guard = self.worker.lock().await;
        let Some(worker) = guard.take() else {
            return Err(AuthzError::Lifecycle("policy store not started".to_string()));
        };

        let unsubscribed = self.source.unsubscribe(worker.subscription).await;

        drop(worker.events);
        worker.cancel.cancel();
        worker
            .handle
            .await
            .map_err(|e| AuthzError::Lifecycle(format!("policy store worker failed: {}", e)))?;

        info!(subscription = %worker.subscription, "policy store stopped");

        if let Err(e) = &unsubscribed {
            warn!(error = %e, "manifest unsubscribe failed");
        }
        drop(guard);
        unsubscribed
    }

    /// Whether the worker is running
    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.is_some()
    }

    /// Look up a policy by name
    pub async fn policy(&self, name: &str) -> Result<Arc<Policy>> {
        let state = self.catalog.state.read().await;
        state
            .policies
            .get(name)
            .cloned()
            .ok_or_else(|| AuthzError::PolicyNotFound(name.to_string()))
    }

    /// Look up a group by name
    pub async fn group(&self, name: &str) -> Result<Arc<Group>> {
        let state = self.catalog.state.read().await;
        state
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| AuthzError::GroupNotFound(name.to_string()))
    }

    /// Names of all loaded policies, in no particular order
    pub async fn policies(&self) -> Vec<String> {
        self.catalog.state.read().await.policies.keys().cloned().collect()
    }

    /// Names of all loaded groups, in no particular order
    pub async fn groups(&self) -> Vec<String> {
        self.catalog.state.read().await.groups.keys().cloned().collect()
    }

    /// Policies reachable from the user's groups.
    ///
    /// Order is group order, then policy order within each group. Unknown
    /// groups and policies are skipped with a warning.
    pub async fn user_policies(&self, user: Option<&UserInfo>) -> Vec<Arc<Policy>> {
        let Some(user) = user else {
            return Vec::new();
        };

        let state = self.catalog.state.read().await;
        let mut policies = Vec::new();

        for group_name in &user.groups {
            let Some(group) = state.groups.get(group_name) else {
                warn!(user = %user.name, error = %AuthzError::GroupNotFound(group_name.clone()), "skipping group");
                continue;
            };

            for policy_name in &group.policies {
                match state.policies.get(policy_name) {
                    Some(policy) => policies.push(Arc::clone(policy)),
                    None => warn!(
                        user = %user.name,
                        group = %group.name,
                        error = %AuthzError::PolicyNotFound(policy_name.clone()),
                        "skipping policy"
                    ),
                }
            }
        }

        policies
    }

    /// Resolver over the user's current policies
    pub async fn resolver_for(&self, user: Option<&UserInfo>) -> Resolver {
        Resolver::new(self.user_policies(user).await)
    }

    #[cfg(test)]
    pub(crate) async fn load(&self, entry: &ManifestEntry) -> Result<()> {
        self.catalog.load(entry).await
    }
}

impl Drop for PolicyStore {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            debug!("policy store dropped while running, cancelling worker");
            worker.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ChannelManifestSource;
    use serde_json::json;

    fn store() -> PolicyStore {
        PolicyStore::new(Arc::new(ChannelManifestSource::new()))
    }

    fn policy_entry(name: &str) -> ManifestEntry {
        ManifestEntry::new(
            "Policy",
            name,
            json!({
                "statements": [{
                    "name": "read",
                    "effect": "Allow",
                    "actions": ["secret.read"],
                    "resource": ["/kv/*"]
                }]
            }),
        )
    }

    #[tokio::test]
    async fn test_load_policy_and_group() {
        let store = store();
        store.load(&policy_entry("readers")).await.unwrap();
        store
            .load(&ManifestEntry::new("Group", "ops", json!({"policies": ["readers"]})))
            .await
            .unwrap();

        assert_eq!(store.policy("readers").await.unwrap().statements.len(), 1);
        assert_eq!(store.group("ops").await.unwrap().policies, vec!["readers"]);
        assert_eq!(store.policies().await, vec!["readers".to_string()]);
        assert_eq!(store.groups().await, vec!["ops".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected_not_overwritten() {
        let store = store();
        store.load(&policy_entry("readers")).await.unwrap();

        let replacement = ManifestEntry::new("Policy", "readers", json!({"statements": []}));
        let err = store.load(&replacement).await.unwrap_err();
        assert_eq!(err.to_string(), r#"policy "readers" already exist"#);
        assert_eq!(store.policy("readers").await.unwrap().statements.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_entries() {
        let store = store();

        let err = store
            .load(&ManifestEntry::new("Secret", "s", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSpec);

        let err = store
            .load(&ManifestEntry::new("Group", "", json!({"policies": []})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSpec);

        let err = store
            .load(&ManifestEntry::new("Group", "ops", json!({"policies": "readers"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSpec);
        assert!(store.groups().await.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let store = store();
        assert_eq!(
            store.policy("missing").await.unwrap_err().to_string(),
            r#"policy "missing" not found"#
        );
        assert_eq!(
            store.group("missing").await.unwrap_err().to_string(),
            r#"group "missing" not found"#
        );
    }

    #[tokio::test]
    async fn test_user_policies_for_absent_user() {
        let store = store();
        store.load(&policy_entry("readers")).await.unwrap();
        assert!(store.user_policies(None).await.is_empty());
        assert!(store.user_policies(Some(&UserInfo::new("nobody"))).await.is_empty());
    }

    /// Channel source whose `unsubscribe` parks until released
    struct SlowUnsubscribe {
        inner: ChannelManifestSource,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl ManifestSource for SlowUnsubscribe {
        async fn subscribe(&self, kinds: &[Kind], sink: LoadSink) -> Result<SubscriptionId> {
            self.inner.subscribe(kinds, sink).await
        }

        async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.unsubscribe(id).await
        }
    }

    #[tokio::test]
    async fn test_start_waits_for_pending_stop() {
        let source = Arc::new(SlowUnsubscribe {
            inner: ChannelManifestSource::new(),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let store = Arc::new(PolicyStore::new(source.clone()));
        store.start().await.unwrap();

        let stopping = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.stop().await }
        });
        source.entered.notified().await;

        let early = tokio::time::timeout(std::time::Duration::from_millis(50), store.start()).await;
        assert!(early.is_err(), "start must not overlap a running stop");

        source.release.notify_one();
        stopping.await.unwrap().unwrap();

        tokio_test::assert_ok!(store.start().await);
        assert_eq!(source.inner.subscriber_count(), 1);
        assert!(store.is_running().await);
    }

    #[tokio::test]
    async fn test_failed_subscription_leaves_store_stopped() {
        let store = PolicyStore::new(Arc::new(crate::manifest::FileManifestSource::new([
            "/nonexistent/keyward/manifest.yaml",
        ])));

        let err = store.start().await.unwrap_err();
        assert!(matches!(err, AuthzError::Manifest(_)));
        assert!(!store.is_running().await);
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let source = Arc::new(ChannelManifestSource::new());
        let store = PolicyStore::new(source.clone());

        tokio_test::assert_err!(store.stop().await);

        tokio_test::assert_ok!(store.start().await);
        assert!(store.is_running().await);
        assert_eq!(source.subscriber_count(), 1);
        assert!(store.start().await.is_err());

        store.stop().await.unwrap();
        assert!(!store.is_running().await);
        assert_eq!(source.subscriber_count(), 0);
        assert!(store.stop().await.is_err());
    }
}

//! Manifest entries and the sources that deliver them
//!
//! A manifest source pushes batches of [`LoadEvent`]s into a sink handed to
//! it on [`ManifestSource::subscribe`]. Sources only forward entries whose
//! [`Kind`] was requested. The consumer owns the receiving half of the sink
//! and decides when to stop draining it.

mod channel;
mod file;

pub use channel::ChannelManifestSource;
pub use file::{parse_manifest, FileManifestSource};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::Result;

/// Manifest entry kinds consumed by the authorization layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Policy,
    Group,
}

impl Kind {
    /// Parse a raw `kind` field, `None` for kinds handled elsewhere
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Policy" => Some(Kind::Policy),
            "Group" => Some(Kind::Group),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Policy => "Policy",
            Kind::Group => "Group",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One manifest object as read from its source
///
/// `kind` is kept raw so that entries of unexpected kinds can still be
/// reported by name. `specs` stays untyped until the consumer decodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub specs: serde_json::Value,
}

impl ManifestEntry {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, specs: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            specs,
        }
    }

    /// Typed kind, `None` when the raw kind is unknown
    pub fn kind(&self) -> Option<Kind> {
        Kind::parse(&self.kind)
    }
}

/// An entry to load, optionally with a channel to report the outcome on
#[derive(Debug)]
pub struct LoadEvent {
    pub entry: ManifestEntry,
    pub ack: Option<oneshot::Sender<Result<()>>>,
}

impl LoadEvent {
    /// Fire-and-forget event
    pub fn new(entry: ManifestEntry) -> Self {
        Self { entry, ack: None }
    }

    /// Event whose outcome is reported on the returned receiver
    pub fn with_ack(entry: ManifestEntry) -> (Self, oneshot::Receiver<Result<()>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                entry,
                ack: Some(tx),
            },
            rx,
        )
    }

    /// Report the outcome of loading this event, if anyone is listening
    pub fn acknowledge(self, outcome: Result<()>) {
        if let Some(ack) = self.ack {
            let _ = ack.send(outcome);
        }
    }
}

/// Batch of events delivered together
pub type LoadBatch = Vec<LoadEvent>;

/// Sending half handed to a source on subscribe
pub type LoadSink = mpsc::Sender<LoadBatch>;

/// Identifier of a live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Source of manifest load events
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Start delivering batches of the given kinds to `sink`
    async fn subscribe(&self, kinds: &[Kind], sink: LoadSink) -> Result<SubscriptionId>;

    /// Stop delivering to the subscription and release its sink
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;
}

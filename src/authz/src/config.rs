//! Policy store configuration

use serde::{Deserialize, Serialize};

/// Default capacity of the manifest event channel, in batches
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Policy store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of load batches the source may queue before it is backpressured
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

impl StoreConfig {
    /// Channel capacity actually used; `mpsc` rejects a zero capacity
    pub fn channel_capacity(&self) -> usize {
        self.event_buffer.max(1)
    }
}

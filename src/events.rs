// src/events.rs
//! Engine event stream.
//!
//! Events are emitted by the store — the single writer — so subscribers
//! observe exactly the mutations that actually happened, in order. Delivery
//! is lossy: with no subscriber, or a subscriber that lags past the channel
//! capacity, events are dropped rather than blocking mutation.

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::model::ProcessingStatus;
use crate::types::{FarmerId, FieldId};
use serde::Serialize;
use tokio::sync::broadcast;

/// Engine event types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// The field list for a farmer changed (populated, grown, or shrunk).
    IndexChanged {
        farmer_id: FarmerId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A field's processing status moved.
    FieldStatusChanged {
        field_id: FieldId,
        old_status: ProcessingStatus,
        new_status: ProcessingStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast hub for engine events.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribes to the event stream from this point onward.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emits an event; a send with no receivers is not an error.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn emit_index_changed(&self, farmer_id: FarmerId) {
        self.emit(EngineEvent::IndexChanged {
            farmer_id,
            timestamp: chrono::Utc::now(),
        });
    }

    pub fn emit_status_changed(
        &self,
        field_id: FieldId,
        old_status: ProcessingStatus,
        new_status: ProcessingStatus,
    ) {
        self.emit(EngineEvent::FieldStatusChanged {
            field_id,
            old_status,
            new_status,
            timestamp: chrono::Utc::now(),
        });
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

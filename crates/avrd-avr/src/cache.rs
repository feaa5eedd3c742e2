use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use avrd_core::properties::{DimmerLevel, Input, ListeningMode, Power};

/// Point-in-time view of everything the polling cycle has learned.
/// Fields stay `None` until the first successful refresh of that property.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StatusSnapshot {
    pub power: Option<Power>,
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    pub input: Option<Input>,
    pub listening_mode: Option<ListeningMode>,
    pub dimmer_level: Option<DimmerLevel>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Eventually-consistent device state, refreshed by the polling cycle and by
/// every settled get/set operation, plus the most recent raw stream frame.
/// The facade serves this instead of querying the device per request.
#[derive(Default)]
pub struct StatusCache {
    snapshot: Mutex<StatusSnapshot>,
    raw: Mutex<Option<Value>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshot.lock().clone()
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut StatusSnapshot)) {
        let mut snapshot = self.snapshot.lock();
        apply(&mut snapshot);
        snapshot.updated_at = Some(Utc::now());
    }

    /// Latest raw frame from the status stream, if any has arrived.
    pub fn raw_frame(&self) -> Option<Value> {
        self.raw.lock().clone()
    }

    pub fn set_raw_frame(&self, frame: Value) {
        *self.raw.lock() = Some(frame);
    }
}

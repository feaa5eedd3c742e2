use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named event raised by the receiver session: a property change
/// announcement or the answer to a query. Payloads are opaque at this level;
/// each operation applies its own decode policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub name: String,
    pub payload: Value,
}

impl DeviceEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self { name: name.into(), payload }
    }
}

/// Event names the session publishes. One per controllable property, plus
/// the connection lifecycle events.
pub mod names {
    pub const SYSTEM_POWER: &str = "system-power";
    pub const VOLUME: &str = "volume";
    pub const AUDIO_MUTING: &str = "audio-muting";
    pub const INPUT_SELECTOR: &str = "input-selector";
    pub const LISTENING_MODE: &str = "listening-mode";
    pub const DIMMER_LEVEL: &str = "dimmer-level";

    pub const CONNECT: &str = "connect";
    pub const CLOSE: &str = "close";
    pub const ERROR: &str = "error";
}

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use avrd_core::events::names;
use avrd_core::AvrError;

use crate::bus::EventBus;
use crate::session::CommandTransport;

/// Scripted in-process receiver for deterministic testing without hardware.
///
/// Behaves like the device: each accepted command is answered by publishing
/// the matching named event on the bus, synchronously from `send`, which is
/// indistinguishable to the correlator from an asynchronous answer because
/// the listener is registered before the send. Failures can be scripted per
/// command prefix, and answering can be muted to simulate a device that
/// accepts a command and never responds.
pub struct MockReceiver {
    bus: EventBus,
    state: Mutex<DeviceState>,
    fail_once: Mutex<HashSet<String>>,
    muted: AtomicBool,
    send_count: AtomicUsize,
}

struct DeviceState {
    power: &'static str,
    volume: u8,
    audio_muting: bool,
    input_id: String,
    listening_mode: String,
    dimmer_level: String,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            power: "on",
            volume: 25,
            audio_muting: false,
            input_id: "dvd".into(),
            listening_mode: "stereo".into(),
            dimmer_level: "bright".into(),
        }
    }
}

impl Default for MockReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReceiver {
    pub fn new() -> Self {
        Self::with_bus(EventBus::new())
    }

    pub fn with_bus(bus: EventBus) -> Self {
        Self {
            bus,
            state: Mutex::new(DeviceState::default()),
            fail_once: Mutex::new(HashSet::new()),
            muted: AtomicBool::new(false),
            send_count: AtomicUsize::new(0),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::Relaxed)
    }

    /// Reject the next send whose command starts with `prefix`.
    pub fn fail_once(&self, prefix: &str) {
        self.fail_once.lock().insert(prefix.to_owned());
    }

    /// When muted, commands are accepted but never answered.
    pub fn mute_answers(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    pub fn set_volume_state(&self, volume: u8) {
        self.state.lock().volume = volume;
    }

    /// Answer with a list payload on the next input query, the way the
    /// hardware reports ambiguous selector states.
    pub fn set_input_state(&self, device_id: &str) {
        self.state.lock().input_id = device_id.to_owned();
    }

    fn answer(&self, property: &str, value: Value) {
        if !self.muted.load(Ordering::Relaxed) {
            self.bus.publish(property, value);
        }
    }

    fn apply(&self, property: &str, arg: &str) {
        let mut state = self.state.lock();
        match property {
            names::SYSTEM_POWER => {
                if arg != "query" {
                    state.power = if arg == "on" { "on" } else { "standby" };
                }
                let payload = json!(state.power);
                drop(state);
                self.answer(names::SYSTEM_POWER, payload);
            }
            names::VOLUME => {
                match arg {
                    "query" => {}
                    "level-up" => state.volume = state.volume.saturating_add(1),
                    "level-down" => state.volume = state.volume.saturating_sub(1),
                    n => {
                        if let Ok(v) = n.parse() {
                            state.volume = v;
                        }
                    }
                }
                let payload = json!(state.volume);
                drop(state);
                self.answer(names::VOLUME, payload);
            }
            names::AUDIO_MUTING => {
                match arg {
                    "query" => {}
                    "toggle" => state.audio_muting = !state.audio_muting,
                    v => state.audio_muting = v == "on",
                }
                let payload = json!(if state.audio_muting { "on" } else { "off" });
                drop(state);
                self.answer(names::AUDIO_MUTING, payload);
            }
            names::INPUT_SELECTOR => {
                if arg != "query" && arg != "up" && arg != "down" {
                    state.input_id = arg.to_owned();
                }
                // The hardware often reports a candidate list.
                let payload = json!([state.input_id.clone(), "unknown-alias"]);
                drop(state);
                self.answer(names::INPUT_SELECTOR, payload);
            }
            names::LISTENING_MODE => {
                if arg != "query" && arg != "up" && arg != "down" {
                    state.listening_mode = arg.to_owned();
                }
                let payload = json!(state.listening_mode.clone());
                drop(state);
                self.answer(names::LISTENING_MODE, payload);
            }
            names::DIMMER_LEVEL => {
                if arg != "query" {
                    state.dimmer_level = arg.to_owned();
                }
                let payload = json!(state.dimmer_level.clone());
                drop(state);
                self.answer(names::DIMMER_LEVEL, payload);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl CommandTransport for MockReceiver {
    async fn send(&self, command: &str) -> Result<(), AvrError> {
        self.send_count.fetch_add(1, Ordering::Relaxed);

        {
            let mut failures = self.fail_once.lock();
            let hit = failures
                .iter()
                .find(|p| command.starts_with(p.as_str()))
                .cloned();
            if let Some(prefix) = hit {
                failures.remove(&prefix);
                return Err(AvrError::Transport(format!("scripted failure: {command}")));
            }
        }

        let (property, arg) = command.split_once(' ').unwrap_or((command, "query"));
        self.apply(property, arg);
        Ok(())
    }
}

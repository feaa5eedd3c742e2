use std::sync::Arc;

use serde_json::Value;

use avrd_core::events::names;
use avrd_core::properties::{DimmerLevel, Input, ListeningMode, MuteCommand, Power, SelectorStep};
use avrd_core::AvrError;

use crate::bus::EventBus;
use crate::cache::StatusCache;
use crate::correlator::issue_and_await;
use crate::session::CommandTransport;

/// Typed operations against one receiver.
///
/// Every operation issues a textual command through the correlator and
/// decodes the answering event with its property's policy; settled values
/// refresh the shared status cache. None of these retry: the polling cycle
/// is the retry mechanism.
pub struct Avr {
    transport: Arc<dyn CommandTransport>,
    bus: EventBus,
    cache: Arc<StatusCache>,
}

impl Avr {
    pub fn new(transport: Arc<dyn CommandTransport>, bus: EventBus, cache: Arc<StatusCache>) -> Self {
        Self { transport, bus, cache }
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    async fn correlate(&self, command: &str, response_event: &str) -> Result<Value, AvrError> {
        issue_and_await(self.transport.as_ref(), &self.bus, command, response_event, None).await
    }

    pub async fn power(&self) -> Result<Power, AvrError> {
        let payload = self.correlate("system-power query", names::SYSTEM_POWER).await?;
        let power = first_recognized(names::SYSTEM_POWER, &payload, Power::parse)?;
        self.cache.update(|s| s.power = Some(power));
        Ok(power)
    }

    pub async fn set_power(&self, on: bool) -> Result<Power, AvrError> {
        let command = if on { "system-power on" } else { "system-power standby" };
        let payload = self.correlate(command, names::SYSTEM_POWER).await?;
        let power = first_recognized(names::SYSTEM_POWER, &payload, Power::parse)?;
        self.cache.update(|s| s.power = Some(power));
        Ok(power)
    }

    pub async fn volume(&self) -> Result<u8, AvrError> {
        let payload = self.correlate("volume query", names::VOLUME).await?;
        let volume = decode_volume(&payload)?;
        self.cache.update(|s| s.volume = Some(volume));
        Ok(volume)
    }

    /// Set the main-zone volume, clamped to 0–100.
    pub async fn set_volume(&self, volume: u8) -> Result<u8, AvrError> {
        let command = format!("volume {}", volume.min(100));
        let payload = self.correlate(&command, names::VOLUME).await?;
        let volume = decode_volume(&payload)?;
        self.cache.update(|s| s.volume = Some(volume));
        Ok(volume)
    }

    /// Nudge the volume one step up or down; resolves with the new level.
    pub async fn step_volume(&self, step: SelectorStep) -> Result<u8, AvrError> {
        let command = format!("volume level-{}", step.device_id());
        let payload = self.correlate(&command, names::VOLUME).await?;
        let volume = decode_volume(&payload)?;
        self.cache.update(|s| s.volume = Some(volume));
        Ok(volume)
    }

    pub async fn muted(&self) -> Result<bool, AvrError> {
        let payload = self.correlate("audio-muting query", names::AUDIO_MUTING).await?;
        let muted = decode_on_off(names::AUDIO_MUTING, &payload)?;
        self.cache.update(|s| s.muted = Some(muted));
        Ok(muted)
    }

    pub async fn set_muted(&self, command: MuteCommand) -> Result<bool, AvrError> {
        let command = format!("audio-muting {}", command.as_str());
        let payload = self.correlate(&command, names::AUDIO_MUTING).await?;
        let muted = decode_on_off(names::AUDIO_MUTING, &payload)?;
        self.cache.update(|s| s.muted = Some(muted));
        Ok(muted)
    }

    pub async fn input(&self) -> Result<Input, AvrError> {
        let payload = self.correlate("input-selector query", names::INPUT_SELECTOR).await?;
        let input = first_recognized(names::INPUT_SELECTOR, &payload, Input::from_device_id)?;
        self.cache.update(|s| s.input = Some(input));
        Ok(input)
    }

    pub async fn set_input(&self, input: Input) -> Result<Input, AvrError> {
        let command = format!("input-selector {}", input.device_id());
        let payload = self.correlate(&command, names::INPUT_SELECTOR).await?;
        let input = first_recognized(names::INPUT_SELECTOR, &payload, Input::from_device_id)?;
        self.cache.update(|s| s.input = Some(input));
        Ok(input)
    }

    pub async fn step_input(&self, step: SelectorStep) -> Result<Input, AvrError> {
        let command = format!("input-selector {}", step.device_id());
        let payload = self.correlate(&command, names::INPUT_SELECTOR).await?;
        let input = first_recognized(names::INPUT_SELECTOR, &payload, Input::from_device_id)?;
        self.cache.update(|s| s.input = Some(input));
        Ok(input)
    }

    pub async fn listening_mode(&self) -> Result<ListeningMode, AvrError> {
        let payload = self.correlate("listening-mode query", names::LISTENING_MODE).await?;
        let mode = first_recognized(names::LISTENING_MODE, &payload, ListeningMode::parse)?;
        self.cache.update(|s| s.listening_mode = Some(mode));
        Ok(mode)
    }

    pub async fn set_listening_mode(&self, mode: ListeningMode) -> Result<ListeningMode, AvrError> {
        let command = format!("listening-mode {}", mode.as_str());
        let payload = self.correlate(&command, names::LISTENING_MODE).await?;
        let mode = first_recognized(names::LISTENING_MODE, &payload, ListeningMode::parse)?;
        self.cache.update(|s| s.listening_mode = Some(mode));
        Ok(mode)
    }

    pub async fn step_listening_mode(&self, step: SelectorStep) -> Result<ListeningMode, AvrError> {
        let command = format!("listening-mode {}", step.device_id());
        let payload = self.correlate(&command, names::LISTENING_MODE).await?;
        let mode = first_recognized(names::LISTENING_MODE, &payload, ListeningMode::parse)?;
        self.cache.update(|s| s.listening_mode = Some(mode));
        Ok(mode)
    }

    pub async fn dimmer_level(&self) -> Result<DimmerLevel, AvrError> {
        let payload = self.correlate("dimmer-level query", names::DIMMER_LEVEL).await?;
        let level = first_recognized(names::DIMMER_LEVEL, &payload, DimmerLevel::parse)?;
        self.cache.update(|s| s.dimmer_level = Some(level));
        Ok(level)
    }

    pub async fn set_dimmer_level(&self, level: DimmerLevel) -> Result<DimmerLevel, AvrError> {
        let command = format!("dimmer-level {}", level.as_str());
        let payload = self.correlate(&command, names::DIMMER_LEVEL).await?;
        let level = first_recognized(names::DIMMER_LEVEL, &payload, DimmerLevel::parse)?;
        self.cache.update(|s| s.dimmer_level = Some(level));
        Ok(level)
    }
}

/// Decode policy for list-or-scalar payloads: the first recognized value in
/// a candidate list is authoritative; an unmapped payload surfaces as
/// `Unrecognized` carrying the raw text, never a silent default.
fn first_recognized<T>(
    property: &'static str,
    payload: &Value,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, AvrError> {
    match payload {
        Value::String(s) => parse(s).ok_or_else(|| unrecognized(property, payload)),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .find_map(&parse)
            .ok_or_else(|| unrecognized(property, payload)),
        _ => Err(unrecognized(property, payload)),
    }
}

fn decode_on_off(property: &'static str, payload: &Value) -> Result<bool, AvrError> {
    first_recognized(property, payload, |s| match s {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    })
}

fn decode_volume(payload: &Value) -> Result<u8, AvrError> {
    let value = match payload {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    match value {
        Some(v) if v <= 100 => Ok(v as u8),
        _ => Err(unrecognized(names::VOLUME, payload)),
    }
}

fn unrecognized(property: &'static str, payload: &Value) -> AvrError {
    let raw = match payload {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_owned).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    };
    AvrError::Unrecognized { property, raw }
}

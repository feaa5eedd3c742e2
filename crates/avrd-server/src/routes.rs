use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use avrd_avr::cache::StatusSnapshot;
use avrd_core::properties::{DimmerLevel, Input, ListeningMode, MuteCommand, SelectorStep};
use avrd_core::AvrError;
use avrd_wled::WledError;

use crate::server::AppState;

type ApiError = (StatusCode, String);
type ApiResult = Result<Json<StatusSnapshot>, ApiError>;

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}

fn avr_error(e: AvrError) -> ApiError {
    tracing::warn!(error = %e, kind = e.error_kind(), "operation failed");
    let status = match &e {
        AvrError::Unrecognized { .. } => StatusCode::BAD_REQUEST,
        e if e.is_transient() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn wled_error(e: WledError) -> ApiError {
    tracing::warn!(error = %e, "wled operation failed");
    let status = match &e {
        WledError::UnknownEffect(_) => StatusCode::BAD_REQUEST,
        WledError::Http(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

fn parse_step(value: &str) -> Option<SelectorStep> {
    match value {
        "next" => Some(SelectorStep::Next),
        "previous" => Some(SelectorStep::Previous),
        _ => None,
    }
}

pub async fn hello() -> &'static str {
    "avrd"
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

pub async fn avr_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.avr.cache().snapshot())
}

/// Last raw frame from the status stream, `null` before the first arrives.
pub async fn avr_raw(State(state): State<AppState>) -> Json<Value> {
    Json(state.avr.cache().raw_frame().unwrap_or(Value::Null))
}

pub async fn set_volume(State(state): State<AppState>, Path(value): Path<String>) -> ApiResult {
    if let Some(step) = parse_step(&value) {
        state.avr.step_volume(step).await.map_err(avr_error)?;
    } else {
        let volume: u8 = value
            .parse()
            .map_err(|_| bad_request(format!("invalid volume: {value}")))?;
        state.avr.set_volume(volume).await.map_err(avr_error)?;
    }
    Ok(Json(state.avr.cache().snapshot()))
}

pub async fn set_power(State(state): State<AppState>, Path(value): Path<String>) -> ApiResult {
    let on = match value.as_str() {
        "on" => true,
        "off" => false,
        _ => return Err(bad_request(format!("invalid power state: {value}"))),
    };
    state.avr.set_power(on).await.map_err(avr_error)?;
    Ok(Json(state.avr.cache().snapshot()))
}

pub async fn set_mute(State(state): State<AppState>, Path(value): Path<String>) -> ApiResult {
    let command = match value.as_str() {
        "on" => MuteCommand::On,
        "off" => MuteCommand::Off,
        "toggle" => MuteCommand::Toggle,
        _ => return Err(bad_request(format!("invalid mute command: {value}"))),
    };
    state.avr.set_muted(command).await.map_err(avr_error)?;
    Ok(Json(state.avr.cache().snapshot()))
}

pub async fn set_input(State(state): State<AppState>, Path(value): Path<String>) -> ApiResult {
    if let Some(step) = parse_step(&value) {
        state.avr.step_input(step).await.map_err(avr_error)?;
    } else {
        let input =
            Input::parse(&value).ok_or_else(|| bad_request(format!("invalid input: {value}")))?;
        state.avr.set_input(input).await.map_err(avr_error)?;
    }
    Ok(Json(state.avr.cache().snapshot()))
}

pub async fn set_listening_mode(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> ApiResult {
    if let Some(step) = parse_step(&value) {
        state.avr.step_listening_mode(step).await.map_err(avr_error)?;
    } else {
        let mode = ListeningMode::parse(&value)
            .ok_or_else(|| bad_request(format!("invalid listening mode: {value}")))?;
        state.avr.set_listening_mode(mode).await.map_err(avr_error)?;
    }
    Ok(Json(state.avr.cache().snapshot()))
}

pub async fn set_dimmer(State(state): State<AppState>, Path(value): Path<String>) -> ApiResult {
    let level = DimmerLevel::parse(&value)
        .ok_or_else(|| bad_request(format!("invalid dimmer level: {value}")))?;
    state.avr.set_dimmer_level(level).await.map_err(avr_error)?;
    Ok(Json(state.avr.cache().snapshot()))
}

fn wled_client(state: &AppState) -> Result<&avrd_wled::WledClient, ApiError> {
    state.wled.as_deref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "no lighting controller configured".into(),
    ))
}

pub async fn wled_power(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let on = match value.as_str() {
        "on" => true,
        "off" => false,
        _ => return Err(bad_request(format!("invalid power state: {value}"))),
    };
    wled_client(&state)?.set_power(on).await.map_err(wled_error)?;
    Ok(Json(json!({"on": on})))
}

pub async fn wled_brightness(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let percent: f64 = value
        .parse()
        .map_err(|_| bad_request(format!("invalid brightness: {value}")))?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(bad_request(format!("brightness out of range: {value}")));
    }
    wled_client(&state)?
        .set_brightness(percent)
        .await
        .map_err(wled_error)?;
    Ok(Json(json!({"brightness": percent})))
}

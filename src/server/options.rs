//! /api/prediction-options handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use super::{ApiError, ServerState};
use crate::api::{NewPredictionOption, PredictionOption};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsQuery {
    pair: Option<String>,
    is_active: Option<String>,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn body_object(body: Result<Json<Value>, JsonRejection>) -> Result<serde_json::Map<String, Value>, ApiError> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("Expected a JSON object")),
        Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
    }
}

fn persist(state: &ServerState, options: &[PredictionOption]) -> Result<(), ApiError> {
    state.options_file.write(options).map_err(|e| {
        error!(error = %e, "Failed to write prediction options file");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save prediction options")
    })
}

/// GET /api/prediction-options?pair=&isActive=
pub async fn list_options(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<OptionsQuery>,
) -> impl IntoResponse {
    let mut options = state.options_file.read();
    if let Some(pair) = query.pair.as_deref().filter(|p| !p.is_empty()) {
        options.retain(|o| o.applies_to(pair));
    }
    if let Some(active) = query.is_active.as_deref() {
        let wanted = active == "true";
        options.retain(|o| o.is_active == wanted);
    }
    crate::admin::sort_options(&mut options);
    Json(options)
}

/// Unvalidated numeric field; missing or non-numeric reads as NaN
fn number(body: &serde_json::Map<String, Value>, key: &str) -> f64 {
    body.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN)
}

/// POST /api/prediction-options
pub async fn create_option(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body_object(body)?;
    let input = NewPredictionOption {
        seconds: number(&body, "seconds"),
        return_rate: number(&body, "returnRate"),
        capital_min: number(&body, "capitalMin"),
        capital_max: number(&body, "capitalMax"),
        currency: body.get("currency").and_then(Value::as_str).map(str::to_string),
        pair: body.get("pair").and_then(Value::as_str).map(str::to_string),
        is_active: body.get("isActive").and_then(Value::as_bool),
        sort_order: body.get("sortOrder").and_then(Value::as_i64),
    };
    input.validate().map_err(ApiError::bad_request)?;

    let timestamp = now();
    let seconds = input.seconds as u32;
    let item = PredictionOption {
        id: format!("{}-{}", seconds, Utc::now().timestamp_millis()),
        option_id: None,
        seconds,
        return_rate: input.return_rate,
        capital_min: input.capital_min,
        capital_max: input.capital_max,
        currency: input
            .currency
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "USDT".to_string()),
        pair: input.pair.filter(|p| !p.is_empty()),
        is_active: input.is_active.unwrap_or(true),
        sort_order: input.sort_order.unwrap_or(0),
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };

    let _guard = state.write_lock.lock().await;
    let mut options = state.options_file.read();
    options.push(item.clone());
    persist(&state, &options)?;

    info!(id = %item.id, seconds = item.seconds, "Prediction option created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/prediction-options/:id
pub async fn get_option(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<PredictionOption>, ApiError> {
    state
        .options_file
        .read()
        .into_iter()
        .find(|o| o.id == id)
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

/// PUT and PATCH /api/prediction-options/:id. Shallow merge; the id is kept.
pub async fn update_option(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionOption>, ApiError> {
    let body = body_object(body)?;

    let _guard = state.write_lock.lock().await;
    let mut options = state.options_file.read();
    let index = options
        .iter()
        .position(|o| o.id == id)
        .ok_or_else(ApiError::not_found)?;

    let mut merged = match serde_json::to_value(&options[index]) {
        Ok(Value::Object(map)) => map,
        _ => {
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update",
            ))
        }
    };
    for (key, value) in body {
        if key != "id" {
            merged.insert(key, value);
        }
    }
    merged.insert("updatedAt".to_string(), Value::String(now()));

    let updated: PredictionOption = serde_json::from_value(Value::Object(merged))
        .map_err(|e| ApiError::bad_request(format!("Invalid option: {}", e)))?;
    options[index] = updated.clone();
    persist(&state, &options)?;

    info!(id = %id, "Prediction option updated");
    Ok(Json(updated))
}

/// DELETE /api/prediction-options/:id
pub async fn delete_option(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let _guard = state.write_lock.lock().await;
    let mut options = state.options_file.read();
    let index = options
        .iter()
        .position(|o| o.id == id)
        .ok_or_else(ApiError::not_found)?;
    options.remove(index);
    persist(&state, &options)?;

    info!(id = %id, "Prediction option deleted");
    Ok(Json(json!({ "success": true })))
}

use std::future::Future;

use crate::error::{AppError, Result};
use crate::model::{CreateUrlRequest, CreateUrlResponse, MetricsQuery, UrlMetricsResponse};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gately_core::ShortKey;
use jiff::Timestamp;
use url::Url;

/// Runs `fut` under the request deadline.
async fn within_deadline<T>(
    state: &AppState,
    fut: impl Future<Output = std::result::Result<T, gately_service::MappingError>>,
) -> Result<T> {
    match tokio::time::timeout(state.request_timeout(), fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(AppError::Timeout),
    }
}

/// `Location` value for `long_url`. Non-ASCII targets are sent in their
/// percent-encoded form.
fn location(long_url: &str) -> Result<HeaderValue> {
    if let Ok(value) = HeaderValue::from_str(long_url) {
        return Ok(value);
    }
    Url::parse(long_url)
        .ok()
        .and_then(|url| HeaderValue::from_str(url.as_str()).ok())
        .ok_or_else(|| AppError::NotFound(format!("stored url is not redirectable: {long_url}")))
}

fn unix_seconds(name: &str, value: i64) -> Result<Timestamp> {
    Timestamp::from_second(value)
        .map_err(|e| AppError::BadRequest(format!("invalid {name} timestamp {value}: {e}")))
}

pub async fn create_url_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let created = within_deadline(&state, state.mapper().create(&request.long_url)).await?;

    let body = CreateUrlResponse {
        long_url: request.long_url,
        short_url: created.short_url,
        time: created.created_at,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn redirect_handler(
    Path(short_key): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    // A key that cannot exist is just an unknown key to the caller.
    let short_key = ShortKey::new(short_key)
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    let long_url = within_deadline(&state, state.mapper().redirect(&short_key)).await?;
    Ok((StatusCode::SEE_OTHER, [(LOCATION, location(&long_url)?)]).into_response())
}

pub async fn delete_url_handler(
    Path(short_key): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    let short_key = ShortKey::new(short_key)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    within_deadline(&state, state.mapper().delete(&short_key)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_urls_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<MetricsQuery>, QueryRejection>,
) -> Result<Json<Vec<UrlMetricsResponse>>> {
    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let start = unix_seconds("start", query.start)?;
    let end = unix_seconds("end", query.end)?;

    let records = within_deadline(&state, state.mapper().metrics(start, end, query.sort)).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

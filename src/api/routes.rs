use crate::api::api_error::APIError;
use crate::api::model::{
    EndpointResult, KeyRequest, KeyRequestResult, KeysQuery, Operation, StatusRequest,
    UpdateRequest, UpdateResult,
};
use crate::api::server::AppState;
use crate::keystore::KeySummary;
use crate::status::KeyStatus;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::net::SocketAddr;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/keys", get(list_keys))
        .route("/keys/request", post(request_key))
        .route("/status", post(key_status))
        .route("/endpoint/:domain", get(find_endpoint))
        .route("/update", post(update))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn list_keys(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<Vec<KeySummary>>, APIError> {
    let keys = match &query.domain {
        Some(domain) => state.client.list_keys_filtered(domain).await?,
        None => state.client.list_keys().await?,
    };
    Ok(Json(keys.iter().map(|key| key.summary()).collect()))
}

async fn request_key(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    WithRejection(Json(payload), _): WithRejection<Json<KeyRequest>, APIError>,
) -> Result<Json<KeyRequestResult>, APIError> {
    tracing::info!(
        "key request from {} for \"{}\"",
        client_addr.ip(),
        payload.domain
    );
    state.client.new_key_request(&payload.domain).await?;
    Ok(Json(KeyRequestResult {
        requested: payload.domain,
    }))
}

async fn key_status(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<StatusRequest>, APIError>,
) -> Result<Json<KeyStatus>, APIError> {
    let status = state
        .client
        .check_key_status(&payload.key, &payload.zone, &payload.endpoint)
        .await?;
    Ok(Json(status))
}

async fn find_endpoint(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<EndpointResult>, APIError> {
    let endpoint = state.client.find_doh_endpoint(&domain).await?;
    Ok(Json(EndpointResult { endpoint }))
}

async fn update(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateRequest>, APIError>,
) -> Result<Json<UpdateResult>, APIError> {
    let mut updater = state
        .client
        .new_updater(&payload.key, &payload.zone, &payload.endpoint)
        .await?;
    for operation in &payload.operations {
        let rr = operation.rr.as_str();
        match operation.op {
            Operation::Add => updater.add_rr(rr),
            Operation::Delete => updater.delete_rr(rr),
            Operation::DeleteRRset => updater.delete_rrset(rr),
            Operation::DeleteName => updater.delete_name(rr),
        }?;
    }
    if payload.signed {
        updater.signed_update().await?;
    } else {
        updater.unsigned_update().await?;
    }
    tracing::info!(
        "update of \"{}\" from {} with {} operations submitted to {}",
        payload.zone,
        client_addr.ip(),
        payload.operations.len(),
        payload.endpoint
    );
    Ok(Json(UpdateResult {
        zone: payload.zone,
        operations: payload.operations.len(),
        signed: payload.signed,
    }))
}

//! Topic handlers.

use crate::http::error::ApiError;
use crate::http::AppState;
use crate::topic::Topic;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use veloq_core::Error;

/// Topic routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/topics", get(list_topics))
        .route("/topics/{topic}", get(get_topic).put(create_topic).delete(delete_topic))
        .route("/topics/{topic}/queues/{queue}", put(subscribe).delete(unsubscribe))
        .route("/topics/{topic}/message", put(broadcast))
        .with_state(state)
}

fn lookup(state: &AppState, topic: &str) -> Result<Arc<Topic>, ApiError> {
    state.topics.get(topic).ok_or_else(|| Error::NotFound(format!("topic {topic}")).into())
}

async fn list_topics(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.topics.list())
}

async fn create_topic(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.topics.create(&topic).await? {
        Ok((StatusCode::CREATED, "created"))
    } else {
        Err(Error::AlreadyExists(format!("topic {topic}")).into())
    }
}

async fn delete_topic(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.topics.delete(&topic).await? {
        Ok(Json(json!({ "deleted": true })))
    } else {
        Err(Error::NotFound(format!("topic {topic}")).into())
    }
}

async fn get_topic(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let topic = lookup(&state, &topic)?;
    Ok(Json(topic.subscribers().into_iter().collect()))
}

/// Both sides must already exist; a missing one is a 422, matching the
/// create-first contract of the API.
async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path((topic, queue)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, ApiError> {
    state.topics.subscribe(&state.queues, &topic, &queue).await.map_err(|e| match e {
        Error::NotFound(what) => Error::InvalidArgument(format!(
            "{what} does not exist; create it first"
        )),
        other => other,
    })?;
    let topic = lookup(&state, &topic)?;
    Ok(Json(topic.subscribers().into_iter().collect()))
}

async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Path((topic, queue)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, ApiError> {
    state.topics.unsubscribe(&topic, &queue).await?;
    let topic = lookup(&state, &topic)?;
    Ok(Json(topic.subscribers().into_iter().collect()))
}

async fn broadcast(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    body: Bytes,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let topic = lookup(&state, &topic)?;
    let written = topic.broadcast(&state.queues, state.store.as_ref(), body).await?;
    Ok(Json(written.into_iter().map(|(queue, id)| (queue, id.to_string())).collect()))
}

//! Queue handlers.

use crate::http::error::ApiError;
use crate::http::AppState;
use crate::queue::Queue;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use veloq_core::{Error, MessageId, QueueConfig};

/// Queue routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/queues", get(list_queues))
        .route(
            "/queues/{queue}",
            get(get_queue).put(create_queue).patch(patch_queue).delete(delete_queue),
        )
        .route("/queues/{queue}/message", put(put_message))
        .route("/queues/{queue}/message/{id}", get(get_message).delete(delete_message))
        .route("/queues/{queue}/messages/{arg}", get(get_messages).delete(delete_messages))
        .with_state(state)
}

fn lookup(state: &AppState, queue: &str) -> Result<Arc<Queue>, ApiError> {
    state.queues.get(queue).ok_or_else(|| Error::NotFound(format!("queue {queue}")).into())
}

/// A message as rendered on the wire.
#[derive(Debug, Serialize)]
struct MessageView {
    id: String,
    body: String,
}

impl From<&veloq_core::Message> for MessageView {
    fn from(message: &veloq_core::Message) -> Self {
        Self {
            id: message.id.to_string(),
            body: String::from_utf8_lossy(&message.body).into_owned(),
        }
    }
}

async fn list_queues(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.queues.list())
}

async fn create_queue(
    State(state): State<Arc<AppState>>,
    Path(queue): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.queues.create(&queue).await? {
        Ok((StatusCode::CREATED, "created"))
    } else {
        Err(Error::AlreadyExists(format!("queue {queue}")).into())
    }
}

async fn delete_queue(
    State(state): State<Arc<AppState>>,
    Path(queue): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.queues.delete(&queue).await? {
        Ok(Json(json!({ "deleted": true })))
    } else {
        Err(Error::NotFound(format!("queue {queue}")).into())
    }
}

#[derive(Debug, Serialize)]
struct QueueDetails {
    #[serde(flatten)]
    config: QueueConfig,
    partitions: usize,
}

async fn get_queue(
    State(state): State<Arc<AppState>>,
    Path(queue): Path<String>,
) -> Result<Json<QueueDetails>, ApiError> {
    let queue = lookup(&state, &queue)?;
    Ok(Json(QueueDetails { config: queue.config(), partitions: queue.partition_count() }))
}

/// Partial configuration update. Absent fields stay untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigPatch {
    visibility_timeout: Option<f64>,
    min_partitions: Option<u32>,
    max_partitions: Option<u32>,
    max_partition_age: Option<f64>,
    compressed_messages: Option<bool>,
}

/// Applies fields one at a time, stopping at the first error with a 500;
/// earlier fields stay applied, so a failed PATCH can leave a partially
/// updated config behind.
async fn patch_queue(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(patch): Json<ConfigPatch>,
) -> Response {
    let queue = match lookup(&state, &name) {
        Ok(queue) => queue,
        Err(e) => return e.into_response(),
    };

    let mut config = queue.config();
    if let Some(v) = patch.visibility_timeout {
        config.visibility_timeout = v;
        if let Err(e) = apply_field(&state, &queue, &config, "visibility_timeout", v.to_string()).await {
            return config_error(e);
        }
    }
    if let Some(v) = patch.min_partitions {
        config.min_partitions = v;
        if let Err(e) = apply_field(&state, &queue, &config, "min_partitions", v.to_string()).await {
            return config_error(e);
        }
    }
    if let Some(v) = patch.max_partitions {
        config.max_partitions = v;
        if let Err(e) = apply_field(&state, &queue, &config, "max_partitions", v.to_string()).await {
            return config_error(e);
        }
    }
    if let Some(v) = patch.max_partition_age {
        config.max_partition_age = v;
        if let Err(e) = apply_field(&state, &queue, &config, "max_partition_age", v.to_string()).await {
            return config_error(e);
        }
    }
    if let Some(v) = patch.compressed_messages {
        config.compressed_messages = v;
        if let Err(e) = apply_field(&state, &queue, &config, "compressed_messages", v.to_string()).await {
            return config_error(e);
        }
    }
    (StatusCode::OK, Json(json!("ok"))).into_response()
}

async fn apply_field(
    state: &AppState,
    queue: &Arc<Queue>,
    config: &QueueConfig,
    key: &str,
    value: String,
) -> veloq_core::Result<()> {
    config.validate()?;
    state.queues.persist_register(queue.name(), key, value).await?;
    queue.set_config(config.clone());
    Ok(())
}

fn config_error(err: Error) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn put_message(
    State(state): State<Arc<AppState>>,
    Path(queue): Path<String>,
    body: Bytes,
) -> Result<String, ApiError> {
    let queue = lookup(&state, &queue)?;
    let id = queue.put(state.store.as_ref(), body).await?;
    Ok(id.to_string())
}

async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path((queue, arg)): Path<(String, String)>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let batch_size: i64 = arg
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("batch size {arg:?} is not an integer")))?;
    if batch_size <= 0 {
        return Err(Error::InvalidArgument("batch size must be a positive integer".to_string())
            .into());
    }
    let queue = lookup(&state, &queue)?;
    let ring = state.ring()?;
    let messages = queue.get(state.store.as_ref(), &ring, batch_size as usize).await?;
    Ok(Json(messages.iter().map(MessageView::from).collect()))
}

async fn get_message(
    State(state): State<Arc<AppState>>,
    Path((queue, id)): Path<(String, String)>,
) -> Result<Json<MessageView>, ApiError> {
    let queue = lookup(&state, &queue)?;
    let id = MessageId::parse(&id)?;
    let found = queue.retrieve(state.store.as_ref(), &[id]).await?;
    match found.first() {
        Some(message) => Ok(Json(MessageView::from(message))),
        None => Err(Error::NotFound(format!("message {id}")).into()),
    }
}

async fn delete_message(
    State(state): State<Arc<AppState>>,
    Path((queue, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let queue = lookup(&state, &queue)?;
    let id = MessageId::parse(&id)?;
    let deleted = queue.delete(state.store.as_ref(), id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn delete_messages(
    State(state): State<Arc<AppState>>,
    Path((queue, arg)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let queue = lookup(&state, &queue)?;
    let ids = arg
        .split(',')
        .map(MessageId::parse)
        .collect::<veloq_core::Result<Vec<MessageId>>>()?;
    let (deleted, _errors) = queue.batch_delete(state.store.as_ref(), &ids).await;
    Ok(Json(json!({ "deleted": deleted })))
}

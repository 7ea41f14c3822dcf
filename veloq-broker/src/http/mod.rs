//! HTTP API, version 1.
//!
//! One handler module per resource, all nested under `/v1`. Handlers do a
//! registry lookup under a read lock, drop it, and then perform KV I/O;
//! error mapping is centralized in [`error::ApiError`].

pub mod error;
pub mod queues;
pub mod status;
pub mod topics;

use crate::registry::{Queues, Topics};
use axum::Router;
use std::sync::Arc;
use veloq_cluster::{Membership, RingView};
use veloq_core::store::KvStore;
use veloq_core::{Error, Result};

/// Shared state for all handlers.
pub struct AppState {
    /// Membership snapshot provider
    pub membership: Arc<dyn Membership>,
    /// Persistent store
    pub store: Arc<dyn KvStore>,
    /// Queue registry
    pub queues: Arc<Queues>,
    /// Topic registry
    pub topics: Arc<Topics>,
}

impl AppState {
    /// Ring view for the current membership snapshot.
    ///
    /// # Errors
    /// `Backend` when the local node is missing from the member list
    /// (the slice is unavailable, not guessable).
    pub fn ring(&self) -> Result<RingView> {
        RingView::new(&self.membership.members(), self.membership.local_name())
            .ok_or_else(|| Error::Backend("local node missing from member list".to_string()))
    }
}

/// Assemble the versioned API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new().nest(
        "/v1",
        Router::new()
            .merge(status::router(state.clone()))
            .merge(queues::router(state.clone()))
            .merge(topics::router(state)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;
    use veloq_cluster::{Member, StaticMembership};
    use veloq_core::store::MemoryStore;
    use veloq_core::{QueueConfig, KEY_SPACE};

    fn test_router() -> Router {
        let store = MemoryStore::new();
        let store: Arc<dyn KvStore> = Arc::new(store);
        let membership = Arc::new(StaticMembership::solo(Member::new(
            "a",
            "127.0.0.1:7001".parse().unwrap(),
        )));
        let state = Arc::new(AppState {
            membership,
            store: store.clone(),
            queues: Arc::new(Queues::new(store.clone(), QueueConfig::default())),
            topics: Arc::new(Topics::new(store)),
        });
        router(state)
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
        let response = router
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(
        router: &Router,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_queue_lifecycle() {
        let router = test_router();

        let (status, _) = send(&router, "PUT", "/v1/queues/q1", Body::empty()).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&router, "PUT", "/v1/queues/q1", Body::empty()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(&router, "GET", "/v1/queues", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(names, vec!["q1".to_string()]);

        let (status, body) = send(&router, "GET", "/v1/queues/q1", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let details: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(details["partitions"], 1);
        assert_eq!(details["min_partitions"], 1);

        let (status, _) = send(&router, "DELETE", "/v1/queues/q1", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&router, "DELETE", "/v1/queues/q1", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_message_round_trip_over_http() {
        let router = test_router();
        send(&router, "PUT", "/v1/queues/q1", Body::empty()).await;

        let (status, id) = send(&router, "PUT", "/v1/queues/q1/message", Body::from("hello")).await;
        assert_eq!(status, StatusCode::OK);
        let id = String::from_utf8(id).unwrap();
        assert_eq!(id.len(), 19);

        let (status, body) = send(&router, "GET", "/v1/queues/q1/messages/5", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let messages: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["id"], id);
        assert_eq!(messages[0]["body"], "hello");

        let (status, body) =
            send(&router, "GET", &format!("/v1/queues/q1/message/{id}"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let message: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(message["body"], "hello");

        let (status, body) =
            send(&router, "DELETE", &format!("/v1/queues/q1/message/{id}"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let reply: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(reply["deleted"], true);

        let (status, _) =
            send(&router, "GET", &format!("/v1/queues/q1/message/{id}"), Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_batch_size_validation() {
        let router = test_router();
        send(&router, "PUT", "/v1/queues/q1", Body::empty()).await;

        let (status, _) = send(&router, "GET", "/v1/queues/q1/messages/0", Body::empty()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = send(&router, "GET", "/v1/queues/q1/messages/-3", Body::empty()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = send(&router, "GET", "/v1/queues/q1/messages/abc", Body::empty()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_exhausted_pool_reads_as_no_content() {
        let router = test_router();
        send(&router, "PUT", "/v1/queues/q1", Body::empty()).await;
        let (status, _) = send_json(
            &router,
            "PATCH",
            "/v1/queues/q1",
            serde_json::json!({"max_partitions": 1, "visibility_timeout": 3600.0}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        send(&router, "PUT", "/v1/queues/q1/message", Body::from("x")).await;
        let (status, _) = send(&router, "GET", "/v1/queues/q1/messages/1", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);

        // The only partition is inside its visibility window now.
        let (status, body) = send(&router, "GET", "/v1/queues/q1/messages/1", Body::empty()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_batch_delete() {
        let router = test_router();
        send(&router, "PUT", "/v1/queues/q1", Body::empty()).await;

        let (_, a) = send(&router, "PUT", "/v1/queues/q1/message", Body::from("a")).await;
        let (_, b) = send(&router, "PUT", "/v1/queues/q1/message", Body::from("b")).await;
        let a = String::from_utf8(a).unwrap();
        let b = String::from_utf8(b).unwrap();

        let (status, body) = send(
            &router,
            "DELETE",
            &format!("/v1/queues/q1/messages/{a},{b},0000000000000000001"),
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let reply: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(reply["deleted"], 2);
    }

    #[tokio::test]
    async fn test_patch_rejects_inconsistent_config_with_500() {
        let router = test_router();
        send(&router, "PUT", "/v1/queues/q1", Body::empty()).await;

        let (status, _) = send_json(
            &router,
            "PATCH",
            "/v1/queues/q1",
            serde_json::json!({"min_partitions": 50}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_patch_updates_config() {
        let router = test_router();
        send(&router, "PUT", "/v1/queues/q1", Body::empty()).await;

        let (status, _) = send_json(
            &router,
            "PATCH",
            "/v1/queues/q1",
            serde_json::json!({"visibility_timeout": 120.0, "max_partitions": 20}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&router, "GET", "/v1/queues/q1", Body::empty()).await;
        let details: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(details["visibility_timeout"], 120.0);
        assert_eq!(details["max_partitions"], 20);
    }

    #[tokio::test]
    async fn test_topic_subscribe_and_broadcast() {
        let router = test_router();
        send(&router, "PUT", "/v1/queues/q1", Body::empty()).await;

        let (status, _) = send(&router, "PUT", "/v1/topics/t1", Body::empty()).await;
        assert_eq!(status, StatusCode::CREATED);

        // Subscribing a missing queue is a conflict, not a 404.
        let (status, _) = send(&router, "PUT", "/v1/topics/t1/queues/ghost", Body::empty()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(&router, "PUT", "/v1/topics/t1/queues/q1", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let subscribers: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(subscribers, vec!["q1".to_string()]);

        let (status, body) =
            send(&router, "PUT", "/v1/topics/t1/message", Body::from("fanout")).await;
        assert_eq!(status, StatusCode::OK);
        let written: std::collections::BTreeMap<String, String> =
            serde_json::from_slice(&body).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written.contains_key("q1"));

        let (status, body) =
            send(&router, "DELETE", "/v1/topics/t1/queues/q1", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let subscribers: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert!(subscribers.is_empty());
    }

    #[tokio::test]
    async fn test_status_endpoints() {
        let router = test_router();

        let (status, body) = send(&router, "GET", "/v1/status/servers", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("Member: a "));

        let (status, body) =
            send(&router, "GET", "/v1/status/partitionrange", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let range: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(range["bottom"], 0);
        assert_eq!(range["top"], KEY_SPACE);
    }
}

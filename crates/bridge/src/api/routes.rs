//! Analysis routes

use axum::{routing::post, Router};

use crate::api::handlers::{analyze_composition, analyze_porosity, check_composition, AnalysisState};

/// Create the analysis router
pub fn create_router(state: AnalysisState) -> Router {
    Router::new()
        .route(
            "/composition/analyze",
            post(analyze_composition).get(check_composition),
        )
        .route("/analyze", post(analyze_porosity))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AnalysisStateBuilder;
    use crate::broker::{Broker, InMemoryBroker, InboundMessage};
    use crate::envelope::{self, JobPayload};
    use crate::family::{JobFamily, QueueDescriptor};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "labgate-test-boundary";
    const COMPOSITION_REQUESTS: &str = "consistence.requests";
    const COMPOSITION_RESPONSES: &str = "consistence.responses";
    const POROSITY_RESPONSES: &str = "hairType.responses";

    enum Part<'a> {
        Text(&'a str),
        File(Option<&'a str>, &'a [u8]),
    }

    fn multipart_request(uri: &str, parts: &[Part<'_>], key: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(text) => {
                    body.extend_from_slice(b"Content-Disposition: form-data; name=\"text\"\r\n\r\n");
                    body.extend_from_slice(text.as_bytes());
                }
                Part::File(content_type, bytes) => {
                    body.extend_from_slice(
                        b"Content-Disposition: form-data; name=\"file\"; filename=\"hair.png\"\r\n",
                    );
                    if let Some(ct) = content_type {
                        body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
                    }
                    body.extend_from_slice(b"\r\n");
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(key) = key {
            builder = builder.header("idempotency-key", key);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn setup() -> (Arc<InMemoryBroker>, AnalysisState) {
        let broker = Arc::new(InMemoryBroker::new());
        broker
            .declare_topology(&[
                QueueDescriptor::default_for(JobFamily::Composition),
                QueueDescriptor::default_for(JobFamily::Porosity),
            ])
            .await
            .unwrap();
        let state = AnalysisStateBuilder::new(broker.clone()).build().unwrap();
        (broker, state)
    }

    async fn send(state: &AnalysisState, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Stand-in worker: take one job from `requests`, reply on `responses`
    fn spawn_worker(broker: Arc<InMemoryBroker>, requests: &'static str, responses: &'static str, reply: Value) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(300)).await;
                if let Ok(Some(job)) = broker.receive_no_wait(requests).await {
                    let job = envelope::decode(&job.body).unwrap();
                    broker.deposit(
                        responses,
                        InboundMessage::new(reply.to_string()).with_correlation_id(job.correlation_id()),
                    );
                    return;
                }
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_analysis_completes() {
        let (broker, state) = setup().await;
        spawn_worker(
            broker.clone(),
            COMPOSITION_REQUESTS,
            COMPOSITION_RESPONSES,
            json!({"hairType": "3A"}),
        );

        let (status, body) = send(
            &state,
            multipart_request("/composition/analyze", &[Part::Text("curly, 3a")], None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "completed", "result": {"hairType": "3A"}}));

        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].exchange, "consistence.exchange");
        assert_eq!(published[0].routing_key, "consistence.request.bind");
        let job = envelope::decode(&published[0].message.body).unwrap();
        assert_eq!(job.payload(), &JobPayload::Text("curly, 3a".into()));
    }

    #[tokio::test]
    async fn test_both_or_neither_payload_is_rejected_without_publish() {
        let (broker, state) = setup().await;

        let (status, body) = send(
            &state,
            multipart_request(
                "/composition/analyze",
                &[Part::File(Some("image/png"), b"png"), Part::Text("curly")],
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("not both"));

        let (status, _) = send(&state, multipart_request("/composition/analyze", &[], None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(broker.published().is_empty());
        assert_eq!(broker.receive_count(COMPOSITION_RESPONSES), 0);
    }

    #[tokio::test]
    async fn test_non_image_file_is_rejected_without_publish() {
        let (broker, state) = setup().await;

        let (status, body) = send(
            &state,
            multipart_request(
                "/composition/analyze",
                &[Part::File(Some("application/pdf"), b"%PDF")],
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "File must be an image"}));
        assert!(broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_rejected() {
        let (broker, state) = setup().await;
        let request = Request::builder()
            .method("POST")
            .uri("/composition/analyze")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"text":"curly"}"#))
            .unwrap();

        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("multipart"));
        assert!(broker.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_result_times_out_with_202() {
        let (broker, state) = setup().await;

        let (status, body) = send(
            &state,
            multipart_request("/composition/analyze", &[Part::Text("wavy")], Some("job-timeout")),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "timed_out");
        assert_eq!(body["message"], "Analysis takes too much time");
        assert_eq!(body["jobId"], "job-timeout");
        assert_eq!(broker.receive_count(COMPOSITION_RESPONSES), 10);
    }

    #[tokio::test]
    async fn test_single_check_pending_then_completed() {
        let (broker, state) = setup().await;
        let check = || {
            Request::builder()
                .uri("/composition/analyze?jobId=job-42")
                .body(Body::empty())
                .unwrap()
        };

        let (status, body) = send(&state, check()).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "processing");
        assert_eq!(body["message"], "Analysis still in progress");

        broker.deposit(
            COMPOSITION_RESPONSES,
            InboundMessage::new(r#"{"hairType":"4C"}"#).with_correlation_id("job-42"),
        );
        let (status, body) = send(&state, check()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!({"hairType": "4C"}));
        assert_eq!(broker.receive_count(COMPOSITION_RESPONSES), 2);
    }

    #[tokio::test]
    async fn test_single_check_receive_failure_is_500() {
        let (broker, state) = setup().await;
        broker.fail_receives("channel closed");

        let request = Request::builder()
            .uri("/composition/analyze")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Failed to get result:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_idempotency_key_does_not_republish() {
        let (broker, state) = setup().await;
        let request = || multipart_request("/composition/analyze", &[Part::Text("coily")], Some("retry-1"));

        let (status, _) = send(&state, request()).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        broker.deposit(
            COMPOSITION_RESPONSES,
            InboundMessage::new(r#"{"hairType":"4A"}"#).with_correlation_id("retry-1"),
        );
        let (status, body) = send(&state, request()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!({"hairType": "4A"}));
        assert_eq!(broker.published().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_on_both_families_publishes_twice() {
        let (broker, state) = setup().await;
        broker.deposit(
            COMPOSITION_RESPONSES,
            InboundMessage::new(r#"{"hairType":"3C"}"#).with_correlation_id("shared-key"),
        );
        broker.deposit(
            POROSITY_RESPONSES,
            InboundMessage::new(r#"{"porosity":"low"}"#).with_correlation_id("shared-key"),
        );

        let (status, body) = send(
            &state,
            multipart_request("/composition/analyze", &[Part::Text("coily")], Some("shared-key")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!({"hairType": "3C"}));

        let (status, body) = send(
            &state,
            multipart_request(
                "/analyze",
                &[Part::File(Some("image/png"), &[0x89, 0x50])],
                Some("shared-key"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!({"porosity": "low"}));

        let exchanges: Vec<_> = broker.published().into_iter().map(|p| p.exchange).collect();
        assert_eq!(exchanges, vec!["consistence.exchange", "hairType.exchange"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_porosity_accepts_images_only() {
        let (broker, state) = setup().await;

        let (status, _) = send(&state, multipart_request("/analyze", &[Part::Text("straight")], None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(broker.published().is_empty());

        broker.deposit(POROSITY_RESPONSES, InboundMessage::new(r#"{"porosity":"high"}"#));
        let (status, body) = send(
            &state,
            multipart_request("/analyze", &[Part::File(Some("image/jpeg"), &[0xff, 0xd8])], None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!({"porosity": "high"}));
        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].exchange, "hairType.exchange");
        let job = envelope::decode(&published[0].message.body).unwrap();
        assert_eq!(job.payload(), &JobPayload::Image(vec![0xff, 0xd8]));
    }

    #[tokio::test]
    async fn test_publish_failure_is_500_and_key_is_released() {
        let (broker, state) = setup().await;
        broker.fail_publishes("connection refused");

        let (status, body) = send(
            &state,
            multipart_request("/composition/analyze", &[Part::Text("curly")], Some("retry-2")),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to submit analysis job"));
        assert!(state.composition.submissions.is_empty());
        assert_eq!(broker.receive_count(COMPOSITION_RESPONSES), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_polling() {
        let (broker, state) = setup().await;
        state.shutdown.cancel();

        let (status, body) = send(
            &state,
            multipart_request("/composition/analyze", &[Part::Text("curly")], None),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"error": "Request cancelled"}));
        assert_eq!(broker.receive_count(COMPOSITION_RESPONSES), 0);
    }
}

use axum::routing::{get, post};
use axum::Router;

use super::endpoints::{health, report, residents, review, submissions};
use super::types::AppContext;

pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/submissions", post(submissions::submit))
        .route("/api/review/pending", get(review::pending))
        .route("/api/review/:id/decision", post(review::decide))
        .route("/api/review/:id/evidence", get(review::evidence))
        .route("/api/report/run", post(report::run))
        .route("/api/residents/:unit_id/balance", get(residents::balance))
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::authorization::StaffRoster;
    use crate::ledger::Ledger;
    use crate::models::{NewSubmission, PaymentStatus, PaymentSubmission};
    use crate::notify::{MemoryNotifier, Notifier};
    use crate::pipeline::classify::ValidUnits;
    use crate::pipeline::ocr::{MockOcr, OcrGateway};
    use crate::pipeline::{Classifier, ReceiptProcessor};
    use crate::report::{MemoryMailer, ReportEngine, ReportMailer};
    use crate::review::ReviewDesk;
    use crate::scheduler::ReportScheduler;
    use crate::storage::{EvidenceStore, MemoryEvidenceStore};

    const RECEIPT_TEXT: &str =
        "Bank transfer receipt\nTotal 1,500.00 Baht\nRef No: ABC123\nFrom: Somsak Wong\n";

    fn test_context(ocr_text: &str) -> AppContext {
        let ledger = Arc::new(Ledger::in_memory().unwrap());
        let notifier = Arc::new(MemoryNotifier::new()) as Arc<dyn Notifier>;
        let evidence = Arc::new(MemoryEvidenceStore::new()) as Arc<dyn EvidenceStore>;

        let gateway = OcrGateway::with_policy(
            Box::new(MockOcr::always(ocr_text)),
            1,
            Duration::ZERO,
        );
        let processor = Arc::new(
            ReceiptProcessor::new(
                gateway,
                Classifier::new(ValidUnits::standard()),
                Arc::clone(&ledger),
                Arc::clone(&evidence),
                Arc::clone(&notifier),
            )
            .unwrap(),
        );
        let desk = Arc::new(ReviewDesk::new(
            Arc::clone(&ledger),
            Arc::new(StaffRoster::new(["admin1".to_string()])),
            notifier,
            evidence,
        ));
        let mailer = Arc::new(MemoryMailer::new()) as Arc<dyn ReportMailer>;
        let engine = Arc::new(ReportEngine::new(Arc::clone(&ledger), mailer));
        let scheduler = Arc::new(ReportScheduler::new(engine, Vec::new()));

        AppContext {
            ledger,
            desk,
            processor,
            scheduler,
        }
    }

    fn pending_submission(ledger: &Ledger) -> PaymentSubmission {
        ledger
            .create(NewSubmission {
                sender_id: "U123".into(),
                unit_id: Some("88/07".into()),
                fee_period: Some("2025-11".into()),
                amount: Some(150_000),
                transaction_reference: None,
                payer_name: None,
                contact_email: None,
                evidence_reference: "88-07_x.jpg".into(),
                raw_text: "partial".into(),
                status: PaymentStatus::PendingReview,
            })
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = build_router(test_context(""));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn complete_submission_round_trips_to_balance() {
        let app = build_router(test_context(RECEIPT_TEXT));

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/submissions",
                serde_json::json!({
                    "sender_id": "U123",
                    "caption": "Unit 88/07, 2025-11, owner@x.com",
                    "image": "data:image/jpeg;base64,aW1hZ2U=",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "completed");
        assert!(body["missing_fields"].as_array().unwrap().is_empty());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/residents/88-07/balance")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["unit_id"], "88/07");
        assert_eq!(body["balance"], 150_000);
        assert_eq!(body["balance_display"], "1500.00");
    }

    #[tokio::test]
    async fn invalid_image_encoding_is_a_validation_error() {
        let app = build_router(test_context(""));
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/submissions",
                serde_json::json!({
                    "sender_id": "U123",
                    "caption": "",
                    "image": "!!! not base64 !!!",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn review_requires_the_actor_header() {
        let app = build_router(test_context(""));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/review/pending")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn non_staff_actor_is_forbidden() {
        let ctx = test_context("");
        pending_submission(&ctx.ledger);
        let app = build_router(ctx);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/review/pending")
                    .header("x-actor-id", "resident9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn decision_flow_applies_then_conflicts() {
        let ctx = test_context("");
        let sub = pending_submission(&ctx.ledger);
        let app = build_router(ctx);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/review/pending")
                    .header("x-actor-id", "admin1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let queue = json_body(response).await;
        assert_eq!(queue.as_array().unwrap().len(), 1);

        let decide_uri = format!("/api/review/{}/decision", sub.id);
        let mut request = json_request(
            "POST",
            &decide_uri,
            serde_json::json!({ "decision": "approve" }),
        );
        request
            .headers_mut()
            .insert("x-actor-id", "admin1".parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "verified");

        // A second decision loses and surfaces the winner's status.
        let mut request = json_request(
            "POST",
            &decide_uri,
            serde_json::json!({ "decision": "reject" }),
        );
        request
            .headers_mut()
            .insert("x-actor-id", "admin1".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "ALREADY_RESOLVED");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("verified"));
    }

    #[tokio::test]
    async fn missing_evidence_is_reported_as_such() {
        let ctx = test_context("");
        let sub = pending_submission(&ctx.ledger);
        let app = build_router(ctx);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/review/{}/evidence", sub.id))
                    .header("x-actor-id", "admin1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "EVIDENCE_MISSING");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn report_trigger_acknowledges_immediately() {
        let app = build_router(test_context(""));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/report/run")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["outcome"], "started");
    }

    #[tokio::test]
    async fn unknown_unit_balance_is_not_found() {
        let app = build_router(test_context(""));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/residents/99-01/balance")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}

//! End-to-end payment lifecycle tests over the HTTP API.
//!
//! A scripted in-process gateway stands in for the external processor;
//! webhook deliveries are signed with the shared test secret exactly as
//! the gateway would sign them.

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use flow_api::{create_router, AppConfig, AppState};
use flow_core::{
    AttemptOutcome, IntentReceipt, Order, PaymentError, PaymentGateway, PaymentResult,
};
use flow_gateway::{signature_header, WebhookVerifier};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const WEBHOOK_SECRET: &str = "ghs_test_secret";

#[derive(Default)]
struct ScriptedGateway {
    counter: AtomicU32,
    failing: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_intent(&self, _order: &Order) -> PaymentResult<IntentReceipt> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentError::GatewayUnavailable("down".into()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IntentReceipt {
            gateway_reference: format!("pi_test_{}", n),
            client_token: format!("pi_test_{}_secret", n),
        })
    }

    async fn query_status(&self, gateway_reference: &str) -> PaymentResult<AttemptOutcome> {
        Err(PaymentError::AttemptUnknownToGateway {
            gateway_reference: gateway_reference.to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        base_url: "http://localhost".to_string(),
        environment: "test".to_string(),
        max_payment_attempts: 3,
    }
}

fn test_server() -> (TestServer, Arc<ScriptedGateway>) {
    let gateway = Arc::new(ScriptedGateway::default());
    let state = AppState::with_gateway(
        test_config(),
        gateway.clone(),
        WebhookVerifier::new(WEBHOOK_SECRET),
    );
    let server = TestServer::new(create_router(state)).unwrap();
    (server, gateway)
}

fn webhook_body(event_id: &str, event_type: &str, reference: &str) -> Vec<u8> {
    json!({
        "id": event_id,
        "type": event_type,
        "data": { "object": { "id": reference } },
    })
    .to_string()
    .into_bytes()
}

async fn deliver_webhook(
    server: &TestServer,
    event_id: &str,
    event_type: &str,
    reference: &str,
) -> axum_test::TestResponse {
    let body = webhook_body(event_id, event_type, reference);
    let header = signature_header(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), &body);
    server
        .post("/webhook/gateway")
        .add_header(
            HeaderName::from_static("gateway-signature"),
            HeaderValue::from_str(&header).unwrap(),
        )
        .bytes(body.into())
        .await
}

async fn create_order(server: &TestServer, amount: f64) -> String {
    let response = server
        .post("/api/v1/orders")
        .json(&json!({ "amount": amount, "currency": "usd" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["id"].as_str().unwrap().to_string()
}

async fn payment_status(server: &TestServer, order_id: &str) -> String {
    let response = server
        .get(&format!("/api/v1/orders/{}/payment", order_id))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["status"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_success_flow_with_redelivery() {
    let (server, _) = test_server();
    let order_id = create_order(&server, 49.99).await;
    assert_eq!(payment_status(&server, &order_id).await, "pending");

    let response = server
        .post(&format!("/api/v1/orders/{}/payment", order_id))
        .await;
    response.assert_status_ok();
    let reference = response.json::<Value>()["gateway_reference"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(payment_status(&server, &order_id).await, "pending");

    let response =
        deliver_webhook(&server, "evt_1", "payment_intent.succeeded", &reference).await;
    response.assert_status_ok();
    assert_eq!(payment_status(&server, &order_id).await, "success");

    // Redelivering evt_1 leaves the order paid with exactly one attempt
    let response =
        deliver_webhook(&server, "evt_1", "payment_intent.succeeded", &reference).await;
    response.assert_status_ok();
    assert_eq!(payment_status(&server, &order_id).await, "success");

    let order = server
        .get(&format!("/api/v1/orders/{}", order_id))
        .await
        .json::<Value>();
    assert_eq!(order["attempt_ids"].as_array().unwrap().len(), 1);
    assert_eq!(order["status"], "paid");
}

#[tokio::test]
async fn test_fail_then_retry_then_succeed() {
    let (server, _) = test_server();
    let order_id = create_order(&server, 20.0).await;

    let response = server
        .post(&format!("/api/v1/orders/{}/payment", order_id))
        .await;
    let first_ref = response.json::<Value>()["gateway_reference"]
        .as_str()
        .unwrap()
        .to_string();

    deliver_webhook(&server, "evt_2", "payment_intent.payment_failed", &first_ref)
        .await
        .assert_status_ok();
    assert_eq!(payment_status(&server, &order_id).await, "failed");

    let response = server
        .post(&format!("/api/v1/orders/{}/payment/retry", order_id))
        .await;
    response.assert_status_ok();
    let second_ref = response.json::<Value>()["gateway_reference"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(first_ref, second_ref);

    deliver_webhook(&server, "evt_3", "payment_intent.succeeded", &second_ref)
        .await
        .assert_status_ok();
    assert_eq!(payment_status(&server, &order_id).await, "success");

    // Failed attempt retained in history
    let order = server
        .get(&format!("/api/v1/orders/{}", order_id))
        .await
        .json::<Value>();
    assert_eq!(order["attempt_ids"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_signature_mutates_nothing() {
    let (server, _) = test_server();
    let order_id = create_order(&server, 15.0).await;
    let response = server
        .post(&format!("/api/v1/orders/{}/payment", order_id))
        .await;
    let reference = response.json::<Value>()["gateway_reference"]
        .as_str()
        .unwrap()
        .to_string();

    let body = webhook_body("evt_4", "payment_intent.succeeded", &reference);
    let bad_header = signature_header("ghs_wrong_secret", chrono::Utc::now().timestamp(), &body);
    let response = server
        .post("/webhook/gateway")
        .add_header(
            HeaderName::from_static("gateway-signature"),
            HeaderValue::from_str(&bad_header).unwrap(),
        )
        .bytes(body.into())
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

    assert_eq!(payment_status(&server, &order_id).await, "pending");
}

#[tokio::test]
async fn test_missing_signature_header() {
    let (server, _) = test_server();
    let body = webhook_body("evt_5", "payment_intent.succeeded", "pi_x");
    let response = server.post("/webhook/gateway").bytes(body.into()).await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_reference_acknowledged() {
    let (server, _) = test_server();
    let response =
        deliver_webhook(&server, "evt_6", "payment_intent.succeeded", "pi_foreign").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_second_initiate_rejected_while_pending() {
    let (server, _) = test_server();
    let order_id = create_order(&server, 15.0).await;

    server
        .post(&format!("/api/v1/orders/{}/payment", order_id))
        .await
        .assert_status_ok();
    let response = server
        .post(&format!("/api/v1/orders/{}/payment", order_id))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_retry_requires_failed_state() {
    let (server, _) = test_server();
    let order_id = create_order(&server, 15.0).await;

    let response = server
        .post(&format!("/api/v1/orders/{}/payment/retry", order_id))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_retry_ceiling() {
    let (server, _) = test_server();
    let order_id = create_order(&server, 15.0).await;

    for i in 0..3 {
        let response = server
            .post(&format!(
                "/api/v1/orders/{}/payment{}",
                order_id,
                if i == 0 { "" } else { "/retry" }
            ))
            .await;
        response.assert_status_ok();
        let reference = response.json::<Value>()["gateway_reference"]
            .as_str()
            .unwrap()
            .to_string();
        deliver_webhook(
            &server,
            &format!("evt_fail_{}", i),
            "payment_intent.payment_failed",
            &reference,
        )
        .await
        .assert_status_ok();
    }

    let response = server
        .post(&format!("/api/v1/orders/{}/payment/retry", order_id))
        .await;
    response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_gateway_outage_surfaces_as_retryable() {
    let (server, gateway) = test_server();
    let order_id = create_order(&server, 15.0).await;

    gateway.failing.store(true, Ordering::SeqCst);
    let response = server
        .post(&format!("/api/v1/orders/{}/payment", order_id))
        .await;
    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);

    // Order remains eligible once the gateway recovers
    gateway.failing.store(false, Ordering::SeqCst);
    server
        .post(&format!("/api/v1/orders/{}/payment", order_id))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_create_order_validation() {
    let (server, _) = test_server();

    let response = server
        .post("/api/v1/orders")
        .json(&json!({ "amount": -5.0, "currency": "usd" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/v1/orders")
        .json(&json!({ "amount": 10.0, "currency": "xyz" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_before_initiation_only() {
    let (server, _) = test_server();
    let order_id = create_order(&server, 15.0).await;

    server
        .post(&format!("/api/v1/orders/{}/cancel", order_id))
        .await
        .assert_status_ok();
    assert_eq!(payment_status(&server, &order_id).await, "failed");

    // Cancelled orders cannot initiate payment
    let response = server
        .post(&format!("/api/v1/orders/{}/payment", order_id))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_order_is_404() {
    let (server, _) = test_server();
    let response = server.post("/api/v1/orders/nope/payment").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conflict_ledger_empty_by_default() {
    let (server, _) = test_server();
    let response = server.get("/api/v1/conflicts").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["count"], 0);
}

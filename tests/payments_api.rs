use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use mockito::Matcher;
use pesa_push::config::GatewayConfig;
use pesa_push::handlers::{build_router, HealthState, PaymentsState};
use pesa_push::services::{
    GatewayClient, InMemoryReceiptStore, PaymentInitiator, ReceiptStore, ReceiptValidator,
    StatusReconciler,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn gateway_config(base_url: String, with_credentials: bool) -> GatewayConfig {
    GatewayConfig {
        base_url,
        api_key: with_credentials.then(|| "key".to_string()),
        api_secret: with_credentials.then(|| "secret".to_string()),
        account_id: with_credentials.then(|| "12345".to_string()),
        timeout_secs: 5,
    }
}

fn app_for(config: GatewayConfig) -> axum::Router {
    let gateway_configured = config.credentials_configured();
    let gateway = Arc::new(GatewayClient::new(&config).expect("gateway client"));
    let store: Arc<dyn ReceiptStore> = Arc::new(InMemoryReceiptStore::default());

    let payments = PaymentsState {
        initiator: Arc::new(PaymentInitiator::new(gateway.clone(), config.clone())),
        reconciler: Arc::new(StatusReconciler::new(gateway)),
        receipts: Arc::new(ReceiptValidator::new(config, store)),
    };
    let health = HealthState {
        gateway_configured,
        started_at: Instant::now(),
    };

    build_router(payments, health)
}

async fn spawn_app(config: GatewayConfig) -> SocketAddr {
    let app = app_for(config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

#[tokio::test]
async fn initiate_and_poll_a_pending_payment() {
    let mut gateway = mockito::Server::new_async().await;
    gateway
        .mock("POST", "/payments")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"checkout_request_id":"ws_CO_PEND","message":"queued"}"#)
        .create_async()
        .await;
    let status_mock = gateway
        .mock("GET", "/payments/status")
        .match_query(Matcher::UrlEncoded(
            "checkout_request_id".into(),
            "ws_CO_PEND".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"status":"pending"}"#)
        .expect(2)
        .create_async()
        .await;

    let addr = spawn_app(gateway_config(gateway.url(), true)).await;
    let client = reqwest::Client::new();

    let initiated: Value = client
        .post(format!("http://{addr}/payments/initiate"))
        .json(&json!({
            "phone": "254712345678",
            "amount": 100,
            "appName": "Telegram Premium Mod"
        }))
        .send()
        .await
        .expect("initiate request")
        .json()
        .await
        .expect("initiate body");

    assert_eq!(initiated["success"], json!(true));
    assert_eq!(initiated["checkoutRequestId"], json!("ws_CO_PEND"));
    assert!(initiated["reference"]
        .as_str()
        .expect("reference")
        .starts_with("PSH_"));

    // Two polls, both pending: the status endpoint is read-only and safe
    // to hit on any cadence.
    for _ in 0..2 {
        let status: Value = client
            .post(format!("http://{addr}/payments/status"))
            .json(&json!({ "checkoutRequestId": "ws_CO_PEND" }))
            .send()
            .await
            .expect("status request")
            .json()
            .await
            .expect("status body");
        assert_eq!(status["status"], json!("pending"));
    }

    status_mock.assert_async().await;
}

#[tokio::test]
async fn full_journey_settles_validates_and_looks_up() {
    let mut gateway = mockito::Server::new_async().await;
    gateway
        .mock("POST", "/payments")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"checkout_request_id":"ws_CO_FULL"}"#)
        .create_async()
        .await;
    gateway
        .mock("GET", "/payments/status")
        .match_query(Matcher::UrlEncoded(
            "checkout_request_id".into(),
            "ws_CO_FULL".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"success":true,"status":"success","transaction_code":"QCD12ABC3",
                "amount":100.0,"phone":"254712345678"}"#,
        )
        .create_async()
        .await;

    let addr = spawn_app(gateway_config(gateway.url(), true)).await;
    let client = reqwest::Client::new();

    let initiated: Value = client
        .post(format!("http://{addr}/payments/initiate"))
        .json(&json!({
            "phone": "254712345678",
            "amount": 100,
            "appName": "Telegram Premium Mod"
        }))
        .send()
        .await
        .expect("initiate request")
        .json()
        .await
        .expect("initiate body");
    assert_eq!(initiated["checkoutRequestId"], json!("ws_CO_FULL"));

    let status: Value = client
        .post(format!("http://{addr}/payments/status"))
        .json(&json!({ "checkoutRequestId": "ws_CO_FULL" }))
        .send()
        .await
        .expect("status request")
        .json()
        .await
        .expect("status body");
    assert_eq!(status["status"], json!("success"));
    assert_eq!(status["transactionCode"], json!("QCD12ABC3"));

    // Nothing recorded yet.
    let missing = client
        .get(format!(
            "http://{addr}/payments/validate?phone=254712345678&checkoutRequestId=ws_CO_FULL"
        ))
        .send()
        .await
        .expect("lookup request");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    let missing: Value = missing.json().await.expect("lookup body");
    assert_eq!(missing["valid"], json!(false));

    // The user types the code back in lowercase; it is stored uppercased.
    let validated: Value = client
        .post(format!("http://{addr}/payments/validate"))
        .json(&json!({
            "phone": "254712345678",
            "transactionCode": "qcd12abc3",
            "checkoutRequestId": "ws_CO_FULL",
            "appName": "Telegram Premium Mod"
        }))
        .send()
        .await
        .expect("validate request")
        .json()
        .await
        .expect("validate body");
    assert_eq!(validated["success"], json!(true));
    assert_eq!(validated["verified"], json!(false));
    assert_eq!(validated["transactionCode"], json!("QCD12ABC3"));

    let found: Value = client
        .get(format!(
            "http://{addr}/payments/validate?phone=254712345678&checkoutRequestId=ws_CO_FULL"
        ))
        .send()
        .await
        .expect("second lookup request")
        .json()
        .await
        .expect("second lookup body");
    assert_eq!(found["valid"], json!(true));
    assert_eq!(found["transaction"]["transactionCode"], json!("QCD12ABC3"));
    assert_eq!(found["transaction"]["phone"], json!("254712345678"));
    assert!(found["transaction"]["timestamp"].as_i64().expect("timestamp") > 0);
}

#[tokio::test]
async fn validation_failures_never_reach_the_gateway() {
    let mut gateway = mockito::Server::new_async().await;
    let push_mock = gateway
        .mock("POST", "/payments")
        .expect(0)
        .create_async()
        .await;

    let addr = spawn_app(gateway_config(gateway.url(), true)).await;
    let client = reqwest::Client::new();

    let bad_phone = client
        .post(format!("http://{addr}/payments/initiate"))
        .json(&json!({
            "phone": "0712345678",
            "amount": 100,
            "appName": "Telegram Premium Mod"
        }))
        .send()
        .await
        .expect("initiate request");
    assert_eq!(bad_phone.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = bad_phone.json().await.expect("error body");
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error_code"], json!("VALIDATION_ERROR"));
    assert!(body["error"].as_str().expect("error").contains("254"));
    assert!(body["request_id"].as_str().is_some());

    let missing_amount = client
        .post(format!("http://{addr}/payments/initiate"))
        .json(&json!({
            "phone": "254712345678",
            "appName": "Telegram Premium Mod"
        }))
        .send()
        .await
        .expect("initiate request");
    assert_eq!(missing_amount.status(), reqwest::StatusCode::BAD_REQUEST);

    let missing_handle = client
        .post(format!("http://{addr}/payments/status"))
        .json(&json!({}))
        .send()
        .await
        .expect("status request");
    assert_eq!(missing_handle.status(), reqwest::StatusCode::BAD_REQUEST);

    let bad_code = client
        .post(format!("http://{addr}/payments/validate"))
        .json(&json!({
            "phone": "254712345678",
            "transactionCode": "no spaces allowed",
            "checkoutRequestId": "ws_CO_X"
        }))
        .send()
        .await
        .expect("validate request");
    assert_eq!(bad_code.status(), reqwest::StatusCode::BAD_REQUEST);

    push_mock.assert_async().await;
}

#[tokio::test]
async fn malformed_bodies_and_missing_params_return_400() {
    let app = app_for(gateway_config("http://127.0.0.1:9".to_string(), true));

    let malformed = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/initiate")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(malformed.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let body: Value = serde_json::from_slice(&bytes).expect("error json");
    assert_eq!(body["error_code"], json!("VALIDATION_ERROR"));

    let missing_params = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/payments/validate?phone=254712345678")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(missing_params.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_credentials_yield_configuration_errors_but_status_stays_200() {
    let mut gateway = mockito::Server::new_async().await;
    let push_mock = gateway
        .mock("POST", "/payments")
        .expect(0)
        .create_async()
        .await;

    let addr = spawn_app(gateway_config(gateway.url(), false)).await;
    let client = reqwest::Client::new();

    let initiate = client
        .post(format!("http://{addr}/payments/initiate"))
        .json(&json!({
            "phone": "254712345678",
            "amount": 100,
            "appName": "Telegram Premium Mod"
        }))
        .send()
        .await
        .expect("initiate request");
    assert_eq!(
        initiate.status(),
        reqwest::StatusCode::INTERNAL_SERVER_ERROR
    );
    let body: Value = initiate.json().await.expect("error body");
    assert_eq!(body["error_code"], json!("CONFIGURATION_ERROR"));

    let validate = client
        .post(format!("http://{addr}/payments/validate"))
        .json(&json!({
            "phone": "254712345678",
            "transactionCode": "QCD12ABC3",
            "checkoutRequestId": "ws_CO_X"
        }))
        .send()
        .await
        .expect("validate request");
    assert_eq!(
        validate.status(),
        reqwest::StatusCode::INTERNAL_SERVER_ERROR
    );

    // The unauthenticated upstream fetch fails, which a poller sees as a
    // plain pending answer, never a 5xx.
    let status = client
        .post(format!("http://{addr}/payments/status"))
        .json(&json!({ "checkoutRequestId": "ws_CO_X" }))
        .send()
        .await
        .expect("status request");
    assert_eq!(status.status(), reqwest::StatusCode::OK);
    let status: Value = status.json().await.expect("status body");
    assert_eq!(status["status"], json!("pending"));

    let health: Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("health request")
        .json()
        .await
        .expect("health body");
    assert_eq!(health["status"], json!("degraded"));
    assert_eq!(health["gateway_configured"], json!(false));

    push_mock.assert_async().await;
}

#[tokio::test]
async fn gateway_outage_and_provider_failure_map_to_the_closed_vocabulary() {
    let mut gateway = mockito::Server::new_async().await;
    gateway
        .mock("GET", "/payments/status")
        .match_query(Matcher::UrlEncoded(
            "checkout_request_id".into(),
            "ws_CO_DOWN".into(),
        ))
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;
    gateway
        .mock("GET", "/payments/status")
        .match_query(Matcher::UrlEncoded(
            "checkout_request_id".into(),
            "ws_CO_NO".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":false,"message":"Request cancelled by user"}"#)
        .create_async()
        .await;

    let addr = spawn_app(gateway_config(gateway.url(), true)).await;
    let client = reqwest::Client::new();

    let outage = client
        .post(format!("http://{addr}/payments/status"))
        .json(&json!({ "checkoutRequestId": "ws_CO_DOWN" }))
        .send()
        .await
        .expect("status request");
    assert_eq!(outage.status(), reqwest::StatusCode::OK);
    let outage: Value = outage.json().await.expect("status body");
    assert_eq!(outage["status"], json!("pending"));

    let declined: Value = client
        .post(format!("http://{addr}/payments/status"))
        .json(&json!({ "checkoutRequestId": "ws_CO_NO" }))
        .send()
        .await
        .expect("status request")
        .json()
        .await
        .expect("status body");
    assert_eq!(declined["status"], json!("failed"));
    assert_eq!(declined["message"], json!("Request cancelled by user"));
}

#[tokio::test]
async fn health_reports_a_configured_gateway() {
    let addr = spawn_app(gateway_config("http://127.0.0.1:9".to_string(), true)).await;

    let health: Value = reqwest::Client::new()
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("health request")
        .json()
        .await
        .expect("health body");

    assert_eq!(health["status"], json!("healthy"));
    assert_eq!(health["gateway_configured"], json!(true));
    assert_eq!(health["version"], json!(env!("CARGO_PKG_VERSION")));
}

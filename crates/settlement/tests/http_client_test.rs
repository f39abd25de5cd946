use axum::extract::Path;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use settlechain_core::{Payload, Transaction, TransactionKind};
use settlechain_settlement::{
    check_transaction, HttpSettlementClient, SettlementError, SettlementValidator,
};
use std::net::SocketAddr;
use std::time::Duration;

fn payment_status(status: &str) -> Value {
    json!({
        "status": 200,
        "body": { "status_updated": { "updated_payment_status": status } }
    })
}

async fn order_status(
    Path(order_id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    match order_id.as_str() {
        "paid" => (StatusCode::OK, Json(payment_status("succeeded"))),
        "pending" => (StatusCode::OK, Json(payment_status("processing"))),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, Json(payment_status("succeeded")))
        }
        "garbled" => (StatusCode::OK, Json(json!({ "status": 200 }))),
        "echo-host" => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            (StatusCode::OK, Json(payment_status(host)))
        }
        "huge" => (StatusCode::OK, Json(payment_status(&"x".repeat(2 << 20)))),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": 404, "body": null })),
        ),
    }
}

async fn spawn_mock_service() -> SocketAddr {
    let app = Router::new().route("/v1/order/status/:order_id", get(order_status));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn client() -> HttpSettlementClient {
    let addr = spawn_mock_service().await;
    HttpSettlementClient::new(&format!("http://{}", addr)).unwrap()
}

fn order(order_id: &str) -> Transaction {
    Transaction::new(
        TransactionKind::Transfer,
        Some("customer-1".into()),
        "merchant-1".into(),
        49.9,
        Payload::new(&json!({ "orderId": order_id })),
    )
}

#[tokio::test]
async fn test_paid_order_is_settled() {
    let client = client().await;
    let settlement = client.check_settlement("paid").await.unwrap();
    assert!(settlement.succeeded);
}

#[tokio::test]
async fn test_processing_order_is_not_settled() {
    let client = client().await;
    let settlement = client.check_settlement("pending").await.unwrap();
    assert!(!settlement.succeeded);
    assert_eq!(settlement.status, "processing");
}

#[tokio::test]
async fn test_unknown_order_is_not_settled() {
    let client = client().await;
    let settlement = client.check_settlement("nope").await.unwrap();
    assert!(!settlement.succeeded);
    assert_eq!(settlement.status, "http 404");
}

#[tokio::test]
async fn test_garbled_document_is_an_error() {
    let client = client().await;
    let result = client.check_settlement("garbled").await;
    assert!(matches!(result, Err(SettlementError::Malformed(_))));
}

#[tokio::test]
async fn test_host_header_names_the_port() {
    let addr = spawn_mock_service().await;
    let client = HttpSettlementClient::new(&format!("http://{}", addr)).unwrap();
    let settlement = client.check_settlement("echo-host").await.unwrap();
    assert_eq!(settlement.status, addr.to_string());
}

#[tokio::test]
async fn test_oversized_response_is_rejected() {
    let client = client().await;
    let result = client.check_settlement("huge").await;
    assert!(matches!(result, Err(SettlementError::Malformed(_))));
}

#[tokio::test]
async fn test_unreachable_service_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpSettlementClient::new(&format!("http://{}", addr)).unwrap();
    let result = client.check_settlement("paid").await;
    assert!(matches!(result, Err(SettlementError::Transport(_))));
}

#[tokio::test]
async fn test_check_transaction_end_to_end() {
    let client = client().await;
    let timeout = Duration::from_secs(2);

    assert!(check_transaction(&client, &order("paid"), timeout).await.is_ok());
    assert!(matches!(
        check_transaction(&client, &order("pending"), timeout).await,
        Err(SettlementError::NotSettled(_))
    ));
}

#[tokio::test]
async fn test_check_transaction_times_out_on_slow_service() {
    let client = client().await;
    let result = check_transaction(&client, &order("slow"), Duration::from_millis(200)).await;
    assert!(matches!(result, Err(SettlementError::Timeout(_))));
}

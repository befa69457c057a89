//! HTTP contract of the gateway, driven through the router without a socket.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use async_trait::async_trait;
use credit_ledger::config::{AccountsConfig, GatewayConfig};
use credit_ledger::gateway::{
    self,
    state::{AppState, RetryPolicy},
};
use credit_ledger::ledger::{
    AccountId, AccountSnapshot, InMemoryLedgerStore, LedgerEngine, LedgerError, LedgerStore,
    UnitOfWork,
};

fn gateway_config(request_timeout_ms: u64) -> GatewayConfig {
    GatewayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_body_bytes: 1024,
        retry_attempts: 1,
        retry_backoff_ms: 1,
        request_timeout_ms,
    }
}

fn router_for(store: Arc<dyn LedgerStore>, config: &GatewayConfig) -> Router {
    let state = Arc::new(AppState::new(
        LedgerEngine::new(store),
        AccountsConfig::default(),
        RetryPolicy::from_config(config),
    ));
    gateway::router(state, config)
}

fn app() -> (InMemoryLedgerStore, Router) {
    let store = InMemoryLedgerStore::new(AccountsConfig::default().seeds());
    let router = router_for(Arc::new(store.clone()), &gateway_config(15_000));
    (store, router)
}

/// Store whose database is gone
struct UnreachableStore;

#[async_trait]
impl LedgerStore for UnreachableStore {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError> {
        Err(LedgerError::Unavailable("connection refused".into()))
    }

    async fn read_snapshot(
        &self,
        _account_id: AccountId,
        _limit: usize,
    ) -> Result<Option<AccountSnapshot>, LedgerError> {
        Err(LedgerError::Unavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable("connection refused".into()))
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_movement(id: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/clientes/{id}/transacoes"))
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get_statement(id: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/clientes/{id}/extrato"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn movement_returns_limit_and_balance() {
    let (_, app) = app();

    let body = json!({"valor": 1000, "tipo": "d", "descricao": "groceries"}).to_string();
    let (status, json) = send(&app, post_movement("1", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["limite"], 100000);
    assert_eq!(json["saldo"], -1000);
}

#[tokio::test]
async fn statement_wire_format() {
    let (_, app) = app();
    for (valor, tipo, descricao) in [(500, "c", "first"), (200, "d", "second")] {
        let body = json!({"valor": valor, "tipo": tipo, "descricao": descricao}).to_string();
        let (status, _) = send(&app, post_movement("2", body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = send(&app, get_statement("2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["saldo"]["total"], 300);
    assert_eq!(json["saldo"]["limite"], 80000);
    assert!(json["saldo"]["data_extrato"].is_string());

    let recent = json["ultimas_transacoes"].as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["descricao"], "second");
    assert_eq!(recent[0]["tipo"], "d");
    assert_eq!(recent[0]["valor"], 200);
    assert!(recent[0]["realizada_em"].is_string());
    assert_eq!(recent[1]["descricao"], "first");
}

#[tokio::test]
async fn empty_statement_has_empty_list() {
    let (_, app) = app();
    let (status, json) = send(&app, get_statement("5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ultimas_transacoes"], json!([]));
}

#[tokio::test]
async fn limit_exceeded_is_422() {
    let (store, app) = app();
    let body = json!({"valor": 80001, "tipo": "d", "descricao": "big"}).to_string();
    let (status, json) = send(&app, post_movement("2", body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "LIMIT_EXCEEDED");
    assert_eq!(store.movement_count(AccountId::new(2)), Some(0));
}

#[tokio::test]
async fn validation_errors_are_422() {
    let (store, app) = app();
    let cases = [
        (json!({"valor": 10, "tipo": "x", "descricao": "a"}), "INVALID_MOVEMENT_KIND"),
        (json!({"valor": 0, "tipo": "c", "descricao": "a"}), "INVALID_AMOUNT"),
        (json!({"valor": 10, "tipo": "c", "descricao": ""}), "INVALID_DESCRIPTION"),
        (json!({"valor": 10, "tipo": "c", "descricao": "12345678901"}), "INVALID_DESCRIPTION"),
        (json!({"valor": 10, "tipo": "c", "descricao": null}), "INVALID_DESCRIPTION"),
        (json!({"valor": 10, "descricao": "a"}), "INVALID_MOVEMENT_KIND"),
    ];

    for (body, code) in cases {
        let (status, json) = send(&app, post_movement("1", body.to_string())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert_eq!(json["code"], code, "{body}");
    }
    assert_eq!(store.units_begun(), 0);
}

#[tokio::test]
async fn malformed_payload_is_400() {
    let (store, app) = app();
    let cases = [
        "{not json".to_string(),
        json!({"valor": 1.5, "tipo": "c", "descricao": "a"}).to_string(),
        json!({"valor": "10", "tipo": "c", "descricao": "a"}).to_string(),
        json!({"valor": 10, "tipo": 1, "descricao": "a"}).to_string(),
    ];

    for body in cases {
        let (status, json) = send(&app, post_movement("1", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["code"], "MALFORMED_PAYLOAD", "{body}");
    }
    assert_eq!(store.units_begun(), 0);
}

#[tokio::test]
async fn oversized_body_is_413() {
    let (_, app) = app();
    let description = "x".repeat(2048);
    let body = json!({"valor": 1, "tipo": "c", "descricao": description}).to_string();

    let (status, json) = send(&app, post_movement("1", body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn unknown_account_ids_are_404() {
    let (store, app) = app();
    let body = json!({"valor": 1, "tipo": "c", "descricao": "a"}).to_string();

    for id in ["6", "0", "-1", "+1", "abc", "99999999999"] {
        let (status, json) = send(&app, post_movement(id, body.clone())).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{id}");
        assert_eq!(json["code"], "ACCOUNT_NOT_FOUND");

        let (status, _) = send(&app, get_statement(id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{id}");
    }
    assert_eq!(store.units_begun(), 0);
}

#[tokio::test]
async fn unknown_account_wins_over_bad_payload() {
    let (_, app) = app();
    let (status, _) = send(&app, post_movement("6", "{not json")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_store() {
    let (_, app) = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], 0);
    assert_eq!(json["data"]["store"], "memory");
}

#[tokio::test]
async fn health_unavailable_when_store_down() {
    let app = router_for(Arc::new(UnreachableStore), &gateway_config(15_000));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json, json!({"code": 503, "msg": "unavailable"}));
}

#[tokio::test]
async fn store_down_is_503_after_retries() {
    let app = router_for(Arc::new(UnreachableStore), &gateway_config(15_000));
    let body = json!({"valor": 1, "tipo": "c", "descricao": "a"}).to_string();

    let (status, json) = send(&app, post_movement("1", body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");

    let (status, _) = send(&app, get_statement("1")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_request_times_out_and_rolls_back() {
    let store = InMemoryLedgerStore::new(AccountsConfig::default().seeds());
    let app = router_for(Arc::new(store.clone()), &gateway_config(50));
    store.set_hold(Duration::from_millis(300));

    let body = json!({"valor": 10, "tipo": "d", "descricao": "slow"}).to_string();
    let (status, json) = send(&app, post_movement("1", body)).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(json["code"], "REQUEST_TIMEOUT");

    store.set_hold(Duration::ZERO);
    assert_eq!(store.movement_count(AccountId::new(1)), Some(0));
    assert_eq!(store.commits(), 0);
}

#[tokio::test]
async fn openapi_document_served() {
    let (_, app) = app();
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/clientes/{id}/transacoes"].is_object());
}

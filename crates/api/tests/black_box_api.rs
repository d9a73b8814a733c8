use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use storefront_api::app::services::{AppServices, seed_accounts};
use storefront_api::config::AppConfig;
use storefront_auth::{JwtClaims, Role, hash_password_with_cost};
use storefront_core::AccountId;
use storefront_infra::stock_store::InMemoryStockStore;

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "owner@shop.test";
const ADMIN_PASSWORD: &str = "correct horse";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(&[]).await
    }

    /// Same router as prod (in-memory stores), bound to an ephemeral port.
    async fn spawn_with(extra_env: &[(&str, &str)]) -> Self {
        let config = test_config(extra_env);
        let app = storefront_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        Self::serve(app).await
    }

    async fn spawn_with_store(store: Arc<InMemoryStockStore>) -> Self {
        let config = test_config(&[]);
        let services = AppServices::new(&config, store, Arc::new(seed_accounts(&config)));
        let app = storefront_api::app::build_app_with_services(&config, services);
        Self::serve(app).await
    }

    async fn serve(app: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn test_config(extra_env: &[(&str, &str)]) -> AppConfig {
    let hash = hash_password_with_cost(ADMIN_PASSWORD, 4).unwrap();
    let mut env: HashMap<String, String> = HashMap::from([
        ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
        ("ADMIN_EMAIL".to_string(), ADMIN_EMAIL.to_string()),
        ("ADMIN_PASSWORD_HASH".to_string(), hash),
    ]);
    for (k, v) in extra_env {
        env.insert(k.to_string(), v.to_string());
    }
    AppConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
}

fn mint_jwt(roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: AccountId::new(),
        email: "someone@shop.test".to_string(),
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin_token() -> String {
    mint_jwt(vec![Role::ADMIN])
}

async fn create_record(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    sku: &str,
    quantity: u64,
    threshold: u64,
) -> serde_json::Value {
    let res = client
        .post(srv.url("/inventory/records"))
        .bearer_auth(token)
        .json(&json!({ "sku": sku, "quantity": quantity, "low_stock_threshold": threshold }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn adjust(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    sku: &str,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(srv.url(&format!("/inventory/records/{sku}/adjust")))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/inventory/records"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn whoami_reflects_token_roles() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(mint_jwt(vec![Role::STAFF]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["email"], "someone@shop.test");
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "staff"));
    assert!(
        body["permissions"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p == "inventory.records.adjust")
    );
}

#[tokio::test]
async fn removing_down_to_threshold_reports_low_stock() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "TSHIRT-RED-M", 12, 5).await;

    let res = adjust(
        &client,
        &srv,
        &token,
        "TSHIRT-RED-M",
        json!({ "quantity": 8, "direction": "remove", "reason": "order #1042" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["record"]["quantity_on_hand"], 4);
    assert_eq!(body["record"]["status"], "low-stock");
    assert_eq!(body["movement"]["quantity_before"], 12);
    assert_eq!(body["movement"]["quantity_after"], 4);
    assert_eq!(body["movement"]["reason"], "order #1042");

    let res = client
        .get(srv.url("/inventory/records/TSHIRT-RED-M"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["quantity_on_hand"], 4);
    assert_eq!(record["version"], 2);
}

#[tokio::test]
async fn stock_goes_out_and_back_in() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "MUG-BLUE", 3, 5).await;

    let res = adjust(&client, &srv, &token, "MUG-BLUE", json!({ "quantity": 3, "direction": "remove" })).await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["record"]["quantity_on_hand"], 0);
    assert_eq!(body["record"]["status"], "out-of-stock");

    let res = adjust(&client, &srv, &token, "MUG-BLUE", json!({ "quantity": 20, "direction": "add" })).await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["record"]["quantity_on_hand"], 20);
    assert_eq!(body["record"]["status"], "in-stock");
}

#[tokio::test]
async fn form_payload_with_numeric_string_is_accepted() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "CAP-GREEN", 10, 2).await;

    let res = client
        .post(srv.url("/inventory/records/CAP-GREEN/adjust"))
        .bearer_auth(&token)
        .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("quantity=3&direction=remove&reason=damaged")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["record"]["quantity_on_hand"], 7);
    assert_eq!(body["movement"]["reason"], "damaged");
}

#[tokio::test]
async fn bad_adjustments_are_invalid_arguments_and_change_nothing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "SOCKS", 5, 1).await;

    for body in [
        json!({ "quantity": "abc", "direction": "add" }),
        json!({ "quantity": 0, "direction": "add" }),
        json!({ "quantity": -2, "direction": "remove" }),
        json!({ "quantity": 2, "direction": "sideways" }),
        json!({ "direction": "add" }),
    ] {
        let res = adjust(&client, &srv, &token, "SOCKS", body.clone()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body}");
        let err: serde_json::Value = res.json().await.unwrap();
        assert_eq!(err["error"], "invalid_argument");
    }

    let res = client
        .get(srv.url("/inventory/records/SOCKS"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["quantity_on_hand"], 5);
    assert_eq!(record["version"], 1);
}

#[tokio::test]
async fn over_removal_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "SCARF", 2, 1).await;

    let res = adjust(&client, &srv, &token, "SCARF", json!({ "quantity": 3, "direction": "remove" })).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "insufficient_stock");
}

#[tokio::test]
async fn unknown_sku_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    let res = adjust(&client, &srv, &token, "NOPE", json!({ "quantity": 1, "direction": "add" })).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/inventory/records/NOPE/movements"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "BELT", 1, 1).await;
    let res = client
        .post(srv.url("/inventory/records"))
        .bearer_auth(&token)
        .json(&json!({ "sku": "BELT", "low_stock_threshold": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn staff_may_adjust_but_not_create_or_configure() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token();
    let staff = mint_jwt(vec![Role::STAFF]);

    create_record(&client, &srv, &admin, "HAT", 4, 1).await;

    let res = client
        .post(srv.url("/inventory/records"))
        .bearer_auth(&staff)
        .json(&json!({ "sku": "GLOVES", "low_stock_threshold": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(srv.url("/inventory/records/HAT/threshold"))
        .bearer_auth(&staff)
        .json(&json!({ "low_stock_threshold": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = adjust(&client, &srv, &staff, "HAT", json!({ "quantity": 1, "direction": "remove" })).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/inventory/records"))
        .bearer_auth(mint_jwt(vec![Role::new("viewer")]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn threshold_change_reclassifies_and_feeds_attention_list() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "BAG", 8, 2).await;
    create_record(&client, &srv, &token, "WALLET", 50, 2).await;

    let res = client
        .put(srv.url("/inventory/records/BAG/threshold"))
        .bearer_auth(&token)
        .json(&json!({ "low_stock_threshold": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["status"], "low-stock");

    let res = client
        .get(srv.url("/inventory/attention"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let skus: Vec<&str> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["sku"].as_str().unwrap())
        .collect();
    assert_eq!(skus, vec!["BAG"]);

    let res = client
        .get(srv.url("/inventory/records"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn movements_are_listed_newest_first() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "LAMP", 0, 1).await;
    adjust(&client, &srv, &token, "LAMP", json!({ "quantity": 5, "direction": "add" })).await;
    adjust(&client, &srv, &token, "LAMP", json!({ "quantity": 2, "direction": "remove" })).await;

    let res = client
        .get(srv.url("/inventory/records/LAMP/movements?limit=1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let movements = body["movements"].as_array().unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0]["direction"], "remove");
    assert_eq!(movements[0]["quantity_after"], 3);

    let res = client
        .get(srv.url("/inventory/records/LAMP/movements?limit=0"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_removals_never_lose_updates() {
    let srv = TestServer::spawn_with(&[("STOCK_MAX_RETRIES", "64")]).await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "PEN", 100, 5).await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        let url = srv.url("/inventory/records/PEN/adjust");
        let token = token.clone();
        tasks.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "quantity": 3, "direction": "remove" }))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }

    let res = client
        .get(srv.url("/inventory/records/PEN"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["quantity_on_hand"], 70);
    assert_eq!(record["version"], 11);
}

#[tokio::test]
async fn storage_outage_is_unavailable() {
    let store = Arc::new(InMemoryStockStore::new());
    let srv = TestServer::spawn_with_store(store.clone()).await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "KEY", 3, 1).await;
    store.set_offline(true);

    let res = adjust(&client, &srv, &token, "KEY", json!({ "quantity": 1, "direction": "add" })).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "unavailable");

    store.set_offline(false);
    let res = client
        .get(srv.url("/inventory/records/KEY"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["quantity_on_hand"], 3);
}

#[tokio::test]
async fn admin_login_issues_a_usable_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");
    let token = body["token"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: serde_json::Value = res.json().await.unwrap();
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert!(me["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn repeated_bad_passwords_lock_the_account() {
    let srv = TestServer::spawn_with(&[("LOGIN_MAX_ATTEMPTS", "2")]).await;
    let client = reqwest::Client::new();

    let login = |password: &'static str| {
        client
            .post(srv.url("/auth/login"))
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!("email=owner%40shop.test&password={password}"))
            .send()
    };

    let res = login("wrong").await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = login("wrong").await.unwrap();
    assert_eq!(res.status(), StatusCode::LOCKED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "account_locked");
    assert!(body["locked_until"].is_string());

    // Correct password is still refused while locked.
    let res = login("correct%20horse").await.unwrap();
    assert_eq!(res.status(), StatusCode::LOCKED);
}

#[tokio::test]
async fn sku_named_attention_is_an_ordinary_record() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token();

    create_record(&client, &srv, &token, "attention", 40, 5).await;

    let res = client
        .get(srv.url("/inventory/records/attention"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["sku"], "attention");
    assert_eq!(record["quantity_on_hand"], 40);
    assert_eq!(record["status"], "in-stock");
}

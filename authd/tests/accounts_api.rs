//! Account endpoint integration tests.
//! Spins up the router on a random port and exercises register/login,
//! decoding the minted tokens with the shared codec.

use std::sync::Arc;

use taskcast_authd::{config::AuthConfig, rest, storage::Storage, AppContext};
use taskcast_claims::Algorithm;
use tempfile::TempDir;

const SECRET: &str = "test-secret";

async fn spawn_server(dir: &TempDir) -> String {
    let config = Arc::new(AuthConfig {
        port: 0,
        bind_address: "127.0.0.1".to_string(),
        data_dir: dir.path().to_path_buf(),
        log: "error".to_string(),
        jwt_secret: SECRET.to_string(),
        algorithm: Algorithm::HS256,
        token_ttl_hours: 12,
        slow_query_threshold_ms: 0,
    });
    let storage = Arc::new(Storage::new(dir.path()).await.unwrap());
    let ctx = Arc::new(AppContext {
        config,
        storage,
        started_at: std::time::Instant::now(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = rest::build_router(ctx);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_register_mints_a_decodable_token() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("{base}/register"))
        .json(&serde_json::json!({
            "username": "alice",
            "password": "hunter2",
            "email": "alice@example.com",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["username"], "alice");
    assert_eq!(body["provider"], "local");

    let token = body["access_token"].as_str().unwrap();
    let claims =
        taskcast_claims::decode(token, SECRET.as_bytes(), Algorithm::HS256).unwrap();
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.email, "alice@example.com");
    assert_eq!(claims.provider, "local");
}

#[tokio::test]
async fn test_register_missing_fields_is_400() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/register"))
        .json(&serde_json::json!({"username": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{base}/register"))
        .json(&serde_json::json!({"username": "", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "empty username counts as missing");
}

#[tokio::test]
async fn test_duplicate_username_is_409() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let body = serde_json::json!({"username": "alice", "password": "hunter2"});
    let resp = client.post(format!("{base}/register")).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.post(format!("{base}/register")).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_login_verifies_password() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/register"))
        .json(&serde_json::json!({"username": "alice", "password": "hunter2"}))
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap();

    let resp = client
        .post(format!("{base}/login"))
        .json(&serde_json::json!({"username": "alice", "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{base}/login"))
        .json(&serde_json::json!({"username": "nobody", "password": "hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401, "unknown user is indistinguishable from bad password");

    let body: serde_json::Value = client
        .post(format!("{base}/login"))
        .json(&serde_json::json!({"username": "alice", "password": "hunter2", "provider": "sso"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["provider"], "sso");

    let claims = taskcast_claims::decode(
        body["access_token"].as_str().unwrap(),
        SECRET.as_bytes(),
        Algorithm::HS256,
    )
    .unwrap();
    assert_eq!(claims.provider, "sso");
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

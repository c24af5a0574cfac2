use std::net::SocketAddr;

use axum::body::Body;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::client::KeyClient;
use common::crypto::KeyPairParams;
use common::key_format::HashAlgorithm;
use common::keystore::KeyStore;
use common::kid::Kid;
use service::http_server::{self, USER_HEADER};
use service::{Database, ServiceState};

async fn setup_router() -> Router {
    let db = Database::in_memory().await.unwrap();
    let config = http_server::Config::new(SocketAddr::from(([127, 0, 0, 1], 0)));
    http_server::router(config, ServiceState::new(db, 5))
}

async fn post_json(router: &Router, user: Option<&str>, path: &str, body: Value) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(user) = user {
        request = request.header(USER_HEADER, user);
    }
    let request = request.body(Body::from(body.to_string())).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Reserve a kid, generate a key pair under it and publish the public half
async fn publish_key(router: &Router, user: &str, client: &KeyClient) -> Kid {
    let (status, reserved) = post_json(router, Some(user), "/api/v0/key/reserve", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let kid: Kid = reserved["kid"].as_str().unwrap().parse().unwrap();

    client
        .generate_key_pair(KeyPairParams::rsa_oaep(
            "laptop key",
            kid,
            HashAlgorithm::Sha256,
        ))
        .await
        .unwrap();
    let public = client.export_public_key(&kid).unwrap().to_json().unwrap();

    let (status, uploaded) = post_json(
        router,
        Some(user),
        "/api/v0/key",
        json!({"kid": kid, "name": "laptop key", "key_b64": STANDARD.encode(public)}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(uploaded["kid"], json!(kid));
    kid
}

fn multipart_body(boundary: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"blob\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

async fn upload_content(router: &Router, user: &str, kid: &Kid, data: &[u8]) -> StatusCode {
    let boundary = "jailbird-boundary";
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v0/blob/{}/content", kid))
        .header(USER_HEADER, user)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, data)))
        .unwrap();
    router.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_status_routes() {
    let router = setup_router().await;

    for path in ["/_status/livez", "/_status/readyz", "/_status/version"] {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
    }
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let router = setup_router().await;
    let request = Request::builder()
        .uri("/nowhere")
        .header("accept", "application/json")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_requests_need_a_user() {
    let router = setup_router().await;
    let (status, _) = post_json(&router, None, "/api/v0/key/reserve", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reservation_cap_over_http() {
    let router = setup_router().await;

    let mut kids = Vec::new();
    for _ in 0..5 {
        let (_, body) = post_json(&router, Some("alice"), "/api/v0/key/reserve", json!({})).await;
        assert_eq!(body["reused"], json!(false));
        kids.push(body["kid"].clone());
    }
    let (_, body) = post_json(&router, Some("alice"), "/api/v0/key/reserve", json!({})).await;
    assert_eq!(body["reused"], json!(true));
    assert!(kids.contains(&body["kid"]));
}

#[tokio::test]
async fn test_key_upload_rejects_bad_material() {
    let router = setup_router().await;
    let (_, reserved) = post_json(&router, Some("alice"), "/api/v0/key/reserve", json!({})).await;

    let (status, _) = post_json(
        &router,
        Some("alice"),
        "/api/v0/key",
        json!({"kid": reserved["kid"], "name": "laptop key", "key_b64": "%%%"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &router,
        Some("alice"),
        "/api/v0/key",
        json!({"kid": reserved["kid"], "name": "laptop key", "key_b64": STANDARD.encode("{}")}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Neither attempt spent the reservation
    let (_, again) = post_json(&router, Some("alice"), "/api/v0/key/reserve", json!({})).await;
    assert_ne!(again["kid"], reserved["kid"]);
}

#[tokio::test]
async fn test_share_round_trip_over_http() {
    let router = setup_router().await;
    let alice = KeyClient::new(KeyStore::memory());
    let pubkey = publish_key(&router, "alice", &alice).await;

    // Duplicate upload of the same kid
    let public = alice.export_public_key(&pubkey).unwrap().to_json().unwrap();
    let (status, _) = post_json(
        &router,
        Some("alice"),
        "/api/v0/key",
        json!({"kid": pubkey, "name": "laptop key", "key_b64": STANDARD.encode(&public)}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Seal for the registry copy of the key
    let (_, downloaded) = post_json(
        &router,
        Some("bob"),
        "/api/v0/key/download",
        json!({"kid": pubkey}),
    )
    .await;
    let registry_bytes = STANDARD
        .decode(downloaded["key_b64"].as_str().unwrap())
        .unwrap();
    let recipient = common::client::parse_public_key(&registry_bytes).unwrap();
    let share = KeyClient::seal_for(&recipient, b"hello").unwrap();

    let (status, created) = post_json(
        &router,
        Some("alice"),
        "/api/v0/blob",
        json!({
            "key_b64": STANDARD.encode(&share.wrapped_key),
            "pubkey": pubkey,
            "file_name": "hello.txt",
            "iv_b64": STANDARD.encode(share.sealed.iv.as_bytes()),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let blob: Kid = created["kid"].as_str().unwrap().parse().unwrap();

    assert_eq!(
        upload_content(&router, "alice", &blob, &share.sealed.ciphertext).await,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        upload_content(&router, "alice", &blob, b"overwrite").await,
        StatusCode::NOT_FOUND
    );

    // Only the key owner gets the wrapped key back
    let (status, _) = post_json(&router, Some("bob"), "/api/v0/blob/key", json!({"kid": blob})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, key) = post_json(&router, Some("alice"), "/api/v0/blob/key", json!({"kid": blob})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(key["pubkey"], json!(pubkey));

    let (status, content) = post_json(
        &router,
        Some("alice"),
        "/api/v0/blob/download",
        json!({"kid": blob}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content["name"], json!("hello.txt"));

    let wrapped = STANDARD.decode(key["key_b64"].as_str().unwrap()).unwrap();
    let iv_bytes = STANDARD.decode(content["iv_b64"].as_str().unwrap()).unwrap();
    let iv = common::crypto::Iv::try_from(iv_bytes.as_slice()).unwrap();
    let ciphertext = STANDARD.decode(content["data_b64"].as_str().unwrap()).unwrap();
    let plaintext = alice.open(&pubkey, &wrapped, &iv, &ciphertext).unwrap();
    assert_eq!(plaintext, b"hello");
}

#[tokio::test]
async fn test_blob_for_unknown_key_is_bad_request() {
    let router = setup_router().await;
    let (status, _) = post_json(
        &router,
        Some("alice"),
        "/api/v0/blob",
        json!({
            "key_b64": STANDARD.encode(b"wrapped"),
            "pubkey": Kid::generate(),
            "file_name": "notes.txt",
            "iv_b64": STANDARD.encode([0u8; 12]),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = post_json(&router, Some("alice"), "/api/v0/blob/list", json!({})).await;
    assert_eq!(listed["blobs"], json!([]));
}

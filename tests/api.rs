//! End-to-end tests over the assembled router: route authorization policy,
//! bearer-token behavior (including the documented signature bypass), and
//! closed-schema search validation.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use stac_catalog_api::app::{build_router, build_state};
use stac_catalog_api::config::{AppEnv, Config};
use stac_catalog_api::services::extensions::ExtensionKind;

fn test_config() -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        app_env: AppEnv::Development,
        cors_allowed_origins: Vec::new(),
        enabled_extensions: ExtensionKind::ALL.to_vec(),
    }
}

fn test_app() -> Router {
    let config = test_config();
    let state = build_state(&config).expect("startup must succeed");
    build_router(state, &config)
}

/// A well-formed three-part token whose signature segment is garbage. The
/// validator accepts it anyway (known, deliberate behavior).
fn forged_token() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({ "sub": "tester" })).unwrap());
    format!("{header}.{payload}.not-a-signature")
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_and_landing_are_open() {
    let app = test_app();

    for uri in ["/health", "/", "/conformance"] {
        let res = app
            .clone()
            .oneshot(request(Method::GET, uri, None, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn search_requires_no_credentials() {
    let app = test_app();

    let res = app
        .oneshot(request(Method::POST, "/search", None, Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_route_without_header_gets_challenge() {
    let app = test_app();

    let res = app
        .oneshot(request(Method::GET, "/collections", None, None))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );

    let body = body_json(res).await;
    assert_eq!(body["error"]["message"], "could not validate credentials");
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let app = test_app();

    let res = app
        .oneshot(request(
            Method::GET,
            "/collections",
            Some("not-a-real-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn template_placeholders_gate_concrete_paths() {
    let app = test_app();

    let res = app
        .oneshot(request(
            Method::GET,
            "/collections/sentinel-2/items/some-item",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn method_outside_table_skips_authorization() {
    let app = test_app();

    // PATCH is not in the table even though other methods on this path are
    // protected; the request must reach the router without a 401.
    let res = app
        .oneshot(request(
            Method::PATCH,
            "/collections/sentinel-2/items",
            None,
            None,
        ))
        .await
        .unwrap();

    assert_ne!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn forged_token_passes_protected_routes() {
    let app = test_app();
    let token = forged_token();

    // Signature-bypass defect, end to end: a forged token both reads and
    // writes the protected surface.
    let res = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/collections",
            Some(&token),
            Some(json!({ "id": "sentinel-2", "description": "test collection" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .oneshot(request(Method::GET, "/collections", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["collections"][0]["id"], "sentinel-2");
}

#[tokio::test]
async fn unknown_search_field_is_rejected_closed_schema() {
    let app = test_app();

    let res = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/search",
            None,
            Some(json!({ "collections": ["s2"], "not_a_field": true })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(request(Method::GET, "/search?not_a_field=1", None, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_round_trip_with_context() {
    let app = test_app();
    let token = forged_token();

    let res = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/collections",
            Some(&token),
            Some(json!({ "id": "s2", "description": "test" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    for (id, datetime) in [("a", "2024-01-01T00:00:00Z"), ("b", "2024-06-01T00:00:00Z")] {
        let res = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/collections/s2/items",
                Some(&token),
                Some(json!({
                    "type": "Feature",
                    "id": id,
                    "bbox": [0.0, 0.0, 1.0, 1.0],
                    "properties": { "datetime": datetime },
                })),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/search",
            None,
            Some(json!({ "collections": ["s2"], "limit": 1 })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["features"].as_array().unwrap().len(), 1);
    // context extension is active in the default set
    assert_eq!(body["context"]["matched"], 2);
    assert_eq!(body["context"]["returned"], 1);

    // GET style goes through the same closed schema and backend
    let res = app
        .oneshot(request(
            Method::GET,
            "/search?collections=s2&datetime=2024-03-01T00:00:00Z/..",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["features"][0]["id"], "b");
}

#[tokio::test]
async fn delete_item_requires_token_but_delete_succeeds_with_one() {
    let app = test_app();
    let token = forged_token();

    let res = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/collections",
            Some(&token),
            Some(json!({ "id": "s2" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/collections/s2/items",
            Some(&token),
            Some(json!({ "id": "gone", "properties": {} })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            "/collections/s2/items/gone",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .oneshot(request(
            Method::DELETE,
            "/collections/s2/items/gone",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn bulk_items_are_all_or_nothing() {
    let app = test_app();
    let token = forged_token();

    let res = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/collections",
            Some(&token),
            Some(json!({ "id": "s2" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // A batch with a duplicate id must fail without inserting anything.
    let res = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/collections/s2/bulk_items",
            None,
            Some(json!({
                "items": [
                    { "id": "x", "properties": {} },
                    { "id": "x", "properties": {} },
                ]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(request(Method::POST, "/search", None, Some(json!({}))))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["context"]["matched"], 0);

    // Bulk route is owned by the bulk_transaction extension and is NOT in
    // the authorization table; it rides along unauthenticated.
    let res = app
        .oneshot(request(
            Method::POST,
            "/collections/s2/bulk_items",
            None,
            Some(json!({
                "items": [
                    { "id": "x", "properties": {} },
                    { "id": "y", "properties": {} },
                ]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["inserted"], 2);
}

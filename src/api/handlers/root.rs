/*
 * Responsibility
 * - GET / (landing page: links + conformance classes)
 * - GET /conformance
 * - GET /health (疎通用, 認証なし)
 */
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

const CORE_CONFORMANCE: &[&str] = &[
    "https://api.stacspec.org/v1.0.0/core",
    "https://api.stacspec.org/v1.0.0/item-search",
    "https://api.stacspec.org/v1.0.0/ogcapi-features",
];

fn conformance_classes(state: &AppState) -> Vec<&'static str> {
    let mut classes: Vec<&'static str> = CORE_CONFORMANCE.to_vec();
    classes.extend(state.registry.conformance_classes());
    classes
}

pub async fn landing_page(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "type": "Catalog",
        "id": "stac-catalog-api",
        "stac_version": "1.0.0",
        "description": "STAC catalog search API",
        "conformsTo": conformance_classes(&state),
        "links": [
            { "rel": "self", "href": "/", "type": "application/json" },
            { "rel": "conformance", "href": "/conformance", "type": "application/json" },
            { "rel": "data", "href": "/collections", "type": "application/json" },
            { "rel": "search", "href": "/search", "type": "application/geo+json" },
        ],
    }))
}

pub async fn conformance(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "conformsTo": conformance_classes(&state) }))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

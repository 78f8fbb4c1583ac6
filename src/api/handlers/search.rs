/*
 * Responsibility
 * - GET/POST /search
 * - Raw input → synthesized schema validation → SearchCriteria → backend
 * - context extension が有効なら response に context を付ける
 */
use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::{Map, Value};

use crate::api::dto::search::{ItemCollection, Link, SearchContext, criteria_from_get, criteria_from_post};
use crate::error::AppError;
use crate::repos::catalog::SearchCriteria;
use crate::state::AppState;

async fn run_search(
    state: &AppState,
    criteria: SearchCriteria,
) -> Result<ItemCollection, AppError> {
    let limit = criteria.limit;
    let page = state.backend.search(criteria).await?;

    let mut links = vec![Link {
        rel: "self",
        href: "/search".to_string(),
        media_type: "application/geo+json",
    }];
    if let Some(token) = &page.next_token {
        links.push(Link {
            rel: "next",
            href: format!("/search?token={token}"),
            media_type: "application/geo+json",
        });
    }

    let context = state
        .registry
        .get("context")
        .map(|_| SearchContext {
            returned: page.features.len(),
            limit,
            matched: page.matched,
        });

    Ok(ItemCollection {
        collection_type: "FeatureCollection",
        features: page.features,
        links,
        context,
    })
}

pub async fn search_get(
    State(state): State<AppState>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Result<Json<ItemCollection>, AppError> {
    // Query parameters are untyped text; lift them into a JSON map so the
    // same closed-schema validation path covers both styles.
    let params: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    state.search_get_schema.validate(&params)?;
    let criteria = criteria_from_get(&params)?;
    Ok(Json(run_search(&state, criteria).await?))
}

pub async fn search_post(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<ItemCollection>, AppError> {
    state.search_post_schema.validate(&payload)?;
    let criteria = criteria_from_post(&payload)?;
    Ok(Json(run_search(&state, criteria).await?))
}

/*
 * Responsibility
 * - /collections/{collectionId}/items 系の read handler (list/get)
 */
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::dto::search::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListItemsParams {
    pub limit: Option<usize>,
}

pub async fn list_items(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Query(params): Query<ListItemsParams>,
) -> Result<Json<Value>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let features = state.backend.list_items(&collection_id, limit).await?;

    Ok(Json(json!({
        "type": "FeatureCollection",
        "features": features,
        "links": [
            {
                "rel": "self",
                "href": format!("/collections/{collection_id}/items"),
                "type": "application/geo+json",
            },
        ],
    })))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path((collection_id, item_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let item = state.backend.get_item(&collection_id, &item_id).await?;
    Ok(Json(item))
}

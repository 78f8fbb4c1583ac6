/*
 * Responsibility
 * - /collections 系の read handler (list/get)
 * - 変更系 (create/update/delete) は transaction extension 側 (transactions.rs)
 */
use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::error::AppError;
use crate::state::AppState;

pub async fn list_collections(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let collections = state.backend.list_collections().await?;
    Ok(Json(json!({
        "collections": collections,
        "links": [
            { "rel": "self", "href": "/collections", "type": "application/json" },
        ],
    })))
}

pub async fn get_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let collection = state.backend.get_collection(&collection_id).await?;
    Ok(Json(collection))
}

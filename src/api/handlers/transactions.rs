/*
 * Responsibility
 * - transaction extension が所有する変更系 sub-route (collections/items CRUD)
 * - bulk_transaction extension の bulk insert
 *
 * These routers are contributed by the extension descriptors and merged into
 * the serving surface at assembly time. Authorization is NOT decided here:
 * the route authorization table gates these paths independently.
 */
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
};
use serde_json::{Value, json};

use crate::error::AppError;
use crate::repos::catalog::document_id;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/collections", post(create_collection).put(update_collection))
        .route("/collections/{collectionId}", delete(delete_collection))
        .route(
            "/collections/{collectionId}/items",
            post(create_item).put(update_item),
        )
        .route(
            "/collections/{collectionId}/items/{itemId}",
            delete(delete_item),
        )
}

pub fn bulk_routes() -> Router<AppState> {
    Router::new().route("/collections/{collectionId}/bulk_items", post(bulk_items))
}

async fn create_collection(
    State(state): State<AppState>,
    Json(collection): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let created = state.backend.create_collection(collection).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_collection(
    State(state): State<AppState>,
    Json(collection): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let updated = state.backend.update_collection(collection).await?;
    Ok(Json(updated))
}

async fn delete_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.backend.delete_collection(&collection_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_item(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(item): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let created = state.backend.create_item(&collection_id, item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_item(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(item): Json<Value>,
) -> Result<Json<Value>, AppError> {
    // The document carries its own id (legacy wire shape: PUT on the items
    // collection, no itemId segment).
    document_id(&item)?;
    let updated = state.backend.update_item(&collection_id, item).await?;
    Ok(Json(updated))
}

async fn delete_item(
    State(state): State<AppState>,
    Path((collection_id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state.backend.delete_item(&collection_id, &item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn bulk_items(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let items = payload
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| {
            AppError::bad_request("INVALID_BULK_REQUEST", "body must carry an 'items' array")
        })?;

    let inserted = state.backend.bulk_create_items(&collection_id, items).await?;
    Ok(Json(json!({ "inserted": inserted })))
}

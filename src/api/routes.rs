/*
 * Responsibility
 * - URL 構造を定義 (core routes + 各 extension の sub-router を merge)
 * - 認証の適用はここではなく route authorization table (middleware) が行う
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::handlers::{
    collections::{get_collection, list_collections},
    items::{get_item, list_items},
    root::{conformance, health, landing_page},
    search::{search_get, search_post},
};

pub fn routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new()
        .route("/", get(landing_page))
        .route("/conformance", get(conformance))
        .route("/health", get(health))
        .route("/search", get(search_get).post(search_post))
        .route("/collections", get(list_collections))
        .route("/collections/{collectionId}", get(get_collection))
        .route("/collections/{collectionId}/items", get(list_items))
        .route(
            "/collections/{collectionId}/items/{itemId}",
            get(get_item),
        );

    // Extension-owned sub-resources, registered independently of the schema
    // merge.
    for extension in state.registry.extensions() {
        if let Some(extension_routes) = extension.routes {
            router = router.merge(extension_routes());
        }
    }

    router
}

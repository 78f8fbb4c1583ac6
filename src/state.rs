/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 * - Everything inside is built once at startup and read-only afterwards;
 *   clones are cheap (Arc all the way down)
 */
use std::sync::Arc;

use crate::middleware::route_auth::RouteAuthTable;
use crate::repos::catalog::CatalogBackend;
use crate::services::extensions::ExtensionRegistry;
use crate::services::schema::SearchRequestSchema;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn CatalogBackend>,
    pub registry: Arc<ExtensionRegistry>,
    pub search_get_schema: Arc<SearchRequestSchema>,
    pub search_post_schema: Arc<SearchRequestSchema>,
    pub auth_table: Arc<RouteAuthTable>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        registry: Arc<ExtensionRegistry>,
        search_get_schema: Arc<SearchRequestSchema>,
        search_post_schema: Arc<SearchRequestSchema>,
        auth_table: Arc<RouteAuthTable>,
    ) -> Self {
        Self {
            backend,
            registry,
            search_get_schema,
            search_post_schema,
            auth_table,
        }
    }
}

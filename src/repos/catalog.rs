/*
 * Responsibility
 * - CatalogBackend: 実ストレージとの境界 (trait)
 * - RepoError: storage 層のエラー (AppError への変換は error.rs)
 *
 * The catalog engine itself (persistence, spatial indexing) is an external
 * collaborator; this trait is the whole contract the serving layer needs.
 */
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),
    #[error("item '{0}' does not exist")]
    ItemNotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidDocument(String),
}

/// Parsed, style-independent search input. The serving layer builds this
/// after validating the raw payload against the synthesized schema.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub collections: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
    pub bbox: Option<Vec<f64>>,
    pub datetime: Option<String>,
    pub limit: usize,
    pub query: Option<Value>,
    pub sortby: Option<Value>,
    pub fields: Option<Value>,
    pub token: Option<String>,
}

/// One page of search results plus the bookkeeping the handlers need to
/// build `context` and the `next` link.
#[derive(Debug, Default)]
pub struct SearchPage {
    pub features: Vec<Value>,
    pub matched: usize,
    pub next_token: Option<String>,
}

/// STAC documents are handled as raw JSON objects with a required `id`;
/// the serving layer does not interpret them beyond that.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<Value>, RepoError>;
    async fn get_collection(&self, collection_id: &str) -> Result<Value, RepoError>;
    async fn create_collection(&self, collection: Value) -> Result<Value, RepoError>;
    async fn update_collection(&self, collection: Value) -> Result<Value, RepoError>;
    async fn delete_collection(&self, collection_id: &str) -> Result<(), RepoError>;

    async fn list_items(
        &self,
        collection_id: &str,
        limit: usize,
    ) -> Result<Vec<Value>, RepoError>;
    async fn get_item(&self, collection_id: &str, item_id: &str) -> Result<Value, RepoError>;
    async fn create_item(&self, collection_id: &str, item: Value) -> Result<Value, RepoError>;
    async fn update_item(&self, collection_id: &str, item: Value) -> Result<Value, RepoError>;
    async fn delete_item(&self, collection_id: &str, item_id: &str) -> Result<(), RepoError>;
    async fn bulk_create_items(
        &self,
        collection_id: &str,
        items: Vec<Value>,
    ) -> Result<usize, RepoError>;

    async fn search(&self, criteria: SearchCriteria) -> Result<SearchPage, RepoError>;
}

/// Pull the `id` out of a STAC document.
pub fn document_id(doc: &Value) -> Result<String, RepoError> {
    doc.get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RepoError::InvalidDocument("document is missing a non-empty 'id'".into()))
}

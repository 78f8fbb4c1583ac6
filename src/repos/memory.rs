/*
 * Responsibility
 * - CatalogBackend の in-memory 参照実装 (dev / tests)
 * - Search filtering: collections/ids/bbox/datetime + query/sortby/fields
 *
 * Not a real engine: bbox overlap and property comparisons only. Anything
 * heavier belongs behind a real backend implementation.
 */
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use super::catalog::{CatalogBackend, RepoError, SearchCriteria, SearchPage, document_id};

#[derive(Debug, Default)]
struct CollectionEntry {
    collection: Value,
    // Insertion order preserved separately so listings are deterministic.
    order: Vec<String>,
    items: HashMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    // Lock is held only for synchronous map access, never across an await.
    collections: RwLock<HashMap<String, CollectionEntry>>,
    order: RwLock<Vec<String>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

fn item_matches(item: &Value, criteria: &SearchCriteria) -> bool {
    if let Some(ids) = &criteria.ids {
        let id = item.get("id").and_then(Value::as_str).unwrap_or_default();
        if !ids.iter().any(|want| want == id) {
            return false;
        }
    }

    if let Some(collections) = &criteria.collections {
        let c = item
            .get("collection")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !collections.iter().any(|want| want == c) {
            return false;
        }
    }

    if let Some(bbox) = &criteria.bbox {
        if !bbox_overlaps(bbox, item) {
            return false;
        }
    }

    if let Some(interval) = &criteria.datetime {
        if !datetime_matches(interval, item) {
            return false;
        }
    }

    if let Some(Value::Object(query)) = &criteria.query {
        if !query_matches(query, item) {
            return false;
        }
    }

    true
}

fn bbox_overlaps(bbox: &[f64], item: &Value) -> bool {
    if bbox.len() != 4 {
        return false;
    }
    let Some(item_bbox) = item.get("bbox").and_then(Value::as_array) else {
        return false;
    };
    let vals: Vec<f64> = item_bbox.iter().filter_map(Value::as_f64).collect();
    if vals.len() != 4 {
        return false;
    }
    bbox[0] <= vals[2] && bbox[2] >= vals[0] && bbox[1] <= vals[3] && bbox[3] >= vals[1]
}

fn item_datetime(item: &Value) -> Option<DateTime<FixedOffset>> {
    item.get("properties")?
        .get("datetime")?
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

/// `datetime` is either a single RFC 3339 instant or an interval
/// `start/end` where either bound may be open (`..` or empty).
fn datetime_matches(interval: &str, item: &Value) -> bool {
    let Some(ts) = item_datetime(item) else {
        return false;
    };

    match interval.split_once('/') {
        None => match DateTime::parse_from_rfc3339(interval) {
            Ok(instant) => ts == instant,
            Err(_) => false,
        },
        Some((start, end)) => {
            let after_start = match start {
                "" | ".." => true,
                s => DateTime::parse_from_rfc3339(s).map(|b| ts >= b).unwrap_or(false),
            };
            let before_end = match end {
                "" | ".." => true,
                e => DateTime::parse_from_rfc3339(e).map(|b| ts <= b).unwrap_or(false),
            };
            after_start && before_end
        }
    }
}

fn property(item: &Value, name: &str) -> Option<Value> {
    item.get("properties")?.get(name).cloned()
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// `query` extension semantics: `{ "<property>": { "<op>": value, .. }, .. }`
/// with ops eq/neq/lt/lte/gt/gte. Every clause must hold.
fn query_matches(query: &Map<String, Value>, item: &Value) -> bool {
    use std::cmp::Ordering::*;

    query.iter().all(|(prop, clauses)| {
        let Some(actual) = property(item, prop) else {
            return false;
        };
        let Some(clauses) = clauses.as_object() else {
            return false;
        };

        clauses.iter().all(|(op, expected)| {
            let ord = compare(&actual, expected);
            match op.as_str() {
                "eq" => actual == *expected,
                "neq" => actual != *expected,
                "lt" => matches!(ord, Some(Less)),
                "lte" => matches!(ord, Some(Less | Equal)),
                "gt" => matches!(ord, Some(Greater)),
                "gte" => matches!(ord, Some(Greater | Equal)),
                _ => false,
            }
        })
    })
}

/// `sortby` entries: `{ "field": "properties.datetime", "direction": "desc" }`.
fn apply_sort(features: &mut [Value], sortby: &Value) {
    let Some(entries) = sortby.as_array() else {
        return;
    };

    for entry in entries.iter().rev() {
        let Some(field) = entry.get("field").and_then(Value::as_str) else {
            continue;
        };
        let descending = entry.get("direction").and_then(Value::as_str) == Some("desc");
        let field = field.strip_prefix("properties.").unwrap_or(field);

        features.sort_by(|a, b| {
            let av = property(a, field).or_else(|| a.get(field).cloned());
            let bv = property(b, field).or_else(|| b.get(field).cloned());
            let ord = match (av, bv) {
                (Some(x), Some(y)) => compare(&x, &y).unwrap_or(std::cmp::Ordering::Equal),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            };
            if descending { ord.reverse() } else { ord }
        });
    }
}

/// `fields` extension projection: top-level or `properties.*` includes and
/// excludes. `id` and `collection` are always kept.
fn apply_fields(feature: &mut Value, fields: &Value) {
    let includes: Vec<&str> = fields
        .get("include")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let excludes: Vec<&str> = fields
        .get("exclude")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let Some(obj) = feature.as_object_mut() else {
        return;
    };

    if !includes.is_empty() {
        let keep: Vec<String> = obj
            .keys()
            .filter(|k| {
                let k = k.as_str();
                k == "id"
                    || k == "collection"
                    || includes
                        .iter()
                        .any(|inc| *inc == k || inc.starts_with(&format!("{k}.")))
            })
            .cloned()
            .collect();
        obj.retain(|k, _| keep.iter().any(|keep_k| keep_k == k));
    }

    for exc in excludes {
        if let Some(prop) = exc.strip_prefix("properties.") {
            if let Some(props) = obj.get_mut("properties").and_then(Value::as_object_mut) {
                props.remove(prop);
            }
        } else if exc != "id" && exc != "collection" {
            obj.remove(exc);
        }
    }
}

#[async_trait]
impl CatalogBackend for MemoryCatalog {
    async fn list_collections(&self) -> Result<Vec<Value>, RepoError> {
        let collections = self.collections.read().unwrap();
        let order = self.order.read().unwrap();
        Ok(order
            .iter()
            .filter_map(|id| collections.get(id).map(|e| e.collection.clone()))
            .collect())
    }

    async fn get_collection(&self, collection_id: &str) -> Result<Value, RepoError> {
        self.collections
            .read()
            .unwrap()
            .get(collection_id)
            .map(|e| e.collection.clone())
            .ok_or_else(|| RepoError::CollectionNotFound(collection_id.to_string()))
    }

    async fn create_collection(&self, collection: Value) -> Result<Value, RepoError> {
        let id = document_id(&collection)?;
        let mut collections = self.collections.write().unwrap();
        if collections.contains_key(&id) {
            return Err(RepoError::Conflict(format!("collection '{id}' already exists")));
        }
        collections.insert(
            id.clone(),
            CollectionEntry {
                collection: collection.clone(),
                ..Default::default()
            },
        );
        self.order.write().unwrap().push(id);
        Ok(collection)
    }

    async fn update_collection(&self, collection: Value) -> Result<Value, RepoError> {
        let id = document_id(&collection)?;
        let mut collections = self.collections.write().unwrap();
        let entry = collections
            .get_mut(&id)
            .ok_or_else(|| RepoError::CollectionNotFound(id.clone()))?;
        entry.collection = collection.clone();
        Ok(collection)
    }

    async fn delete_collection(&self, collection_id: &str) -> Result<(), RepoError> {
        let removed = self.collections.write().unwrap().remove(collection_id);
        if removed.is_none() {
            return Err(RepoError::CollectionNotFound(collection_id.to_string()));
        }
        self.order.write().unwrap().retain(|id| id != collection_id);
        Ok(())
    }

    async fn list_items(
        &self,
        collection_id: &str,
        limit: usize,
    ) -> Result<Vec<Value>, RepoError> {
        let collections = self.collections.read().unwrap();
        let entry = collections
            .get(collection_id)
            .ok_or_else(|| RepoError::CollectionNotFound(collection_id.to_string()))?;
        Ok(entry
            .order
            .iter()
            .take(limit)
            .filter_map(|id| entry.items.get(id).cloned())
            .collect())
    }

    async fn get_item(&self, collection_id: &str, item_id: &str) -> Result<Value, RepoError> {
        let collections = self.collections.read().unwrap();
        let entry = collections
            .get(collection_id)
            .ok_or_else(|| RepoError::CollectionNotFound(collection_id.to_string()))?;
        entry
            .items
            .get(item_id)
            .cloned()
            .ok_or_else(|| RepoError::ItemNotFound(item_id.to_string()))
    }

    async fn create_item(&self, collection_id: &str, mut item: Value) -> Result<Value, RepoError> {
        let id = document_id(&item)?;
        if let Some(obj) = item.as_object_mut() {
            obj.insert("collection".into(), Value::String(collection_id.to_string()));
        }

        let mut collections = self.collections.write().unwrap();
        let entry = collections
            .get_mut(collection_id)
            .ok_or_else(|| RepoError::CollectionNotFound(collection_id.to_string()))?;
        if entry.items.contains_key(&id) {
            return Err(RepoError::Conflict(format!("item '{id}' already exists")));
        }
        entry.items.insert(id.clone(), item.clone());
        entry.order.push(id);
        Ok(item)
    }

    async fn update_item(&self, collection_id: &str, mut item: Value) -> Result<Value, RepoError> {
        let id = document_id(&item)?;
        if let Some(obj) = item.as_object_mut() {
            obj.insert("collection".into(), Value::String(collection_id.to_string()));
        }

        let mut collections = self.collections.write().unwrap();
        let entry = collections
            .get_mut(collection_id)
            .ok_or_else(|| RepoError::CollectionNotFound(collection_id.to_string()))?;
        if !entry.items.contains_key(&id) {
            return Err(RepoError::ItemNotFound(id));
        }
        entry.items.insert(id, item.clone());
        Ok(item)
    }

    async fn delete_item(&self, collection_id: &str, item_id: &str) -> Result<(), RepoError> {
        let mut collections = self.collections.write().unwrap();
        let entry = collections
            .get_mut(collection_id)
            .ok_or_else(|| RepoError::CollectionNotFound(collection_id.to_string()))?;
        if entry.items.remove(item_id).is_none() {
            return Err(RepoError::ItemNotFound(item_id.to_string()));
        }
        entry.order.retain(|id| id != item_id);
        Ok(())
    }

    async fn bulk_create_items(
        &self,
        collection_id: &str,
        items: Vec<Value>,
    ) -> Result<usize, RepoError> {
        // All-or-nothing: every id is checked against the batch itself and
        // the stored items inside one write-lock critical section, before
        // anything is mutated. An error here leaves the collection untouched.
        let mut ids = Vec::with_capacity(items.len());
        for item in &items {
            ids.push(document_id(item)?);
        }

        let mut collections = self.collections.write().unwrap();
        let entry = collections
            .get_mut(collection_id)
            .ok_or_else(|| RepoError::CollectionNotFound(collection_id.to_string()))?;

        for (i, id) in ids.iter().enumerate() {
            if entry.items.contains_key(id) || ids[..i].contains(id) {
                return Err(RepoError::Conflict(format!("item '{id}' already exists")));
            }
        }

        let count = items.len();
        for (id, mut item) in ids.into_iter().zip(items) {
            if let Some(obj) = item.as_object_mut() {
                obj.insert("collection".into(), Value::String(collection_id.to_string()));
            }
            entry.items.insert(id.clone(), item);
            entry.order.push(id);
        }
        Ok(count)
    }

    async fn search(&self, criteria: SearchCriteria) -> Result<SearchPage, RepoError> {
        let mut features: Vec<Value> = {
            let collections = self.collections.read().unwrap();
            let order = self.order.read().unwrap();
            order
                .iter()
                .filter_map(|id| collections.get(id))
                .flat_map(|entry| {
                    entry
                        .order
                        .iter()
                        .filter_map(|id| entry.items.get(id).cloned())
                        .collect::<Vec<_>>()
                })
                .filter(|item| item_matches(item, &criteria))
                .collect()
        };

        if let Some(sortby) = &criteria.sortby {
            apply_sort(&mut features, sortby);
        }

        let matched = features.len();

        // Token is a plain offset; opaque encodings are a concern for real
        // backends, not this reference implementation.
        let offset: usize = criteria
            .token
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);

        let mut page: Vec<Value> = features
            .into_iter()
            .skip(offset)
            .take(criteria.limit)
            .collect();

        if let Some(fields) = &criteria.fields {
            for feature in &mut page {
                apply_fields(feature, fields);
            }
        }

        let next_token = if offset + page.len() < matched {
            Some((offset + page.len()).to_string())
        } else {
            None
        };

        Ok(SearchPage {
            features: page,
            matched,
            next_token,
        })
    }
}

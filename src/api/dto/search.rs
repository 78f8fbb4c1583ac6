/*
 * Responsibility
 * - Search の request/response DTO
 * - Validated payload (Map) → SearchCriteria への変換 (GET/POST 両 style)
 *
 * Validation against the synthesized schema happens before conversion; this
 * module only parses values it already knows are schema-shaped.
 */
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::repos::catalog::SearchCriteria;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 10_000;

#[derive(Debug, Serialize)]
pub struct Link {
    pub rel: &'static str,
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: &'static str,
}

/// `context` object contributed by the context extension.
#[derive(Debug, Serialize)]
pub struct SearchContext {
    pub returned: usize,
    pub limit: usize,
    pub matched: usize,
}

#[derive(Debug, Serialize)]
pub struct ItemCollection {
    #[serde(rename = "type")]
    pub collection_type: &'static str,
    pub features: Vec<Value>,
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<SearchContext>,
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT).max(1)
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|a| {
        a.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn csv_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build criteria from a schema-validated POST body.
pub fn criteria_from_post(payload: &Map<String, Value>) -> Result<SearchCriteria, AppError> {
    let bbox = match payload.get("bbox") {
        Some(Value::Array(values)) => {
            let parsed: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
            if parsed.len() != values.len() || !matches!(parsed.len(), 4 | 6) {
                return Err(AppError::bad_request(
                    "INVALID_SEARCH_REQUEST",
                    "bbox must be an array of 4 or 6 numbers",
                ));
            }
            Some(parsed)
        }
        _ => None,
    };

    // Schema validation only checks "is an integer"; negative or zero limits
    // are still an error, not a silent fall-back to the default.
    let limit = match payload.get("limit") {
        None | Some(Value::Null) => None,
        Some(value) => match value.as_u64() {
            Some(v) if v >= 1 => Some(v as usize),
            _ => {
                return Err(AppError::bad_request(
                    "INVALID_SEARCH_REQUEST",
                    "limit must be a positive integer",
                ));
            }
        },
    };

    Ok(SearchCriteria {
        collections: payload.get("collections").and_then(string_list),
        ids: payload.get("ids").and_then(string_list),
        bbox,
        datetime: payload
            .get("datetime")
            .and_then(Value::as_str)
            .map(str::to_string),
        limit: clamp_limit(limit),
        query: payload.get("query").cloned().filter(|v| !v.is_null()),
        sortby: payload.get("sortby").cloned().filter(|v| !v.is_null()),
        fields: payload.get("fields").cloned().filter(|v| !v.is_null()),
        token: payload
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Build criteria from schema-validated GET query parameters (all text).
///
/// GET encodings follow the usual conventions: csv for lists, JSON text for
/// `query`, `-field` prefix for descending sort, `+`/none for ascending,
/// csv of include/exclude (`-` prefix) for `fields`.
pub fn criteria_from_get(params: &Map<String, Value>) -> Result<SearchCriteria, AppError> {
    let text = |name: &str| params.get(name).and_then(Value::as_str);

    let bbox = match text("bbox") {
        None => None,
        Some(raw) => {
            let parsed: Result<Vec<f64>, _> =
                csv_list(raw).iter().map(|s| s.parse::<f64>()).collect();
            match parsed {
                Ok(values) if matches!(values.len(), 4 | 6) => Some(values),
                _ => {
                    return Err(AppError::bad_request(
                        "INVALID_SEARCH_REQUEST",
                        "bbox must be 4 or 6 comma-separated numbers",
                    ));
                }
            }
        }
    };

    let limit = match text("limit") {
        None => None,
        Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
            AppError::bad_request("INVALID_SEARCH_REQUEST", "limit must be a positive integer")
        })?),
    };

    let query = match text("query") {
        None => None,
        Some(raw) => Some(serde_json::from_str::<Value>(raw).map_err(|_| {
            AppError::bad_request("INVALID_SEARCH_REQUEST", "query must be JSON-encoded")
        })?),
    };

    let sortby = text("sortby").map(|raw| {
        let entries: Vec<Value> = csv_list(raw)
            .iter()
            .map(|spec| {
                let (field, direction) = match spec.strip_prefix('-') {
                    Some(field) => (field, "desc"),
                    None => (spec.strip_prefix('+').unwrap_or(spec), "asc"),
                };
                serde_json::json!({ "field": field, "direction": direction })
            })
            .collect();
        Value::Array(entries)
    });

    let fields = text("fields").map(|raw| {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for spec in csv_list(raw) {
            match spec.strip_prefix('-') {
                Some(field) => exclude.push(Value::String(field.to_string())),
                None => include.push(Value::String(
                    spec.strip_prefix('+').unwrap_or(&spec).to_string(),
                )),
            }
        }
        serde_json::json!({ "include": include, "exclude": exclude })
    });

    Ok(SearchCriteria {
        collections: text("collections").map(|raw| csv_list(raw)),
        ids: text("ids").map(|raw| csv_list(raw)),
        bbox,
        datetime: text("datetime").map(str::to_string),
        limit: clamp_limit(limit),
        query,
        sortby,
        fields,
        token: text("token").map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_criteria_defaults_limit() {
        let payload = json!({ "collections": ["s2"] });
        let criteria = criteria_from_post(payload.as_object().unwrap()).unwrap();
        assert_eq!(criteria.limit, DEFAULT_LIMIT);
        assert_eq!(criteria.collections.as_deref(), Some(&["s2".to_string()][..]));
    }

    #[test]
    fn post_rejects_non_positive_limit() {
        for limit in [-5, 0] {
            let payload = json!({ "limit": limit });
            assert!(
                criteria_from_post(payload.as_object().unwrap()).is_err(),
                "limit {limit} must be rejected"
            );
        }
    }

    #[test]
    fn post_rejects_bad_bbox_arity() {
        let payload = json!({ "bbox": [1.0, 2.0, 3.0] });
        assert!(criteria_from_post(payload.as_object().unwrap()).is_err());
    }

    #[test]
    fn get_criteria_parses_csv_and_sort_prefixes() {
        let payload = json!({
            "collections": "s2,landsat",
            "bbox": "0,0,10,10",
            "sortby": "-properties.datetime,+id",
            "limit": "25"
        });
        let criteria = criteria_from_get(payload.as_object().unwrap()).unwrap();

        assert_eq!(criteria.collections.as_ref().unwrap().len(), 2);
        assert_eq!(criteria.bbox.as_ref().unwrap().len(), 4);
        assert_eq!(criteria.limit, 25);

        let sortby = criteria.sortby.unwrap();
        assert_eq!(sortby[0]["direction"], "desc");
        assert_eq!(sortby[1]["field"], "id");
        assert_eq!(sortby[1]["direction"], "asc");
    }

    #[test]
    fn get_rejects_unparseable_limit() {
        let payload = json!({ "limit": "many" });
        assert!(criteria_from_get(payload.as_object().unwrap()).is_err());
    }
}

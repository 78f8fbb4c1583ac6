/*
 * Responsibility
 * - Capability extension descriptors (fields contributed to search requests,
 *   conformance URIs, optional sub-resource routes)
 * - The seven concrete extensions this deployment ships with
 */
mod registry;

use std::str::FromStr;

use axum::Router;
use serde_json::Value;

use crate::state::AppState;

pub use registry::ExtensionRegistry;

/// Which flavor of search request a field belongs to.
///
/// GET search parameters arrive as query-string text, so GET-style fields are
/// declared String regardless of their POST-style shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStyle {
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    /// Structural check used by the closed-schema validator.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl FieldDef {
    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }

    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }
}

/// A pluggable capability.
///
/// Built once at startup from `Config.enabled_extensions` and immutable
/// thereafter. Field contributions are merged into the search schemas by the
/// synthesizer; sub-resource routes are registered independently of the merge.
pub struct ExtensionDescriptor {
    pub id: &'static str,
    pub conformance: &'static [&'static str],
    pub get_fields: Vec<FieldDef>,
    pub post_fields: Vec<FieldDef>,
    /// When set, search requests may carry fields outside the synthesized
    /// schema without being rejected.
    pub allow_unknown_fields: bool,
    pub routes: Option<fn() -> Router<AppState>>,
}

impl ExtensionDescriptor {
    pub fn fields(&self, style: RequestStyle) -> &[FieldDef] {
        match style {
            RequestStyle::Get => &self.get_fields,
            RequestStyle::Post => &self.post_fields,
        }
    }
}

impl std::fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("id", &self.id)
            .field("get_fields", &self.get_fields)
            .field("post_fields", &self.post_fields)
            .field("allow_unknown_fields", &self.allow_unknown_fields)
            .field("has_routes", &self.routes.is_some())
            .finish()
    }
}

/// Extension identifiers accepted in `ENABLED_EXTENSIONS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Transaction,
    BulkTransaction,
    Fields,
    Query,
    Sort,
    TokenPagination,
    Context,
}

impl ExtensionKind {
    /// Default deployment: everything on, transactions first.
    pub const ALL: [ExtensionKind; 7] = [
        ExtensionKind::Transaction,
        ExtensionKind::BulkTransaction,
        ExtensionKind::Fields,
        ExtensionKind::Query,
        ExtensionKind::Sort,
        ExtensionKind::TokenPagination,
        ExtensionKind::Context,
    ];

    pub fn descriptor(&self) -> ExtensionDescriptor {
        match self {
            ExtensionKind::Transaction => transaction_extension(),
            ExtensionKind::BulkTransaction => bulk_transaction_extension(),
            ExtensionKind::Fields => fields_extension(),
            ExtensionKind::Query => query_extension(),
            ExtensionKind::Sort => sort_extension(),
            ExtensionKind::TokenPagination => token_pagination_extension(),
            ExtensionKind::Context => context_extension(),
        }
    }
}

impl FromStr for ExtensionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transaction" => Ok(Self::Transaction),
            "bulk_transaction" => Ok(Self::BulkTransaction),
            "fields" => Ok(Self::Fields),
            "query" => Ok(Self::Query),
            "sort" => Ok(Self::Sort),
            "token_pagination" => Ok(Self::TokenPagination),
            "context" => Ok(Self::Context),
            _ => Err(()),
        }
    }
}

pub fn transaction_extension() -> ExtensionDescriptor {
    ExtensionDescriptor {
        id: "transaction",
        conformance: &[
            "https://api.stacspec.org/v1.0.0/ogcapi-features/extensions/transaction",
        ],
        get_fields: Vec::new(),
        post_fields: Vec::new(),
        allow_unknown_fields: false,
        routes: Some(crate::api::handlers::transactions::routes),
    }
}

pub fn bulk_transaction_extension() -> ExtensionDescriptor {
    ExtensionDescriptor {
        id: "bulk_transaction",
        conformance: &[],
        get_fields: Vec::new(),
        post_fields: Vec::new(),
        allow_unknown_fields: false,
        routes: Some(crate::api::handlers::transactions::bulk_routes),
    }
}

pub fn fields_extension() -> ExtensionDescriptor {
    ExtensionDescriptor {
        id: "fields",
        conformance: &["https://api.stacspec.org/v1.0.0/item-search#fields"],
        get_fields: vec![FieldDef::optional("fields", FieldType::String)],
        post_fields: vec![FieldDef::optional("fields", FieldType::Object)],
        allow_unknown_fields: false,
        routes: None,
    }
}

pub fn query_extension() -> ExtensionDescriptor {
    ExtensionDescriptor {
        id: "query",
        conformance: &["https://api.stacspec.org/v1.0.0/item-search#query"],
        get_fields: vec![FieldDef::optional("query", FieldType::String)],
        post_fields: vec![FieldDef::optional("query", FieldType::Object)],
        allow_unknown_fields: false,
        routes: None,
    }
}

pub fn sort_extension() -> ExtensionDescriptor {
    ExtensionDescriptor {
        id: "sort",
        conformance: &["https://api.stacspec.org/v1.0.0/item-search#sort"],
        get_fields: vec![FieldDef::optional("sortby", FieldType::String)],
        post_fields: vec![FieldDef::optional("sortby", FieldType::Array)],
        allow_unknown_fields: false,
        routes: None,
    }
}

pub fn token_pagination_extension() -> ExtensionDescriptor {
    ExtensionDescriptor {
        id: "token_pagination",
        conformance: &[],
        get_fields: vec![FieldDef::optional("token", FieldType::String)],
        post_fields: vec![FieldDef::optional("token", FieldType::String)],
        allow_unknown_fields: false,
        routes: None,
    }
}

pub fn context_extension() -> ExtensionDescriptor {
    ExtensionDescriptor {
        id: "context",
        conformance: &["https://api.stacspec.org/v1.0.0/item-search#context"],
        get_fields: Vec::new(),
        post_fields: Vec::new(),
        allow_unknown_fields: false,
        routes: None,
    }
}

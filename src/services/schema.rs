/*
 * Responsibility
 * - Base search schema (GET / POST flavors)
 * - Startup-time synthesis: base fields + registry contributions, last wins
 * - Closed-schema validation of incoming search payloads
 */
use serde_json::{Map, Value};

use crate::error::StartupError;
use crate::services::extensions::{ExtensionRegistry, FieldDef, FieldType, RequestStyle};

/// Base search fields shared by every deployment. Extensions layer on top of
/// these; they can re-type a non-required base field but never drop one.
pub fn base_fields(style: RequestStyle) -> Vec<FieldDef> {
    match style {
        // Query-string parameters arrive as text.
        RequestStyle::Get => vec![
            FieldDef::optional("collections", FieldType::String),
            FieldDef::optional("ids", FieldType::String),
            FieldDef::optional("bbox", FieldType::String),
            FieldDef::optional("datetime", FieldType::String),
            FieldDef::optional("limit", FieldType::String),
        ],
        RequestStyle::Post => vec![
            FieldDef::optional("collections", FieldType::Array),
            FieldDef::optional("ids", FieldType::Array),
            FieldDef::optional("bbox", FieldType::Array),
            FieldDef::optional("intersects", FieldType::Object),
            FieldDef::optional("datetime", FieldType::String),
            FieldDef::optional("limit", FieldType::Integer),
        ],
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaViolation {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field '{field}' must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// The synthesized shape of a valid search request for one style.
///
/// Built exactly once per style at startup and shared read-only across all
/// request validations.
#[derive(Debug)]
pub struct SearchRequestSchema {
    style: RequestStyle,
    fields: Vec<FieldDef>,
    allow_unknown: bool,
}

impl SearchRequestSchema {
    /// Merge `base` with the registry's contributions for `style`.
    ///
    /// An extension may not shadow a required base field with a different
    /// type or weaken it to optional; that is a configuration error and
    /// aborts startup.
    pub fn synthesize(
        base: Vec<FieldDef>,
        registry: &ExtensionRegistry,
        style: RequestStyle,
    ) -> Result<Self, StartupError> {
        let mut fields = base;

        for contributed in registry.fields_for(style) {
            match fields.iter_mut().find(|f| f.name == contributed.name) {
                Some(existing) => {
                    if existing.required
                        && (contributed.ty != existing.ty || !contributed.required)
                    {
                        return Err(StartupError::SchemaConflict {
                            field: existing.name,
                        });
                    }
                    *existing = contributed;
                }
                None => fields.push(contributed),
            }
        }

        Ok(Self {
            style,
            fields,
            allow_unknown: registry.allows_unknown_fields(),
        })
    }

    pub fn style(&self) -> RequestStyle {
        self.style
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Closed-schema validation: unknown fields are rejected (unless an
    /// active extension opened the schema), required fields must be present,
    /// declared types must match. `null` is treated as absent.
    pub fn validate(&self, payload: &Map<String, Value>) -> Result<(), SchemaViolation> {
        if !self.allow_unknown {
            for name in payload.keys() {
                if self.field(name).is_none() {
                    return Err(SchemaViolation::UnknownField(name.clone()));
                }
            }
        }

        for def in &self.fields {
            match payload.get(def.name) {
                None | Some(Value::Null) => {
                    if def.required {
                        return Err(SchemaViolation::MissingField(def.name));
                    }
                }
                Some(value) => {
                    if !def.ty.matches(value) {
                        return Err(SchemaViolation::WrongType {
                            field: def.name,
                            expected: def.ty.name(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extensions::{ExtensionDescriptor, ExtensionKind};
    use serde_json::json;

    fn ext(id: &'static str, post_fields: Vec<FieldDef>) -> ExtensionDescriptor {
        ExtensionDescriptor {
            id,
            conformance: &[],
            get_fields: Vec::new(),
            post_fields,
            allow_unknown_fields: false,
            routes: None,
        }
    }

    fn default_registry() -> ExtensionRegistry {
        ExtensionRegistry::new(ExtensionKind::ALL.iter().map(|k| k.descriptor()).collect())
    }

    #[test]
    fn base_fields_survive_synthesis_in_both_styles() {
        let registry = default_registry();

        for style in [RequestStyle::Get, RequestStyle::Post] {
            let schema =
                SearchRequestSchema::synthesize(base_fields(style), &registry, style).unwrap();
            for base in base_fields(style) {
                assert!(schema.field(base.name).is_some(), "missing {}", base.name);
            }
        }
    }

    #[test]
    fn styles_differ_in_contributed_field_types() {
        let registry = default_registry();

        let get =
            SearchRequestSchema::synthesize(base_fields(RequestStyle::Get), &registry, RequestStyle::Get)
                .unwrap();
        let post = SearchRequestSchema::synthesize(
            base_fields(RequestStyle::Post),
            &registry,
            RequestStyle::Post,
        )
        .unwrap();

        assert_eq!(get.field("sortby").unwrap().ty, FieldType::String);
        assert_eq!(post.field("sortby").unwrap().ty, FieldType::Array);
    }

    #[test]
    fn later_extension_overrides_earlier_field() {
        let registry = ExtensionRegistry::new(vec![
            ext("first", vec![FieldDef::optional("filter", FieldType::String)]),
            ext("second", vec![FieldDef::optional("filter", FieldType::Object)]),
        ]);

        let schema = SearchRequestSchema::synthesize(
            base_fields(RequestStyle::Post),
            &registry,
            RequestStyle::Post,
        )
        .unwrap();

        assert_eq!(schema.field("filter").unwrap().ty, FieldType::Object);
    }

    #[test]
    fn required_base_field_cannot_be_weakened() {
        let base = vec![FieldDef::required("collections", FieldType::Array)];
        let registry = ExtensionRegistry::new(vec![ext(
            "rogue",
            vec![FieldDef::optional("collections", FieldType::Array)],
        )]);

        let err = SearchRequestSchema::synthesize(base, &registry, RequestStyle::Post)
            .unwrap_err();
        assert!(matches!(
            err,
            StartupError::SchemaConflict {
                field: "collections"
            }
        ));
    }

    #[test]
    fn required_base_field_cannot_change_type() {
        let base = vec![FieldDef::required("limit", FieldType::Integer)];
        let registry = ExtensionRegistry::new(vec![ext(
            "rogue",
            vec![FieldDef::required("limit", FieldType::String)],
        )]);

        let err =
            SearchRequestSchema::synthesize(base, &registry, RequestStyle::Post).unwrap_err();
        assert!(matches!(err, StartupError::SchemaConflict { field: "limit" }));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let registry = default_registry();
        let schema = SearchRequestSchema::synthesize(
            base_fields(RequestStyle::Post),
            &registry,
            RequestStyle::Post,
        )
        .unwrap();

        let payload = json!({ "collections": ["a"], "not_a_field": 1 });
        let err = schema.validate(payload.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, SchemaViolation::UnknownField(name) if name == "not_a_field"));
    }

    #[test]
    fn open_schema_extension_admits_unknown_fields() {
        let registry = ExtensionRegistry::new(vec![ExtensionDescriptor {
            id: "permissive",
            conformance: &[],
            get_fields: Vec::new(),
            post_fields: Vec::new(),
            allow_unknown_fields: true,
            routes: None,
        }]);
        let schema = SearchRequestSchema::synthesize(
            base_fields(RequestStyle::Post),
            &registry,
            RequestStyle::Post,
        )
        .unwrap();

        let payload = json!({ "anything": "goes" });
        assert!(schema.validate(payload.as_object().unwrap()).is_ok());
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let registry = default_registry();
        let schema = SearchRequestSchema::synthesize(
            base_fields(RequestStyle::Post),
            &registry,
            RequestStyle::Post,
        )
        .unwrap();

        let payload = json!({ "limit": "ten" });
        let err = schema.validate(payload.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, SchemaViolation::WrongType { field: "limit", .. }));
    }
}

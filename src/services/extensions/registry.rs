/*
 * Responsibility
 * - Ordered, immutable set of active extensions
 * - Merged field view per request style (registration order, last writer wins)
 */
use super::{ExtensionDescriptor, FieldDef, RequestStyle};

/// Built once at startup; no removal, no re-registration. A fresh registry is
/// built for a fresh configuration.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    extensions: Vec<ExtensionDescriptor>,
}

impl ExtensionRegistry {
    pub fn new(extensions: Vec<ExtensionDescriptor>) -> Self {
        Self { extensions }
    }

    pub fn extensions(&self) -> &[ExtensionDescriptor] {
        &self.extensions
    }

    pub fn get(&self, id: &str) -> Option<&ExtensionDescriptor> {
        self.extensions.iter().find(|e| e.id == id)
    }

    /// Merged contributed fields for one request style.
    ///
    /// Iterates extensions in registration order; a later extension that
    /// redeclares an already-contributed name replaces the earlier definition
    /// in place. First-seen position is kept so the merged order is stable.
    pub fn fields_for(&self, style: RequestStyle) -> Vec<FieldDef> {
        let mut merged: Vec<FieldDef> = Vec::new();

        for ext in &self.extensions {
            for field in ext.fields(style) {
                match merged.iter_mut().find(|f| f.name == field.name) {
                    Some(existing) => *existing = field.clone(),
                    None => merged.push(field.clone()),
                }
            }
        }

        merged
    }

    /// True when any active extension opens the schema to arbitrary fields.
    pub fn allows_unknown_fields(&self) -> bool {
        self.extensions.iter().any(|e| e.allow_unknown_fields)
    }

    pub fn conformance_classes(&self) -> Vec<&'static str> {
        self.extensions
            .iter()
            .flat_map(|e| e.conformance.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extensions::FieldType;

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

    #[test]
    fn later_registration_wins_on_name_collision() {
        let registry = ExtensionRegistry::new(vec![
            ext("a", vec![FieldDef::optional("token", FieldType::Integer)]),
            ext("b", vec![FieldDef::optional("token", FieldType::String)]),
        ]);

        let fields = registry.fields_for(RequestStyle::Post);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].ty, FieldType::String);
    }

    #[test]
    fn merge_preserves_first_seen_order() {
        let registry = ExtensionRegistry::new(vec![
            ext(
                "a",
                vec![
                    FieldDef::optional("sortby", FieldType::Array),
                    FieldDef::optional("token", FieldType::String),
                ],
            ),
            ext("b", vec![FieldDef::optional("sortby", FieldType::Object)]),
        ]);

        let fields = registry.fields_for(RequestStyle::Post);
        let names: Vec<&str> = fields.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["sortby", "token"]);
        // Overwritten in place, not re-appended.
        assert_eq!(fields[0].ty, FieldType::Object);
    }

    #[test]
    fn styles_are_independent() {
        let registry = ExtensionRegistry::new(vec![ExtensionDescriptor {
            id: "fields",
            conformance: &[],
            get_fields: vec![FieldDef::optional("fields", FieldType::String)],
            post_fields: vec![FieldDef::optional("fields", FieldType::Object)],
            allow_unknown_fields: false,
            routes: None,
        }]);

        assert_eq!(
            registry.fields_for(RequestStyle::Get)[0].ty,
            FieldType::String
        );
        assert_eq!(
            registry.fields_for(RequestStyle::Post)[0].ty,
            FieldType::Object
        );
    }
}

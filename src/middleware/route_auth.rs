//! Route-scoped authorization, layered on top of normal route registration.
//!
//! A declarative table maps (path template, method) to an ordered guard chain
//! that must pass before the underlying handler runs. Matching is structural
//! (segment by segment, `{placeholder}` matches any single non-empty
//! segment), independent of axum's own dispatch: a route can exist in the
//! router without appearing here, in which case it is unauthenticated.
//!
//! Two rules that could both match some concrete (path, method) are an
//! ambiguous security policy; table construction rejects them at startup.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::{Method, Request},
    middleware::{self, Next},
    response::Response,
};

use crate::error::{AppError, StartupError};
use crate::state::AppState;

/// A pre-handler dependency check. Guards may stash data (e.g. token claims)
/// in request extensions for downstream handlers.
#[async_trait]
pub trait RouteGuard: Send + Sync {
    async fn check(&self, req: &mut Request<Body>) -> Result<(), AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder,
}

/// A parsed path template such as `/collections/{collectionId}/items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with('{') && s.ends_with('}') {
                    Segment::Placeholder
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            raw: template.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Structural match: equal segment count, literal segments compare
    /// exactly, placeholders accept any single non-empty segment.
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return false;
        }

        self.segments.iter().zip(parts).all(|(seg, part)| match seg {
            Segment::Literal(lit) => lit == part,
            Segment::Placeholder => !part.is_empty(),
        })
    }

    /// True when some concrete path could match both templates.
    fn overlaps(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| match (a, b) {
                    (Segment::Literal(x), Segment::Literal(y)) => x == y,
                    _ => true,
                })
    }
}

pub struct RouteAuthRule {
    pub template: PathTemplate,
    pub method: Method,
    pub guards: Vec<Arc<dyn RouteGuard>>,
}

impl RouteAuthRule {
    pub fn new(template: &str, method: Method, guards: Vec<Arc<dyn RouteGuard>>) -> Self {
        Self {
            template: PathTemplate::parse(template),
            method,
            guards,
        }
    }
}

impl std::fmt::Debug for RouteAuthRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteAuthRule")
            .field("template", &self.template.raw)
            .field("method", &self.method)
            .field("guards", &self.guards.len())
            .finish()
    }
}

/// Immutable after startup; consulted once per request.
#[derive(Debug, Default)]
pub struct RouteAuthTable {
    rules: Vec<RouteAuthRule>,
}

impl RouteAuthTable {
    /// Fails fast when two rules could both match the same (path, method);
    /// ambiguity is never resolved silently by precedence.
    pub fn new(rules: Vec<RouteAuthRule>) -> Result<Self, StartupError> {
        for (i, a) in rules.iter().enumerate() {
            for b in &rules[i + 1..] {
                if a.method == b.method && a.template.overlaps(&b.template) {
                    return Err(StartupError::AmbiguousRouteRule {
                        path: a.template.raw.clone(),
                        method: a.method.to_string(),
                    });
                }
            }
        }

        Ok(Self { rules })
    }

    /// At most one rule can match thanks to the construction-time check.
    pub fn lookup(&self, path: &str, method: &Method) -> Option<&RouteAuthRule> {
        self.rules
            .iter()
            .find(|r| r.method == *method && r.template.matches(path))
    }

    pub fn rules(&self) -> &[RouteAuthRule] {
        &self.rules
    }
}

/// Install the table as router-level middleware.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, route_auth_middleware))
}

async fn route_auth_middleware(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(rule) = state.auth_table.lookup(original_uri.path(), req.method()) {
        // Guards run in declaration order; the first failure wins.
        for guard in &rule.guards {
            guard.check(&mut req).await?;
        }
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(template: &str, method: Method) -> RouteAuthRule {
        RouteAuthRule::new(template, method, Vec::new())
    }

    #[test]
    fn placeholder_matches_any_single_segment() {
        let t = PathTemplate::parse("/collections/{collectionId}/items");
        assert!(t.matches("/collections/sentinel-2/items"));
        assert!(t.matches("/collections/x/items/"));
        assert!(!t.matches("/collections/items"));
        assert!(!t.matches("/collections/a/b/items"));
        assert!(!t.matches("/collections/sentinel-2/item"));
    }

    #[test]
    fn literal_segments_must_match_exactly() {
        let t = PathTemplate::parse("/collections");
        assert!(t.matches("/collections"));
        assert!(!t.matches("/collection"));
        assert!(!t.matches("/collections/x"));
    }

    #[test]
    fn lookup_distinguishes_methods() {
        let table = RouteAuthTable::new(vec![
            rule("/collections", Method::GET),
            rule("/collections", Method::POST),
        ])
        .unwrap();

        assert!(table.lookup("/collections", &Method::GET).is_some());
        assert!(table.lookup("/collections", &Method::PUT).is_none());
        assert!(table.lookup("/collections", &Method::PATCH).is_none());
    }

    #[test]
    fn unlisted_path_has_no_rule() {
        let table =
            RouteAuthTable::new(vec![rule("/collections/{collectionId}", Method::GET)]).unwrap();
        assert!(table.lookup("/search", &Method::GET).is_none());
    }

    #[test]
    fn duplicate_rules_are_rejected_at_startup() {
        let err = RouteAuthTable::new(vec![
            rule("/collections/{collectionId}", Method::DELETE),
            rule("/collections/{collectionId}", Method::DELETE),
        ])
        .unwrap_err();

        assert!(matches!(err, StartupError::AmbiguousRouteRule { .. }));
    }

    #[test]
    fn overlapping_templates_are_rejected_at_startup() {
        // `{collectionId}` can take the value `featured`, so both rules
        // would match GET /collections/featured.
        let err = RouteAuthTable::new(vec![
            rule("/collections/{collectionId}", Method::GET),
            rule("/collections/featured", Method::GET),
        ])
        .unwrap_err();

        assert!(matches!(err, StartupError::AmbiguousRouteRule { .. }));
    }

    #[test]
    fn same_template_different_method_is_fine() {
        assert!(
            RouteAuthTable::new(vec![
                rule("/collections/{collectionId}", Method::GET),
                rule("/collections/{collectionId}", Method::DELETE),
            ])
            .is_ok()
        );
    }
}

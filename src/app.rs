/*
 * Responsibility
 * - Config読み込み → extension registry → schema synthesis → Router 組み立て
 * - Route authorization table の構築 (protected route set はここで宣言)
 * - Middleware の適用 (route auth / CORS / request-id / trace)
 * - axum::serve() で起動
 */
use std::sync::Arc;
use std::{panic, process};

use anyhow::Result;
use axum::Router;
use axum::http::Method;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::StartupError;
use crate::middleware::{cors, http, route_auth};
use crate::middleware::route_auth::{RouteAuthRule, RouteAuthTable, RouteGuard};
use crate::repos::memory::MemoryCatalog;
use crate::services::auth::TokenValidator;
use crate::services::extensions::ExtensionRegistry;
use crate::services::schema::{SearchRequestSchema, base_fields};
use crate::services::extensions::RequestStyle;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Surface panics via tracing so they don't get lost when stderr is
        // hidden by the launcher.
        tracing::error!(?info, "panic");

        // Development: fail fast. Production: default behavior, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

/// The route authorization table for this deployment: every management route
/// requires a bearer token; browsing and search stay open.
pub fn route_auth_rules() -> Result<RouteAuthTable, StartupError> {
    let validator: Arc<dyn RouteGuard> = Arc::new(TokenValidator::new());
    let guarded = |path: &str, method: Method| {
        RouteAuthRule::new(path, method, vec![validator.clone()])
    };

    RouteAuthTable::new(vec![
        guarded("/collections", Method::GET),
        guarded("/collections", Method::POST),
        guarded("/collections", Method::PUT),
        guarded("/collections/{collectionId}", Method::GET),
        guarded("/collections/{collectionId}", Method::DELETE),
        guarded("/collections/{collectionId}/items", Method::GET),
        guarded("/collections/{collectionId}/items", Method::POST),
        guarded("/collections/{collectionId}/items", Method::PUT),
        guarded("/collections/{collectionId}/items/{itemId}", Method::GET),
        guarded("/collections/{collectionId}/items/{itemId}", Method::DELETE),
    ])
}

/// Build process-level services and the read-only schemas/tables, then pack
/// them into the shared application state. Any error here aborts startup.
pub fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let registry = Arc::new(ExtensionRegistry::new(
        config
            .enabled_extensions
            .iter()
            .map(|kind| kind.descriptor())
            .collect(),
    ));

    let search_get_schema = SearchRequestSchema::synthesize(
        base_fields(RequestStyle::Get),
        &registry,
        RequestStyle::Get,
    )?;
    let search_post_schema = SearchRequestSchema::synthesize(
        base_fields(RequestStyle::Post),
        &registry,
        RequestStyle::Post,
    )?;

    let auth_table = route_auth_rules()?;

    Ok(AppState::new(
        Arc::new(MemoryCatalog::new()),
        registry,
        Arc::new(search_get_schema),
        Arc::new(search_post_schema),
        Arc::new(auth_table),
    ))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let routed = api::routes(&state);
    let routed = route_auth::apply(routed, state.clone());

    let router = routed.with_state(state);
    let router = cors::apply(router, config);
    http::apply(router)
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    let state = build_state(&config)?;

    tracing::info!(
        addr = %config.addr,
        env = ?config.app_env,
        extensions = ?config.enabled_extensions,
        "starting catalog API"
    );

    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

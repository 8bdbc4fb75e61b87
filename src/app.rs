//! Router assembly and shared application state.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post, MethodRouter};
use axum::{middleware, Extension, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, StoreBackend};
use crate::database::{MemoryStore, PgStore, Store};
use crate::handlers::protected::{ledger, resource, users, ResourceRef};
use crate::handlers::public;
use crate::middleware::jwt_auth_middleware;
use crate::observer::ObserverPipeline;
use crate::schema::{ResourceDef, RESOURCES};
use crate::services::ResourceService;

#[derive(Clone)]
pub struct AppState {
    pub service: ResourceService,
}

impl AppState {
    /// State over the given store with every default observer registered
    pub fn new(store: Arc<dyn Store>) -> Self {
        let pipeline = Arc::new(ObserverPipeline::with_default_observers());
        Self { service: ResourceService::new(store, pipeline) }
    }
}

/// Store selected by `database.backend`
pub fn build_store(config: &AppConfig) -> Arc<dyn Store> {
    match config.database.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Postgres => Arc::new(PgStore::new()),
    }
}

/// Register `path` and `path/` with the same method router
fn both<S: Clone + Send + Sync + 'static>(router: Router<S>, path: &str, methods: MethodRouter<S>) -> Router<S> {
    router.route(path, methods.clone()).route(&format!("{}/", path), methods)
}

fn resource_routes(def: &'static ResourceDef) -> Router<AppState> {
    let base = def.route();
    let collection = get(resource::list).post(resource::create);
    let member = get(resource::retrieve)
        .put(resource::replace)
        .patch(resource::patch)
        .delete(resource::destroy);

    let router = both(Router::new(), &base, collection);
    both(router, &format!("{}/:id", base), member).layer(Extension(ResourceRef(def)))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();
    // Static segments win over `:id`, so these coexist with the member routes
    router = both(router, "/api/core/users/me", get(users::users_me));
    router = both(router, "/api/financial/ledger/summary", get(ledger::ledger_summary));
    for def in RESOURCES {
        router = router.merge(resource_routes(*def));
    }
    router.route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn public_routes() -> Router<AppState> {
    let router = Router::new().route("/", get(public::root)).route("/health", get(public::health));
    let router = both(router, "/api/token", post(public::token_obtain));
    both(router, "/api/token/refresh", post(public::token_refresh))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = &config.security.cors_origins;
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new().allow_origin(allowed).allow_methods(Any).allow_headers(Any)
}

/// The full HTTP surface
pub fn app(state: AppState) -> Router {
    let config = crate::config::config();

    let mut router = public_routes()
        .merge(protected_routes(&state))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(config));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

//! Router assembly for both services.
//!
//! Each service exposes a public `/health` route and a group of routes behind
//! the token authentication middleware. Both routers carry a tracing layer.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::LedgerState, state::SettlementState};

/// Build the Ledger Service router.
pub fn ledger_router(state: LedgerState) -> Router {
    let authenticated_routes = Router::new()
        .route(
            "/lock",
            put(handlers::ledger::acquire_lock).delete(handlers::ledger::release_lock),
        )
        .route(
            "/balance/{owner_id}/{account}",
            get(handlers::ledger::get_balance).put(handlers::ledger::put_balance),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.credentials.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::ledger_health))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the Settlement Service router.
///
/// The batch consumer is not started here; the caller spawns it with the
/// same queue and stats held by `state`.
pub fn settlement_router(state: SettlementState) -> Router {
    let authenticated_routes = Router::new()
        .route(
            "/balance/{account}",
            get(handlers::settlement::get_balance),
        )
        .route(
            "/deposit/{account}/{amount}",
            post(handlers::settlement::deposit),
        )
        .route(
            "/withdraw/{account}/{amount}",
            post(handlers::settlement::withdraw),
        )
        .route(
            "/transfer/{debit}/{credit}/{amount}",
            post(handlers::settlement::transfer),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.credentials.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::settlement_health))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

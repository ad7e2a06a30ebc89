use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{admin, balance, order, public};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/public/register", post(public::register))
        .route("/public/instrument", get(public::list_instruments))
        .route("/public/orderbook/:ticker", get(public::orderbook))
        .route("/public/transactions/:ticker", get(public::transactions));

    let balance_routes = Router::new().route("/balance", get(balance::get_balance));

    let order_routes = Router::new()
        .route("/order", post(order::submit).get(order::list))
        .route("/order/:id", get(order::get).delete(order::cancel));

    let admin_routes = Router::new()
        .route("/admin/user/:id", delete(admin::delete_user))
        .route("/admin/instrument", post(admin::add_instrument))
        .route("/admin/instrument/:ticker", delete(admin::delete_instrument))
        .route("/admin/balance/deposit", post(admin::deposit))
        .route("/admin/balance/withdraw", post(admin::withdraw));

    let api_v1 = public_routes
        .merge(balance_routes)
        .merge(order_routes)
        .merge(admin_routes);

    Router::new()
        .nest("/api/v1", api_v1)
        .route("/health", get(public::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

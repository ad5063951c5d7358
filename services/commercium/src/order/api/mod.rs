//! 订单 REST 接口 `/api/orders`

mod dto;
mod handlers;

use axum::{
    Router, middleware,
    routing::{get, patch},
};

pub use dto::*;
pub(crate) use handlers::parse_order_id;

use crate::shared::{AppState, auth::require_member};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(handlers::list_orders).post(handlers::create_order))
        .route("/api/orders/{id}", get(handlers::get_order))
        .route("/api/orders/{id}/cancel", patch(handlers::cancel_order))
        .route_layer(middleware::from_fn(require_member))
}

/// 需 `X-Internal-Token`
pub fn internal_routes() -> Router<AppState> {
    Router::new().route(
        "/api/orders/{id}/confirm-payment",
        patch(handlers::confirm_payment),
    )
}

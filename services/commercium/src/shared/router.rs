//! HTTP 路由装配

use std::time::Duration;

use axum::{Json, Router, http::StatusCode, middleware, routing::get};
use commercium_common::ApiResponse;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::auth::{auth_middleware, http_metrics_middleware, internal_token_middleware};
use super::state::AppState;
use crate::{inventory, order, payment, settlement};

async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success_with("UP", "서비스가 정상 동작 중입니다"))
}

/// 组装全部 API
///
/// - 公开：`/api/health`、支付回调
/// - 内部：需 `X-Internal-Token`
/// - 其余：需 Bearer token
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let public = Router::new()
        .route("/api/health", get(health))
        .merge(payment::api::callback_routes());

    let internal = Router::new()
        .merge(order::api::internal_routes())
        .merge(inventory::api::internal_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            internal_token_middleware,
        ));

    let protected = Router::new()
        .merge(order::api::routes())
        .merge(payment::api::routes())
        .merge(inventory::api::routes())
        .merge(settlement::api::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .merge(public)
        .merge(internal)
        .merge(protected)
        .route_layer(middleware::from_fn(http_metrics_middleware));

    with_http_layers(api, request_timeout).with_state(state)
}

/// 超时返回 408，外加 trace 与 CORS
fn with_http_layers<S>(router: Router<S>, request_timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_slow_request_times_out_with_408() {
        let router = with_http_layers(
            Router::new()
                .route(
                    "/slow",
                    get(|| async {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        "done"
                    }),
                )
                .route("/fast", get(|| async { "done" })),
            Duration::from_millis(20),
        );

        let response = router
            .clone()
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let response = router
            .oneshot(Request::get("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

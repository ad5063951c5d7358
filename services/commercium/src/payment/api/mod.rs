//! 支付 REST 接口 `/api/payments`

mod dto;
mod handlers;

use axum::{
    Router, middleware,
    routing::{get, post},
};

pub use dto::*;

use crate::shared::{AppState, auth::require_member};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments", post(handlers::create_payment))
        .route("/api/payments/{id}", get(handlers::get_payment))
        .route("/api/payments/orders/{order_id}", get(handlers::get_payment_by_order))
        .route("/api/payments/{id}/cancel", post(handlers::cancel_payment))
        .route_layer(middleware::from_fn(require_member))
}

/// PG 回调，无需认证
pub fn callback_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/callback/complete", post(handlers::complete_callback))
        .route("/api/payments/callback/fail", post(handlers::fail_callback))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use commercium_auth_core::Role;
    use commercium_common::OrderId;

    use crate::shared::testing::{StaticSales, TestApp};

    fn payment_body(order_id: &OrderId) -> serde_json::Value {
        serde_json::json!({
            "orderId": order_id,
            "paymentMethod": "VIRTUAL_ACCOUNT",
            "amount": 20000
        })
    }

    /// 虚拟账户：网关受理后等待回调
    async fn pending_payment(app: &TestApp) -> (String, String) {
        let user = app.token("user-1", &[Role::User]);
        let response = app
            .send(Method::POST, "/api/payments", Some(&user), Some(payment_body(&OrderId::new())))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        let json = response.json();
        assert_eq!(json["data"]["status"], "PROCESSING");
        (
            json["data"]["paymentId"].as_str().unwrap().to_string(),
            json["data"]["externalPaymentId"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn test_payments_require_member_token() {
        let app = TestApp::new(StaticSales::default());

        let response = app
            .send(Method::POST, "/api/payments", None, Some(payment_body(&OrderId::new())))
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        let uri = format!("/api/payments/orders/{}", OrderId::new());
        let response = app.send(Method::GET, &uri, Some("garbage"), None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        let seller = app.token("seller-1", &[Role::Seller]);
        let response = app.send(Method::GET, &uri, Some(&seller), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_complete_callback_is_public() {
        let app = TestApp::new(StaticSales::default());
        let (payment_id, payment_key) = pending_payment(&app).await;

        let uri = format!("/api/payments/callback/complete?paymentKey={}&amount=20000", payment_key);
        let response = app.send(Method::POST, &uri, None, None).await;
        assert_eq!(response.status, StatusCode::OK);

        let admin = app.token("admin-1", &[Role::Admin]);
        let response = app
            .send(Method::GET, &format!("/api/payments/{}", payment_id), Some(&admin), None)
            .await;
        let json = response.json();
        assert_eq!(json["data"]["status"], "COMPLETED");
        assert_eq!(app.publisher.on_topic("order.payment-completed").len(), 1);
    }

    #[tokio::test]
    async fn test_fail_callback_formats_gateway_error() {
        let app = TestApp::new(StaticSales::default());
        let (payment_id, payment_key) = pending_payment(&app).await;

        let uri = format!(
            "/api/payments/callback/fail?paymentKey={}&errorCode=REJECTED&errorMessage=declined",
            payment_key
        );
        let response = app.send(Method::POST, &uri, None, None).await;
        assert_eq!(response.status, StatusCode::OK);

        let user = app.token("user-1", &[Role::User]);
        let response = app
            .send(Method::GET, &format!("/api/payments/{}", payment_id), Some(&user), None)
            .await;
        let json = response.json();
        assert_eq!(json["data"]["status"], "FAILED");
        assert_eq!(json["data"]["failedReason"], "[REJECTED] declined");
    }

    #[tokio::test]
    async fn test_callback_with_unknown_key_is_not_found() {
        let app = TestApp::new(StaticSales::default());

        let response = app
            .send(
                Method::POST,
                "/api/payments/callback/complete?paymentKey=mock_payment_unknown&amount=1000",
                None,
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let response = app
            .send(
                Method::POST,
                "/api/payments/callback/fail?paymentKey=mock_payment_unknown",
                None,
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}

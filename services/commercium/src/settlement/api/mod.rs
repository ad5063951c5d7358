//! 结算 REST 接口 `/api/settlements`
//!
//! 生成、完成与取消需 ADMIN；卖家只能查看自己的结算与报表

mod dto;
mod handlers;

use axum::{
    Router,
    routing::{get, patch, post},
};

pub use dto::*;

use crate::shared::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/settlements", post(handlers::create_settlement))
        .route("/api/settlements/my", get(handlers::get_my_settlements))
        .route(
            "/api/settlements/seller/{seller_id}",
            get(handlers::get_seller_settlements),
        )
        .route(
            "/api/settlements/status/{status}",
            get(handlers::get_settlements_by_status),
        )
        .route(
            "/api/settlements/reports/seller/{seller_id}/download",
            get(handlers::download_seller_report),
        )
        .route(
            "/api/settlements/reports/my/download",
            get(handlers::download_my_report),
        )
        .route("/api/settlements/{id}", get(handlers::get_settlement))
        .route("/api/settlements/{id}/complete", patch(handlers::complete_settlement))
        .route("/api/settlements/{id}/cancel", patch(handlers::cancel_settlement))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode, header};
    use chrono::Utc;
    use commercium_auth_core::Role;

    use crate::shared::testing::{StaticSales, TestApp};

    fn app() -> TestApp {
        TestApp::new(StaticSales::with(&[("seller-1", &[10_000, 20_000])]))
    }

    fn yesterday() -> String {
        Utc::now().date_naive().pred_opt().unwrap().to_string()
    }

    async fn create(app: &TestApp) -> String {
        let admin = app.token("admin-1", &[Role::Admin]);
        let uri = format!(
            "/api/settlements?sellerId=seller-1&startDate={d}&endDate={d}",
            d = yesterday()
        );
        let response = app.send(Method::POST, &uri, Some(&admin), None).await;
        assert_eq!(response.status, StatusCode::CREATED);
        let json = response.json();
        assert_eq!(json["data"]["itemCount"], 2);
        assert_eq!(json["data"]["items"].as_array().unwrap().len(), 2);
        json["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_only_admin_creates_settlement() {
        let app = app();
        let seller = app.token("seller-1", &[Role::Seller]);
        let uri = format!(
            "/api/settlements?sellerId=seller-1&startDate={d}&endDate={d}",
            d = yesterday()
        );

        let response = app.send(Method::POST, &uri, Some(&seller), None).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = app.send(Method::POST, &uri, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        create(&app).await;
        let admin = app.token("admin-1", &[Role::Admin]);
        let response = app.send(Method::POST, &uri, Some(&admin), None).await;
        assert_eq!(response.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_seller_sees_only_own_settlements() {
        let app = app();
        let id = create(&app).await;

        let owner = app.token("seller-1", &[Role::Seller]);
        let other = app.token("seller-2", &[Role::Seller]);

        let response = app.send(Method::GET, "/api/settlements/my", Some(&owner), None).await;
        assert_eq!(response.status, StatusCode::OK);
        let json = response.json();
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert!(json["data"][0].get("items").is_none());
        assert_eq!(json["message"], "총 1건의 정산 정보를 조회했습니다");

        let response = app
            .send(Method::GET, "/api/settlements/seller/seller-1", Some(&other), None)
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = app
            .send(Method::GET, &format!("/api/settlements/{}", id), Some(&other), None)
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = app
            .send(Method::GET, &format!("/api/settlements/{}", id), Some(&owner), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_complete_then_cancel_is_rejected() {
        let app = app();
        let id = create(&app).await;
        let admin = app.token("admin-1", &[Role::Admin]);

        let response = app
            .send(Method::PATCH, &format!("/api/settlements/{}/complete", id), Some(&admin), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["data"]["status"], "COMPLETED");

        let response = app
            .send(Method::GET, "/api/settlements/status/completed", Some(&admin), None)
            .await;
        assert_eq!(response.json()["data"].as_array().unwrap().len(), 1);

        let response = app
            .send(Method::PATCH, &format!("/api/settlements/{}/cancel", id), Some(&admin), None)
            .await;
        assert_eq!(response.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_report_download_is_attachment() {
        let app = app();
        create(&app).await;
        let owner = app.token("seller-1", &[Role::Seller]);
        let today = Utc::now().date_naive();
        let uri = format!(
            "/api/settlements/reports/my/download?startDate={}&endDate={}",
            today.pred_opt().unwrap(),
            today
        );

        let response = app.send(Method::GET, &uri, Some(&owner), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers[header::CONTENT_TYPE], "application/octet-stream");
        let disposition = response.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"my_settlement_report_"));
        assert!(response.body.starts_with(b"PK"));

        let other = app.token("seller-2", &[Role::Seller]);
        let uri = format!(
            "/api/settlements/reports/seller/seller-1/download?startDate={}&endDate={}",
            today, today
        );
        let response = app.send(Method::GET, &uri, Some(&other), None).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }
}

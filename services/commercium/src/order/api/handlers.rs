//! 订单 HTTP handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use commercium_common::{ApiResponse, OrderId};
use commercium_errors::{AppError, AppResult};
use validator::Validate;

use super::dto::{CreateOrderRequest, OrderResponse};
use crate::shared::{AppState, auth::AuthUser};

pub(crate) fn parse_order_id(raw: &str) -> AppResult<OrderId> {
    OrderId::from_string(raw).map_err(|_| AppError::validation("잘못된 주문 ID 형식입니다"))
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderResponse>>)> {
    request.validate()?;
    let user_id = user.user_id()?;
    let order = state.orders.create_order(&user_id, request.into_command()?).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with(
            OrderResponse::from(&order),
            "주문이 성공적으로 생성되었습니다",
        )),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<OrderResponse>>>> {
    let orders = state.orders.get_user_orders(&user.user_id()?).await?;
    Ok(Json(ApiResponse::success(
        orders.iter().map(OrderResponse::from).collect(),
    )))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderResponse>>> {
    let order = state
        .orders
        .get_order(&user.user_id()?, &parse_order_id(&order_id)?)
        .await?;
    Ok(Json(ApiResponse::success(OrderResponse::from(&order))))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderResponse>>> {
    let order = state
        .orders
        .cancel_order(&user.user_id()?, &parse_order_id(&order_id)?)
        .await?;
    Ok(Json(ApiResponse::success_with(
        OrderResponse::from(&order),
        "주문이 취소되었습니다",
    )))
}

/// 服务间调用：支付完成后确认订单
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderResponse>>> {
    let order = state.orders.confirm_payment(&parse_order_id(&order_id)?).await?;
    Ok(Json(ApiResponse::success_with(
        OrderResponse::from(&order),
        "결제가 확인되었습니다",
    )))
}

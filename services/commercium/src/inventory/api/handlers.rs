//! 库存 HTTP handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use commercium_auth_core::Role;
use commercium_common::{ApiResponse, ProductId};
use commercium_errors::{AppError, AppResult};
use tracing::info;
use validator::Validate;

use super::dto::{
    AdjustStockParams, CreateInventoryParams, IncreaseStockParams, InventoryResponse,
    StockReservationRequest, StockTransactionResponse,
};
use crate::order::api::parse_order_id;
use crate::shared::{AppState, auth::AuthUser};

const STOCK_MANAGERS: &[Role] = &[Role::Admin, Role::Seller];

fn parse_product_id(raw: String) -> AppResult<ProductId> {
    ProductId::parse(raw).map_err(AppError::validation)
}

pub async fn create_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<String>,
    Query(params): Query<CreateInventoryParams>,
) -> AppResult<(StatusCode, Json<ApiResponse<InventoryResponse>>)> {
    user.require_any_role(STOCK_MANAGERS)?;
    params.validate()?;

    let inventory = state
        .inventory
        .create_inventory(parse_product_id(product_id)?, params.initial_quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with(
            InventoryResponse::from(&inventory),
            "재고가 성공적으로 생성되었습니다",
        )),
    ))
}

pub async fn get_inventory(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> AppResult<Json<ApiResponse<InventoryResponse>>> {
    let inventory = state
        .inventory
        .get_inventory(&parse_product_id(product_id)?)
        .await?;
    Ok(Json(ApiResponse::success_with(
        InventoryResponse::from(&inventory),
        "재고 정보를 성공적으로 조회했습니다",
    )))
}

pub async fn increase_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<String>,
    Query(params): Query<IncreaseStockParams>,
) -> AppResult<Json<ApiResponse<InventoryResponse>>> {
    user.require_any_role(STOCK_MANAGERS)?;
    params.validate()?;

    let inventory = state
        .inventory
        .increase_stock(&parse_product_id(product_id)?, params.quantity, &params.reason)
        .await?;
    Ok(Json(ApiResponse::success_with(
        InventoryResponse::from(&inventory),
        "재고 입고가 완료되었습니다",
    )))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<String>,
    Query(params): Query<AdjustStockParams>,
) -> AppResult<Json<ApiResponse<InventoryResponse>>> {
    user.require_any_role(&[Role::Admin])?;
    params.validate()?;
    info!(user_id = %user.0.sub, product_id = %product_id, new_quantity = params.new_quantity, "Stock adjustment requested");

    let inventory = state
        .inventory
        .adjust_stock(&parse_product_id(product_id)?, params.new_quantity, &params.reason)
        .await?;
    Ok(Json(ApiResponse::success_with(
        InventoryResponse::from(&inventory),
        "재고 조정이 완료되었습니다",
    )))
}

pub async fn get_stock_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<StockTransactionResponse>>>> {
    user.require_any_role(STOCK_MANAGERS)?;
    let transactions = state
        .inventory
        .get_stock_transactions(&parse_product_id(product_id)?)
        .await?;
    Ok(Json(transactions_response(&transactions)))
}

pub async fn get_order_stock_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<StockTransactionResponse>>>> {
    user.require_any_role(STOCK_MANAGERS)?;
    let transactions = state
        .inventory
        .get_order_stock_transactions(&parse_order_id(&order_id)?)
        .await?;
    Ok(Json(transactions_response(&transactions)))
}

fn transactions_response(
    transactions: &[crate::inventory::domain::InventoryTransaction],
) -> ApiResponse<Vec<StockTransactionResponse>> {
    let body: Vec<StockTransactionResponse> = transactions.iter().map(Into::into).collect();
    let message = format!("총 {}건의 재고 이력을 조회했습니다", body.len());
    ApiResponse::success_with(body, message)
}

// 以下为服务间调用，由 `X-Internal-Token` 保护

pub async fn reserve_stock(
    State(state): State<AppState>,
    Json(request): Json<StockReservationRequest>,
) -> AppResult<Json<ApiResponse<InventoryResponse>>> {
    request.validate()?;
    let (product_id, order_id) = request.parse_ids()?;

    let inventory = state
        .reservations
        .reserve_stock(&product_id, order_id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success_with(
        InventoryResponse::from(&inventory),
        "재고 예약이 완료되었습니다",
    )))
}

pub async fn release_stock(
    State(state): State<AppState>,
    Json(request): Json<StockReservationRequest>,
) -> AppResult<Json<ApiResponse<InventoryResponse>>> {
    request.validate()?;
    let (product_id, order_id) = request.parse_ids()?;

    let inventory = state
        .reservations
        .release_stock(&product_id, order_id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success_with(
        InventoryResponse::from(&inventory),
        "재고 예약 해제가 완료되었습니다",
    )))
}

pub async fn decrease_stock(
    State(state): State<AppState>,
    Json(request): Json<StockReservationRequest>,
) -> AppResult<Json<ApiResponse<InventoryResponse>>> {
    request.validate()?;
    let (product_id, order_id) = request.parse_ids()?;

    let inventory = state
        .reservations
        .decrease_stock(&product_id, order_id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success_with(
        InventoryResponse::from(&inventory),
        "재고 차감이 완료되었습니다",
    )))
}

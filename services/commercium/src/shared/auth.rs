//! 认证中间件与提取器
//!
//! - `auth_middleware` 校验 Bearer access token，并把 Claims 注入请求扩展
//! - `AuthUser` 在 handler 中读取已校验的 Claims
//! - `internal_token_middleware` 保护服务间调用接口

use std::time::Instant;

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use commercium_auth_core::{Claims, Role};
use commercium_common::{SellerId, UserId};
use commercium_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use super::state::AppState;

pub const INTERNAL_TOKEN_HEADER: &str = "X-Internal-Token";

/// 所有登录用户都具备的角色集合
pub const MEMBER_ROLES: &[Role] = &[Role::User, Role::Seller, Role::Admin];

/// 已认证用户
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> AppResult<UserId> {
        self.0.user_id()
    }

    /// 卖家身份即 token subject
    pub fn seller_id(&self) -> AppResult<SellerId> {
        SellerId::parse(self.0.sub.clone()).map_err(AppError::unauthenticated)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.0.has_role(role)
    }

    pub fn require_any_role(&self, roles: &[Role]) -> AppResult<()> {
        self.0.require_any_role(roles)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::unauthenticated("인증이 필요합니다"))
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// JWT 认证中间件
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(&request) else {
        warn!(path = %request.uri().path(), "Missing or invalid authorization header");
        return Err(AppError::unauthenticated("인증이 필요합니다"));
    };

    let claims = state.token_service.validate_access_token(token).map_err(|e| {
        warn!(error = %e, "Token validation failed");
        AppError::unauthenticated("유효하지 않은 토큰입니다")
    })?;
    debug!(user_id = %claims.sub, "Token validated");

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// 要求任一会员角色（USER / SELLER / ADMIN）
pub async fn require_member(user: AuthUser, request: Request, next: Next) -> Result<Response, AppError> {
    user.require_any_role(MEMBER_ROLES)?;
    Ok(next.run(request).await)
}

/// 服务间调用令牌校验
pub async fn internal_token_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = request
        .headers()
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());

    match presented {
        Some(token) if token == state.internal_token.expose_secret() => Ok(next.run(request).await),
        _ => {
            warn!(path = %request.uri().path(), "Rejected internal call without valid token");
            Err(AppError::forbidden("내부 호출 권한이 없습니다"))
        }
    }
}

/// HTTP 请求指标
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    commercium_telemetry::metrics::record_http_request(
        &method,
        &route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0,
    );
    response
}

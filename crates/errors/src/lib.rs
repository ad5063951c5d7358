//! commercium-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范，HTTP 层输出统一的 ApiResponse 错误包体

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// 业务规则违反（库存不足、数量上限等）
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// 聚合当前状态不允许该操作
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn business_rule(msg: impl Into<String>) -> Self {
        Self::BusinessRule(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) | Self::BusinessRule(_) => 400,
            Self::Unauthorized(_) | Self::Unauthenticated(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) | Self::InvalidState(_) => 409,
            Self::ResourceExhausted(_) => 429,
            Self::ExternalService(_) => 502,
            Self::Internal(_) | Self::Database(_) => 500,
        }
    }

    /// 面向客户端的消息，内部错误不暴露细节
    pub fn client_message(&self) -> String {
        match self {
            Self::NotFound(m)
            | Self::Validation(m)
            | Self::Unauthorized(m)
            | Self::Unauthenticated(m)
            | Self::Forbidden(m)
            | Self::Conflict(m)
            | Self::BusinessRule(m)
            | Self::InvalidState(m)
            | Self::ExternalService(m)
            | Self::ResourceExhausted(m) => m.clone(),
            Self::Internal(_) | Self::Database(_) => "서버 내부 오류가 발생했습니다".to_string(),
        }
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: format!("https://api.commercium.io/problems/{}", self.problem_slug()),
            title: self.problem_title().to_string(),
            status: self.status_code(),
            detail: self.to_string(),
            instance: None,
        }
    }

    fn problem_slug(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::Validation(_) => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::BusinessRule(_) => "business-rule",
            Self::InvalidState(_) => "invalid-state",
            Self::Internal(_) => "internal",
            Self::Database(_) => "database",
            Self::ExternalService(_) => "external-service",
            Self::ResourceExhausted(_) => "resource-exhausted",
        }
    }

    fn problem_title(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Resource Not Found",
            Self::Validation(_) => "Validation Error",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Unauthenticated(_) => "Unauthenticated",
            Self::Forbidden(_) => "Forbidden",
            Self::Conflict(_) => "Conflict",
            Self::BusinessRule(_) => "Business Rule Violation",
            Self::InvalidState(_) => "Invalid State",
            Self::Internal(_) => "Internal Server Error",
            Self::Database(_) => "Database Error",
            Self::ExternalService(_) => "External Service Error",
            Self::ResourceExhausted(_) => "Resource Exhausted",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_validation_errors("", &err, &mut fields);
        fields.sort();
        Self::Validation(fields.join(", "))
    }
}

/// 展开嵌套结构与列表中的字段错误，路径形如 `items[0].quantity`
fn collect_validation_errors(prefix: &str, err: &validator::ValidationErrors, out: &mut Vec<String>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in err.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(errors) => {
                let detail = errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "invalid".to_string());
                out.push(format!("{}: {}", path, detail));
            }
            ValidationErrorsKind::Struct(inner) => collect_validation_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// HTTP 错误包体，与成功响应的 ApiResponse 结构一致
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            success: false,
            data: None,
            message: self.client_message(),
            timestamp: chrono::Utc::now(),
        };
        (status, axum::Json(body)).into_response()
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::not_found("x").status_code(), 404);
        assert_eq!(AppError::business_rule("x").status_code(), 400);
        assert_eq!(AppError::invalid_state("x").status_code(), 409);
        assert_eq!(AppError::resource_exhausted("x").status_code(), 429);
        assert_eq!(AppError::external_service("x").status_code(), 502);
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::database("connection refused on 10.0.0.1");
        assert!(!err.client_message().contains("10.0.0.1"));
        assert_eq!(err.to_problem_details().status, 500);
    }

    #[tokio::test]
    async fn test_into_response_envelope() {
        let response = AppError::not_found("주문을 찾을 수 없습니다").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! 统一 API 响应包体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 默认成功消息
pub const DEFAULT_SUCCESS_MESSAGE: &str = "요청이 성공적으로 처리되었습니다";

/// API 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::success_with(data, DEFAULT_SUCCESS_MESSAGE)
    }

    pub fn success_with(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_uses_default_message() {
        let resp = ApiResponse::success(1);
        assert!(resp.success);
        assert_eq!(resp.message, DEFAULT_SUCCESS_MESSAGE);
        assert_eq!(resp.data, Some(1));
    }

    #[test]
    fn test_error_has_no_data() {
        let resp: ApiResponse<()> = ApiResponse::error("실패");
        assert!(!resp.success);
        assert!(resp.data.is_none());
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["data"].is_null());
    }
}

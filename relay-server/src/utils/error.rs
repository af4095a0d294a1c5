//! 统一错误处理
//!
//! 提供应用级错误类型和响应结构：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResponse`] - API 响应结构
//!
//! 注入路由把错误映射为 `{code, message}` 响应；
//! 对账 handler 自行捕获错误并继续，不向上传播到进程。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// API 统一响应结构
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// 错误码（E0000 表示成功）
    pub code: String,
    /// 消息
    pub message: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 入站事件无法解码 (400)
    #[error("Malformed event: {0}")]
    Decode(String),

    /// 平台列表拉取失败 (502)
    #[error("Platform request failed: {0}")]
    Platform(String),

    /// 下游转发失败 (502)
    #[error("Downstream request failed: {0}")]
    Downstream(String),

    /// 缺少门店标识，无法拉取列表
    #[error("No store id configured")]
    MissingStore,

    /// 内部错误 (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }

    pub fn downstream(msg: impl Into<String>) -> Self {
        Self::Downstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Decode(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),

            AppError::Platform(msg) => {
                error!(target: "platform", error = %msg, "Platform error occurred");
                (StatusCode::BAD_GATEWAY, "E8001", "Platform request failed")
            }

            AppError::Downstream(msg) => {
                error!(target: "downstream", error = %msg, "Downstream error occurred");
                (StatusCode::BAD_GATEWAY, "E8002", "Downstream request failed")
            }

            AppError::MissingStore => (StatusCode::CONFLICT, "E0007", "No store id configured"),

            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error",
                )
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        });

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}

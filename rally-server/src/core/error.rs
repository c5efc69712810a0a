use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::registration::EngineError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("验证错误: {0}")]
    Validation(String),

    /// Business-rule refusal, surfaced with its stable code
    #[error("{message}")]
    Rule {
        code: &'static str,
        message: String,
    },

    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(id) => ServerError::NotFound(id),
            EngineError::Validation(msg) => ServerError::Validation(msg),
            EngineError::Rule(rule) => ServerError::Rule {
                code: rule.code(),
                message: rule.to_string(),
            },
            EngineError::Storage(e) => ServerError::Internal(e.into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type, message, retryable) = match &self {
            ServerError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("game not found: {id}"),
                false,
            ),
            ServerError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_input", msg.clone(), false)
            }
            ServerError::Rule { code, message } => {
                (StatusCode::CONFLICT, *code, message.clone(), false)
            }
            ServerError::Internal(err) => {
                // 记录内部错误但不暴露详细信息
                tracing::error!(error = ?err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    true,
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            retryable,
        };

        (status, Json(body)).into_response()
    }
}

/// 处理器的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;

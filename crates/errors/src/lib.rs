//! credstore-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 凭据缓存错误类型
///
/// 过期与不存在对调用方呈现为同一种错误，只在日志细节上有区别。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// 授权码不存在或已过期
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// Token 不存在或已过期
    #[error("Not found: {0}")]
    NotFound(String),

    /// 调用参数不合法
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 内部不变式被破坏（编程错误）
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// 协作方（例如随机码生成器）失败
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_grant(msg: impl Into<String>) -> Self {
        Self::InvalidGrant(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 是否为调用方可见的"凭据无效"类错误
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, Self::InvalidGrant(_) | Self::NotFound(_))
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidGrant(_) => 400,
            Self::NotFound(_) => 404,
            Self::InvalidArgument(_) => 400,
            Self::IllegalState(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: self.problem_type(),
            title: self.problem_title(),
            status: self.status_code(),
            detail: self.to_string(),
            instance: None,
        }
    }

    fn problem_type(&self) -> String {
        match self {
            Self::InvalidGrant(_) => "https://credstore.dev/problems/invalid-grant".to_string(),
            Self::NotFound(_) => "https://credstore.dev/problems/not-found".to_string(),
            Self::InvalidArgument(_) => {
                "https://credstore.dev/problems/invalid-argument".to_string()
            }
            Self::IllegalState(_) => "https://credstore.dev/problems/illegal-state".to_string(),
            Self::Internal(_) => "https://credstore.dev/problems/internal".to_string(),
        }
    }

    fn problem_title(&self) -> String {
        match self {
            Self::InvalidGrant(_) => "Invalid Grant".to_string(),
            Self::NotFound(_) => "Resource Not Found".to_string(),
            Self::InvalidArgument(_) => "Invalid Argument".to_string(),
            Self::IllegalState(_) => "Illegal State".to_string(),
            Self::Internal(_) => "Internal Server Error".to_string(),
        }
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

impl ProblemDetails {
    /// 附加出错实例的标识
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

//! 徽章服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

/// 错误大类
///
/// 调用方据此决定处理方式：校验错误修正后可重试，冲突错误可整体重试，其余为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Permission,
    Conflict,
    Backend,
}

/// 徽章服务错误类型
#[derive(Debug, Error)]
pub enum BadgeError {
    // === 校验错误 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 不存在 ===
    #[error("徽章不存在: {0}")]
    BadgeNotFound(String),

    #[error("徽章类型不存在: {0}")]
    TypeNotFound(String),

    #[error("用户不存在: {0}")]
    UserNotFound(String),

    // === 权限 ===
    #[error("权限不足: {operation}")]
    PermissionDenied { operation: String },

    // === 并发 ===
    #[error("并发冲突，{operation} 在 {attempts} 次尝试后仍未成功，请重试")]
    ConflictExhausted { operation: String, attempts: u32 },

    // === 级联删除中断 ===
    #[error("级联删除未完成: {entity} id={id}, 失败步骤={step}: {source}")]
    CascadeIncomplete {
        entity: String,
        id: String,
        step: String,
        #[source]
        source: Box<BadgeError>,
    },

    // === 系统错误 ===
    #[error("存储后端错误: {0}")]
    Backend(String),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 徽章服务 Result 类型别名
pub type Result<T> = std::result::Result<T, BadgeError>;

impl From<badge_shared::error::BadgeError> for BadgeError {
    fn from(err: badge_shared::error::BadgeError) -> Self {
        match err {
            badge_shared::error::BadgeError::Serialization(e) => Self::Serialization(e),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for BadgeError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl BadgeError {
    pub fn permission_denied(operation: impl Into<String>) -> Self {
        Self::PermissionDenied {
            operation: operation.into(),
        }
    }

    /// 错误大类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::BadgeNotFound(_) | Self::TypeNotFound(_) | Self::UserNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::PermissionDenied { .. } => ErrorKind::Permission,
            Self::ConflictExhausted { .. } => ErrorKind::Conflict,
            Self::CascadeIncomplete { source, .. } => source.kind(),
            Self::Backend(_) | Self::Serialization(_) | Self::Internal(_) => ErrorKind::Backend,
        }
    }

    /// 检查是否为可重试的错误
    ///
    /// 只有乐观并发冲突属于瞬时错误，后端错误对当前操作视为致命。
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Backend | ErrorKind::Conflict)
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadgeNotFound(_) => "BADGE_NOT_FOUND",
            Self::TypeNotFound(_) => "TYPE_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::ConflictExhausted { .. } => "CONFLICT_EXHAUSTED",
            Self::CascadeIncomplete { .. } => "CASCADE_INCOMPLETE",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

//! 统一错误处理模块
//!
//! 定义基础设施层共享的错误类型，使用 thiserror 提供良好的错误信息。
//! 业务错误由各服务自行定义，并通过 `From` 转换吸收这里的错误。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum BadgeError {
    // ==================== 存储错误 ====================
    #[error("Redis 错误: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("键值存储错误: key={key} - {message}")]
    KvBackend { key: String, message: String },

    // ==================== 序列化错误 ====================
    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, BadgeError>;

impl BadgeError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Redis(_) => "REDIS_ERROR",
            Self::KvBackend { .. } => "KV_BACKEND_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 只有网络层的瞬时故障可以重试，序列化和配置错误重试无意义。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Redis(_))
    }
}

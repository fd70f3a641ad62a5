//! 业务服务层
//!
//! 编排仓储操作与权限判定：
//!
//! - `CatalogService`: 类型与徽章的创建、编辑、删除、集成注册、数据修复
//! - `GrantService`: 徽章发放与发放通知
//! - `SubscriptionService`: 频道订阅
//! - `BadgeQueryService`: 只读查询与候选列表

pub mod catalog_service;
pub mod dto;
pub mod grant_service;
pub mod query_service;
pub mod subscription_service;

pub use catalog_service::CatalogService;
pub use grant_service::GrantService;
pub use query_service::BadgeQueryService;
pub use subscription_service::SubscriptionService;

use badge_shared::observability::metrics::PERMISSION_DENIED_TOTAL;
use tracing::warn;

use crate::error::BadgeError;
use crate::permission::Actor;

/// 记录一次权限拒绝并构造错误
pub(crate) fn permission_denied(operation: &'static str, actor: &Actor) -> BadgeError {
    metrics::counter!(PERMISSION_DENIED_TOTAL, "operation" => operation).increment(1);
    warn!(operation, actor = %actor.id, "权限不足，操作被拒绝");
    BadgeError::permission_denied(operation)
}

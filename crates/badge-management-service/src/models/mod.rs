//! 徽章服务领域模型
//!
//! 包含徽章系统的所有核心实体定义

pub mod badge;
pub mod enums;
pub mod subscription;
pub mod user_badge;

// 重新导出常用类型
pub use badge::{
    Badge, BadgeTypeDefinition, DESCRIPTION_MAX_LENGTH, NAME_MAX_LENGTH, PermissionScheme,
};
pub use enums::{ImageType, Origin};
pub use subscription::Subscription;
pub use user_badge::{AllBadgesBadge, BadgeDetails, Ownership, UserBadge};

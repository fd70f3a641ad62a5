//! 用户徽章相关实体定义
//!
//! `Ownership` 是一次发放记录，只追加、不修改；其余结构是查询层的投影

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::badge::Badge;

/// 发放记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    /// 获得者
    pub user: String,
    /// 发放者
    pub granted_by: String,
    /// 徽章 ID
    pub badge: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
}

impl Ownership {
    pub fn matches(&self, user_id: &str, badge_id: &str) -> bool {
        self.user == user_id && self.badge == badge_id
    }
}

/// 用户持有的徽章
///
/// 徽章定义 + 发放记录 + 发放者显示名 + 类型名称
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    #[serde(flatten)]
    pub badge: Badge,
    #[serde(flatten)]
    pub ownership: Ownership,
    #[serde(rename = "granted_by_name")]
    pub granted_by_name: String,
    pub type_name: String,
}

/// 徽章详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDetails {
    #[serde(flatten)]
    pub badge: Badge,
    pub owners: Vec<Ownership>,
    pub created_by_username: String,
    pub type_name: String,
}

/// 徽章目录条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllBadgesBadge {
    #[serde(flatten)]
    pub badge: Badge,
    /// 不同获得者数量
    pub granted: usize,
    /// 总发放次数
    pub granted_times: usize,
    pub type_name: String,
}

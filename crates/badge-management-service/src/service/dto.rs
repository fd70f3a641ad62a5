//! 服务层数据传输对象
//!
//! 定义服务层与调用方交互使用的请求和结果结构

use serde::{Deserialize, Serialize};

/// 发放请求
///
/// 发放者即调用时传入的操作者
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantBadgeRequest {
    pub badge_id: String,
    pub user_id: String,
    #[serde(default)]
    pub reason: String,
    /// 需要额外公告的当前频道
    #[serde(default)]
    pub notify_channel_id: Option<String>,
}

impl GrantBadgeRequest {
    pub fn new(badge_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            badge_id: badge_id.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn notify_in(mut self, channel_id: impl Into<String>) -> Self {
        self.notify_channel_id = Some(channel_id.into());
        self
    }
}

/// 发放结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantOutcome {
    /// 是否新增了发放记录；非可重复徽章重复发放时为 false
    pub should_notify: bool,
}

/// 级联删除结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub types_removed: usize,
    pub badges_removed: usize,
    pub ownerships_removed: usize,
}

impl DeletionReport {
    pub fn merge(&mut self, other: DeletionReport) {
        self.types_removed += other.types_removed;
        self.badges_removed += other.badges_removed;
        self.ownerships_removed += other.ownerships_removed;
    }

    pub fn is_empty(&self) -> bool {
        self.types_removed == 0 && self.badges_removed == 0 && self.ownerships_removed == 0
    }
}

/// 修复结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// 类型已不存在的徽章
    pub orphan_badges: usize,
    /// 徽章已不存在的发放记录
    pub orphan_ownerships: usize,
    /// 类型已不存在的订阅
    pub orphan_subscriptions: usize,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.orphan_badges + self.orphan_ownerships + self.orphan_subscriptions
    }
}

//! 通知类型定义

use serde::{Deserialize, Serialize};

use crate::models::Badge;

/// 消息附件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub title: String,
    pub text: String,
}

/// 待发送的消息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// 发送者（通常是机器人账号）
    pub user_id: String,
    /// 目标频道，私信时由平台决定
    #[serde(default)]
    pub channel_id: String,
    /// 纯文本正文
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Post {
    pub fn in_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }
}

/// 一次成功发放的通知上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantEvent {
    pub badge: Badge,
    pub granter_id: String,
    pub grantee_id: String,
    pub reason: String,
    /// 需要额外公告的当前频道
    pub notify_channel_id: Option<String>,
}

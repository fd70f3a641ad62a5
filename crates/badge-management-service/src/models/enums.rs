//! 徽章服务枚举类型定义
//!
//! 所有枚举都支持 JSON（serde）序列化，序列化值与已持久化的集合数据保持一致

use serde::{Deserialize, Serialize};

/// 徽章图片类型
///
/// 决定 `image` 字段的解释方式以及通知中的图片前缀
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    /// 表情名称，如 `medal_sports`
    #[default]
    #[serde(rename = "emoji")]
    Emoji,
    /// 站内相对地址
    #[serde(rename = "rel_url")]
    RelativeUrl,
    /// 完整的外部地址
    #[serde(rename = "abs_url")]
    AbsoluteUrl,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emoji => "emoji",
            Self::RelativeUrl => "rel_url",
            Self::AbsoluteUrl => "abs_url",
        }
    }
}

/// 操作来源
///
/// 集成方（其他插件、机器人）通过程序接口注册的类型不受创建权限限制
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// 普通用户操作
    #[default]
    User,
    /// 外部集成
    Integration { plugin_id: String },
}

impl Origin {
    pub fn is_integration(&self) -> bool {
        matches!(self, Self::Integration { .. })
    }
}

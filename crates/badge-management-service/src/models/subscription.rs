//! 频道订阅
//!
//! 频道订阅某个类型后，该类型下的每次发放都会在频道中公告

use serde::{Deserialize, Serialize};

/// (频道, 类型) 订阅对，集合内去重
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    pub channel_id: String,
    pub type_id: String,
}

impl Subscription {
    pub fn new(channel_id: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            type_id: type_id.into(),
        }
    }
}

//! 消息发送接口
//!
//! 平台侧的消息能力：私信、频道发帖、仅操作者可见的临时消息、发帖权限查询。
//! 发放流程只在写入成功后调用，发送失败由调用方记录日志，不影响发放结果。

use async_trait::async_trait;

use super::types::Post;
use crate::error::Result;

/// 消息发送接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// 机器人给用户发私信
    async fn send_direct(&self, bot_user_id: &str, user_id: &str, post: Post) -> Result<()>;

    /// 在频道中发帖
    async fn create_post(&self, post: Post) -> Result<()>;

    /// 给用户发送仅自己可见的消息
    async fn send_ephemeral(&self, user_id: &str, post: Post) -> Result<()>;

    /// 用户能否在频道中发帖
    async fn can_post(&self, user_id: &str, channel_id: &str) -> Result<bool>;
}

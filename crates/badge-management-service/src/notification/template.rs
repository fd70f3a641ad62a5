//! 发放通知文案
//!
//! 文案使用平台的 Markdown 语法，徽章图片按类型渲染为表情或图片前缀。
//!
//! ```ignore
//! let text = channel_text("alice", "bob", &badge, "won the race");
//! // "@alice granted @bob the :medal: `Sporty` badge.\nWhy? won the race"
//! ```

use crate::models::{Badge, ImageType};

/// 发放者无权在当前频道发帖时的提示
pub const NO_CHANNEL_PERMISSION_NOTICE: &str =
    "You don't have permissions to notify the grant on this channel.";

/// 徽章图片前缀，相对地址不渲染
pub fn image_prefix(badge: &Badge) -> String {
    match badge.image_type {
        ImageType::Emoji => format!(":{}: ", badge.image),
        ImageType::AbsoluteUrl => format!("![icon]({}) ", badge.image),
        ImageType::RelativeUrl => String::new(),
    }
}

/// 附件标题
pub fn attachment_title(badge: &Badge) -> String {
    format!("{}badge granted!", image_prefix(badge))
}

/// 发给获得者的私信正文
pub fn direct_text(granter_username: &str, badge: &Badge, reason: &str) -> String {
    with_reason(
        format!(
            "@{} granted you the {}`{}` badge.",
            granter_username,
            image_prefix(badge),
            badge.name
        ),
        reason,
    )
}

/// 频道公告正文
pub fn channel_text(
    granter_username: &str,
    grantee_username: &str,
    badge: &Badge,
    reason: &str,
) -> String {
    with_reason(
        format!(
            "@{} granted @{} the {}`{}` badge.",
            granter_username,
            grantee_username,
            image_prefix(badge),
            badge.name
        ),
        reason,
    )
}

fn with_reason(mut text: String, reason: &str) -> String {
    if !reason.is_empty() {
        text.push_str("\nWhy? ");
        text.push_str(reason);
    }
    text
}

//! 发放通知模块
//!
//! 徽章发放成功后，通过平台消息能力通知获得者和订阅频道。
//!
//! ## 功能特性
//!
//! - **私信获得者**：附带发放者和发放理由
//! - **订阅频道公告**：订阅了该类型的频道逐一公告
//! - **当前频道公告**：发放者无发帖权限时改为临时提示
//! - **失败容忍**：任何发送失败只记录日志，不影响发放结果

pub mod sender;
pub mod service;
pub mod template;
pub mod types;

pub use sender::MessageSink;
pub use service::GrantNotifier;
pub use types::{Attachment, GrantEvent, Post};

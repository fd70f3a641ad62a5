//! 徽章管理服务
//!
//! 聊天平台的徽章子系统：用户获得按类型分组的徽章，发放被记录，频道可订阅某类型的发放公告。
//!
//! ## 核心功能
//!
//! - **集合存储**：徽章、类型、发放记录、订阅各存为一个键，仅依赖单键 CAS
//! - **乐观更新**：读-改-写在有上限的重试内完成，不加锁、不丢更新
//! - **权限判定**：按固定层级顺序判定创建、发放、编辑、订阅权限
//! - **查询投影**：用户徽章、徽章详情、目录统计、订阅视图、候选列表
//! - **通知发送**：发放成功后私信获得者并在订阅频道公告
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `id`: 实体标识生成
//! - `permission`: 权限判定
//! - `repository`: 集合仓储层
//! - `service`: 业务服务层
//! - `directory`: 用户目录接口
//! - `notification`: 发放通知
//! - `cli`: 维护命令

pub mod cli;
pub mod directory;
pub mod error;
pub mod id;
pub mod models;
pub mod notification;
pub mod permission;
pub mod repository;
pub mod service;

pub use directory::{DisplayNameFormat, StaticUserDirectory, User, UserDirectory};
pub use error::{BadgeError, ErrorKind, Result};
pub use id::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use models::*;
pub use notification::{GrantEvent, GrantNotifier, MessageSink, Post};
pub use permission::{Actor, PermissionEvaluator};
pub use repository::{BadgeRepository, CollectionKey, CollectionStore};
pub use service::{
    BadgeQueryService, CatalogService, GrantService, SubscriptionService, dto,
};

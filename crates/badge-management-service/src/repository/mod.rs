//! 集合仓储层
//!
//! 徽章、类型、发放记录、订阅各自作为一个整体文档存放在键值存储中。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含权限判断
//! - 每个写操作只触及一个集合，通过 CAS + 有上限的重试保证读-改-写不丢更新
//! - 跨集合的流程由服务层按步骤编排

mod badge_repo;
mod collection;

pub use badge_repo::BadgeRepository;
pub use collection::{CollectionKey, CollectionStore, Versioned};

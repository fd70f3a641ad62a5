//! CLI 模块
//!
//! 提供徽章数据的维护命令：
//!
//! - `reconcile` - 清理悬挂数据
//! - `reset --yes` - 清空所有集合
//! - `list-types` / `list-badges` - 以 JSON 输出目录
//! - `check` - 检查存储连通性与数据格式
//!
//! # 使用示例
//!
//! ```bash
//! BADGE_STORE__BACKEND=redis badge-management check
//! badge-management reconcile
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::{CommandRunner, build_repository};

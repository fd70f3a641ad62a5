//! CLI 命令定义
//!
//! 使用 clap derive 宏定义维护工具的命令行接口。

use clap::{Parser, Subcommand};

/// 徽章数据维护工具
///
/// 连接配置中的存储后端，执行修复、清空、查看等维护操作。
/// 使用 `--help` 查看各子命令的详细说明。
#[derive(Parser, Debug)]
#[command(name = "badge-management")]
#[command(version, about = "徽章数据维护工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 配置中的服务名，决定加载 config/{service}.toml
    #[arg(long, default_value = "badge-management-service")]
    pub service_name: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// 清理悬挂数据
    ///
    /// 删除类型已不存在的徽章、徽章已不存在的发放记录、类型已不存在的订阅。
    Reconcile,

    /// 清空所有徽章数据
    Reset {
        /// 确认执行，不带此参数时拒绝清空
        #[arg(long)]
        yes: bool,
    },

    /// 列出所有徽章类型（JSON）
    ListTypes,

    /// 列出所有徽章（JSON）
    ListBadges,

    /// 检查存储连通性和集合数据格式
    Check,
}

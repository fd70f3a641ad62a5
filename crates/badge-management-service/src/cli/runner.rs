//! CLI 命令执行器
//!
//! 根据配置构建存储后端和服务，执行各子命令。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::info;

use badge_shared::config::{AppConfig, StoreBackend};
use badge_shared::kv::{KvBackend, MemoryKv, RedisKv};
use badge_shared::retry::OptimisticPolicy;

use crate::permission::PermissionEvaluator;
use crate::repository::BadgeRepository;
use crate::service::CatalogService;

use super::commands::Commands;

/// 命令执行器
pub struct CommandRunner {
    repo: BadgeRepository,
    catalog: CatalogService,
}

impl CommandRunner {
    /// 按配置连接存储后端
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let kv: Arc<dyn KvBackend> = match config.store.backend {
            StoreBackend::Memory => {
                info!("使用内存存储，数据不会持久化");
                Arc::new(MemoryKv::new())
            }
            StoreBackend::Redis => {
                let redis = RedisKv::new(&config.store.redis_url, config.store.key_prefix.clone())?;
                redis.health_check().await?;
                info!(prefix = %config.store.key_prefix, "Redis 连接成功");
                Arc::new(redis)
            }
        };

        Ok(Self::new(build_repository(config, kv), config))
    }

    pub fn new(repo: BadgeRepository, config: &AppConfig) -> Self {
        let catalog = CatalogService::new(
            repo.clone(),
            PermissionEvaluator::from_config(&config.permissions),
        );
        Self { repo, catalog }
    }

    /// 执行子命令，返回写到标准输出的内容
    pub async fn run(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::Reconcile => {
                let report = self.catalog.reconcile().await?;
                Ok(serde_json::to_string_pretty(&report)?)
            }
            Commands::Reset { yes } => {
                if !yes {
                    bail!("清空操作不可恢复，请使用 --yes 确认");
                }
                self.catalog.reset().await?;
                Ok("所有徽章数据已清空".to_string())
            }
            Commands::ListTypes => Ok(serde_json::to_string_pretty(
                &self.repo.list_types().await?,
            )?),
            Commands::ListBadges => Ok(serde_json::to_string_pretty(
                &self.repo.list_badges().await?,
            )?),
            Commands::Check => {
                let types = self.repo.list_types().await?.len();
                let badges = self.repo.list_badges().await?.len();
                let ownerships = self.repo.list_ownerships().await?.len();
                let subscriptions = self.repo.list_subscriptions().await?.len();
                Ok(format!(
                    "存储正常: types={} badges={} ownerships={} subscriptions={}",
                    types, badges, ownerships, subscriptions
                ))
            }
        }
    }
}

/// 按配置构建仓储
pub fn build_repository(config: &AppConfig, kv: Arc<dyn KvBackend>) -> BadgeRepository {
    let policy = OptimisticPolicy::new(
        config.store.max_attempts,
        Duration::from_millis(config.store.retry_backoff_ms),
    );
    BadgeRepository::new(kv).with_policy(policy)
}

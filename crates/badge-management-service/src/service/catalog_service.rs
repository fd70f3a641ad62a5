//! 徽章目录服务
//!
//! 负责类型和徽章的创建、编辑、删除，以及外部集成的幂等注册。
//!
//! ## 删除流程
//!
//! 删除按步骤执行，每一步只写一个集合且可重复执行：
//!
//! 1. 删除类型条目（仅删除类型时）
//! 2. 逐个删除该类型下的徽章条目
//! 3. 删除这些徽章的发放记录
//!
//! 后续步骤失败时返回 `CascadeIncomplete`，已完成的步骤不回滚。此时残留的发放记录
//! 对所有经由徽章关联的查询都不可见，可通过 `reconcile` 清理。

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::error::{BadgeError, Result};
use crate::models::{Badge, BadgeTypeDefinition};
use crate::permission::{Actor, PermissionEvaluator};
use crate::repository::BadgeRepository;
use crate::service::dto::{DeletionReport, ReconcileReport};
use crate::service::permission_denied;

/// 集成方自动创建的类型名称前缀
pub const PLUGIN_TYPE_NAME_PREFIX: &str = "Plugin badges: ";

/// 徽章目录服务
#[derive(Clone)]
pub struct CatalogService {
    repo: BadgeRepository,
    permissions: PermissionEvaluator,
}

impl CatalogService {
    pub fn new(repo: BadgeRepository, permissions: PermissionEvaluator) -> Self {
        Self { repo, permissions }
    }

    // ==================== 创建 ====================

    /// 创建徽章
    ///
    /// 校验字段 -> 解析类型 -> 权限检查 -> 分配 ID 并写入。创建者记为操作者。
    #[instrument(skip(self, badge), fields(actor = %actor.id, name = %badge.name, type_id = %badge.type_id))]
    pub async fn add_badge(&self, actor: &Actor, mut badge: Badge) -> Result<Badge> {
        badge.validate()?;

        let badge_type = self.repo.get_type(&badge.type_id).await?;
        if !self.permissions.can_create_badge(actor, &badge_type) {
            return Err(permission_denied("add_badge", actor));
        }

        badge.created_by = actor.id.clone();
        let stored = self.repo.insert_badge(badge).await?;
        info!(badge_id = %stored.id, "徽章创建成功");
        Ok(stored)
    }

    /// 创建类型
    ///
    /// 集成来源的操作者不受创建权限限制
    #[instrument(skip(self, definition), fields(actor = %actor.id, name = %definition.name))]
    pub async fn add_type(
        &self,
        actor: &Actor,
        mut definition: BadgeTypeDefinition,
    ) -> Result<BadgeTypeDefinition> {
        if !self
            .permissions
            .can_create_type(actor, actor.origin.is_integration())
        {
            return Err(permission_denied("add_type", actor));
        }

        definition.created_by = actor.id.clone();
        let stored = self.repo.insert_type(definition).await?;
        info!(type_id = %stored.id, "徽章类型创建成功");
        Ok(stored)
    }

    // ==================== 编辑 ====================

    /// 按 ID 替换徽章，调用方负责编辑权限
    pub async fn update_badge(&self, badge: &Badge) -> Result<()> {
        badge.validate()?;
        self.repo.update_badge(badge).await
    }

    /// 按 ID 替换类型，调用方负责编辑权限
    pub async fn update_type(&self, definition: &BadgeTypeDefinition) -> Result<()> {
        self.repo.update_type(definition).await
    }

    /// 编辑徽章：管理员或徽章创建者
    ///
    /// 创建者保持不变；修改所属类型时新类型必须存在
    #[instrument(skip(self, badge), fields(actor = %actor.id, badge_id = %badge.id))]
    pub async fn edit_badge(&self, actor: &Actor, mut badge: Badge) -> Result<Badge> {
        let stored = self.repo.get_badge(&badge.id).await?;
        if !self.permissions.can_edit_badge(actor, &stored) {
            return Err(permission_denied("edit_badge", actor));
        }

        badge.validate()?;
        if badge.type_id != stored.type_id {
            self.repo.get_type(&badge.type_id).await?;
        }

        badge.created_by = stored.created_by;
        self.repo.update_badge(&badge).await?;
        info!("徽章已更新");
        Ok(badge)
    }

    /// 编辑类型：仅管理员
    #[instrument(skip(self, definition), fields(actor = %actor.id, type_id = %definition.id))]
    pub async fn edit_type(
        &self,
        actor: &Actor,
        mut definition: BadgeTypeDefinition,
    ) -> Result<BadgeTypeDefinition> {
        let stored = self.repo.get_type(&definition.id).await?;
        if !self.permissions.can_edit_type(actor, &stored) {
            return Err(permission_denied("edit_type", actor));
        }

        definition.created_by = stored.created_by;
        self.repo.update_type(&definition).await?;
        info!("徽章类型已更新");
        Ok(definition)
    }

    // ==================== 删除 ====================

    /// 删除徽章及其发放记录，徽章不存在时视为已删除
    #[instrument(skip(self))]
    pub async fn delete_badge(&self, badge_id: &str) -> Result<DeletionReport> {
        let badges_removed = self.repo.remove_badge_entry(badge_id).await?;

        let ownerships_removed = self
            .repo
            .remove_ownerships_of_badge(badge_id)
            .await
            .map_err(|e| cascade_incomplete("badge", badge_id, "remove_ownerships", e))?;

        let report = DeletionReport {
            types_removed: 0,
            badges_removed,
            ownerships_removed,
        };
        info!(?report, "徽章删除完成");
        Ok(report)
    }

    /// 删除类型、其下所有徽章以及这些徽章的发放记录
    #[instrument(skip(self))]
    pub async fn delete_type(&self, type_id: &str) -> Result<DeletionReport> {
        let mut report = DeletionReport {
            types_removed: self.repo.remove_type_entry(type_id).await?,
            ..DeletionReport::default()
        };

        let badges = self
            .repo
            .list_badges()
            .await
            .map_err(|e| cascade_incomplete("type", type_id, "list_badges", e))?;

        for badge in badges.iter().filter(|b| b.type_id == type_id) {
            debug!(badge_id = %badge.id, name = %badge.name, "删除类型下的徽章");
            let removed = self.delete_badge(&badge.id).await.map_err(|e| {
                cascade_incomplete("type", type_id, &format!("delete_badge:{}", badge.id), e)
            })?;
            report.merge(removed);
        }

        info!(?report, "徽章类型删除完成");
        Ok(report)
    }

    /// 删除徽章：先检查编辑权限
    pub async fn remove_badge(&self, actor: &Actor, badge_id: &str) -> Result<DeletionReport> {
        let stored = self.repo.get_badge(badge_id).await?;
        if !self.permissions.can_edit_badge(actor, &stored) {
            return Err(permission_denied("delete_badge", actor));
        }
        self.delete_badge(badge_id).await
    }

    /// 删除类型：先检查编辑权限
    pub async fn remove_type(&self, actor: &Actor, type_id: &str) -> Result<DeletionReport> {
        let stored = self.repo.get_type(type_id).await?;
        if !self.permissions.can_edit_type(actor, &stored) {
            return Err(permission_denied("delete_type", actor));
        }
        self.delete_type(type_id).await
    }

    // ==================== 集成注册 ====================

    /// 外部集成幂等注册徽章
    ///
    /// 查找（或创建）由 `bot_id` 创建的类型；对每个请求的徽章，若该机器人已创建同名徽章则复用，
    /// 否则在该类型下创建。返回顺序与请求一致，重启后重复调用不会产生重复徽章。
    #[instrument(skip(self, badges), fields(count = badges.len()))]
    pub async fn ensure_badges(
        &self,
        badges: Vec<Badge>,
        plugin_id: &str,
        bot_id: &str,
    ) -> Result<Vec<Badge>> {
        let actor = Actor::integration(bot_id, plugin_id);

        let existing_type = self
            .repo
            .list_types()
            .await?
            .into_iter()
            .find(|t| t.created_by == bot_id);
        let badge_type = match existing_type {
            Some(t) => t,
            None => {
                let definition = BadgeTypeDefinition {
                    name: format!("{}{}", PLUGIN_TYPE_NAME_PREFIX, plugin_id),
                    ..BadgeTypeDefinition::default()
                };
                self.add_type(&actor, definition).await?
            }
        };

        let mut known: Vec<Badge> = self
            .repo
            .list_badges()
            .await?
            .into_iter()
            .filter(|b| b.created_by == bot_id)
            .collect();

        let mut out = Vec::with_capacity(badges.len());
        for mut requested in badges {
            if let Some(found) = known.iter().find(|b| b.name == requested.name) {
                debug!(badge_id = %found.id, name = %found.name, "复用已注册的徽章");
                out.push(found.clone());
                continue;
            }

            requested.type_id = badge_type.id.clone();
            let created = self.add_badge(&actor, requested).await?;
            known.push(created.clone());
            out.push(created);
        }

        info!(plugin_id, type_id = %badge_type.id, "集成徽章注册完成");
        Ok(out)
    }

    // ==================== 维护 ====================

    /// 清理悬挂数据
    ///
    /// 依次删除类型已不存在的徽章、徽章已不存在的发放记录、类型已不存在的订阅，
    /// 每一步单独原子执行。判断依据来自步骤开始前的快照，应在没有并发写入时运行。
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let type_ids: HashSet<String> = self
            .repo
            .list_types()
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let orphan_badges = self
            .repo
            .remove_badges_where(|b| !type_ids.contains(&b.type_id))
            .await?;

        let badge_ids: HashSet<String> = self
            .repo
            .list_badges()
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        let orphan_ownerships = self
            .repo
            .remove_ownerships_where(|o| !badge_ids.contains(&o.badge))
            .await?;

        let orphan_subscriptions = self
            .repo
            .remove_subscriptions_where(|s| !type_ids.contains(&s.type_id))
            .await?;

        let report = ReconcileReport {
            orphan_badges,
            orphan_ownerships,
            orphan_subscriptions,
        };
        if report.total() > 0 {
            warn!(?report, "已清理悬挂数据");
        } else {
            info!("没有发现悬挂数据");
        }
        Ok(report)
    }

    /// 清空所有集合
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<()> {
        self.repo.reset().await?;
        warn!("所有徽章数据已清空");
        Ok(())
    }
}

fn cascade_incomplete(entity: &str, id: &str, step: &str, source: BadgeError) -> BadgeError {
    warn!(entity, id, step, error = %source, "级联删除中断");
    BadgeError::CascadeIncomplete {
        entity: entity.to_string(),
        id: id.to_string(),
        step: step.to_string(),
        source: Box::new(source),
    }
}

//! 徽章查询服务
//!
//! 只读视图：用户徽章、徽章详情、徽章目录、订阅查询，以及按操作者权限过滤的候选列表。
//! 每个集合整体读取，集合规模预期在几十到几千条之间。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::directory::{UNKNOWN_DISPLAY_NAME, UserDirectory, display_name_or_unknown};
use crate::error::Result;
use crate::models::{AllBadgesBadge, Badge, BadgeDetails, BadgeTypeDefinition, UserBadge};
use crate::permission::{Actor, PermissionEvaluator};
use crate::repository::BadgeRepository;

/// 徽章查询服务
#[derive(Clone)]
pub struct BadgeQueryService {
    repo: BadgeRepository,
    directory: Arc<dyn UserDirectory>,
    permissions: PermissionEvaluator,
}

impl BadgeQueryService {
    pub fn new(
        repo: BadgeRepository,
        directory: Arc<dyn UserDirectory>,
        permissions: PermissionEvaluator,
    ) -> Self {
        Self {
            repo,
            directory,
            permissions,
        }
    }

    pub async fn get_badge(&self, badge_id: &str) -> Result<Badge> {
        self.repo.get_badge(badge_id).await
    }

    pub async fn get_type(&self, type_id: &str) -> Result<BadgeTypeDefinition> {
        self.repo.get_type(type_id).await
    }

    pub async fn list_badges(&self) -> Result<Vec<Badge>> {
        self.repo.list_badges().await
    }

    pub async fn list_types(&self) -> Result<Vec<BadgeTypeDefinition>> {
        self.repo.list_types().await
    }

    /// 徽章详情：持有记录、创建者显示名、类型名称
    #[instrument(skip(self))]
    pub async fn get_badge_details(&self, badge_id: &str) -> Result<BadgeDetails> {
        let badge = self.repo.get_badge(badge_id).await?;
        let owners = self
            .repo
            .list_ownerships()
            .await?
            .into_iter()
            .filter(|o| o.badge == badge.id)
            .collect();
        let created_by_username =
            display_name_or_unknown(self.directory.as_ref(), &badge.created_by).await;
        let type_name = self.type_names().await?.name_of(&badge.type_id);

        Ok(BadgeDetails {
            badge,
            owners,
            created_by_username,
            type_name,
        })
    }

    /// 用户持有的徽章，最新发放在前
    ///
    /// 徽章已被删除的发放记录直接跳过
    #[instrument(skip(self))]
    pub async fn get_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>> {
        let ownerships = self.repo.list_ownerships().await?;
        let badges: HashMap<String, Badge> = self
            .repo
            .list_badges()
            .await?
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();
        let type_names = self.type_names().await?;

        let mut granter_names: HashMap<String, String> = HashMap::new();
        let mut out = Vec::new();
        for ownership in ownerships.into_iter().rev().filter(|o| o.user == user_id) {
            let Some(badge) = badges.get(&ownership.badge) else {
                debug!(badge_id = %ownership.badge, "发放记录对应的徽章不存在，跳过");
                continue;
            };

            let granted_by_name = match granter_names.get(&ownership.granted_by) {
                Some(name) => name.clone(),
                None => {
                    let name =
                        display_name_or_unknown(self.directory.as_ref(), &ownership.granted_by)
                            .await;
                    granter_names.insert(ownership.granted_by.clone(), name.clone());
                    name
                }
            };

            out.push(UserBadge {
                badge: badge.clone(),
                type_name: type_names.name_of(&badge.type_id),
                granted_by_name,
                ownership,
            });
        }
        Ok(out)
    }

    /// 徽章目录，附带不同获得者数量和总发放次数
    #[instrument(skip(self))]
    pub async fn get_all_badges(&self) -> Result<Vec<AllBadgesBadge>> {
        let badges = self.repo.list_badges().await?;
        let ownerships = self.repo.list_ownerships().await?;
        let type_names = self.type_names().await?;

        let mut times: HashMap<&str, usize> = HashMap::new();
        let mut owners: HashMap<&str, HashSet<&str>> = HashMap::new();
        for o in &ownerships {
            *times.entry(o.badge.as_str()).or_default() += 1;
            owners
                .entry(o.badge.as_str())
                .or_default()
                .insert(o.user.as_str());
        }

        Ok(badges
            .into_iter()
            .map(|badge| AllBadgesBadge {
                granted: owners.get(badge.id.as_str()).map_or(0, HashSet::len),
                granted_times: times.get(badge.id.as_str()).copied().unwrap_or(0),
                type_name: type_names.name_of(&badge.type_id),
                badge,
            })
            .collect())
    }

    /// 频道订阅的类型，类型已不存在的订阅跳过
    pub async fn get_channel_subscriptions(
        &self,
        channel_id: &str,
    ) -> Result<Vec<BadgeTypeDefinition>> {
        let type_ids: Vec<String> = self
            .repo
            .list_subscriptions()
            .await?
            .into_iter()
            .filter(|s| s.channel_id == channel_id)
            .map(|s| s.type_id)
            .collect();
        let types = self.repo.list_types().await?;

        Ok(type_ids
            .iter()
            .filter_map(|id| types.iter().find(|t| &t.id == id).cloned())
            .collect())
    }

    /// 订阅了该类型的频道
    pub async fn get_type_subscriptions(&self, type_id: &str) -> Result<Vec<String>> {
        Ok(self
            .repo
            .list_subscriptions()
            .await?
            .into_iter()
            .filter(|s| s.type_id == type_id)
            .map(|s| s.channel_id)
            .collect())
    }

    // ==================== 候选列表 ====================

    /// 操作者可以发放的徽章
    pub async fn get_grant_suggestions(&self, actor: &Actor) -> Result<Vec<Badge>> {
        let badges = self.repo.list_badges().await?;
        let types = self.repo.list_types().await?;

        Ok(badges
            .into_iter()
            .filter(|b| match types.iter().find(|t| t.id == b.type_id) {
                Some(t) => self.permissions.can_grant_badge(actor, b, t),
                None => {
                    debug!(badge_id = %b.id, "徽章的类型不存在");
                    false
                }
            })
            .collect())
    }

    /// 操作者可以编辑的徽章
    pub async fn get_edit_badge_suggestions(&self, actor: &Actor) -> Result<Vec<Badge>> {
        Ok(self
            .repo
            .list_badges()
            .await?
            .into_iter()
            .filter(|b| self.permissions.can_edit_badge(actor, b))
            .collect())
    }

    /// 操作者可以在其下创建徽章的类型
    pub async fn get_type_suggestions(&self, actor: &Actor) -> Result<Vec<BadgeTypeDefinition>> {
        Ok(self
            .repo
            .list_types()
            .await?
            .into_iter()
            .filter(|t| self.permissions.can_create_badge(actor, t))
            .collect())
    }

    /// 操作者可以编辑的类型
    pub async fn get_edit_type_suggestions(
        &self,
        actor: &Actor,
    ) -> Result<Vec<BadgeTypeDefinition>> {
        Ok(self
            .repo
            .list_types()
            .await?
            .into_iter()
            .filter(|t| self.permissions.can_edit_type(actor, t))
            .collect())
    }

    async fn type_names(&self) -> Result<TypeNames> {
        Ok(TypeNames(
            self.repo
                .list_types()
                .await?
                .into_iter()
                .map(|t| (t.id, t.name))
                .collect(),
        ))
    }
}

/// 类型 ID -> 名称
struct TypeNames(HashMap<String, String>);

impl TypeNames {
    fn name_of(&self, type_id: &str) -> String {
        self.0
            .get(type_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string())
    }
}

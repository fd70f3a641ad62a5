//! 权限判定
//!
//! 所有判定都是无副作用的纯函数。每种操作对应一组按固定顺序检查的层级（Tier），
//! 第一个给出结论的层级决定结果，全部层级都不表态时拒绝。
//!
//! 创建/发放的顺序：管理员 -> 创建者 -> 屏蔽名单 -> 角色 -> 允许名单 -> 所有人。
//! 屏蔽名单只能否决其后的层级，无法覆盖管理员和创建者。

use serde::{Deserialize, Serialize};

use badge_shared::config::PermissionConfig;

use crate::models::{Badge, BadgeTypeDefinition, Origin, PermissionScheme};

/// 操作者
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_system_admin: bool,
    #[serde(default)]
    pub origin: Origin,
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn system_admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_system_admin: true,
            ..Self::default()
        }
    }

    /// 代表外部集成执行操作的机器人
    pub fn integration(bot_id: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self {
            id: bot_id.into(),
            origin: Origin::Integration {
                plugin_id: plugin_id.into(),
            },
            ..Self::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

/// 判定层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// 配置的徽章管理员或系统管理员
    Admin,
    /// 类型创建者
    TypeCreator,
    /// 徽章创建者
    BadgeCreator,
    /// 屏蔽名单否决
    BlockList,
    /// 角色允许
    RoleAllowList,
    /// 个人允许名单
    UserAllowList,
    /// 方案对所有人开放
    Everyone,
}

pub const CREATE_BADGE_TIERS: &[Tier] = &[
    Tier::Admin,
    Tier::TypeCreator,
    Tier::BlockList,
    Tier::RoleAllowList,
    Tier::UserAllowList,
    Tier::Everyone,
];

pub const GRANT_BADGE_TIERS: &[Tier] = &[
    Tier::Admin,
    Tier::TypeCreator,
    Tier::BadgeCreator,
    Tier::BlockList,
    Tier::RoleAllowList,
    Tier::UserAllowList,
    Tier::Everyone,
];

pub const EDIT_TYPE_TIERS: &[Tier] = &[Tier::Admin];

pub const EDIT_BADGE_TIERS: &[Tier] = &[Tier::Admin, Tier::BadgeCreator];

pub const ADMIN_ONLY_TIERS: &[Tier] = &[Tier::Admin];

/// 判定上下文
#[derive(Debug, Default, Clone, Copy)]
struct Target<'a> {
    scheme: Option<&'a PermissionScheme>,
    type_creator: Option<&'a str>,
    badge_creator: Option<&'a str>,
}

/// 权限判定器
#[derive(Debug, Clone, Default)]
pub struct PermissionEvaluator {
    badge_admin_user_id: Option<String>,
}

impl PermissionEvaluator {
    pub fn new(badge_admin_user_id: Option<String>) -> Self {
        Self {
            badge_admin_user_id: badge_admin_user_id.filter(|id| !id.is_empty()),
        }
    }

    pub fn from_config(config: &PermissionConfig) -> Self {
        Self::new(config.badge_admin_user_id.clone())
    }

    pub fn is_admin(&self, actor: &Actor) -> bool {
        actor.is_system_admin || self.badge_admin_user_id.as_deref() == Some(actor.id.as_str())
    }

    pub fn can_create_badge(&self, actor: &Actor, badge_type: &BadgeTypeDefinition) -> bool {
        self.evaluate(
            CREATE_BADGE_TIERS,
            actor,
            Target {
                scheme: Some(&badge_type.can_create),
                type_creator: Some(&badge_type.created_by),
                badge_creator: None,
            },
        )
    }

    pub fn can_grant_badge(
        &self,
        actor: &Actor,
        badge: &Badge,
        badge_type: &BadgeTypeDefinition,
    ) -> bool {
        self.evaluate(
            GRANT_BADGE_TIERS,
            actor,
            Target {
                scheme: Some(&badge_type.can_grant),
                type_creator: Some(&badge_type.created_by),
                badge_creator: Some(&badge.created_by),
            },
        )
    }

    /// 集成来源无条件放行，否则仅管理员
    pub fn can_create_type(&self, actor: &Actor, is_plugin_origin: bool) -> bool {
        is_plugin_origin || self.evaluate(ADMIN_ONLY_TIERS, actor, Target::default())
    }

    pub fn can_edit_type(&self, actor: &Actor, _badge_type: &BadgeTypeDefinition) -> bool {
        self.evaluate(EDIT_TYPE_TIERS, actor, Target::default())
    }

    pub fn can_edit_badge(&self, actor: &Actor, badge: &Badge) -> bool {
        self.evaluate(
            EDIT_BADGE_TIERS,
            actor,
            Target {
                badge_creator: Some(&badge.created_by),
                ..Target::default()
            },
        )
    }

    pub fn can_create_subscription(&self, actor: &Actor, _channel_id: &str) -> bool {
        self.evaluate(ADMIN_ONLY_TIERS, actor, Target::default())
    }

    fn evaluate(&self, tiers: &[Tier], actor: &Actor, target: Target<'_>) -> bool {
        tiers
            .iter()
            .find_map(|tier| self.decide(*tier, actor, &target))
            .unwrap_or(false)
    }

    /// 单个层级的结论，`None` 表示交给下一层级
    fn decide(&self, tier: Tier, actor: &Actor, target: &Target<'_>) -> Option<bool> {
        match tier {
            Tier::Admin => self.is_admin(actor).then_some(true),
            Tier::TypeCreator => is_creator(target.type_creator, actor).then_some(true),
            Tier::BadgeCreator => is_creator(target.badge_creator, actor).then_some(true),
            Tier::BlockList => target
                .scheme
                .is_some_and(|s| s.is_blocked(&actor.id))
                .then_some(false),
            Tier::RoleAllowList => target
                .scheme
                .is_some_and(|s| s.allows_any_role(&actor.roles))
                .then_some(true),
            Tier::UserAllowList => target
                .scheme
                .is_some_and(|s| s.is_allowed(&actor.id))
                .then_some(true),
            Tier::Everyone => target.scheme.is_some_and(|s| s.everyone).then_some(true),
        }
    }
}

fn is_creator(creator: Option<&str>, actor: &Actor) -> bool {
    matches!(creator, Some(id) if !id.is_empty() && id == actor.id)
}

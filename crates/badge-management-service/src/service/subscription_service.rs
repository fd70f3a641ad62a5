//! 频道订阅服务

use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::models::Subscription;
use crate::permission::{Actor, PermissionEvaluator};
use crate::repository::BadgeRepository;
use crate::service::permission_denied;

/// 频道订阅服务
#[derive(Clone)]
pub struct SubscriptionService {
    repo: BadgeRepository,
    permissions: PermissionEvaluator,
}

impl SubscriptionService {
    pub fn new(repo: BadgeRepository, permissions: PermissionEvaluator) -> Self {
        Self { repo, permissions }
    }

    /// 订阅类型，已订阅时为空操作；返回是否新增
    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn subscribe(&self, actor: &Actor, channel_id: &str, type_id: &str) -> Result<bool> {
        if !self.permissions.can_create_subscription(actor, channel_id) {
            return Err(permission_denied("add_subscription", actor));
        }

        self.repo.get_type(type_id).await?;
        let added = self
            .repo
            .add_subscription(&Subscription::new(channel_id, type_id))
            .await?;
        if added {
            info!("频道订阅成功");
        } else {
            debug!("频道已订阅该类型");
        }
        Ok(added)
    }

    /// 取消订阅，未订阅时静默成功；返回是否删除
    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn unsubscribe(
        &self,
        actor: &Actor,
        channel_id: &str,
        type_id: &str,
    ) -> Result<bool> {
        if !self.permissions.can_create_subscription(actor, channel_id) {
            return Err(permission_denied("remove_subscription", actor));
        }

        let removed = self
            .repo
            .remove_subscription(&Subscription::new(channel_id, type_id))
            .await?;
        if removed {
            info!("已取消频道订阅");
        }
        Ok(removed)
    }
}

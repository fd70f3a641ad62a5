//! 徽章发放服务
//!
//! ## 发放流程
//!
//! 1. 解析徽章 -> 2. 解析类型 -> 3. 权限检查 -> 4. 乐观写入发放记录
//!    -> 5. 发送通知（仅新增记录时，失败不影响发放结果）
//!
//! 非可重复徽章的重复发放是幂等的空操作：不写入、不通知、不报错。

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use badge_shared::observability::metrics::BADGE_GRANTS_TOTAL;

use crate::error::Result;
use crate::models::Ownership;
use crate::notification::{GrantEvent, GrantNotifier};
use crate::permission::{Actor, PermissionEvaluator};
use crate::repository::BadgeRepository;
use crate::service::dto::{GrantBadgeRequest, GrantOutcome};
use crate::service::permission_denied;

/// 徽章发放服务
#[derive(Clone)]
pub struct GrantService {
    repo: BadgeRepository,
    permissions: PermissionEvaluator,
    /// 通知器（可选，未设置时只写入不通知）
    notifier: Option<Arc<GrantNotifier>>,
}

impl GrantService {
    pub fn new(repo: BadgeRepository, permissions: PermissionEvaluator) -> Self {
        Self {
            repo,
            permissions,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<GrantNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// 以操作者身份发放徽章
    #[instrument(skip(self, request), fields(granter = %actor.id, user_id = %request.user_id, badge_id = %request.badge_id))]
    pub async fn grant_badge(
        &self,
        actor: &Actor,
        request: GrantBadgeRequest,
    ) -> Result<GrantOutcome> {
        let badge = self.repo.get_badge(&request.badge_id).await?;
        let badge_type = self.repo.get_type(&badge.type_id).await?;

        if !self.permissions.can_grant_badge(actor, &badge, &badge_type) {
            metrics::counter!(BADGE_GRANTS_TOTAL, "result" => "denied").increment(1);
            return Err(permission_denied("grant_badge", actor));
        }

        let ownership = Ownership {
            user: request.user_id.clone(),
            granted_by: actor.id.clone(),
            badge: badge.id.clone(),
            time: Utc::now(),
            reason: request.reason.clone(),
        };
        let should_notify = self.repo.add_ownership(&ownership, badge.multiple).await?;

        if !should_notify {
            metrics::counter!(BADGE_GRANTS_TOTAL, "result" => "duplicate").increment(1);
            debug!("用户已持有非可重复徽章，跳过");
            return Ok(GrantOutcome { should_notify });
        }

        metrics::counter!(BADGE_GRANTS_TOTAL, "result" => "granted").increment(1);
        info!("徽章发放成功");

        if let Some(notifier) = &self.notifier {
            notifier
                .notify_grant(&GrantEvent {
                    badge,
                    granter_id: actor.id.clone(),
                    grantee_id: request.user_id,
                    reason: request.reason,
                    notify_channel_id: request.notify_channel_id,
                })
                .await;
        }

        Ok(GrantOutcome { should_notify })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use badge_shared::kv::MemoryKv;

    use crate::directory::{DisplayNameFormat, StaticUserDirectory, User};
    use crate::error::{BadgeError, ErrorKind};
    use crate::models::{Badge, BadgeTypeDefinition, PermissionScheme};
    use crate::notification::sender::MockMessageSink;

    async fn seed(repo: &BadgeRepository, multiple: bool) -> Badge {
        let t = repo
            .insert_type(BadgeTypeDefinition {
                name: "Sports".to_string(),
                created_by: "owner".to_string(),
                can_grant: PermissionScheme::everyone(),
                ..BadgeTypeDefinition::default()
            })
            .await
            .unwrap();
        repo.insert_badge(Badge {
            name: "Sporty".to_string(),
            image: "medal".to_string(),
            type_id: t.id,
            multiple,
            created_by: "owner".to_string(),
            ..Badge::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_grant_unknown_badge() {
        let repo = BadgeRepository::new(Arc::new(MemoryKv::new()));
        let service = GrantService::new(repo, PermissionEvaluator::default());
        let err = service
            .grant_badge(&Actor::user("u1"), GrantBadgeRequest::new("missing", "u2"))
            .await
            .unwrap_err();
        assert!(matches!(err, BadgeError::BadgeNotFound(_)));
    }

    #[tokio::test]
    async fn test_grant_with_missing_type() {
        let repo = BadgeRepository::new(Arc::new(MemoryKv::new()));
        let badge = repo
            .insert_badge(Badge {
                name: "Lost".to_string(),
                image: "medal".to_string(),
                type_id: "gone".to_string(),
                ..Badge::default()
            })
            .await
            .unwrap();
        let service = GrantService::new(repo, PermissionEvaluator::default());
        let err = service
            .grant_badge(&Actor::user("u1"), GrantBadgeRequest::new(badge.id, "u2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_grant_does_not_notify() {
        let repo = BadgeRepository::new(Arc::new(MemoryKv::new()));
        let badge = seed(&repo, false).await;

        let directory = Arc::new(StaticUserDirectory::with_users(
            DisplayNameFormat::Username,
            [User::new("u1", "alice"), User::new("u2", "bob")],
        ));
        let mut sink = MockMessageSink::new();
        sink.expect_send_direct()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let notifier = Arc::new(GrantNotifier::new(
            repo.clone(),
            directory,
            Arc::new(sink),
            "bot",
        ));
        let service =
            GrantService::new(repo.clone(), PermissionEvaluator::default()).with_notifier(notifier);

        let first = service
            .grant_badge(&Actor::user("u1"), GrantBadgeRequest::new(&badge.id, "u2"))
            .await
            .unwrap();
        let second = service
            .grant_badge(&Actor::user("u1"), GrantBadgeRequest::new(&badge.id, "u2"))
            .await
            .unwrap();

        assert!(first.should_notify);
        assert!(!second.should_notify);
        assert_eq!(repo.list_ownerships().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_grant_records_granter_and_reason() {
        let repo = BadgeRepository::new(Arc::new(MemoryKv::new()));
        let badge = seed(&repo, true).await;
        let service = GrantService::new(repo.clone(), PermissionEvaluator::default());

        service
            .grant_badge(
                &Actor::user("u1"),
                GrantBadgeRequest::new(&badge.id, "u2").with_reason("helped out"),
            )
            .await
            .unwrap();

        let rows = repo.list_ownerships().await.unwrap();
        assert_eq!(rows[0].granted_by, "u1");
        assert_eq!(rows[0].user, "u2");
        assert_eq!(rows[0].reason, "helped out");
    }
}

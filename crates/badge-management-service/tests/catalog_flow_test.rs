//! 目录管理集成测试
//!
//! 覆盖类型与徽章的创建、编辑、权限拒绝、校验、集成注册和订阅，
//! 全部基于内存存储，无需外部依赖。

mod common;

use badge_management::models::{BadgeTypeDefinition, PermissionScheme};
use badge_management::permission::Actor;
use badge_management::{BadgeError, ErrorKind};

use common::{Harness, badge_draft};

// ==================== 创建 ====================

#[tokio::test]
async fn test_everyone_can_create_badge_under_open_type() {
    let h = Harness::memory();
    let sports = h
        .create_type("Sports", PermissionScheme::everyone(), PermissionScheme::default())
        .await;

    let alice = h.user(0);
    let badge = h
        .catalog
        .add_badge(&alice, badge_draft(&sports.id, "Sporty", false))
        .await
        .unwrap();

    assert!(!badge.id.is_empty());
    assert_eq!(badge.created_by, alice.id);
    assert_eq!(badge.type_id, sports.id);

    let stored = h.queries.get_badge(&badge.id).await.unwrap();
    assert_eq!(stored, badge);
}

#[tokio::test]
async fn test_denied_create_performs_no_write() {
    let h = Harness::memory();
    let closed = h
        .create_type("Staff", PermissionScheme::default(), PermissionScheme::default())
        .await;

    let err = h
        .catalog
        .add_badge(&h.user(1), badge_draft(&closed.id, "Insider", false))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Permission);
    assert!(h.queries.list_badges().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blocked_user_cannot_create_even_if_everyone_allowed() {
    let h = Harness::memory();
    let mut scheme = PermissionScheme::everyone();
    let bob = h.user(1);
    scheme.block_list.insert(bob.id.clone(), true);
    let t = h.create_type("Open", scheme, PermissionScheme::default()).await;

    let err = h
        .catalog
        .add_badge(&bob, badge_draft(&t.id, "Nope", false))
        .await
        .unwrap_err();
    assert!(matches!(err, BadgeError::PermissionDenied { .. }));

    // 其他用户不受影响
    h.catalog
        .add_badge(&h.user(2), badge_draft(&t.id, "Yes", false))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_role_allowed_create() {
    let h = Harness::memory();
    let mut scheme = PermissionScheme::default();
    scheme.roles.insert("team_lead".to_string(), true);
    let t = h.create_type("Leads", scheme, PermissionScheme::default()).await;

    let lead = Actor::user("u-lead").with_roles(["team_lead"]);
    h.catalog
        .add_badge(&lead, badge_draft(&t.id, "Captain", false))
        .await
        .unwrap();

    let member = Actor::user("u-member").with_roles(["member"]);
    assert!(
        h.catalog
            .add_badge(&member, badge_draft(&t.id, "Crew", false))
            .await
            .is_err()
    );
}

// ==================== 校验 ====================

#[tokio::test]
async fn test_validation_limits_are_enforced() {
    let h = Harness::memory();
    let t = h
        .create_type("Sports", PermissionScheme::everyone(), PermissionScheme::default())
        .await;
    let admin = h.admin();

    let mut at_limit = badge_draft(&t.id, &"徽".repeat(20), false);
    at_limit.description = "d".repeat(120);
    h.catalog.add_badge(&admin, at_limit).await.unwrap();

    let long_name = badge_draft(&t.id, &"n".repeat(21), false);
    let err = h.catalog.add_badge(&admin, long_name).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut long_description = badge_draft(&t.id, "Ok", false);
    long_description.description = "d".repeat(121);
    let err = h
        .catalog
        .add_badge(&admin, long_description)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut no_image = badge_draft(&t.id, "Blank", false);
    no_image.image.clear();
    let err = h.catalog.add_badge(&admin, no_image).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(h.queries.list_badges().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_badge_under_missing_type_is_rejected() {
    let h = Harness::memory();
    let err = h
        .catalog
        .add_badge(&h.admin(), badge_draft("missing", "Ghost", false))
        .await
        .unwrap_err();
    assert!(matches!(err, BadgeError::TypeNotFound(_)));
}

// ==================== 类型 ====================

#[tokio::test]
async fn test_add_type_then_get_type() {
    let h = Harness::memory();
    let created = h
        .catalog
        .add_type(
            &h.admin(),
            BadgeTypeDefinition {
                name: "Events".to_string(),
                frame: "gold".to_string(),
                can_grant: PermissionScheme::everyone(),
                ..BadgeTypeDefinition::default()
            },
        )
        .await
        .unwrap();

    let fetched = h.queries.get_type(&created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.created_by, common::ADMIN_ID);
    assert!(fetched.can_grant.everyone);
}

#[tokio::test]
async fn test_non_admin_cannot_create_type() {
    let h = Harness::memory();
    let err = h
        .catalog
        .add_type(
            &h.user(0),
            BadgeTypeDefinition {
                name: "Mine".to_string(),
                ..BadgeTypeDefinition::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert!(h.queries.list_types().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_edit_type_keeps_creator() {
    let h = Harness::memory();
    let t = h
        .create_type("Sports", PermissionScheme::default(), PermissionScheme::default())
        .await;

    let mut edited = t.clone();
    edited.name = "Athletics".to_string();
    edited.created_by = "someone-else".to_string();
    h.catalog.edit_type(&h.admin(), edited).await.unwrap();

    let stored = h.queries.get_type(&t.id).await.unwrap();
    assert_eq!(stored.name, "Athletics");
    assert_eq!(stored.created_by, common::ADMIN_ID);

    assert!(h.catalog.edit_type(&h.user(0), stored).await.is_err());
}

// ==================== 编辑徽章 ====================

#[tokio::test]
async fn test_only_creator_or_admin_edits_badge() {
    let h = Harness::memory();
    let t = h
        .create_type("Sports", PermissionScheme::everyone(), PermissionScheme::default())
        .await;
    let alice = h.user(0);
    let badge = h
        .catalog
        .add_badge(&alice, badge_draft(&t.id, "Sporty", false))
        .await
        .unwrap();

    let mut renamed = badge.clone();
    renamed.name = "Sportier".to_string();
    let err = h
        .catalog
        .edit_badge(&h.user(1), renamed.clone())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    let edited = h.catalog.edit_badge(&alice, renamed).await.unwrap();
    assert_eq!(edited.name, "Sportier");
    assert_eq!(edited.created_by, alice.id);

    let mut moved = edited.clone();
    moved.type_id = "missing".to_string();
    let err = h.catalog.edit_badge(&h.admin(), moved).await.unwrap_err();
    assert!(matches!(err, BadgeError::TypeNotFound(_)));
    assert_eq!(h.queries.get_badge(&badge.id).await.unwrap().type_id, t.id);
}

// ==================== 集成注册 ====================

#[tokio::test]
async fn test_ensure_badges_is_idempotent() {
    let h = Harness::memory();
    let requested = || {
        vec![
            badge_draft("", "First Commit", false),
            badge_draft("", "Reviewer", true),
        ]
    };

    let first = h
        .catalog
        .ensure_badges(requested(), "github", common::BOT_ID)
        .await
        .unwrap();
    let second = h
        .catalog
        .ensure_badges(requested(), "github", common::BOT_ID)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].name, "First Commit");
    assert_eq!(first[1].name, "Reviewer");

    let types = h.queries.list_types().await.unwrap();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].name, "Plugin badges: github");
    assert_eq!(types[0].created_by, common::BOT_ID);
    assert!(first.iter().all(|b| b.type_id == types[0].id));
    assert_eq!(h.queries.list_badges().await.unwrap().len(), 2);
}

// ==================== 订阅 ====================

#[tokio::test]
async fn test_subscriptions_are_admin_only_and_deduplicated() {
    let h = Harness::memory();
    let t = h
        .create_type("Sports", PermissionScheme::default(), PermissionScheme::default())
        .await;

    let err = h
        .subscriptions
        .subscribe(&h.user(0), "town-square", &t.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    let err = h
        .subscriptions
        .subscribe(&h.admin(), "town-square", "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, BadgeError::TypeNotFound(_)));

    assert!(
        h.subscriptions
            .subscribe(&h.admin(), "town-square", &t.id)
            .await
            .unwrap()
    );
    assert!(
        !h.subscriptions
            .subscribe(&h.admin(), "town-square", &t.id)
            .await
            .unwrap()
    );

    let channels = h.queries.get_type_subscriptions(&t.id).await.unwrap();
    assert_eq!(channels, vec!["town-square".to_string()]);
    let types = h
        .queries
        .get_channel_subscriptions("town-square")
        .await
        .unwrap();
    assert_eq!(types, vec![t.clone()]);

    assert!(
        h.subscriptions
            .unsubscribe(&h.admin(), "town-square", &t.id)
            .await
            .unwrap()
    );
    assert!(
        !h.subscriptions
            .unsubscribe(&h.admin(), "town-square", &t.id)
            .await
            .unwrap()
    );
    assert!(h.queries.get_type_subscriptions(&t.id).await.unwrap().is_empty());
}

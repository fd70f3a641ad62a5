//! 徽章仓储实现
//!
//! 所有写操作都是“读取集合 -> 计算新集合 -> CAS 写回”的乐观步骤，
//! 由 `with_optimistic_retry` 在尝试上限内重复执行。
//!
//! 每个写操作只触及一个集合，跨集合的流程（级联删除等）由服务层按步骤编排。

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use badge_shared::kv::KvBackend;
use badge_shared::observability::metrics::{CAS_CONFLICTS_TOTAL, RETRY_EXHAUSTED_TOTAL};
use badge_shared::retry::{Attempt, OptimisticPolicy, with_optimistic_retry};

use crate::error::{BadgeError, Result};
use crate::id::{IdGenerator, UuidIdGenerator};
use crate::models::{Badge, BadgeTypeDefinition, Ownership, Subscription};

use super::collection::{CollectionKey, CollectionStore};

/// 徽章仓储
///
/// 独占四个集合的写入权限，查询层只读取
#[derive(Clone)]
pub struct BadgeRepository {
    store: CollectionStore,
    policy: OptimisticPolicy,
    ids: Arc<dyn IdGenerator>,
}

impl BadgeRepository {
    pub fn new(kv: Arc<dyn KvBackend>) -> Self {
        Self {
            store: CollectionStore::new(kv),
            policy: OptimisticPolicy::default(),
            ids: Arc::new(UuidIdGenerator),
        }
    }

    pub fn with_policy(mut self, policy: OptimisticPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn policy(&self) -> &OptimisticPolicy {
        &self.policy
    }

    // ==================== 读取 ====================

    pub async fn list_badges(&self) -> Result<Vec<Badge>> {
        Ok(self.store.load(CollectionKey::Badges).await?.items)
    }

    pub async fn list_types(&self) -> Result<Vec<BadgeTypeDefinition>> {
        Ok(self.store.load(CollectionKey::Types).await?.items)
    }

    pub async fn list_ownerships(&self) -> Result<Vec<Ownership>> {
        Ok(self.store.load(CollectionKey::Ownership).await?.items)
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        Ok(self.store.load(CollectionKey::Subscriptions).await?.items)
    }

    pub async fn get_badge(&self, badge_id: &str) -> Result<Badge> {
        self.list_badges()
            .await?
            .into_iter()
            .find(|b| b.id == badge_id)
            .ok_or_else(|| BadgeError::BadgeNotFound(badge_id.to_string()))
    }

    pub async fn get_type(&self, type_id: &str) -> Result<BadgeTypeDefinition> {
        self.list_types()
            .await?
            .into_iter()
            .find(|t| t.id == type_id)
            .ok_or_else(|| BadgeError::TypeNotFound(type_id.to_string()))
    }

    // ==================== 写入 ====================

    /// 分配新 ID 并追加徽章
    #[instrument(skip(self, badge), fields(name = %badge.name))]
    pub async fn insert_badge(&self, mut badge: Badge) -> Result<Badge> {
        badge.id = self.ids.next_id();
        self.append("add_badge", CollectionKey::Badges, &badge).await?;
        Ok(badge)
    }

    /// 分配新 ID 并追加类型
    #[instrument(skip(self, definition), fields(name = %definition.name))]
    pub async fn insert_type(
        &self,
        mut definition: BadgeTypeDefinition,
    ) -> Result<BadgeTypeDefinition> {
        definition.id = self.ids.next_id();
        self.append("add_type", CollectionKey::Types, &definition)
            .await?;
        Ok(definition)
    }

    /// 按 ID 原地替换徽章，不做权限检查
    #[instrument(skip(self, badge), fields(badge_id = %badge.id))]
    pub async fn update_badge(&self, badge: &Badge) -> Result<()> {
        self.replace(
            "update_badge",
            CollectionKey::Badges,
            badge,
            |b: &Badge| b.id == badge.id,
            || BadgeError::BadgeNotFound(badge.id.clone()),
        )
        .await
    }

    /// 按 ID 原地替换类型，不做权限检查
    #[instrument(skip(self, definition), fields(type_id = %definition.id))]
    pub async fn update_type(&self, definition: &BadgeTypeDefinition) -> Result<()> {
        self.replace(
            "update_type",
            CollectionKey::Types,
            definition,
            |t: &BadgeTypeDefinition| t.id == definition.id,
            || BadgeError::TypeNotFound(definition.id.clone()),
        )
        .await
    }

    /// 删除徽章条目，返回删除数量；不存在时不写入
    pub async fn remove_badge_entry(&self, badge_id: &str) -> Result<usize> {
        self.remove_badges_where(|b| b.id == badge_id).await
    }

    /// 删除类型条目，返回删除数量；不存在时不写入
    pub async fn remove_type_entry(&self, type_id: &str) -> Result<usize> {
        let removed: Vec<BadgeTypeDefinition> = self
            .remove_where("remove_type", CollectionKey::Types, |t: &BadgeTypeDefinition| {
                t.id == type_id
            })
            .await?;
        Ok(removed.len())
    }

    /// 删除某徽章的全部发放记录
    pub async fn remove_ownerships_of_badge(&self, badge_id: &str) -> Result<usize> {
        self.remove_ownerships_where(|o| o.badge == badge_id).await
    }

    pub async fn remove_badges_where<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&Badge) -> bool + Sync,
    {
        let removed: Vec<Badge> = self
            .remove_where("remove_badges", CollectionKey::Badges, predicate)
            .await?;
        Ok(removed.len())
    }

    pub async fn remove_ownerships_where<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&Ownership) -> bool + Sync,
    {
        let removed: Vec<Ownership> = self
            .remove_where("remove_ownerships", CollectionKey::Ownership, predicate)
            .await?;
        Ok(removed.len())
    }

    pub async fn remove_subscriptions_where<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&Subscription) -> bool + Sync,
    {
        let removed: Vec<Subscription> = self
            .remove_where(
                "remove_subscriptions",
                CollectionKey::Subscriptions,
                predicate,
            )
            .await?;
        Ok(removed.len())
    }

    /// 追加发放记录
    ///
    /// 非可重复徽章且用户已持有时直接完成、不写入，返回 false（无需通知）。
    #[instrument(skip(self, ownership), fields(user_id = %ownership.user, badge_id = %ownership.badge))]
    pub async fn add_ownership(&self, ownership: &Ownership, multiple: bool) -> Result<bool> {
        self.do_atomic("grant_badge", move || async move {
            let snapshot = self
                .store
                .load::<Ownership>(CollectionKey::Ownership)
                .await?;

            if !multiple
                && snapshot
                    .items
                    .iter()
                    .any(|o| o.matches(&ownership.user, &ownership.badge))
            {
                debug!("用户已持有该徽章，跳过写入");
                return Ok(Attempt::Done(false));
            }

            let mut items = snapshot.items.clone();
            items.push(ownership.clone());
            self.commit(
                "grant_badge",
                CollectionKey::Ownership,
                snapshot.version(),
                &items,
                true,
            )
            .await
        })
        .await
    }

    /// 去重插入订阅，返回是否新增
    #[instrument(skip(self))]
    pub async fn add_subscription(&self, subscription: &Subscription) -> Result<bool> {
        self.do_atomic("add_subscription", move || async move {
            let snapshot = self
                .store
                .load::<Subscription>(CollectionKey::Subscriptions)
                .await?;
            if snapshot.items.contains(subscription) {
                return Ok(Attempt::Done(false));
            }

            let mut items = snapshot.items.clone();
            items.push(subscription.clone());
            self.commit(
                "add_subscription",
                CollectionKey::Subscriptions,
                snapshot.version(),
                &items,
                true,
            )
            .await
        })
        .await
    }

    /// 删除订阅，不存在时静默成功，返回是否删除
    pub async fn remove_subscription(&self, subscription: &Subscription) -> Result<bool> {
        let removed = self.remove_subscriptions_where(|s| s == subscription).await?;
        Ok(removed > 0)
    }

    /// 清空所有集合
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<()> {
        self.store.delete_all().await
    }

    // ==================== 乐观更新原语 ====================

    /// 在尝试上限内执行步骤，耗尽时转换为 `ConflictExhausted`
    async fn do_atomic<T, F, Fut>(&self, operation: &'static str, step: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Attempt<T>>>,
    {
        with_optimistic_retry(&self.policy, operation, step)
            .await
            .into_result(|attempts| {
                metrics::counter!(RETRY_EXHAUSTED_TOTAL, "operation" => operation).increment(1);
                BadgeError::ConflictExhausted {
                    operation: operation.to_string(),
                    attempts,
                }
            })
    }

    /// CAS 写回，失败时记为一次冲突
    async fn commit<T, V>(
        &self,
        operation: &'static str,
        key: CollectionKey,
        version: Option<&[u8]>,
        items: &[T],
        value: V,
    ) -> Result<Attempt<V>>
    where
        T: Serialize + Sync,
    {
        if self.store.compare_and_set(key, version, items).await? {
            Ok(Attempt::Done(value))
        } else {
            metrics::counter!(CAS_CONFLICTS_TOTAL, "operation" => operation).increment(1);
            Ok(Attempt::Conflict)
        }
    }

    async fn append<T>(&self, operation: &'static str, key: CollectionKey, item: &T) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Clone + Sync,
    {
        self.do_atomic(operation, move || async move {
            let snapshot = self.store.load::<T>(key).await?;
            let mut items = snapshot.items.clone();
            items.push(item.clone());
            self.commit(operation, key, snapshot.version(), &items, ())
                .await
        })
        .await
    }

    async fn replace<T, M, N>(
        &self,
        operation: &'static str,
        key: CollectionKey,
        item: &T,
        matches: M,
        not_found: N,
    ) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Clone + Sync,
        M: Fn(&T) -> bool,
        N: Fn() -> BadgeError,
    {
        let matches = &matches;
        let not_found = &not_found;
        self.do_atomic(operation, move || async move {
            let snapshot = self.store.load::<T>(key).await?;
            let mut items = snapshot.items.clone();
            let slot = items
                .iter_mut()
                .find(|existing| matches(existing))
                .ok_or_else(not_found)?;
            *slot = item.clone();
            self.commit(operation, key, snapshot.version(), &items, ())
                .await
        })
        .await
    }

    /// 删除满足条件的条目，返回被删除的条目；没有命中时视为完成且不写入
    async fn remove_where<T, F>(
        &self,
        operation: &'static str,
        key: CollectionKey,
        predicate: F,
    ) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Sync,
        F: Fn(&T) -> bool + Sync,
    {
        let predicate = &predicate;
        self.do_atomic(operation, move || async move {
            let snapshot = self.store.load::<T>(key).await?;
            let version = snapshot.version;
            let (removed, kept): (Vec<T>, Vec<T>) =
                snapshot.items.into_iter().partition(|item| predicate(item));
            if removed.is_empty() {
                return Ok(Attempt::Done(removed));
            }
            self.commit(operation, key, version.as_deref(), &kept, removed)
                .await
        })
        .await
    }
}

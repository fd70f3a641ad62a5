//! 集成测试公共设施
//!
//! 提供可注入竞争写入的键值后端、始终冲突的后端、可按键注入故障的后端、
//! 记录消息的发送器，以及预置用户和类型的服务组合。

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use fake::Fake;
use fake::faker::internet::en::Username;
use parking_lot::Mutex;

use badge_management::directory::{DisplayNameFormat, StaticUserDirectory, User};
use badge_management::dto::GrantBadgeRequest;
use badge_management::models::{Badge, BadgeTypeDefinition, PermissionScheme};
use badge_management::notification::{GrantNotifier, MessageSink, Post};
use badge_management::permission::{Actor, PermissionEvaluator};
use badge_management::repository::BadgeRepository;
use badge_management::service::{
    BadgeQueryService, CatalogService, GrantService, SubscriptionService,
};
use badge_management::{BadgeError, SequentialIdGenerator};
use badge_shared::error::{BadgeError as KvError, Result as KvResult};
use badge_shared::kv::{KvBackend, MemoryKv};

// ==================== 键值后端 ====================

/// 竞争写入：在 CAS 之前执行，模拟另一个写者抢先提交
pub type Interleave = Box<dyn FnOnce(Option<Vec<u8>>) -> Vec<u8> + Send>;

/// 可注入竞争写入的后端
///
/// 对某个键登记的竞争写入会在该键下一次 CAS 之前直接改写存储内容，
/// 使本次 CAS 基于过期版本而失败，随后的重试重新读取。
#[derive(Default)]
pub struct RaceInjectingKv {
    inner: MemoryKv,
    pending: Mutex<HashMap<String, VecDeque<Interleave>>>,
    cas_calls: AtomicU32,
}

impl RaceInjectingKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interleave(&self, key: &str, write: Interleave) {
        self.pending
            .lock()
            .entry(key.to_string())
            .or_default()
            .push_back(write);
    }

    pub fn cas_calls(&self) -> u32 {
        self.cas_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvBackend for RaceInjectingKv {
    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> KvResult<()> {
        self.inner.set(key, value).await
    }

    async fn compare_and_set(&self, key: &str, old: Option<&[u8]>, new: Vec<u8>) -> KvResult<bool> {
        self.cas_calls.fetch_add(1, Ordering::SeqCst);
        let write = self
            .pending
            .lock()
            .get_mut(key)
            .and_then(|queue| queue.pop_front());
        if let Some(write) = write {
            let current = self.inner.get(key).await?;
            self.inner.set(key, write(current)).await?;
        }
        self.inner.compare_and_set(key, old, new).await
    }

    async fn delete_all(&self) -> KvResult<()> {
        self.inner.delete_all().await
    }
}

/// 指定键上 CAS 永远失败的后端，其余键正常读写
pub struct AlwaysConflictKv {
    inner: MemoryKv,
    conflicting_key: String,
    cas_calls: AtomicU32,
}

impl AlwaysConflictKv {
    pub fn on_key(key: &str) -> Self {
        Self {
            inner: MemoryKv::new(),
            conflicting_key: key.to_string(),
            cas_calls: AtomicU32::new(0),
        }
    }

    /// 冲突键上的 CAS 次数
    pub fn cas_calls(&self) -> u32 {
        self.cas_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvBackend for AlwaysConflictKv {
    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> KvResult<()> {
        self.inner.set(key, value).await
    }

    async fn compare_and_set(&self, key: &str, old: Option<&[u8]>, new: Vec<u8>) -> KvResult<bool> {
        if key != self.conflicting_key {
            return self.inner.compare_and_set(key, old, new).await;
        }
        self.cas_calls.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }

    async fn delete_all(&self) -> KvResult<()> {
        self.inner.delete_all().await
    }
}

/// 可按键注入写入故障的后端
pub struct FaultyKv {
    inner: MemoryKv,
    failing_key: String,
    armed: AtomicBool,
}

impl FaultyKv {
    pub fn new(failing_key: &str) -> Self {
        Self {
            inner: MemoryKv::new(),
            failing_key: failing_key.to_string(),
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvBackend for FaultyKv {
    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> KvResult<()> {
        self.inner.set(key, value).await
    }

    async fn compare_and_set(&self, key: &str, old: Option<&[u8]>, new: Vec<u8>) -> KvResult<bool> {
        if self.armed.load(Ordering::SeqCst) && key == self.failing_key {
            return Err(KvError::Internal(format!("写入 {} 失败", key)));
        }
        self.inner.compare_and_set(key, old, new).await
    }

    async fn delete_all(&self) -> KvResult<()> {
        self.inner.delete_all().await
    }
}

// ==================== 消息发送 ====================

/// 记录所有消息的发送器
#[derive(Default)]
pub struct RecordingSink {
    pub direct: Mutex<Vec<(String, Post)>>,
    pub posts: Mutex<Vec<Post>>,
    pub ephemeral: Mutex<Vec<(String, Post)>>,
    /// 有发帖权限的 (用户, 频道)
    pub allowed: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_direct(
        &self,
        _bot_user_id: &str,
        user_id: &str,
        post: Post,
    ) -> badge_management::Result<()> {
        self.direct.lock().push((user_id.to_string(), post));
        Ok(())
    }

    async fn create_post(&self, post: Post) -> badge_management::Result<()> {
        self.posts.lock().push(post);
        Ok(())
    }

    async fn send_ephemeral(&self, user_id: &str, post: Post) -> badge_management::Result<()> {
        self.ephemeral.lock().push((user_id.to_string(), post));
        Ok(())
    }

    async fn can_post(&self, user_id: &str, channel_id: &str) -> badge_management::Result<bool> {
        Ok(self
            .allowed
            .lock()
            .iter()
            .any(|(u, c)| u == user_id && c == channel_id))
    }
}

// ==================== 服务组合 ====================

pub const ADMIN_ID: &str = "u-admin";
pub const BOT_ID: &str = "u-bot";

/// 预置了管理员和若干普通用户的服务组合
pub struct Harness {
    pub repo: BadgeRepository,
    pub catalog: CatalogService,
    pub grants: GrantService,
    pub subscriptions: SubscriptionService,
    pub queries: BadgeQueryService,
    pub directory: Arc<StaticUserDirectory>,
    pub sink: Arc<RecordingSink>,
    pub users: Vec<User>,
}

impl Harness {
    pub fn new(kv: Arc<dyn KvBackend>) -> Self {
        Self::with_repository(BadgeRepository::new(kv))
    }

    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryKv::new()))
    }

    pub fn with_repository(repo: BadgeRepository) -> Self {
        let repo = repo.with_id_generator(Arc::new(SequentialIdGenerator::new("id")));
        let permissions = PermissionEvaluator::new(Some(ADMIN_ID.to_string()));

        let users: Vec<User> = (0..4)
            .map(|i| User::new(format!("u-{}", i), Username().fake::<String>()))
            .collect();
        let directory = Arc::new(StaticUserDirectory::with_users(
            DisplayNameFormat::Username,
            users
                .iter()
                .cloned()
                .chain([User::new(ADMIN_ID, "badge-admin"), User::new(BOT_ID, "badge-bot")]),
        ));
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(GrantNotifier::new(
            repo.clone(),
            directory.clone(),
            sink.clone(),
            BOT_ID,
        ));

        Self {
            catalog: CatalogService::new(repo.clone(), permissions.clone()),
            grants: GrantService::new(repo.clone(), permissions.clone()).with_notifier(notifier),
            subscriptions: SubscriptionService::new(repo.clone(), permissions.clone()),
            queries: BadgeQueryService::new(repo.clone(), directory.clone(), permissions),
            repo,
            directory,
            sink,
            users,
        }
    }

    pub fn admin(&self) -> Actor {
        Actor::user(ADMIN_ID)
    }

    pub fn user(&self, index: usize) -> Actor {
        self.users[index].to_actor()
    }

    /// 管理员创建类型
    pub async fn create_type(
        &self,
        name: &str,
        can_create: PermissionScheme,
        can_grant: PermissionScheme,
    ) -> BadgeTypeDefinition {
        self.catalog
            .add_type(
                &self.admin(),
                BadgeTypeDefinition {
                    name: name.to_string(),
                    can_create,
                    can_grant,
                    ..BadgeTypeDefinition::default()
                },
            )
            .await
            .expect("create type")
    }

    /// 管理员在类型下创建徽章
    pub async fn create_badge(&self, type_id: &str, name: &str, multiple: bool) -> Badge {
        self.catalog
            .add_badge(&self.admin(), badge_draft(type_id, name, multiple))
            .await
            .expect("create badge")
    }

    pub async fn grant(&self, badge_id: &str, user_id: &str) -> Result<bool, BadgeError> {
        self.grants
            .grant_badge(&self.admin(), GrantBadgeRequest::new(badge_id, user_id))
            .await
            .map(|outcome| outcome.should_notify)
    }
}

pub fn badge_draft(type_id: &str, name: &str, multiple: bool) -> Badge {
    Badge {
        name: name.to_string(),
        description: format!("{} badge", name),
        image: "medal".to_string(),
        type_id: type_id.to_string(),
        multiple,
        ..Badge::default()
    }
}

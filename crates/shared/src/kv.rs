//! 键值存储后端
//!
//! 徽章集合只依赖一个极简的键值接口：读、写、按字节比较后交换（CAS）、清空。
//! 提供两种实现：
//!
//! - `MemoryKv`：基于 DashMap 的进程内存储，适用于测试和开发环境
//! - `RedisKv`：基于 Redis 的实现，CAS 通过 Lua 脚本保证原子性

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::{debug, info, instrument};

use crate::error::{BadgeError, Result};

/// 键值存储接口
///
/// `compare_and_set` 的 `old` 是调用方此前读到的原始字节，`None` 表示期望该键不存在。
/// 只有当前存储的字节与 `old` 完全一致时才会写入 `new`，返回值表示是否写入成功。
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn compare_and_set(&self, key: &str, old: Option<&[u8]>, new: Vec<u8>) -> Result<bool>;

    async fn delete_all(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryKv
// ---------------------------------------------------------------------------

/// 进程内键值存储
///
/// CAS 在 DashMap 的分片锁内完成比较与写入，天然原子。
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    data: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前存储的键数量
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    async fn compare_and_set(&self, key: &str, old: Option<&[u8]>, new: Vec<u8>) -> Result<bool> {
        match (self.data.entry(key.to_string()), old) {
            (Entry::Occupied(mut entry), Some(expected)) if entry.get().as_slice() == expected => {
                entry.insert(new);
                Ok(true)
            }
            (Entry::Vacant(entry), None) => {
                entry.insert(new);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_all(&self) -> Result<()> {
        self.data.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RedisKv
// ---------------------------------------------------------------------------

/// CAS 脚本
///
/// ARGV[1] = "1" 表示期望键存在且值等于 ARGV[2]；"0" 表示期望键不存在。
/// ARGV[3] 为新值。成功返回 1，否则返回 0。
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
    if current ~= ARGV[2] then
        return 0
    end
elseif current then
    return 0
end
redis.call('SET', KEYS[1], ARGV[3])
return 1
"#;

/// Redis 键值存储
///
/// 所有键都带有 `key_prefix` 命名空间，`delete_all` 只清理本命名空间下的键。
#[derive(Clone)]
pub struct RedisKv {
    client: Client,
    key_prefix: String,
}

impl RedisKv {
    /// 创建 Redis 客户端
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = Client::open(url)?;
        info!("Redis kv client created");
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// 获取连接
    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(BadgeError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(BadgeError::from)
    }
}

#[async_trait]
impl KvBackend for RedisKv {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.get_conn().await?;
        let value: Option<Vec<u8>> = conn.get(self.full_key(key)).await?;
        Ok(value)
    }

    #[instrument(skip(self, value), fields(len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let _: () = conn.set(self.full_key(key), value).await?;
        Ok(())
    }

    #[instrument(skip(self, old, new), fields(expect_present = old.is_some()))]
    async fn compare_and_set(&self, key: &str, old: Option<&[u8]>, new: Vec<u8>) -> Result<bool> {
        let mut conn = self.get_conn().await?;
        let (flag, expected): (&str, &[u8]) = match old {
            Some(bytes) => ("1", bytes),
            None => ("0", &[]),
        };

        let swapped: i32 = redis::Script::new(COMPARE_AND_SET_SCRIPT)
            .key(self.full_key(key))
            .arg(flag)
            .arg(expected)
            .arg(new)
            .invoke_async(&mut conn)
            .await?;

        debug!(key = %key, swapped = swapped == 1, "compare-and-set finished");
        Ok(swapped == 1)
    }

    #[instrument(skip(self))]
    async fn delete_all(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let keys: Vec<String> = conn.keys(format!("{}*", self.key_prefix)).await?;

        if keys.is_empty() {
            return Ok(());
        }

        let count: u64 = conn.del(keys).await?;
        info!(count, prefix = %self.key_prefix, "kv namespace cleared");
        Ok(())
    }
}

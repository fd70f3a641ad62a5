//! 集合存储
//!
//! 每个集合整体序列化为 JSON 存放在单个键下。读取时返回内容和版本（原始字节），
//! 写入时由后端按字节比较版本，一致才替换。

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use badge_shared::kv::KvBackend;

use crate::error::Result;

/// 集合键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    Badges,
    Types,
    Ownership,
    Subscriptions,
}

impl CollectionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Badges => "badges",
            Self::Types => "types",
            Self::Ownership => "ownership",
            Self::Subscriptions => "subscriptions",
        }
    }
}

impl std::fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 带版本的集合快照
///
/// `version` 为读取到的原始字节，键不存在时为 `None`
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub items: Vec<T>,
    pub version: Option<Vec<u8>>,
}

impl<T> Versioned<T> {
    pub fn version(&self) -> Option<&[u8]> {
        self.version.as_deref()
    }
}

/// 集合存储
#[derive(Clone)]
pub struct CollectionStore {
    kv: Arc<dyn KvBackend>,
}

impl CollectionStore {
    pub fn new(kv: Arc<dyn KvBackend>) -> Self {
        Self { kv }
    }

    /// 读取集合，键不存在视为空集合
    #[instrument(skip(self), fields(key = %key))]
    pub async fn load<T>(&self, key: CollectionKey) -> Result<Versioned<T>>
    where
        T: DeserializeOwned,
    {
        let data = self.kv.get(key.as_str()).await?;
        let items = match &data {
            Some(bytes) => serde_json::from_slice::<Option<Vec<T>>>(bytes)?.unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(Versioned {
            items,
            version: data,
        })
    }

    /// 版本一致时写入新内容，返回是否替换成功
    #[instrument(skip(self, version, items), fields(key = %key, len = items.len()))]
    pub async fn compare_and_set<T>(
        &self,
        key: CollectionKey,
        version: Option<&[u8]>,
        items: &[T],
    ) -> Result<bool>
    where
        T: Serialize + Sync,
    {
        let data = serde_json::to_vec(items)?;
        Ok(self.kv.compare_and_set(key.as_str(), version, data).await?)
    }

    /// 清空全部集合
    pub async fn delete_all(&self) -> Result<()> {
        Ok(self.kv.delete_all().await?)
    }
}

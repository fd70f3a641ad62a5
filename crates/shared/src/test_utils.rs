//! 测试工具模块
//!
//! 提供集成测试所需的辅助函数和测试配置。
//! 用于简化测试代码编写，提高测试的可重复性。

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::config::{AppConfig, StoreBackend, StoreConfig};
use crate::kv::RedisKv;

// ==================== 测试配置辅助 ====================

/// 创建测试用存储配置（内存后端，默认重试上限）
pub fn test_store_config() -> StoreConfig {
    StoreConfig {
        backend: StoreBackend::Memory,
        key_prefix: format!("badge-test-{}:", Uuid::new_v4().simple()),
        ..StoreConfig::default()
    }
}

/// 创建测试用应用配置
pub fn test_app_config(badge_admin_user_id: Option<&str>) -> AppConfig {
    let mut config = AppConfig {
        service_name: "badge-management-service".to_string(),
        environment: "test".to_string(),
        store: test_store_config(),
        ..AppConfig::default()
    };
    config.permissions.badge_admin_user_id = badge_admin_user_id.map(str::to_string);
    config
}

/// 创建测试用 Redis 后端
///
/// 优先使用环境变量 TEST_REDIS_URL，每次调用使用独立的键前缀以隔离并行测试
pub fn test_redis_kv() -> crate::error::Result<RedisKv> {
    let url = std::env::var("TEST_REDIS_URL")
        .unwrap_or_else(|_| "redis://localhost:6379/1".to_string());
    RedisKv::new(&url, test_store_config().key_prefix)
}

// ==================== 测试数据生成 ====================

/// 生成唯一的测试用户 ID
pub fn test_user_id() -> String {
    format!("test-user-{}", Uuid::new_v4().simple())
}

/// 生成唯一的测试频道 ID
pub fn test_channel_id() -> String {
    format!("test-channel-{}", Uuid::new_v4().simple())
}

/// 生成唯一的短名称
///
/// 使用原子计数器确保并行测试时的唯一性，长度保持在徽章名称上限之内
pub fn test_name(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut name = format!("{}-{}", prefix, n);
    name.truncate(20);
    name
}

//! 实体标识生成
//!
//! 标识是不透明字符串，调用方不得假设其有序或为数字

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// 标识生成器
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// 基于 UUID v4 的生成器，输出 32 位小写十六进制
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// 顺序生成器，输出 `prefix-1`、`prefix-2`……，用于测试中获得可预测的标识
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

//! 乐观重试执行器
//!
//! 共享集合只支持单键 CAS，因此所有“读-改-写”都以乐观方式进行：
//! 读取当前值、计算新值、尝试 CAS；CAS 失败说明有其他写者抢先，重新读取再试。
//! 尝试次数有上限，超过上限时返回 `Conflict`，由调用方决定是否整体重试。

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// OptimisticPolicy: 重试策略配置
// ---------------------------------------------------------------------------

/// 乐观重试策略
#[derive(Debug, Clone)]
pub struct OptimisticPolicy {
    /// 最大尝试次数（含首次执行）
    pub max_attempts: u32,
    /// 首次重试前的等待时间，为 0 时立即重试
    pub initial_delay: Duration,
    /// 退避时间上限
    pub max_delay: Duration,
    /// 每次重试的退避倍数
    pub multiplier: f64,
}

impl Default for OptimisticPolicy {
    /// 默认策略：最多尝试 3 次，不等待
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_millis(200),
            multiplier: 2.0,
        }
    }
}

impl OptimisticPolicy {
    /// 使用固定尝试次数和初始退避构造策略
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            ..Self::default()
        }
    }

    /// 计算第 N 次重试前的等待时间（retry 从 0 开始）
    ///
    /// 公式: initial_delay * multiplier^retry，结果不超过 max_delay。
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let base_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = base_ms * self.multiplier.powi(retry as i32);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

// ---------------------------------------------------------------------------
// 结果类型
// ---------------------------------------------------------------------------

/// 单次尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// CAS 成功，或操作判定为无需写入的空操作
    Done(T),
    /// CAS 失败，期间有其他写者修改了集合
    Conflict,
}

/// 乐观执行的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicOutcome<T, E> {
    Success { value: T, attempts: u32 },
    Conflict { attempts: u32 },
    Error(E),
}

impl<T, E> AtomicOutcome<T, E> {
    /// 转换为 Result，冲突由调用方映射为自己的错误类型
    pub fn into_result(self, on_conflict: impl FnOnce(u32) -> E) -> Result<T, E> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Conflict { attempts } => Err(on_conflict(attempts)),
            Self::Error(err) => Err(err),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

// ---------------------------------------------------------------------------
// with_optimistic_retry: 带上限的乐观执行器
// ---------------------------------------------------------------------------

/// 带上限的乐观执行器
///
/// 每次调用 `step` 都必须重新读取集合。`step` 返回错误时立即终止，不再重试。
pub async fn with_optimistic_retry<F, Fut, T, E>(
    policy: &OptimisticPolicy,
    operation_name: &str,
    mut step: F,
) -> AtomicOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>, E>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match step().await {
            Ok(Attempt::Done(value)) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "乐观更新在重试后成功");
                }
                return AtomicOutcome::Success {
                    value,
                    attempts: attempt,
                };
            }
            Ok(Attempt::Conflict) => {
                if attempt == max_attempts {
                    break;
                }
                let delay = policy.delay_for_retry(attempt - 1);
                debug!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "CAS 冲突，重新读取后重试"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(err) => return AtomicOutcome::Error(err),
        }
    }

    warn!(
        operation = operation_name,
        max_attempts, "已达最大尝试次数，放弃乐观更新"
    );
    AtomicOutcome::Conflict {
        attempts: max_attempts,
    }
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------

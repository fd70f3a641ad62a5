//! 共享库
//!
//! 包含徽章服务共用的配置、错误处理、键值存储后端、乐观重试、可观测性等基础设施代码。

pub mod config;
pub mod error;
pub mod kv;
pub mod observability;
pub mod retry;
pub mod test_utils;

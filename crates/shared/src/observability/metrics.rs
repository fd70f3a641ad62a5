//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// 徽章发放次数，按结果（granted / duplicate / denied）区分
pub const BADGE_GRANTS_TOTAL: &str = "badge_grants_total";
/// 集合 CAS 冲突次数
pub const CAS_CONFLICTS_TOTAL: &str = "badge_store_cas_conflicts_total";
/// 乐观更新达到尝试上限的次数
pub const RETRY_EXHAUSTED_TOTAL: &str = "badge_store_retry_exhausted_total";
/// 权限拒绝次数
pub const PERMISSION_DENIED_TOTAL: &str = "badge_permission_denied_total";

/// 初始化 Prometheus 指标导出
///
/// 在指定端口启动 `/metrics` 端点。
pub fn init(service_name: &str, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", service_name)
        .install()?;

    register_common_metrics();
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// 注册通用指标描述，出现在 /metrics 端点的 HELP 注释中
fn register_common_metrics() {
    metrics::describe_counter!(BADGE_GRANTS_TOTAL, "Total number of badge grant attempts");
    metrics::describe_counter!(
        CAS_CONFLICTS_TOTAL,
        "Total number of compare-and-set conflicts on badge collections"
    );
    metrics::describe_counter!(
        RETRY_EXHAUSTED_TOTAL,
        "Total number of optimistic updates that gave up after the attempt bound"
    );
    metrics::describe_counter!(
        PERMISSION_DENIED_TOTAL,
        "Total number of operations rejected by the authorization engine"
    );
}

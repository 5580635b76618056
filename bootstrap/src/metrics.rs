//! Metrics 模块
//!
//! 提供 Prometheus metrics 导出

use credstore_errors::{AppError, AppResult};
use credstore_telemetry::{describe_metrics, init_metrics};
use metrics_exporter_prometheus::PrometheusHandle;

/// Metrics 记录器
pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    /// 安装全局 Prometheus recorder，每个进程只能安装一次
    pub fn install() -> AppResult<Self> {
        let handle = init_metrics().map_err(|e| {
            AppError::internal(format!("Failed to install Prometheus recorder: {}", e))
        })?;
        describe_metrics();

        Ok(Self { handle })
    }

    /// 获取 Prometheus 格式的 metrics
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

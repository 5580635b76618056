//! telemetry - 可观测性库

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化 tracing
///
/// 重复初始化（例如多个测试共用进程）时静默忽略。
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn init_tracing_json(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init();
}

/// 初始化 Prometheus metrics
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// 描述凭据缓存导出的指标
pub fn describe_metrics() {
    metrics::describe_counter!(
        "credstore_codes_issued_total",
        "Authorization codes issued"
    );
    metrics::describe_counter!(
        "credstore_codes_redeemed_total",
        "Authorization codes redeemed successfully"
    );
    metrics::describe_counter!(
        "credstore_codes_rejected_total",
        "Authorization code redemptions rejected, labelled by reason"
    );
    metrics::describe_counter!(
        "credstore_tokens_created_total",
        "Revocable tokens created"
    );
    metrics::describe_counter!(
        "credstore_tokens_deleted_total",
        "Revocable tokens deleted, labelled by reason"
    );
    metrics::describe_counter!(
        "credstore_sweeps_total",
        "Expiration sweeps executed, labelled by cache"
    );
    metrics::describe_counter!(
        "credstore_swept_entries_total",
        "Entries removed by expiration sweeps, labelled by cache"
    );
}

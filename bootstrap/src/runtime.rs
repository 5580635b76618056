//! 进程运行时

use credstore_config::AppConfig;
use credstore_telemetry::{init_tracing, init_tracing_json};
use tracing::info;

/// 初始化运行时
pub fn init_runtime(config: &AppConfig) {
    // 生产环境或显式开启时输出 JSON 日志
    if config.is_production() || config.telemetry.json {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        code_ttl_secs = config.authorization_code.ttl_secs,
        token_sweep_interval_secs = config.revocable_token.sweep_interval_secs,
        "Runtime initialized"
    );
}

//! 启动器
//!
//! 提供统一的启动流程

use std::future::Future;
use std::sync::Arc;

use credstore_config::AppConfig;
use credstore_ports::GrantAuthentication;
use tracing::{debug, info};

use crate::infrastructure::CredentialStores;
use crate::metrics::MetricsRecorder;
use crate::runtime::init_runtime;

/// 加载配置、初始化运行时并创建凭据缓存，然后把缓存交给调用方
///
/// 流程：
/// 1. 加载 `.env` 与配置目录
/// 2. 初始化日志
/// 3. 安装 Prometheus recorder
/// 4. 创建授权码缓存与 Token 缓存
/// 5. 执行 `task`，结束后输出一次指标快照
pub async fn run<A, P, F, Fut>(config_dir: &str, task: F) -> anyhow::Result<()>
where
    A: GrantAuthentication + 'static,
    P: Clone + Send + Sync + 'static,
    F: FnOnce(Arc<CredentialStores<A, P>>) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    dotenvy::dotenv().ok();

    let config = AppConfig::load(config_dir)?;
    init_runtime(&config);

    info!("Starting {}", config.app_name);

    let metrics = MetricsRecorder::install()?;
    let stores = Arc::new(CredentialStores::from_config(config)?);

    task(stores).await?;

    debug!(metrics = %metrics.render(), "Metrics snapshot");
    info!("Finished");
    Ok(())
}

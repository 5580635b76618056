//! credstore-bootstrap - 启动骨架
//!
//! 按配置组装凭据缓存，初始化日志与指标

mod infrastructure;
mod metrics;
mod runtime;
mod starter;

pub use infrastructure::*;
pub use metrics::*;
pub use runtime::*;
pub use starter::*;

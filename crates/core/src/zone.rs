//! 当前租户解析

use std::future::Future;

use credstore_common::ZoneId;
use credstore_ports::ZoneResolver;

tokio::task_local! {
    static CURRENT_ZONE: ZoneId;
}

/// 在指定租户上下文中执行异步任务
pub async fn with_zone<F>(zone: ZoneId, f: F) -> F::Output
where
    F: Future,
{
    CURRENT_ZONE.scope(zone, f).await
}

/// 在指定租户上下文中执行同步代码
pub fn with_zone_sync<F, R>(zone: ZoneId, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT_ZONE.sync_scope(zone, f)
}

/// 从任务上下文读取租户，未设置时退回默认租户
#[derive(Debug, Clone, Default)]
pub struct TaskZoneResolver {
    fallback: ZoneId,
}

impl TaskZoneResolver {
    pub fn with_fallback(fallback: ZoneId) -> Self {
        Self { fallback }
    }
}

impl ZoneResolver for TaskZoneResolver {
    fn current_zone(&self) -> ZoneId {
        CURRENT_ZONE
            .try_with(|zone| zone.clone())
            .unwrap_or_else(|_| self.fallback.clone())
    }
}

/// 固定租户
#[derive(Debug, Clone, Default)]
pub struct StaticZoneResolver(pub ZoneId);

impl StaticZoneResolver {
    pub fn new(zone: impl Into<ZoneId>) -> Self {
        Self(zone.into())
    }
}

impl ZoneResolver for StaticZoneResolver {
    fn current_zone(&self) -> ZoneId {
        self.0.clone()
    }
}

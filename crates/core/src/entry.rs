//! 缓存条目

use chrono::{DateTime, Duration, Utc};

/// 带过期时间的缓存条目
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// 到期时刻本身即视为过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// 剩余有效时间，已过期时为零
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// 读取结果
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    Found(V),
    NotFound,
    /// 条目存在但已过期，读取时已被移除
    Expired,
}

impl<V> Lookup<V> {
    pub fn found(self) -> Option<V> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

//! 带节流清理的过期 Map
//!
//! 所有条目都带有过期时间。过期条目的清理不依赖后台线程：
//! `put` 与读取操作会顺带检查 [`SweepGate`]，赢得清理权的调用方执行一次全量清理。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use credstore_common::Clock;
use credstore_errors::{AppError, AppResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::observability;
use crate::{CacheEntry, Lookup, SweepGate};

/// 带节流清理的并发过期 Map
///
/// 单个 key 上的插入、删除、条件删除都是原子的；批量操作只保证逐条原子。
pub struct ThrottledExpiringMap<V> {
    /// 用于日志和指标的名称
    name: &'static str,
    entries: DashMap<String, CacheEntry<V>>,
    gate: SweepGate,
    clock: Arc<dyn Clock>,
    /// 已执行的全量清理次数
    sweeps: AtomicU64,
}

impl<V> ThrottledExpiringMap<V> {
    /// 创建 Map，`sweep_interval` 必须为正
    pub fn new(
        name: &'static str,
        sweep_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        Ok(Self {
            name,
            entries: DashMap::new(),
            gate: SweepGate::new(sweep_interval)?,
            clock,
            sweeps: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn sweep_interval(&self) -> Duration {
        self.gate.interval()
    }

    /// 写入条目，覆盖同 key 的旧条目
    ///
    /// `ttl` 必须为正，否则返回 `IllegalState`。
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) -> AppResult<()> {
        let key = key.into();
        self.maybe_sweep();

        let now = self.clock.now();
        let expires_at = expiry_after(&key, now, ttl)?;
        self.entries.insert(key.clone(), entry(key, value, now, expires_at));
        Ok(())
    }

    /// 以绝对过期时间写入条目，覆盖同 key 的旧条目
    ///
    /// `expires_at` 不晚于当前时间时返回 `IllegalState`。
    pub fn put_until(
        &self,
        key: impl Into<String>,
        value: V,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let key = key.into();
        self.maybe_sweep();

        let now = self.clock.now();
        if expires_at <= now {
            return Err(expire_immediately(&key, expires_at - now));
        }
        self.entries.insert(key.clone(), entry(key, value, now, expires_at));
        Ok(())
    }

    /// key 上没有有效条目时才写入
    ///
    /// 已有未过期条目时不做修改，并把 `value` 原样返回；过期条目会被替换。
    pub fn put_if_absent(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Duration,
    ) -> AppResult<Option<V>> {
        let key = key.into();
        self.maybe_sweep();

        let now = self.clock.now();
        let expires_at = expiry_after(&key, now, ttl)?;
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired_at(now) {
                    occupied.insert(entry(key, value, now, expires_at));
                    Ok(None)
                } else {
                    Ok(Some(value))
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry(key, value, now, expires_at));
                Ok(None)
            }
        }
    }

    /// 读取并移除条目
    ///
    /// 等价于 `get_and_optionally_remove(key, true)`，但不要求 `V: Clone`。
    /// 并发调用时只有一个调用方能拿到 `Found`。
    pub fn take(&self, key: &str) -> Lookup<V> {
        self.maybe_sweep();

        let now = self.clock.now();
        match self.entries.remove(key) {
            None => Lookup::NotFound,
            Some((_, entry)) if entry.is_expired_at(now) => Lookup::Expired,
            Some((_, entry)) => Lookup::Found(entry.value),
        }
    }

    /// 无条件删除，返回旧值（包括已过期的）
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// 删除所有满足条件的条目，返回删除数量
    ///
    /// 每个条目的删除独立原子，不保证整体原子。
    pub fn remove_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&CacheEntry<V>) -> bool,
    {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if predicate(entry) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// 删除满足条件的有效条目，返回删除数量
    ///
    /// 已过期的条目不参与匹配，留给清理处理。
    pub fn remove_live_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&V) -> bool,
    {
        let now = self.clock.now();
        self.remove_where(|entry| !entry.is_expired_at(now) && predicate(&entry.value))
    }

    /// 立即清理所有过期条目，不经过闸门
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = self.remove_where(|entry| entry.is_expired_at(now));
        self.sweeps.fetch_add(1, Ordering::Relaxed);

        debug!(cache = self.name, removed, "Removed expired entries");
        observability::record_sweep(self.name, removed);
        removed
    }

    /// 闸门允许时执行一次清理
    ///
    /// 返回 `None` 表示本次调用被限流跳过。
    pub fn maybe_sweep(&self) -> Option<usize> {
        if self.gate.try_acquire(self.clock.now_millis()) {
            Some(self.sweep_expired())
        } else {
            None
        }
    }

    /// 已执行的全量清理次数
    pub fn sweep_count(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// 条目数（包括尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> ThrottledExpiringMap<V> {
    /// 读取条目
    ///
    /// - 不存在：`NotFound`
    /// - 已过期：移除并返回 `Expired`
    /// - 否则返回值，`consume_on_read` 为真时同时移除
    pub fn get_and_optionally_remove(&self, key: &str, consume_on_read: bool) -> Lookup<V> {
        if consume_on_read {
            return self.take(key);
        }

        self.maybe_sweep();

        let now = self.clock.now();
        match self.entries.get(key) {
            None => return Lookup::NotFound,
            Some(entry) if !entry.is_expired_at(now) => return Lookup::Found(entry.value.clone()),
            Some(_) => {}
        };

        // 读锁已释放；只删除仍然过期的条目，避免误删并发写入的新值
        self.entries
            .remove_if(key, |_, entry| entry.is_expired_at(now));
        Lookup::Expired
    }

    /// 原样读取条目，不检查过期，也不触发清理
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// 惰性遍历满足条件的有效条目
    ///
    /// 每次调用重新扫描。迭代期间持有分片读锁，不要在迭代过程中修改本 Map。
    pub fn live_entries<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = CacheEntry<V>> + 'a
    where
        F: Fn(&CacheEntry<V>) -> bool + 'a,
    {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(move |entry| !entry.value().is_expired_at(now) && predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }

    /// 收集满足条件的有效值
    pub fn collect_live<F>(&self, predicate: F) -> Vec<V>
    where
        F: Fn(&V) -> bool,
    {
        self.live_entries(|entry| predicate(&entry.value))
            .map(|entry| entry.value)
            .collect()
    }
}

fn entry<V>(key: String, value: V, created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> CacheEntry<V> {
    CacheEntry {
        key,
        value,
        created_at,
        expires_at,
    }
}

/// 计算过期时间，`ttl` 必须为正且结果不能超出时间范围
fn expiry_after(key: &str, now: DateTime<Utc>, ttl: Duration) -> AppResult<DateTime<Utc>> {
    if ttl <= Duration::zero() {
        return Err(expire_immediately(key, ttl));
    }
    now.checked_add_signed(ttl).ok_or_else(|| {
        AppError::illegal_state(format!(
            "Entry '{}' ttl {}s is out of range",
            key,
            ttl.num_seconds()
        ))
    })
}

fn expire_immediately(key: &str, ttl: Duration) -> AppError {
    AppError::illegal_state(format!(
        "Entry '{}' would expire immediately (ttl {}ms)",
        key,
        ttl.num_milliseconds()
    ))
}

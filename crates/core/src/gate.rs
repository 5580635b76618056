//! 清理限流闸门

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Duration;
use credstore_errors::{AppError, AppResult};

/// 过期清理的限流闸门
///
/// 每个缓存实例独占一个闸门。闸门只通过 CAS 推进，同一个间隔内
/// 至多一个调用方赢得清理权，其余调用方直接跳过，不会等待。
#[derive(Debug)]
pub struct SweepGate {
    /// 上次清理时间（毫秒时间戳），初始为纪元
    last_sweep_at: AtomicI64,
    interval_millis: i64,
}

impl SweepGate {
    pub fn new(interval: Duration) -> AppResult<Self> {
        let interval_millis = interval.num_milliseconds();
        if interval_millis <= 0 {
            return Err(AppError::invalid_argument(format!(
                "Sweep interval must be positive, got {}ms",
                interval_millis
            )));
        }

        Ok(Self {
            last_sweep_at: AtomicI64::new(0),
            interval_millis,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::milliseconds(self.interval_millis)
    }

    /// 上次清理时间（毫秒时间戳）
    pub fn last_sweep_millis(&self) -> i64 {
        self.last_sweep_at.load(Ordering::Acquire)
    }

    /// 尝试获取本间隔的清理权
    ///
    /// 成功时闸门被推进到 `now_millis`，因此两次成功之间至少相隔一个完整间隔。
    pub fn try_acquire(&self, now_millis: i64) -> bool {
        let last = self.last_sweep_at.load(Ordering::Acquire);
        if now_millis - last < self.interval_millis {
            return false;
        }

        self.last_sweep_at
            .compare_exchange(last, now_millis, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

//! 凭据缓存指标
//!
//! 未安装 recorder 时这些调用都是空操作

use ::metrics::counter;

/// 记录一次过期清理
pub(crate) fn record_sweep(cache: &'static str, removed: usize) {
    let labels = [("cache", cache.to_string())];
    counter!("credstore_sweeps_total", &labels).increment(1);
    counter!("credstore_swept_entries_total", &labels).increment(removed as u64);
}

/// 记录签发授权码
pub(crate) fn record_code_issued() {
    counter!("credstore_codes_issued_total").increment(1);
}

/// 记录兑换授权码
pub(crate) fn record_code_redeemed() {
    counter!("credstore_codes_redeemed_total").increment(1);
}

/// 记录拒绝兑换（reason: not_found / expired）
pub(crate) fn record_code_rejected(reason: &'static str) {
    let labels = [("reason", reason.to_string())];
    counter!("credstore_codes_rejected_total", &labels).increment(1);
}

/// 记录创建 Token
pub(crate) fn record_token_created() {
    counter!("credstore_tokens_created_total").increment(1);
}

/// 记录删除 Token（reason: revoked / expired / zone / origin / user / client）
///
/// `expired` 只统计读取时发现并删除的过期 Token，清理删除的条目由 [`record_sweep`] 统计。
pub(crate) fn record_tokens_deleted(reason: &'static str, count: usize) {
    if count == 0 {
        return;
    }
    let labels = [("reason", reason.to_string())];
    counter!("credstore_tokens_deleted_total", &labels).increment(count as u64);
}

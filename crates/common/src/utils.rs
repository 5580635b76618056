//! 通用工具函数

use rand::Rng;
use rand::distributions::Alphanumeric;
use uuid::Uuid;

/// 生成新的 UUID v7（时间有序）
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// 生成新的 UUID v4（随机）
pub fn random_id() -> Uuid {
    Uuid::new_v4()
}

/// 生成指定长度的随机字母数字串
pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_alphanumeric() {
        let s = random_alphanumeric(10);
        assert_eq!(s.len(), 10);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(random_alphanumeric(0).is_empty());
    }
}

//! 通用类型定义

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// 租户（Identity Zone）ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[display("{_0}")]
pub struct ZoneId(pub String);

impl ZoneId {
    /// 默认租户
    pub const UAA: &'static str = "uaa";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::UAA
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self(Self::UAA.to_string())
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for ZoneId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ZoneId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_id_default_and_display() {
        let zone = ZoneId::default();
        assert!(zone.is_default());
        assert_eq!(zone.to_string(), "uaa");

        let zone: ZoneId = "z1".into();
        assert_eq!(zone, "z1");
        assert!(!zone.is_default());
    }
}

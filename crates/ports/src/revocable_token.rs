//! 可撤销 Token 实体与仓储 trait 定义

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use credstore_common::ZoneId;
use credstore_errors::AppResult;
use serde::{Deserialize, Serialize};

/// Token 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    AccessToken,
    RefreshToken,
}

/// Token 格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFormat {
    #[default]
    Jwt,
    Opaque,
}

/// 可撤销 Token
///
/// `value` 是 Token 本身的内容，缓存不解析。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocableToken<P> {
    /// Token ID（由调用方提供，缓存内唯一）
    pub token_id: String,
    /// 用户 ID
    pub user_id: String,
    /// Client ID
    pub client_id: String,
    /// 所属租户，由缓存在创建和更新时写入
    pub zone_id: ZoneId,
    /// 用户来源的身份提供方
    pub origin: Option<String>,
    /// Token 类型
    pub token_type: TokenType,
    /// Token 格式
    pub format: TokenFormat,
    /// 授权的 Scope 列表
    pub scope: Vec<String>,
    /// 签发时间
    pub issued_at: DateTime<Utc>,
    /// 过期时间
    pub expires_at: DateTime<Utc>,
    /// Token 内容
    pub value: P,
}

impl<P> RevocableToken<P> {
    pub fn new(
        token_id: impl Into<String>,
        user_id: impl Into<String>,
        client_id: impl Into<String>,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        value: P,
    ) -> Self {
        Self {
            token_id: token_id.into(),
            user_id: user_id.into(),
            client_id: client_id.into(),
            zone_id: ZoneId::default(),
            origin: None,
            token_type,
            format: TokenFormat::default(),
            scope: Vec::new(),
            issued_at,
            expires_at,
            value,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_format(mut self, format: TokenFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    /// 在 `now` 时刻是否已过期（到期时刻本身即视为过期）
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_refresh_token(&self) -> bool {
        self.token_type == TokenType::RefreshToken
    }
}

/// 可撤销 Token 仓储
#[async_trait]
pub trait RevocableTokenProvisioning<P>: Send + Sync
where
    P: Clone + Send + Sync + 'static,
{
    /// 保存 Token，写入当前租户
    async fn create(&self, token: RevocableToken<P>) -> AppResult<RevocableToken<P>>;

    /// 根据 ID 查找，已过期的 Token 视为不存在
    async fn retrieve(&self, token_id: &str) -> AppResult<RevocableToken<P>>;

    /// 当前租户下所有有效的 Token
    async fn retrieve_all(&self) -> AppResult<Vec<RevocableToken<P>>>;

    /// 覆盖更新
    async fn update(
        &self,
        token_id: &str,
        token: RevocableToken<P>,
    ) -> AppResult<RevocableToken<P>>;

    /// 删除 Token，返回被删除的值
    async fn delete(&self, token_id: &str) -> AppResult<Option<RevocableToken<P>>>;

    /// 删除租户下所有 Token
    async fn delete_by_identity_zone(&self, zone_id: &ZoneId) -> AppResult<usize>;

    /// 删除租户下来自指定身份提供方的 Token
    async fn delete_by_origin(&self, origin: &str, zone_id: &ZoneId) -> AppResult<usize>;

    /// 用户的所有 Token
    async fn get_user_tokens(&self, user_id: &str) -> AppResult<Vec<RevocableToken<P>>>;

    /// 用户在指定 Client 下的 Token
    async fn get_user_client_tokens(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> AppResult<Vec<RevocableToken<P>>>;

    /// Client 的所有 Token
    async fn get_client_tokens(&self, client_id: &str) -> AppResult<Vec<RevocableToken<P>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let issued = DateTime::UNIX_EPOCH;
        let token = RevocableToken::new(
            "tok1",
            "u1",
            "c1",
            TokenType::AccessToken,
            issued,
            issued + Duration::seconds(10),
            (),
        );

        assert!(!token.is_expired_at(issued + Duration::milliseconds(9_999)));
        assert!(token.is_expired_at(issued + Duration::seconds(10)));
    }

    #[test]
    fn test_builder_defaults() {
        let now = Utc::now();
        let token = RevocableToken::new(
            "tok1",
            "u1",
            "c1",
            TokenType::RefreshToken,
            now,
            now + Duration::hours(1),
            "opaque".to_string(),
        )
        .with_origin("ldap")
        .with_scope(["openid", "profile"]);

        assert!(token.is_refresh_token());
        assert_eq!(token.zone_id, ZoneId::default());
        assert_eq!(token.origin.as_deref(), Some("ldap"));
        assert_eq!(token.scope, vec!["openid", "profile"]);
        assert_eq!(token.format, TokenFormat::Jwt);
    }
}

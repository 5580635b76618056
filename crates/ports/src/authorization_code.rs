//! 授权码服务 trait 定义

use async_trait::async_trait;
use credstore_errors::AppResult;

use crate::GrantAuthentication;

/// 授权码服务
#[async_trait]
pub trait AuthorizationCodeServices<A>: Send + Sync
where
    A: GrantAuthentication + 'static,
{
    /// 为认证上下文签发一次性授权码
    async fn create_authorization_code(&self, authentication: A) -> AppResult<String>;

    /// 兑换授权码，成功后授权码立即失效
    ///
    /// 授权码不存在或已过期时返回 `InvalidGrant`。
    async fn consume_authorization_code(&self, code: &str) -> AppResult<A>;
}

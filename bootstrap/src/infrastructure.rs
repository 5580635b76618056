//! 凭据缓存资源管理
//!
//! 按配置统一创建进程内的授权码缓存与可撤销 Token 缓存

use std::sync::Arc;

use credstore_common::{Clock, ZoneId, system_clock};
use credstore_config::AppConfig;
use credstore_core::{AuthorizationCodeCache, RevocableTokenCache, TaskZoneResolver};
use credstore_errors::AppResult;
use credstore_ports::{GrantAuthentication, ZoneResolver};
use tracing::info;

/// 凭据缓存容器
///
/// `A` 为授权码携带的认证上下文，`P` 为 Token 的负载类型。
pub struct CredentialStores<A, P> {
    config: AppConfig,
    authorization_codes: Arc<AuthorizationCodeCache<A>>,
    revocable_tokens: Arc<RevocableTokenCache<P>>,
}

impl<A, P> CredentialStores<A, P>
where
    A: GrantAuthentication + 'static,
    P: Clone + Send + Sync + 'static,
{
    /// 使用系统时钟和任务上下文租户创建
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let zones = Arc::new(TaskZoneResolver::with_fallback(ZoneId::default()));
        Self::with_parts(config, zones, system_clock())
    }

    /// 指定租户解析和时钟创建
    pub fn with_parts(
        config: AppConfig,
        zones: Arc<dyn ZoneResolver>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let authorization_codes = Arc::new(AuthorizationCodeCache::from_config(
            &config.authorization_code,
            clock.clone(),
        )?);
        info!(
            ttl_secs = config.authorization_code.ttl_secs,
            code_length = config.authorization_code.code_length,
            "Authorization code cache created"
        );

        let revocable_tokens = Arc::new(RevocableTokenCache::from_config(
            &config.revocable_token,
            zones,
            clock,
        )?);
        info!(
            sweep_interval_secs = config.revocable_token.sweep_interval_secs,
            "Revocable token cache created"
        );

        Ok(Self {
            config,
            authorization_codes,
            revocable_tokens,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn authorization_codes(&self) -> Arc<AuthorizationCodeCache<A>> {
        self.authorization_codes.clone()
    }

    pub fn revocable_tokens(&self) -> Arc<RevocableTokenCache<P>> {
        self.revocable_tokens.clone()
    }
}

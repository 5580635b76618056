//! 一次性授权码缓存

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use credstore_common::Clock;
use credstore_config::AuthorizationCodeConfig;
use credstore_errors::{AppError, AppResult};
use credstore_ports::{AuthorizationCodeServices, CodeGenerator, GrantAuthentication};
use tracing::{debug, warn};

use crate::observability;
use crate::{Lookup, RandomCodeGenerator, ThrottledExpiringMap};

/// 默认授权码有效期
pub const DEFAULT_CODE_TTL_SECS: i64 = 5 * 60;

/// 授权码
#[derive(Debug, Clone)]
pub struct AuthorizationCode<A> {
    /// 授权码
    pub code: String,
    /// 用户 ID
    pub user_id: Option<String>,
    /// Client ID
    pub client_id: String,
    /// 兑换时原样返回的认证上下文
    pub authentication: A,
}

/// 授权码缓存
///
/// 授权码在第一次成功兑换时即被移除，之后的兑换（包括并发竞争的兑换）一律失败。
pub struct AuthorizationCodeCache<A> {
    codes: ThrottledExpiringMap<AuthorizationCode<A>>,
    generator: Arc<dyn CodeGenerator>,
    ttl: Duration,
    max_collision_retries: u32,
}

impl<A: GrantAuthentication> AuthorizationCodeCache<A> {
    /// 创建缓存，清理间隔与有效期相同
    pub fn new(
        ttl: Duration,
        generator: Arc<dyn CodeGenerator>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        if ttl <= Duration::zero() {
            return Err(AppError::invalid_argument(format!(
                "Authorization code ttl must be positive, got {}ms",
                ttl.num_milliseconds()
            )));
        }

        Ok(Self {
            codes: ThrottledExpiringMap::new("authorization_code", ttl, clock)?,
            generator,
            ttl,
            max_collision_retries: 0,
        })
    }

    /// 默认有效期与默认生成器
    pub fn with_defaults(clock: Arc<dyn Clock>) -> AppResult<Self> {
        Self::new(
            Duration::seconds(DEFAULT_CODE_TTL_SECS),
            Arc::new(RandomCodeGenerator::default()),
            clock,
        )
    }

    /// 按配置创建，使用随机字母数字生成器
    pub fn from_config(config: &AuthorizationCodeConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let ttl = config
            .ttl()
            .map_err(|e| AppError::invalid_argument(e.to_string()))?;
        let generator = Arc::new(RandomCodeGenerator::new(config.code_length)?);
        Ok(Self::new(ttl, generator, clock)?
            .with_max_collision_retries(config.max_collision_retries))
    }

    /// 生成的授权码与有效授权码冲突时的重试次数
    pub fn with_max_collision_retries(mut self, retries: u32) -> Self {
        self.max_collision_retries = retries;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 以默认有效期签发授权码
    pub fn issue(&self, authentication: A) -> AppResult<String> {
        self.issue_with_ttl(authentication, self.ttl)
    }

    /// 以指定有效期签发授权码
    ///
    /// 生成器失败时原样返回其错误；用尽重试仍冲突时返回 `IllegalState`。
    pub fn issue_with_ttl(&self, authentication: A, ttl: Duration) -> AppResult<String> {
        let client_id = authentication.client_id().to_string();
        let mut pending = AuthorizationCode {
            code: String::new(),
            user_id: authentication.user_id().map(str::to_string),
            client_id: client_id.clone(),
            authentication,
        };

        for attempt in 0..=self.max_collision_retries {
            let code = self.generator.generate()?;
            pending.code = code.clone();

            match self.codes.put_if_absent(code.clone(), pending, ttl)? {
                None => {
                    debug!(
                        client_id = %client_id,
                        ttl_secs = ttl.num_seconds(),
                        "Issued authorization code"
                    );
                    observability::record_code_issued();
                    return Ok(code);
                }
                Some(rejected) => {
                    warn!(
                        attempt = attempt + 1,
                        "Generated authorization code collided with a live code"
                    );
                    pending = rejected;
                }
            }
        }

        Err(AppError::illegal_state(
            "Unable to generate a unique authorization code",
        ))
    }

    /// 兑换授权码，成功后授权码即失效
    ///
    /// 不存在与已过期都返回 `InvalidGrant`。
    pub fn redeem(&self, code: &str) -> AppResult<A> {
        match self.codes.take(code) {
            Lookup::Found(entry) => {
                observability::record_code_redeemed();
                Ok(entry.authentication)
            }
            Lookup::Expired => {
                debug!("[oauth_code] Found code, but it expired");
                observability::record_code_rejected("expired");
                Err(AppError::invalid_grant(format!(
                    "Authorization code expired: {}",
                    code
                )))
            }
            Lookup::NotFound => {
                observability::record_code_rejected("not_found");
                Err(AppError::invalid_grant(format!(
                    "Invalid authorization code: {}",
                    code
                )))
            }
        }
    }

    /// 立即清理过期授权码
    pub fn sweep_expired(&self) -> usize {
        self.codes.sweep_expired()
    }

    pub fn sweep_count(&self) -> u64 {
        self.codes.sweep_count()
    }

    /// 缓存中的授权码数量（包括尚未清理的过期授权码）
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl<A> AuthorizationCodeServices<A> for AuthorizationCodeCache<A>
where
    A: GrantAuthentication + 'static,
{
    async fn create_authorization_code(&self, authentication: A) -> AppResult<String> {
        self.issue(authentication)
    }

    async fn consume_authorization_code(&self, code: &str) -> AppResult<A> {
        self.redeem(code)
    }
}

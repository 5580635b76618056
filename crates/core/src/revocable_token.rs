//! 可撤销 Token 缓存

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use credstore_common::{Clock, ZoneId};
use credstore_config::RevocableTokenConfig;
use credstore_errors::{AppError, AppResult};
use credstore_ports::{RevocableToken, RevocableTokenProvisioning, ZoneResolver};
use tracing::debug;

use crate::observability;
use crate::{Lookup, ThrottledExpiringMap};

/// 默认清理间隔
pub const DEFAULT_SWEEP_INTERVAL_SECS: i64 = 30;

/// 可撤销 Token 缓存
///
/// 按用户、Client 的查询都是对有效条目的线性扫描，没有二级索引。
pub struct RevocableTokenCache<P> {
    tokens: ThrottledExpiringMap<RevocableToken<P>>,
    zones: Arc<dyn ZoneResolver>,
}

impl<P> RevocableTokenCache<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new(
        sweep_interval: Duration,
        zones: Arc<dyn ZoneResolver>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        Ok(Self {
            tokens: ThrottledExpiringMap::new("revocable_token", sweep_interval, clock)?,
            zones,
        })
    }

    pub fn with_defaults(zones: Arc<dyn ZoneResolver>, clock: Arc<dyn Clock>) -> AppResult<Self> {
        Self::new(Duration::seconds(DEFAULT_SWEEP_INTERVAL_SECS), zones, clock)
    }

    pub fn from_config(
        config: &RevocableTokenConfig,
        zones: Arc<dyn ZoneResolver>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let interval = config
            .sweep_interval()
            .map_err(|e| AppError::invalid_argument(e.to_string()))?;
        Self::new(interval, zones, clock)
    }

    /// 保存 Token
    ///
    /// 写入当前租户，以 Token 自身的过期时间为准。过期时间不晚于当前时间时返回 `IllegalState`。
    pub fn create(&self, mut token: RevocableToken<P>) -> AppResult<RevocableToken<P>> {
        token.zone_id = self.zones.current_zone();
        self.tokens
            .put_until(token.token_id.clone(), token.clone(), token.expires_at)?;

        debug!(
            token_id = %token.token_id,
            zone_id = %token.zone_id,
            token_type = ?token.token_type,
            "Created revocable token"
        );
        observability::record_token_created();
        Ok(token)
    }

    /// 根据 ID 查找，过期 Token 与不存在的 Token 同样返回 `NotFound`
    pub fn retrieve(&self, token_id: &str) -> AppResult<RevocableToken<P>> {
        self.retrieve_checked(token_id, true)
    }

    /// 根据 ID 查找
    ///
    /// `check_expired` 为假时既不检查过期，也不触发清理。
    pub fn retrieve_checked(
        &self,
        token_id: &str,
        check_expired: bool,
    ) -> AppResult<RevocableToken<P>> {
        if !check_expired {
            return self
                .tokens
                .get(token_id)
                .map(|entry| entry.value)
                .ok_or_else(|| not_found(token_id));
        }

        match self.tokens.get_and_optionally_remove(token_id, false) {
            Lookup::Found(token) => Ok(token),
            Lookup::NotFound => Err(not_found(token_id)),
            Lookup::Expired => {
                debug!(token_id, "Revocable token expired on read");
                observability::record_tokens_deleted("expired", 1);
                Err(AppError::not_found("Token expired."))
            }
        }
    }

    /// 当前租户下所有有效的 Token
    pub fn retrieve_all(&self) -> Vec<RevocableToken<P>> {
        let zone = self.zones.current_zone();
        self.tokens.collect_live(|token| token.zone_id == zone)
    }

    /// 覆盖更新，不做并发版本检查
    pub fn update(
        &self,
        token_id: &str,
        mut token: RevocableToken<P>,
    ) -> AppResult<RevocableToken<P>> {
        token.token_id = token_id.to_string();
        token.zone_id = self.zones.current_zone();
        self.tokens
            .put_until(token_id, token.clone(), token.expires_at)?;
        Ok(token)
    }

    /// 删除 Token，返回被删除的值；重复删除返回 `None`
    pub fn delete(&self, token_id: &str) -> Option<RevocableToken<P>> {
        let previous = self.tokens.remove(token_id);
        if previous.is_some() {
            observability::record_tokens_deleted("revoked", 1);
        }
        previous
    }

    /// 删除租户下所有有效 Token，返回删除数量
    pub fn delete_by_zone(&self, zone_id: &ZoneId) -> usize {
        let removed = self
            .tokens
            .remove_live_where(|token| &token.zone_id == zone_id);

        debug!(zone_id = %zone_id, removed, "Deleted revocable tokens by zone");
        observability::record_tokens_deleted("zone", removed);
        removed
    }

    /// 删除租户下来自指定身份提供方的 Token
    pub fn delete_by_origin(&self, origin: &str, zone_id: &ZoneId) -> usize {
        let removed = self.tokens.remove_live_where(|token| {
            &token.zone_id == zone_id && token.origin.as_deref() == Some(origin)
        });

        debug!(origin, zone_id = %zone_id, removed, "Deleted revocable tokens by origin");
        observability::record_tokens_deleted("origin", removed);
        removed
    }

    /// 删除用户在租户下的所有 Token
    pub fn delete_by_user(&self, user_id: &str, zone_id: &ZoneId) -> usize {
        let removed = self
            .tokens
            .remove_live_where(|token| &token.zone_id == zone_id && token.user_id == user_id);
        observability::record_tokens_deleted("user", removed);
        removed
    }

    /// 删除 Client 在租户下的所有 Token
    pub fn delete_by_client(&self, client_id: &str, zone_id: &ZoneId) -> usize {
        let removed = self.tokens.remove_live_where(|token| {
            &token.zone_id == zone_id && token.client_id == client_id
        });
        observability::record_tokens_deleted("client", removed);
        removed
    }

    /// 用户的所有有效 Token
    pub fn get_user_tokens(&self, user_id: &str) -> Vec<RevocableToken<P>> {
        self.tokens.collect_live(|token| token.user_id == user_id)
    }

    /// 用户在指定 Client 下的有效 Token
    pub fn get_user_client_tokens(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> AppResult<Vec<RevocableToken<P>>> {
        if client_id.trim().is_empty() {
            return Err(AppError::invalid_argument(
                "Client ID can not be null when retrieving tokens.",
            ));
        }

        Ok(self
            .tokens
            .collect_live(|token| token.user_id == user_id && token.client_id == client_id))
    }

    /// Client 的所有有效 Token
    pub fn get_client_tokens(&self, client_id: &str) -> Vec<RevocableToken<P>> {
        self.tokens.collect_live(|token| token.client_id == client_id)
    }

    /// 立即清理过期 Token，计入 `credstore_swept_entries_total`
    pub fn sweep_expired(&self) -> usize {
        self.tokens.sweep_expired()
    }

    pub fn sweep_count(&self) -> u64 {
        self.tokens.sweep_count()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn not_found(token_id: &str) -> AppError {
    AppError::not_found(format!("Token not found '{}'.", token_id))
}

#[async_trait]
impl<P> RevocableTokenProvisioning<P> for RevocableTokenCache<P>
where
    P: Clone + Send + Sync + 'static,
{
    async fn create(&self, token: RevocableToken<P>) -> AppResult<RevocableToken<P>> {
        RevocableTokenCache::create(self, token)
    }

    async fn retrieve(&self, token_id: &str) -> AppResult<RevocableToken<P>> {
        RevocableTokenCache::retrieve(self, token_id)
    }

    async fn retrieve_all(&self) -> AppResult<Vec<RevocableToken<P>>> {
        Ok(RevocableTokenCache::retrieve_all(self))
    }

    async fn update(
        &self,
        token_id: &str,
        token: RevocableToken<P>,
    ) -> AppResult<RevocableToken<P>> {
        RevocableTokenCache::update(self, token_id, token)
    }

    async fn delete(&self, token_id: &str) -> AppResult<Option<RevocableToken<P>>> {
        Ok(RevocableTokenCache::delete(self, token_id))
    }

    async fn delete_by_identity_zone(&self, zone_id: &ZoneId) -> AppResult<usize> {
        Ok(self.delete_by_zone(zone_id))
    }

    async fn delete_by_origin(&self, origin: &str, zone_id: &ZoneId) -> AppResult<usize> {
        Ok(RevocableTokenCache::delete_by_origin(self, origin, zone_id))
    }

    async fn get_user_tokens(&self, user_id: &str) -> AppResult<Vec<RevocableToken<P>>> {
        Ok(RevocableTokenCache::get_user_tokens(self, user_id))
    }

    async fn get_user_client_tokens(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> AppResult<Vec<RevocableToken<P>>> {
        RevocableTokenCache::get_user_client_tokens(self, user_id, client_id)
    }

    async fn get_client_tokens(&self, client_id: &str) -> AppResult<Vec<RevocableToken<P>>> {
        Ok(RevocableTokenCache::get_client_tokens(self, client_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticZoneResolver;
    use crate::observability::capture::CapturingRecorder;
    use chrono::DateTime;
    use credstore_common::ManualClock;
    use credstore_ports::TokenType;

    fn cache_in(zone: &str) -> (RevocableTokenCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(DateTime::UNIX_EPOCH + Duration::days(1)));
        let cache = RevocableTokenCache::new(
            Duration::seconds(30),
            Arc::new(StaticZoneResolver::new(zone)),
            clock.clone(),
        )
        .unwrap();
        (cache, clock)
    }

    fn token(clock: &ManualClock, id: &str, user: &str, client: &str) -> RevocableToken<String> {
        let now = clock.now();
        RevocableToken::new(
            id,
            user,
            client,
            TokenType::AccessToken,
            now,
            now + Duration::hours(1),
            format!("value-{id}"),
        )
    }

    #[test]
    fn test_rejects_non_positive_interval() {
        let result = RevocableTokenCache::<String>::new(
            Duration::zero(),
            Arc::new(StaticZoneResolver::default()),
            Arc::new(ManualClock::at_epoch()),
        );
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_create_stamps_zone() {
        let (cache, clock) = cache_in("z1");
        let mut tok = token(&clock, "tok1", "u1", "c1");
        tok.zone_id = ZoneId::new("spoofed");

        let created = cache.create(tok).unwrap();
        assert_eq!(created.zone_id, "z1");
        assert_eq!(cache.retrieve("tok1").unwrap().zone_id, "z1");
    }

    #[test]
    fn test_create_rejects_already_expired_token() {
        let (cache, clock) = cache_in("z1");
        let mut tok = token(&clock, "tok1", "u1", "c1");
        tok.expires_at = clock.now();

        assert!(matches!(cache.create(tok), Err(AppError::IllegalState(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_retrieve_missing_is_not_found() {
        let (cache, _) = cache_in("z1");
        let err = cache.retrieve("nope").unwrap_err();
        assert_eq!(err, AppError::not_found("Token not found 'nope'."));
    }

    #[test]
    fn test_retrieve_expired_deletes() {
        let (cache, clock) = cache_in("z1");
        cache.create(token(&clock, "tok1", "u1", "c1")).unwrap();

        clock.advance(Duration::hours(1));
        // 不检查过期时仍能读到
        assert!(cache.retrieve_checked("tok1", false).is_ok());

        assert!(matches!(cache.retrieve("tok1"), Err(AppError::NotFound(_))));
        assert!(matches!(
            cache.retrieve_checked("tok1", false),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_overwrites_and_keeps_key() {
        let (cache, clock) = cache_in("z1");
        cache.create(token(&clock, "tok1", "u1", "c1")).unwrap();

        let mut replacement = token(&clock, "other", "u1", "c1");
        replacement.value = "rotated".to_string();
        let updated = cache.update("tok1", replacement).unwrap();

        assert_eq!(updated.token_id, "tok1");
        assert_eq!(cache.retrieve("tok1").unwrap().value, "rotated");
        assert!(cache.retrieve("other").is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_update_restamps_current_zone() {
        let clock = Arc::new(ManualClock::new(DateTime::UNIX_EPOCH + Duration::days(1)));
        let cache: RevocableTokenCache<String> = RevocableTokenCache::new(
            Duration::seconds(30),
            Arc::new(crate::TaskZoneResolver::default()),
            clock.clone(),
        )
        .unwrap();

        crate::with_zone_sync(ZoneId::new("z1"), || {
            cache.create(token(&clock, "tok1", "u1", "c1")).unwrap();
        });
        let updated = crate::with_zone_sync(ZoneId::new("z2"), || {
            cache.update("tok1", token(&clock, "tok1", "u1", "c1"))
        })
        .unwrap();

        assert_eq!(updated.zone_id, "z2");
        assert_eq!(cache.retrieve("tok1").unwrap().zone_id, "z2");
        assert_eq!(cache.delete_by_zone(&ZoneId::new("z1")), 0);
        assert_eq!(cache.delete_by_zone(&ZoneId::new("z2")), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (cache, clock) = cache_in("z1");
        cache.create(token(&clock, "tok1", "u1", "c1")).unwrap();

        assert_eq!(cache.delete("tok1").map(|t| t.token_id), Some("tok1".to_string()));
        assert!(cache.delete("tok1").is_none());
        assert!(cache.delete("never").is_none());
    }

    #[test]
    fn test_user_and_client_queries() {
        let (cache, clock) = cache_in("z1");
        cache.create(token(&clock, "t1", "u1", "c1")).unwrap();
        cache.create(token(&clock, "t2", "u1", "c2")).unwrap();
        cache.create(token(&clock, "t3", "u2", "c1")).unwrap();

        let mut ids: Vec<String> = cache
            .get_user_tokens("u1")
            .into_iter()
            .map(|t| t.token_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["t1", "t2"]);

        let ids: Vec<String> = cache
            .get_user_client_tokens("u1", "c2")
            .unwrap()
            .into_iter()
            .map(|t| t.token_id)
            .collect();
        assert_eq!(ids, vec!["t2"]);

        assert_eq!(cache.get_client_tokens("c1").len(), 2);
        assert!(cache.get_client_tokens("c9").is_empty());
    }

    #[test]
    fn test_blank_client_filter_rejected() {
        let (cache, _) = cache_in("z1");
        assert!(matches!(
            cache.get_user_client_tokens("u1", ""),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.get_user_client_tokens("u1", "   "),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_queries_hide_expired_tokens() {
        let (cache, clock) = cache_in("z1");
        cache.create(token(&clock, "t1", "u1", "c1")).unwrap();

        let now = clock.now();
        let short = RevocableToken::new(
            "t2",
            "u1",
            "c1",
            TokenType::RefreshToken,
            now,
            now + Duration::minutes(1),
            "short".to_string(),
        );
        cache.create(short).unwrap();

        clock.advance(Duration::minutes(1));
        let ids: Vec<String> = cache
            .get_user_tokens("u1")
            .into_iter()
            .map(|t| t.token_id)
            .collect();
        assert_eq!(ids, vec!["t1"]);
    }

    #[test]
    fn test_delete_by_origin_scoped_to_zone() {
        let clock = Arc::new(ManualClock::new(DateTime::UNIX_EPOCH + Duration::days(1)));
        let cache: RevocableTokenCache<String> = RevocableTokenCache::new(
            Duration::seconds(30),
            Arc::new(crate::TaskZoneResolver::default()),
            clock.clone(),
        )
        .unwrap();

        crate::with_zone_sync(ZoneId::new("z1"), || {
            cache.create(token(&clock, "a", "u1", "c1").with_origin("ldap")).unwrap();
            cache.create(token(&clock, "b", "u2", "c1").with_origin("uaa")).unwrap();
        });
        crate::with_zone_sync(ZoneId::new("z2"), || {
            cache.create(token(&clock, "c", "u3", "c1").with_origin("ldap")).unwrap();
        });

        assert_eq!(cache.delete_by_origin("ldap", &ZoneId::new("z1")), 1);
        assert!(cache.retrieve("a").is_err());
        assert!(cache.retrieve("b").is_ok());
        assert!(cache.retrieve("c").is_ok());
    }

    #[test]
    fn test_bulk_deletes_ignore_expired_tokens() {
        let (cache, clock) = cache_in("z1");
        let now = clock.now();
        let short = RevocableToken::new(
            "t1",
            "u1",
            "c1",
            TokenType::AccessToken,
            now,
            now + Duration::seconds(5),
            "short".to_string(),
        )
        .with_origin("ldap");
        cache.create(short).unwrap();

        clock.advance(Duration::seconds(6));
        assert!(cache.get_user_tokens("u1").is_empty());

        let zone = ZoneId::new("z1");
        assert_eq!(cache.delete_by_zone(&zone), 0);
        assert_eq!(cache.delete_by_origin("ldap", &zone), 0);
        assert_eq!(cache.delete_by_user("u1", &zone), 0);
        assert_eq!(cache.delete_by_client("c1", &zone), 0);

        // 过期 Token 由清理删除
        assert_eq!(cache.sweep_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_deletion_metrics() {
        let recorder = CapturingRecorder::default();

        ::metrics::with_local_recorder(&recorder, || {
            let (cache, clock) = cache_in("z1");
            let now = clock.now();
            for id in ["s1", "s2"] {
                let short = RevocableToken::new(
                    id,
                    "u1",
                    "c1",
                    TokenType::AccessToken,
                    now,
                    now + Duration::seconds(5),
                    String::new(),
                );
                cache.create(short).unwrap();
            }

            // 读取时删除
            clock.advance(Duration::seconds(6));
            assert!(cache.retrieve("s1").is_err());

            // 闸门触发的清理
            clock.advance(Duration::seconds(30));
            assert!(cache.retrieve("missing").is_err());
            assert_eq!(cache.len(), 0);
            assert_eq!(cache.sweep_expired(), 0);
        });

        assert_eq!(
            recorder.counter("credstore_tokens_deleted_total{reason=expired}"),
            1
        );
        assert_eq!(
            recorder.counter("credstore_swept_entries_total{cache=revocable_token}"),
            1
        );
        assert_eq!(
            recorder.counter("credstore_sweeps_total{cache=revocable_token}"),
            3
        );
    }

    #[test]
    fn test_from_config_rejects_out_of_range_interval() {
        let config = RevocableTokenConfig {
            sweep_interval_secs: u64::MAX,
        };
        let result = RevocableTokenCache::<String>::from_config(
            &config,
            Arc::new(StaticZoneResolver::default()),
            Arc::new(ManualClock::at_epoch()),
        );
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_delete_by_user_and_client() {
        let (cache, clock) = cache_in("z1");
        cache.create(token(&clock, "t1", "u1", "c1")).unwrap();
        cache.create(token(&clock, "t2", "u1", "c2")).unwrap();
        cache.create(token(&clock, "t3", "u2", "c2")).unwrap();

        let zone = ZoneId::new("z1");
        assert_eq!(cache.delete_by_user("u1", &zone), 2);
        assert_eq!(cache.delete_by_client("c2", &zone), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.delete_by_user("u1", &ZoneId::new("other")), 0);
    }

    #[test]
    fn test_retrieve_all_limited_to_current_zone() {
        let clock = Arc::new(ManualClock::new(DateTime::UNIX_EPOCH + Duration::days(1)));
        let cache: RevocableTokenCache<String> = RevocableTokenCache::new(
            Duration::seconds(30),
            Arc::new(crate::TaskZoneResolver::default()),
            clock.clone(),
        )
        .unwrap();

        crate::with_zone_sync(ZoneId::new("z1"), || {
            cache.create(token(&clock, "a", "u1", "c1")).unwrap();
        });
        cache.create(token(&clock, "b", "u1", "c1")).unwrap();

        let in_z1 = crate::with_zone_sync(ZoneId::new("z1"), || cache.retrieve_all());
        assert_eq!(in_z1.len(), 1);
        assert_eq!(in_z1[0].token_id, "a");

        let in_default = cache.retrieve_all();
        assert_eq!(in_default.len(), 1);
        assert!(in_default[0].zone_id.is_default());
    }
}

//! credstore - 凭据缓存演示入口
//!
//! 签发并兑换一次授权码，随后创建、查询、撤销一个 Token。

use chrono::{Duration, Utc};
use credstore_bootstrap::run;
use credstore_common::ZoneId;
use credstore_common::utils::random_id;
use credstore_core::with_zone;
use credstore_ports::{GrantAuthentication, RevocableToken, TokenType};
use tracing::{info, warn};

/// 授权请求上下文
#[derive(Debug, Clone)]
struct AuthorizationRequest {
    user_id: String,
    client_id: String,
    redirect_uri: String,
}

impl GrantAuthentication for AuthorizationRequest {
    fn user_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    run::<AuthorizationRequest, String, _, _>(&config_dir, |stores| async move {
        let codes = stores.authorization_codes();
        let tokens = stores.revocable_tokens();

        let request = AuthorizationRequest {
            user_id: "marissa".to_string(),
            client_id: "app".to_string(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
        };

        let code = codes.issue(request)?;
        info!(code_length = code.len(), "Issued authorization code");

        let redeemed = codes.redeem(&code)?;
        info!(
            user_id = %redeemed.user_id,
            redirect_uri = %redeemed.redirect_uri,
            "Redeemed authorization code"
        );

        if let Err(e) = codes.redeem(&code) {
            warn!(error = %e, "Second redemption rejected");
        }

        let zone = ZoneId::new("demo");
        let tokens_in_zone = tokens.clone();
        let token_id = with_zone(zone.clone(), async move {
            let now = Utc::now();
            let token = RevocableToken::new(
                random_id().to_string(),
                redeemed.user_id.clone(),
                redeemed.client_id.clone(),
                TokenType::RefreshToken,
                now,
                now + Duration::days(30),
                "opaque-refresh-token".to_string(),
            )
            .with_scope(["openid", "profile"]);

            tokens_in_zone.create(token).map(|t| t.token_id)
        })
        .await?;

        let found = tokens.retrieve(&token_id)?;
        info!(token_id = %found.token_id, zone_id = %found.zone_id, "Retrieved token");

        let user_tokens = tokens.get_user_client_tokens("marissa", "app")?;
        info!(count = user_tokens.len(), "Tokens for user and client");

        let removed = tokens.delete_by_zone(&zone);
        info!(removed, zone_id = %zone, "Revoked tokens in zone");

        anyhow::Ok(())
    })
    .await
}

//! credstore-config - 配置加载库

use chrono::Duration;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 授权码配置
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationCodeConfig {
    /// 授权码有效期（秒）
    #[serde(default = "default_code_ttl_secs")]
    pub ttl_secs: u64,
    /// 授权码长度
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    /// 生成的授权码与现存授权码冲突时的最大重试次数
    #[serde(default = "default_max_collision_retries")]
    pub max_collision_retries: u32,
}

fn default_code_ttl_secs() -> u64 {
    300
}

fn default_code_length() -> usize {
    10
}

fn default_max_collision_retries() -> u32 {
    3
}

impl Default for AuthorizationCodeConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_code_ttl_secs(),
            code_length: default_code_length(),
            max_collision_retries: default_max_collision_retries(),
        }
    }
}

impl AuthorizationCodeConfig {
    pub fn ttl(&self) -> Result<Duration, ConfigError> {
        positive_secs("authorization_code.ttl_secs", self.ttl_secs)
    }

    /// 授权码同时充当清理间隔
    pub fn sweep_interval(&self) -> Result<Duration, ConfigError> {
        self.ttl()
    }
}

/// 可撤销 Token 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RevocableTokenConfig {
    /// 过期清理的最小间隔（秒）
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    30
}

impl Default for RevocableTokenConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl RevocableTokenConfig {
    pub fn sweep_interval(&self) -> Result<Duration, ConfigError> {
        positive_secs("revocable_token.sweep_interval_secs", self.sweep_interval_secs)
    }
}

/// 秒数转换为 `Duration`，零值或超出范围时返回 `Invalid`
fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid(format!("{} must be positive", field)));
    }
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ConfigError::Invalid(format!("{} is out of range: {}", field, secs)))
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 是否输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default)]
    pub authorization_code: AuthorizationCodeConfig,
    #[serde(default)]
    pub revocable_token: RevocableTokenConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_app_name() -> String {
    "credstore".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            app_env: default_app_env(),
            authorization_code: AuthorizationCodeConfig::default(),
            revocable_token: RevocableTokenConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("CREDSTORE_").split("__"));

        Self::from_figment(figment)
    }

    /// 从已组装的 Figment 中提取并校验
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// 启动时校验，零值直接失败
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.authorization_code.ttl()?;
        if self.authorization_code.code_length == 0 {
            return Err(ConfigError::Invalid(
                "authorization_code.code_length must be positive".to_string(),
            ));
        }
        self.revocable_token.sweep_interval()?;
        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

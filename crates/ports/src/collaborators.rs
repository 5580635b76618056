//! 外部协作方 trait 定义

use credstore_common::ZoneId;
use credstore_errors::AppResult;

/// 授权码生成器
///
/// 生成的标识必须不可猜测，强度由实现方负责。
pub trait CodeGenerator: Send + Sync {
    /// 生成一个新的授权码
    fn generate(&self) -> AppResult<String>;
}

/// 当前租户解析器
pub trait ZoneResolver: Send + Sync {
    /// 当前请求所属的租户
    fn current_zone(&self) -> ZoneId;
}

/// 授权码绑定的认证上下文
///
/// 缓存只读取用户与客户端标识用于记录，不关心其余内容。
pub trait GrantAuthentication: Send + Sync {
    /// 用户 ID（Client Credentials 流程为 None）
    fn user_id(&self) -> Option<&str>;

    /// Client ID
    fn client_id(&self) -> &str;
}

//! credstore-core - 过期凭据缓存
//!
//! 进程内缓存，负责一次性授权码与可撤销 Token 的签发、查询和过期清理。
//! 过期清理不依赖后台线程，由常规操作顺带触发，并通过 [`SweepGate`] 限流。

mod authorization_code;
mod entry;
mod expiring_map;
mod gate;
mod generator;
mod observability;
mod revocable_token;
mod zone;

pub use authorization_code::*;
pub use entry::*;
pub use expiring_map::*;
pub use gate::*;
pub use generator::*;
pub use revocable_token::*;
pub use zone::*;

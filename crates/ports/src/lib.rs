//! ports - 抽象 trait 层
//!
//! 定义凭据缓存对外暴露的接口，以及它依赖的外部协作方

mod authorization_code;
mod collaborators;
mod revocable_token;

pub use authorization_code::*;
pub use collaborators::*;
pub use revocable_token::*;

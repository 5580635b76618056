//! 授权码生成器

use credstore_common::utils::random_alphanumeric;
use credstore_errors::{AppError, AppResult};
use credstore_ports::CodeGenerator;

/// 默认授权码长度
pub const DEFAULT_CODE_LENGTH: usize = 10;

/// 随机字母数字授权码生成器
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> AppResult<Self> {
        if length == 0 {
            return Err(AppError::invalid_argument(
                "Authorization code length must be positive",
            ));
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_CODE_LENGTH,
        }
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> AppResult<String> {
        Ok(random_alphanumeric(self.length))
    }
}

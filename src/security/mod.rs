//! 安全模块
//!
//! 密码哈希与安全响应头。

pub mod middleware;
pub mod password;

pub use middleware::security_headers_middleware;
pub use password::{hash_password, verify_password};

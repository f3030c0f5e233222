use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// 用户唯一标识
    pub id: String,

    /// 用户名（唯一）
    pub username: String,

    /// argon2 PHC 格式的密码哈希
    pub hashed_password: String,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl User {
    /// 创建新用户
    pub fn new(username: &str, hashed_password: &str) -> Self {
        Self {
            id: format!("user_{}", Uuid::new_v4().simple()),
            username: username.to_string(),
            hashed_password: hashed_password.to_string(),
            created_at: Utc::now(),
        }
    }
}

//! 用户服务
//!
//! 注册与登录。密码以 argon2id 哈希存储。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::security::password::{hash_password, verify_password};
use crate::storage::repository::{Repository, USERNAME_TAKEN, UserRepository};

/// 用户服务 trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// 注册新用户
    async fn register(&self, username: &str, password: &str) -> Result<User>;

    /// 校验用户名与密码
    async fn login(&self, username: &str, password: &str) -> Result<User>;

    /// 根据 ID 获取用户
    async fn get_by_id(&self, id: &str) -> Result<Option<User>>;
}

/// 用户服务实现
pub struct UserServiceImpl {
    repository: Arc<dyn UserRepository>,
}

impl UserServiceImpl {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn register(&self, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        // 并发注册的唯一性由存储层保证
        if self.repository.find_by_username(username).await?.is_some() {
            return Err(AppError::Validation(USERNAME_TAKEN.to_string()));
        }

        let user = User::new(username, &hash_password(password)?);
        let user = self.repository.create(&user).await?;
        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self.repository.find_by_username(username.trim()).await?;
        match user {
            Some(user) if verify_password(password, &user.hashed_password) => Ok(user),
            _ => Err(AppError::Authentication(
                "Invalid username/password".to_string(),
            )),
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        self.repository.get_by_id(id).await
    }
}

/// 创建用户服务
pub fn create_user_service(repository: Arc<dyn UserRepository>) -> Arc<dyn UserService> {
    Arc::new(UserServiceImpl::new(repository))
}

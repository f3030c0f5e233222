//! 存储工厂模块
//!
//! 根据配置创建相应的仓储实例。

use std::sync::Arc;

use crate::config::config::{DatabaseConfig, StorageBackend};
use crate::error::Result;
use crate::storage::memory::{InMemoryHistoryStore, InMemoryPersonaRepository, InMemoryUserRepository};
use crate::storage::repository::{HistoryStore, PersonaRepository, UserRepository};

#[cfg(feature = "surrealdb")]
use crate::storage::surrealdb::{
    SurrealHistoryStore, SurrealPersonaRepository, SurrealPool, SurrealUserRepository,
};

/// 一组共享的仓储实例
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub personas: Arc<dyn PersonaRepository>,
    pub history: Arc<dyn HistoryStore>,
    #[cfg(feature = "surrealdb")]
    pool: Option<SurrealPool>,
}

impl Repositories {
    /// 创建进程内仓储
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            personas: Arc::new(InMemoryPersonaRepository::new()),
            history: Arc::new(InMemoryHistoryStore::new()),
            #[cfg(feature = "surrealdb")]
            pool: None,
        }
    }

    /// 检查存储是否可用
    pub async fn health_check(&self) -> Result<()> {
        #[cfg(feature = "surrealdb")]
        if let Some(pool) = &self.pool {
            return pool.health_check().await;
        }
        Ok(())
    }
}

/// 存储工厂
pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建仓储
    pub async fn create(config: &DatabaseConfig) -> Result<Repositories> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Repositories::in_memory())
            }
            #[cfg(feature = "surrealdb")]
            StorageBackend::Surrealdb => {
                let pool = SurrealPool::new(config.clone()).await?;
                let db = pool.inner();
                Ok(Repositories {
                    users: Arc::new(SurrealUserRepository::new(db.clone())),
                    personas: Arc::new(SurrealPersonaRepository::new(db.clone())),
                    history: Arc::new(SurrealHistoryStore::new(db)),
                    pool: Some(pool),
                })
            }
            #[cfg(not(feature = "surrealdb"))]
            StorageBackend::Surrealdb => Err(crate::error::AppError::Config(
                "SurrealDB feature is not enabled. Enable 'surrealdb' feature or use the memory backend."
                    .into(),
            )),
        }
    }
}

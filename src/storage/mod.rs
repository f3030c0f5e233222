//! 存储层模块
//!
//! 提供数据持久化服务：SurrealDB（生产）与进程内存储（开发/测试）。

pub mod factory;
pub mod memory;
pub mod repository;

#[cfg(feature = "surrealdb")]
pub mod surrealdb;

pub use factory::{Repositories, StorageFactory};
pub use repository::{HistoryStore, PersonaRepository, Repository, UserRepository};

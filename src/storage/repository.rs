use async_trait::async_trait;

use crate::error::Result;
use crate::models::message::{HistoryEntry, Sender};
use crate::models::persona::Persona;
use crate::models::user::User;

/// 仓储 trait
#[async_trait]
pub trait Repository<T: Clone + Send + Sync>: Send + Sync {
    /// 创建实体
    async fn create(&self, entity: &T) -> Result<T>;

    /// 根据 ID 获取实体
    async fn get_by_id(&self, id: &str) -> Result<Option<T>>;

    /// 删除实体
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// 用户名重复时的错误消息
pub const USERNAME_TAKEN: &str = "Username already exists";

/// 用户仓储
///
/// 用户名唯一：`create` 遇到重复用户名返回 `AppError::Validation(USERNAME_TAKEN)`。
#[async_trait]
pub trait UserRepository: Repository<User> {
    /// 按用户名查找
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
}

/// 角色仓储
#[async_trait]
pub trait PersonaRepository: Repository<Persona> {
    /// 列出用户的所有角色（按创建时间倒序）
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Persona>>;
}

/// 对话历史存储
///
/// 只追加、按角色内序号排序的消息日志。
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 追加一条消息，写入时间为当前时间，序号为该角色的下一个序号
    async fn append(&self, persona_id: &str, sender: Sender, message: &str)
    -> Result<HistoryEntry>;

    /// 读取最近的 `limit` 条消息（最新在前）
    ///
    /// `before` 为排他上界：只返回 `sequence < before` 的消息。
    async fn fetch_recent(
        &self,
        persona_id: &str,
        limit: usize,
        before: Option<u64>,
    ) -> Result<Vec<HistoryEntry>>;

    /// 列出角色的全部消息（最早在前）
    async fn list_by_persona(&self, persona_id: &str) -> Result<Vec<HistoryEntry>>;

    /// 统计角色的消息数量
    async fn count_by_persona(&self, persona_id: &str) -> Result<u64>;

    /// 删除角色的全部消息，返回删除条数
    async fn delete_by_persona(&self, persona_id: &str) -> Result<u64>;
}

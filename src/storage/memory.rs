//! 进程内存储
//!
//! 基于 `parking_lot::RwLock` 的仓储实现，用于开发模式和测试。

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::message::{HistoryEntry, Sender};
use crate::models::persona::Persona;
use crate::models::user::User;
use crate::storage::repository::{
    HistoryStore, PersonaRepository, Repository, USERNAME_TAKEN, UserRepository,
};

/// 内存用户仓储
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<User> for InMemoryUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        // 用户名唯一性检查与插入在同一把写锁内完成
        let mut users = self.users.write();
        if users.values().any(|u| u.username == user.username) {
            return Err(AppError::Validation(USERNAME_TAKEN.to_string()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.users.write().remove(id).is_some())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

/// 内存角色仓储
#[derive(Default)]
pub struct InMemoryPersonaRepository {
    personas: RwLock<HashMap<String, Persona>>,
}

impl InMemoryPersonaRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<Persona> for InMemoryPersonaRepository {
    async fn create(&self, persona: &Persona) -> Result<Persona> {
        self.personas
            .write()
            .insert(persona.id.clone(), persona.clone());
        Ok(persona.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Persona>> {
        Ok(self.personas.read().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.personas.write().remove(id).is_some())
    }
}

#[async_trait]
impl PersonaRepository for InMemoryPersonaRepository {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Persona>> {
        let mut personas: Vec<Persona> = self
            .personas
            .read()
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        personas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(personas)
    }
}

/// 内存历史存储
///
/// 每个角色一个按序号递增的向量；追加在写锁内分配序号。
#[derive(Default)]
pub struct InMemoryHistoryStore {
    logs: RwLock<HashMap<String, Vec<HistoryEntry>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(
        &self,
        persona_id: &str,
        sender: Sender,
        message: &str,
    ) -> Result<HistoryEntry> {
        let mut logs = self.logs.write();
        let log = logs.entry(persona_id.to_string()).or_default();
        let sequence = log.last().map(|e| e.sequence + 1).unwrap_or(1);
        let entry = HistoryEntry::new(persona_id, sender, message, sequence);
        log.push(entry.clone());
        Ok(entry)
    }

    async fn fetch_recent(
        &self,
        persona_id: &str,
        limit: usize,
        before: Option<u64>,
    ) -> Result<Vec<HistoryEntry>> {
        let logs = self.logs.read();
        let Some(log) = logs.get(persona_id) else {
            return Ok(Vec::new());
        };
        Ok(log
            .iter()
            .rev()
            .filter(|e| before.is_none_or(|b| e.sequence < b))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_by_persona(&self, persona_id: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .logs
            .read()
            .get(persona_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn count_by_persona(&self, persona_id: &str) -> Result<u64> {
        Ok(self
            .logs
            .read()
            .get(persona_id)
            .map(|log| log.len() as u64)
            .unwrap_or(0))
    }

    async fn delete_by_persona(&self, persona_id: &str) -> Result<u64> {
        Ok(self
            .logs
            .write()
            .remove(persona_id)
            .map(|log| log.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_assigns_monotonic_sequence() {
        let store = InMemoryHistoryStore::new();
        let a = store.append("p1", Sender::User, "hi").await.unwrap();
        let b = store.append("p1", Sender::Agent, "hello").await.unwrap();
        let other = store.append("p2", Sender::User, "yo").await.unwrap();

        assert_eq!(a.sequence, 1);
        assert_eq!(b.sequence, 2);
        assert_eq!(other.sequence, 1);
    }

    #[tokio::test]
    async fn test_fetch_recent_is_newest_first_and_bounded() {
        let store = InMemoryHistoryStore::new();
        for i in 0..6 {
            store
                .append("p1", Sender::User, &format!("m{}", i))
                .await
                .unwrap();
        }

        let recent = store.fetch_recent("p1", 3, None).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(texts, vec!["m5", "m4", "m3"]);

        let before = store.fetch_recent("p1", 3, Some(5)).await.unwrap();
        let seqs: Vec<u64> = before.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn test_delete_by_persona() {
        let store = InMemoryHistoryStore::new();
        store.append("p1", Sender::User, "a").await.unwrap();
        store.append("p1", Sender::Agent, "b").await.unwrap();

        assert_eq!(store.delete_by_persona("p1").await.unwrap(), 2);
        assert_eq!(store.count_by_persona("p1").await.unwrap(), 0);
        assert!(store.list_by_persona("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_lookup_by_username() {
        let repo = InMemoryUserRepository::new();
        let user = User::new("alice", "hash");
        Repository::create(&repo, &user).await.unwrap();

        let found = repo.find_by_username("alice").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected_on_insert() {
        let repo = InMemoryUserRepository::new();
        Repository::create(&repo, &User::new("alice", "h1")).await.unwrap();

        let err = Repository::create(&repo, &User::new("alice", "h2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == USERNAME_TAKEN));
        assert_eq!(repo.users.read().len(), 1);
    }

    #[tokio::test]
    async fn test_personas_listed_newest_first() {
        let repo = InMemoryPersonaRepository::new();
        let mut older = Persona::new("u1", "Old", Default::default(), None, None);
        older.created_at = older.created_at - chrono::Duration::seconds(60);
        let newer = Persona::new("u1", "New", Default::default(), None, None);
        let foreign = Persona::new("u2", "Other", Default::default(), None, None);
        for p in [&older, &newer, &foreign] {
            repo.create(p).await.unwrap();
        }

        let listed = repo.list_by_user("u1").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|p| p.character_name.as_str()).collect();
        assert_eq!(names, vec!["New", "Old"]);
    }
}

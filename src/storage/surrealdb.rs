//! SurrealDB 存储实现

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tokio::sync::Mutex;

use crate::config::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::message::{HistoryEntry, Sender};
use crate::models::persona::{Persona, PersonaMode};
use crate::models::user::User;
use crate::storage::repository::{
    HistoryStore, PersonaRepository, Repository, USERNAME_TAKEN, UserRepository,
};

/// 读取时把记录 ID 还原为纯字符串
const SELECT_WITH_ID: &str = "SELECT *, meta::id(id) AS id";

/// 用户名唯一索引
const USERNAME_INDEX: &str = "user_username";

/// 启动时定义的索引
const SCHEMA: &str = "\
    DEFINE INDEX IF NOT EXISTS user_username ON TABLE user FIELDS username UNIQUE;\
    DEFINE INDEX IF NOT EXISTS message_persona_sequence ON TABLE message FIELDS persona_id, sequence;";

/// SurrealDB 连接
#[derive(Clone)]
pub struct SurrealPool {
    /// 数据库连接
    db: Surreal<Any>,
}

impl SurrealPool {
    /// 建立连接、认证并选择命名空间和数据库
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.connection_timeout.max(1));
        let db: Surreal<Any> = tokio::time::timeout(timeout, connect(config.url.as_str()))
            .await
            .map_err(|_| AppError::Connection(format!("Timed out connecting to {}", config.url)))??;

        // 内嵌引擎无需认证
        if !config.url.starts_with("mem://") && !config.username.is_empty() {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;
        db.query(SCHEMA).await?.check()?;

        Ok(Self { db })
    }

    /// 获取内部数据库实例
    pub fn inner(&self) -> Surreal<Any> {
        self.db.clone()
    }

    /// 检查连接是否可用
    pub async fn health_check(&self) -> Result<()> {
        self.db.health().await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct CountRow {
    count: u64,
}

#[derive(Deserialize)]
struct SequenceRow {
    sequence: u64,
}

#[derive(Serialize)]
struct UserRow {
    username: String,
    hashed_password: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
struct PersonaRow {
    user_id: String,
    character_name: String,
    mode: PersonaMode,
    tone: String,
    summary: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
struct MessageRow {
    persona_id: String,
    sender: Sender,
    message: String,
    sequence: u64,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// 用户仓储实现
#[derive(Clone)]
pub struct SurrealUserRepository {
    db: Surreal<Any>,
}

impl SurrealUserRepository {
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<User> for SurrealUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let row = UserRow {
            username: user.username.clone(),
            hashed_password: user.hashed_password.clone(),
            created_at: user.created_at,
        };
        let created = self
            .db
            .query("CREATE type::thing('user', $id) CONTENT $data RETURN NONE")
            .bind(("id", user.id.clone()))
            .bind(("data", row))
            .await
            .and_then(|response| response.check());
        match created {
            Ok(_) => Ok(user.clone()),
            Err(e) if e.to_string().contains(USERNAME_INDEX) => {
                Err(AppError::Validation(USERNAME_TAKEN.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let users: Vec<User> = self
            .db
            .query(format!("{SELECT_WITH_ID} FROM type::thing('user', $id)"))
            .bind(("id", id.to_string()))
            .await?
            .take(0)?;
        Ok(users.into_iter().next())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let existed = self.get_by_id(id).await?.is_some();
        self.db
            .query("DELETE type::thing('user', $id)")
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        Ok(existed)
    }
}

#[async_trait]
impl UserRepository for SurrealUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users: Vec<User> = self
            .db
            .query(format!(
                "{SELECT_WITH_ID} FROM user WHERE username = $username LIMIT 1"
            ))
            .bind(("username", username.to_string()))
            .await?
            .take(0)?;
        Ok(users.into_iter().next())
    }
}

/// 角色仓储实现
#[derive(Clone)]
pub struct SurrealPersonaRepository {
    db: Surreal<Any>,
}

impl SurrealPersonaRepository {
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<Persona> for SurrealPersonaRepository {
    async fn create(&self, persona: &Persona) -> Result<Persona> {
        let row = PersonaRow {
            user_id: persona.user_id.clone(),
            character_name: persona.character_name.clone(),
            mode: persona.mode,
            tone: persona.tone.clone(),
            summary: persona.summary.clone(),
            created_at: persona.created_at,
        };
        self.db
            .query("CREATE type::thing('persona', $id) CONTENT $data RETURN NONE")
            .bind(("id", persona.id.clone()))
            .bind(("data", row))
            .await?
            .check()?;
        Ok(persona.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Persona>> {
        let personas: Vec<Persona> = self
            .db
            .query(format!("{SELECT_WITH_ID} FROM type::thing('persona', $id)"))
            .bind(("id", id.to_string()))
            .await?
            .take(0)?;
        Ok(personas.into_iter().next())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let existed = self.get_by_id(id).await?.is_some();
        self.db
            .query("DELETE type::thing('persona', $id)")
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        Ok(existed)
    }
}

#[async_trait]
impl PersonaRepository for SurrealPersonaRepository {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Persona>> {
        let personas: Vec<Persona> = self
            .db
            .query(format!(
                "{SELECT_WITH_ID} FROM persona WHERE user_id = $user_id ORDER BY created_at DESC"
            ))
            .bind(("user_id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(personas)
    }
}

/// 历史消息存储实现
pub struct SurrealHistoryStore {
    db: Surreal<Any>,
    // 序号分配是“读最大值再写入”，进程内串行化
    append_lock: Mutex<()>,
}

impl SurrealHistoryStore {
    pub fn new(db: Surreal<Any>) -> Self {
        Self {
            db,
            append_lock: Mutex::new(()),
        }
    }

    async fn max_sequence(&self, persona_id: &str) -> Result<u64> {
        let rows: Vec<SequenceRow> = self
            .db
            .query(
                "SELECT sequence FROM message WHERE persona_id = $persona_id \
                 ORDER BY sequence DESC LIMIT 1",
            )
            .bind(("persona_id", persona_id.to_string()))
            .await?
            .take(0)?;
        Ok(rows.first().map(|r| r.sequence).unwrap_or(0))
    }
}

#[async_trait]
impl HistoryStore for SurrealHistoryStore {
    async fn append(
        &self,
        persona_id: &str,
        sender: Sender,
        message: &str,
    ) -> Result<HistoryEntry> {
        let _guard = self.append_lock.lock().await;

        let sequence = self.max_sequence(persona_id).await? + 1;
        let entry = HistoryEntry::new(persona_id, sender, message, sequence);
        let row = MessageRow {
            persona_id: entry.persona_id.clone(),
            sender: entry.sender,
            message: entry.message.clone(),
            sequence: entry.sequence,
            created_at: entry.created_at,
        };

        self.db
            .query("CREATE type::thing('message', $id) CONTENT $data RETURN NONE")
            .bind(("id", entry.id.clone()))
            .bind(("data", row))
            .await?
            .check()?;

        Ok(entry)
    }

    async fn fetch_recent(
        &self,
        persona_id: &str,
        limit: usize,
        before: Option<u64>,
    ) -> Result<Vec<HistoryEntry>> {
        let mut query = self
            .db
            .query(match before {
                Some(_) => format!(
                    "{SELECT_WITH_ID} FROM message WHERE persona_id = $persona_id \
                     AND sequence < $before ORDER BY sequence DESC LIMIT $limit"
                ),
                None => format!(
                    "{SELECT_WITH_ID} FROM message WHERE persona_id = $persona_id \
                     ORDER BY sequence DESC LIMIT $limit"
                ),
            })
            .bind(("persona_id", persona_id.to_string()))
            .bind(("limit", limit));
        if let Some(before) = before {
            query = query.bind(("before", before));
        }

        let entries: Vec<HistoryEntry> = query.await?.take(0)?;
        Ok(entries)
    }

    async fn list_by_persona(&self, persona_id: &str) -> Result<Vec<HistoryEntry>> {
        let entries: Vec<HistoryEntry> = self
            .db
            .query(format!(
                "{SELECT_WITH_ID} FROM message WHERE persona_id = $persona_id ORDER BY sequence ASC"
            ))
            .bind(("persona_id", persona_id.to_string()))
            .await?
            .take(0)?;
        Ok(entries)
    }

    async fn count_by_persona(&self, persona_id: &str) -> Result<u64> {
        let rows: Vec<CountRow> = self
            .db
            .query("SELECT count() FROM message WHERE persona_id = $persona_id GROUP ALL")
            .bind(("persona_id", persona_id.to_string()))
            .await?
            .take(0)?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0))
    }

    async fn delete_by_persona(&self, persona_id: &str) -> Result<u64> {
        let removed = self.count_by_persona(persona_id).await?;
        self.db
            .query("DELETE message WHERE persona_id = $persona_id")
            .bind(("persona_id", persona_id.to_string()))
            .await?
            .check()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SurrealPool {
        SurrealPool::new(DatabaseConfig {
            url: "mem://".to_string(),
            namespace: "test".to_string(),
            database: "test".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    async fn seeded_history(count: usize) -> SurrealHistoryStore {
        let store = SurrealHistoryStore::new(pool().await.inner());
        for i in 1..=count {
            let sender = if i % 2 == 1 { Sender::User } else { Sender::Agent };
            store
                .append("p1", sender, &format!("m{}", i))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_append_assigns_sequence_per_persona() {
        let store = seeded_history(3).await;
        let other = store.append("p2", Sender::User, "yo").await.unwrap();

        let sequences: Vec<u64> = store
            .list_by_persona("p1")
            .await
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(other.sequence, 1);
    }

    #[tokio::test]
    async fn test_fetch_recent_respects_limit_and_exclusive_bound() {
        let store = seeded_history(6).await;

        let recent = store.fetch_recent("p1", 3, None).await.unwrap();
        let sequences: Vec<u64> = recent.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![6, 5, 4]);

        let prior = store.fetch_recent("p1", 3, Some(5)).await.unwrap();
        let sequences: Vec<u64> = prior.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![4, 3, 2]);

        assert!(store.fetch_recent("p1", 10, Some(1)).await.unwrap().is_empty());
        assert!(store.fetch_recent("missing", 10, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_round_trip_plain_ids() {
        let store = seeded_history(0).await;
        let appended = store.append("p1", Sender::Agent, "hello").await.unwrap();

        let listed = store.list_by_persona("p1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, appended.id);
        assert_eq!(listed[0].sender, Sender::Agent);
        assert_eq!(listed[0].message, "hello");
    }

    #[tokio::test]
    async fn test_count_and_delete_by_persona() {
        let store = seeded_history(6).await;
        store.append("p2", Sender::User, "keep me").await.unwrap();

        assert_eq!(store.count_by_persona("p1").await.unwrap(), 6);
        assert_eq!(store.delete_by_persona("p1").await.unwrap(), 6);
        assert_eq!(store.count_by_persona("p1").await.unwrap(), 0);
        assert!(store.list_by_persona("p1").await.unwrap().is_empty());
        assert_eq!(store.count_by_persona("p2").await.unwrap(), 1);

        // 删除后重新从 1 开始编号
        let next = store.append("p1", Sender::User, "again").await.unwrap();
        assert_eq!(next.sequence, 1);
    }

    #[tokio::test]
    async fn test_user_lookup_and_unique_username() {
        let repo = SurrealUserRepository::new(pool().await.inner());
        let user = User::new("alice", "hash");
        repo.create(&user).await.unwrap();

        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_name.hashed_password, "hash");
        let by_id = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(repo.find_by_username("bob").await.unwrap().is_none());

        let err = repo.create(&User::new("alice", "other")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == USERNAME_TAKEN));

        assert!(repo.delete(&user.id).await.unwrap());
        assert!(repo.get_by_id(&user.id).await.unwrap().is_none());
        assert!(!repo.delete(&user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_persona_lookup_and_listing() {
        let repo = SurrealPersonaRepository::new(pool().await.inner());
        let mut older = Persona::new("u1", "Old", PersonaMode::Auto, None, None);
        older.created_at -= chrono::Duration::seconds(60);
        let newer = Persona::new(
            "u1",
            "New",
            PersonaMode::Custom,
            Some("witty"),
            Some("A starship pilot"),
        );
        let foreign = Persona::new("u2", "Other", PersonaMode::Auto, None, None);
        for p in [&older, &newer, &foreign] {
            repo.create(p).await.unwrap();
        }

        let listed = repo.list_by_user("u1").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|p| p.character_name.as_str()).collect();
        assert_eq!(names, vec!["New", "Old"]);

        let fetched = repo.get_by_id(&newer.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, newer.id);
        assert_eq!(fetched.mode, PersonaMode::Custom);
        assert_eq!(fetched.tone, "witty");
        assert_eq!(fetched.summary, "A starship pilot");

        assert!(repo.delete(&newer.id).await.unwrap());
        assert_eq!(repo.list_by_user("u1").await.unwrap().len(), 1);
    }
}

//! 角色服务
//!
//! 角色的创建、列表与删除。删除角色时级联删除其对话历史。

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::persona::{Persona, PersonaMode};
use crate::storage::repository::{HistoryStore, PersonaRepository, Repository, UserRepository};

/// 创建角色请求
#[derive(Debug, Clone)]
pub struct NewPersona {
    pub user_id: String,
    pub character_name: String,
    pub mode: PersonaMode,
    pub tone: Option<String>,
    pub summary: Option<String>,
}

/// 角色列表项（附消息数）
#[derive(Debug, Clone, Serialize)]
pub struct PersonaWithCount {
    #[serde(flatten)]
    pub persona: Persona,
    pub message_count: u64,
}

/// 角色服务 trait
#[async_trait]
pub trait PersonaService: Send + Sync {
    /// 创建角色
    async fn create(&self, request: NewPersona) -> Result<Persona>;

    /// 列出用户的角色（最新在前）
    async fn list(&self, user_id: &str) -> Result<Vec<PersonaWithCount>>;

    /// 删除角色及其对话历史，返回删除的消息条数
    async fn delete(&self, persona_id: &str, user_id: &str) -> Result<u64>;

    /// 获取属于该用户的角色
    async fn get_owned(&self, persona_id: &str, user_id: &str) -> Result<Option<Persona>>;
}

/// 角色服务实现
pub struct PersonaServiceImpl {
    users: Arc<dyn UserRepository>,
    personas: Arc<dyn PersonaRepository>,
    history: Arc<dyn HistoryStore>,
}

impl PersonaServiceImpl {
    pub fn new(
        users: Arc<dyn UserRepository>,
        personas: Arc<dyn PersonaRepository>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            users,
            personas,
            history,
        }
    }
}

#[async_trait]
impl PersonaService for PersonaServiceImpl {
    async fn create(&self, request: NewPersona) -> Result<Persona> {
        if request.character_name.trim().is_empty() {
            return Err(AppError::Validation(
                "character_name is required".to_string(),
            ));
        }

        let has_summary = request
            .summary
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if request.mode == PersonaMode::Custom && !has_summary {
            return Err(AppError::Validation("Custom mode needs summary".to_string()));
        }

        if self.users.get_by_id(&request.user_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "User not found: {}",
                request.user_id
            )));
        }

        let persona = Persona::new(
            &request.user_id,
            &request.character_name,
            request.mode,
            request.tone.as_deref(),
            request.summary.as_deref(),
        );
        let persona = self.personas.create(&persona).await?;
        info!(
            persona_id = %persona.id,
            user_id = %persona.user_id,
            mode = %persona.mode,
            "Persona created"
        );
        Ok(persona)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<PersonaWithCount>> {
        let personas = self.personas.list_by_user(user_id).await?;
        let mut listed = Vec::with_capacity(personas.len());
        for persona in personas {
            let message_count = self.history.count_by_persona(&persona.id).await?;
            listed.push(PersonaWithCount {
                persona,
                message_count,
            });
        }
        Ok(listed)
    }

    async fn delete(&self, persona_id: &str, user_id: &str) -> Result<u64> {
        if self.get_owned(persona_id, user_id).await?.is_none() {
            return Err(AppError::Authorization(
                "Persona not found or not owned by user".to_string(),
            ));
        }

        let removed = self.history.delete_by_persona(persona_id).await?;
        self.personas.delete(persona_id).await?;
        info!(persona_id, messages_removed = removed, "Persona deleted");
        Ok(removed)
    }

    async fn get_owned(&self, persona_id: &str, user_id: &str) -> Result<Option<Persona>> {
        Ok(self
            .personas
            .get_by_id(persona_id)
            .await?
            .filter(|p| p.user_id == user_id))
    }
}

/// 创建角色服务
pub fn create_persona_service(
    users: Arc<dyn UserRepository>,
    personas: Arc<dyn PersonaRepository>,
    history: Arc<dyn HistoryStore>,
) -> Arc<dyn PersonaService> {
    Arc::new(PersonaServiceImpl::new(users, personas, history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Sender;
    use crate::models::user::User;
    use crate::storage::Repositories;

    async fn setup() -> (Repositories, Arc<dyn PersonaService>, User) {
        let repos = Repositories::in_memory();
        let user = repos.users.create(&User::new("alice", "hash")).await.unwrap();
        let service = create_persona_service(
            repos.users.clone(),
            repos.personas.clone(),
            repos.history.clone(),
        );
        (repos, service, user)
    }

    fn request(user_id: &str, mode: PersonaMode, summary: Option<&str>) -> NewPersona {
        NewPersona {
            user_id: user_id.to_string(),
            character_name: "Nova".to_string(),
            mode,
            tone: None,
            summary: summary.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_with_defaults() {
        let (_, service, user) = setup().await;
        let persona = service
            .create(request(&user.id, PersonaMode::Auto, None))
            .await
            .unwrap();
        assert_eq!(persona.tone, "neutral");
        assert_eq!(persona.summary, "");
    }

    #[tokio::test]
    async fn test_custom_mode_needs_summary() {
        let (_, service, user) = setup().await;
        let err = service
            .create(request(&user.id, PersonaMode::Custom, Some("  ")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Custom mode needs summary"));

        assert!(service
            .create(request(&user.id, PersonaMode::Custom, Some("A starship pilot")))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (_, service, _) = setup().await;
        let err = service
            .create(request("user_missing", PersonaMode::Auto, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_counts_messages() {
        let (repos, service, user) = setup().await;
        let persona = service
            .create(request(&user.id, PersonaMode::Auto, None))
            .await
            .unwrap();
        repos.history.append(&persona.id, Sender::User, "hi").await.unwrap();
        repos.history.append(&persona.id, Sender::Agent, "hey").await.unwrap();

        let listed = service.list(&user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].message_count, 2);
    }

    #[tokio::test]
    async fn test_delete_requires_owner_and_cascades() {
        let (repos, service, user) = setup().await;
        let persona = service
            .create(request(&user.id, PersonaMode::Auto, None))
            .await
            .unwrap();
        repos.history.append(&persona.id, Sender::User, "hi").await.unwrap();

        let err = service.delete(&persona.id, "user_other").await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        assert_eq!(service.delete(&persona.id, &user.id).await.unwrap(), 1);
        assert!(repos.personas.get_by_id(&persona.id).await.unwrap().is_none());
        assert_eq!(repos.history.count_by_persona(&persona.id).await.unwrap(), 0);
    }
}

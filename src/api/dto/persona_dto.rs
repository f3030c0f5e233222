//! 角色 DTO

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::persona::{Persona, PersonaMode};
use crate::services::persona::{NewPersona, PersonaWithCount};

/// 创建角色请求
#[derive(Debug, Deserialize)]
pub struct CreatePersonaRequest {
    pub user_id: String,
    pub character_name: String,
    #[serde(default)]
    pub mode: PersonaMode,
    pub tone: Option<String>,
    pub summary: Option<String>,
}

impl From<CreatePersonaRequest> for NewPersona {
    fn from(req: CreatePersonaRequest) -> Self {
        NewPersona {
            user_id: req.user_id,
            character_name: req.character_name,
            mode: req.mode,
            tone: req.tone,
            summary: req.summary,
        }
    }
}

/// 角色响应
#[derive(Debug, Serialize, Deserialize)]
pub struct PersonaResponse {
    pub id: String,
    pub user_id: String,
    pub character_name: String,
    pub mode: PersonaMode,
    pub tone: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl From<Persona> for PersonaResponse {
    fn from(p: Persona) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            character_name: p.character_name,
            mode: p.mode,
            tone: p.tone,
            summary: p.summary,
            created_at: p.created_at,
        }
    }
}

/// 角色列表项
#[derive(Debug, Serialize, Deserialize)]
pub struct PersonaListItem {
    #[serde(flatten)]
    pub persona: PersonaResponse,
    pub message_count: u64,
}

impl From<PersonaWithCount> for PersonaListItem {
    fn from(item: PersonaWithCount) -> Self {
        Self {
            persona: item.persona.into(),
            message_count: item.message_count,
        }
    }
}

/// 所有者查询参数
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: String,
}

/// 删除角色响应
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletePersonaResponse {
    pub msg: String,
    pub id: String,
    pub messages_removed: u64,
}

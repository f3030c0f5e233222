//! 对话 DTO

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::message::{HistoryEntry, Sender};

/// 对话请求
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub user_id: String,
    pub persona_id: String,
    pub user_input: String,
}

/// 对话响应
#[derive(Debug, Serialize, Deserialize)]
pub struct RespondResponse {
    pub reply: String,
}

/// 消息响应
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub persona_id: String,
    pub sender: Sender,
    pub message: String,
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryEntry> for MessageResponse {
    fn from(e: HistoryEntry) -> Self {
        Self {
            id: e.id,
            persona_id: e.persona_id,
            sender: e.sender,
            message: e.message,
            sequence: e.sequence,
            created_at: e.created_at,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 消息发送方
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// 用户
    User,
    /// 角色（模型回复）
    Agent,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Agent => write!(f, "agent"),
        }
    }
}

/// 历史消息
///
/// 写入后不可变。`sequence` 在同一角色内单调递增（从 1 开始）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// 消息唯一标识
    pub id: String,

    /// 所属角色
    pub persona_id: String,

    /// 发送方
    pub sender: Sender,

    /// 消息内容
    pub message: String,

    /// 角色内序号
    pub sequence: u64,

    /// 写入时间
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// 创建新消息
    pub fn new(persona_id: &str, sender: Sender, message: &str, sequence: u64) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4().simple()),
            persona_id: persona_id.to_string(),
            sender,
            message: message.to_string(),
            sequence,
            created_at: Utc::now(),
        }
    }

    /// 渲染为 `sender: message` 形式的一行对话
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.sender, self.message)
    }
}

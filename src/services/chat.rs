//! 对话服务
//!
//! 一轮对话：持久化用户消息 → 运行生成流水线 → 持久化回复。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::config::PipelineConfig;
use crate::error::{AppError, Result};
use crate::llm::TextGenerator;
use crate::models::message::{HistoryEntry, Sender};
use crate::models::persona::Persona;
use crate::observability::AppMetrics;
use crate::services::pipeline::{ChatPipeline, TurnOutcome};
use crate::storage::repository::{HistoryStore, PersonaRepository, Repository};

/// 一轮对话的结果
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// 最终回复
    pub reply: String,
    /// 本轮的用户消息
    pub user_message: HistoryEntry,
    /// 本轮的回复消息
    pub agent_message: HistoryEntry,
    /// 是否调用了摘要阶段
    pub summarized: bool,
}

/// 对话服务 trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// 与角色进行一轮对话
    async fn respond(&self, user_id: &str, persona_id: &str, user_input: &str) -> Result<ChatTurn>;

    /// 获取角色的全部消息（需为角色所有者）
    async fn messages(&self, persona_id: &str, user_id: &str) -> Result<Vec<HistoryEntry>>;

    /// 获取角色的全部消息（不校验所有者）
    async fn full_history(&self, persona_id: &str) -> Result<Vec<HistoryEntry>>;
}

/// 对话服务实现
pub struct ChatServiceImpl {
    personas: Arc<dyn PersonaRepository>,
    history: Arc<dyn HistoryStore>,
    oracle: Arc<dyn TextGenerator>,
    config: PipelineConfig,
    metrics: Arc<AppMetrics>,
}

impl ChatServiceImpl {
    pub fn new(
        personas: Arc<dyn PersonaRepository>,
        history: Arc<dyn HistoryStore>,
        oracle: Arc<dyn TextGenerator>,
        config: PipelineConfig,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            personas,
            history,
            oracle,
            config,
            metrics,
        }
    }

    async fn owned_persona(&self, persona_id: &str, user_id: &str) -> Result<Option<Persona>> {
        Ok(self
            .personas
            .get_by_id(persona_id)
            .await?
            .filter(|p| p.user_id == user_id))
    }

    /// 运行流水线，`turn_timeout` 为 0 时不限时
    async fn run_pipeline(
        &self,
        pipeline: &ChatPipeline,
        persona_id: &str,
        user_input: &str,
        before: u64,
    ) -> Result<TurnOutcome> {
        let run = pipeline.run(persona_id, user_input, Some(before));
        if self.config.turn_timeout == 0 {
            return run.await;
        }

        let limit = Duration::from_secs(self.config.turn_timeout);
        match tokio::time::timeout(limit, run).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.record_turn_timeout();
                Err(AppError::Timeout(format!(
                    "Turn exceeded {}s",
                    self.config.turn_timeout
                )))
            }
        }
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn respond(&self, user_id: &str, persona_id: &str, user_input: &str) -> Result<ChatTurn> {
        let persona = self
            .owned_persona(persona_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Persona not found for this user".to_string()))?;

        if user_input.trim().is_empty() {
            return Err(AppError::Validation("user_input must not be empty".to_string()));
        }

        let user_message = self
            .history
            .append(persona_id, Sender::User, user_input)
            .await?;

        let pipeline = ChatPipeline::new(
            self.oracle.clone(),
            self.history.clone(),
            &self.config,
            persona.profile(),
        );

        let outcome = match self
            .run_pipeline(&pipeline, persona_id, user_input, user_message.sequence)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                if let AppError::Generation(failure) = &e {
                    self.metrics.record_stage_failure(failure.stage);
                }
                warn!(persona_id, error = %e, "Chat turn failed");
                return Err(e);
            }
        };

        let agent_message = self
            .history
            .append(persona_id, Sender::Agent, &outcome.reply)
            .await?;
        self.metrics.record_turn();

        info!(
            persona_id,
            user_seq = user_message.sequence,
            agent_seq = agent_message.sequence,
            summarized = outcome.summarized(),
            "Chat turn completed"
        );

        Ok(ChatTurn {
            summarized: outcome.summarized(),
            reply: outcome.reply,
            user_message,
            agent_message,
        })
    }

    async fn messages(&self, persona_id: &str, user_id: &str) -> Result<Vec<HistoryEntry>> {
        if self.owned_persona(persona_id, user_id).await?.is_none() {
            return Err(AppError::Authorization("Access denied".to_string()));
        }
        self.history.list_by_persona(persona_id).await
    }

    async fn full_history(&self, persona_id: &str) -> Result<Vec<HistoryEntry>> {
        self.history.list_by_persona(persona_id).await
    }
}

/// 创建对话服务
pub fn create_chat_service(
    personas: Arc<dyn PersonaRepository>,
    history: Arc<dyn HistoryStore>,
    oracle: Arc<dyn TextGenerator>,
    config: PipelineConfig,
    metrics: Arc<AppMetrics>,
) -> Arc<dyn ChatService> {
    Arc::new(ChatServiceImpl::new(
        personas, history, oracle, config, metrics,
    ))
}

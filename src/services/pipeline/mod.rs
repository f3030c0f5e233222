//! 生成流水线
//!
//! 每轮对话依次执行三个阶段：历史摘要 → 角色回复 → 回复审核。
//!
//! ```text
//! FETCH_HISTORY ─┬─ SUMMARIZE ────┬─ RESPOND ─ MODERATE ─ DONE
//!                └─ SKIP_SUMMARY ─┘
//!            (任一生成阶段失败 → FAILED)
//! ```
//!
//! 流水线不跨轮次保存状态，每轮用角色画像新建一个实例。

pub mod prompts;
pub mod stage;
pub mod window;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::config::PipelineConfig;
use crate::error::Result;
use crate::llm::TextGenerator;
use crate::models::message::HistoryEntry;
use crate::models::persona::PersonaProfile;
use crate::storage::repository::HistoryStore;

pub use prompts::{NEW_CONVERSATION_CONTEXT, RespondInput};
pub use stage::{GenerationFailure, PromptStage, StageKind};
pub use window::HistoryWindow;

/// 流水线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    FetchHistory,
    Summarize,
    SkipSummary,
    Respond,
    Moderate,
    Done,
    Failed(StageKind),
}

/// 一轮对话的结果
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// 审核后的最终回复
    pub reply: String,
    /// 读取到的历史条数
    pub history_len: usize,
    /// 经过的状态
    pub path: Vec<PipelineState>,
}

impl TurnOutcome {
    /// 是否调用了摘要阶段
    pub fn summarized(&self) -> bool {
        self.path.contains(&PipelineState::Summarize)
    }
}

/// 生成流水线（编排器）
pub struct ChatPipeline {
    oracle: Arc<dyn TextGenerator>,
    history: Arc<dyn HistoryStore>,
    window: HistoryWindow,
    persona: PersonaProfile,
}

impl ChatPipeline {
    /// 创建单轮流水线
    pub fn new(
        oracle: Arc<dyn TextGenerator>,
        history: Arc<dyn HistoryStore>,
        config: &PipelineConfig,
        persona: PersonaProfile,
    ) -> Self {
        Self {
            oracle,
            history,
            window: HistoryWindow::new(config.history_limit),
            persona,
        }
    }

    pub fn persona(&self) -> &PersonaProfile {
        &self.persona
    }

    pub fn window(&self) -> HistoryWindow {
        self.window
    }

    /// 读取最近的历史，按时间正序返回
    ///
    /// `before` 为当前轮用户消息的序号，保证只读到之前的轮次。
    pub async fn fetch_history(
        &self,
        persona_id: &str,
        before: Option<u64>,
    ) -> Result<Vec<HistoryEntry>> {
        let mut entries = self
            .history
            .fetch_recent(persona_id, self.window.limit(), before)
            .await?;
        entries.reverse();
        Ok(entries)
    }

    /// 执行完整的一轮
    pub async fn run(
        &self,
        persona_id: &str,
        user_message: &str,
        before: Option<u64>,
    ) -> Result<TurnOutcome> {
        debug!(persona_id, state = ?PipelineState::FetchHistory, "Pipeline transition");
        let history = self.fetch_history(persona_id, before).await?;
        Ok(self.generate(&history, user_message).await?)
    }

    /// 历史摘要：把时间正序的历史压缩为上下文
    pub async fn build_context(
        &self,
        history: &[HistoryEntry],
    ) -> std::result::Result<String, GenerationFailure> {
        prompts::summarize_stage()
            .invoke(self.oracle.as_ref(), history)
            .await
    }

    /// 角色回复：基于上下文与用户消息生成草稿
    pub async fn reply(
        &self,
        context: &str,
        user_message: &str,
    ) -> std::result::Result<String, GenerationFailure> {
        let input = RespondInput {
            persona: &self.persona,
            context,
            user_message,
        };
        prompts::respond_stage()
            .invoke(self.oracle.as_ref(), &input)
            .await
    }

    /// 回复审核：输出即最终回复
    pub async fn check(&self, draft: &str) -> std::result::Result<String, GenerationFailure> {
        prompts::moderate_stage()
            .invoke(self.oracle.as_ref(), draft)
            .await
    }

    /// 基于已读取的历史（时间正序）执行三个生成阶段
    pub async fn generate(
        &self,
        history: &[HistoryEntry],
        user_message: &str,
    ) -> std::result::Result<TurnOutcome, GenerationFailure> {
        let mut path = vec![PipelineState::FetchHistory];

        let context = if history.is_empty() {
            self.transition(&mut path, PipelineState::SkipSummary);
            NEW_CONVERSATION_CONTEXT.to_string()
        } else {
            self.transition(&mut path, PipelineState::Summarize);
            self.build_context(history)
                .await
                .inspect_err(|f| self.fail(f))?
        };

        self.transition(&mut path, PipelineState::Respond);
        let draft = self
            .reply(&context, user_message)
            .await
            .inspect_err(|f| self.fail(f))?;

        self.transition(&mut path, PipelineState::Moderate);
        let reply = self.check(&draft).await.inspect_err(|f| self.fail(f))?;

        self.transition(&mut path, PipelineState::Done);
        info!(
            character = %self.persona.character_name,
            history_len = history.len(),
            reply_chars = reply.len(),
            "Turn completed"
        );

        Ok(TurnOutcome {
            reply,
            history_len: history.len(),
            path,
        })
    }

    fn transition(&self, path: &mut Vec<PipelineState>, next: PipelineState) {
        debug!(character = %self.persona.character_name, state = ?next, "Pipeline transition");
        path.push(next);
    }

    fn fail(&self, failure: &GenerationFailure) {
        warn!(
            character = %self.persona.character_name,
            state = ?PipelineState::Failed(failure.stage),
            cause = %failure.cause,
            "Turn aborted"
        );
    }
}

//! 提示词阶段
//!
//! 三个生成阶段形状相同：渲染模板、调用模型、后处理。差异只在模板与后处理函数。

use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::TextGenerator;

/// 生成阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// 历史摘要
    Summarize,
    /// 角色回复
    Respond,
    /// 回复审核
    Moderate,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Summarize, StageKind::Respond, StageKind::Moderate];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Summarize => "summarize",
            StageKind::Respond => "respond",
            StageKind::Moderate => "moderate",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 生成失败
///
/// 流水线唯一会抛出的错误，标明失败阶段。不做自动重试。
#[derive(Error, Debug, Clone, PartialEq)]
#[error("回复生成失败 (stage={stage}): {cause}")]
pub struct GenerationFailure {
    /// 失败阶段
    pub stage: StageKind,
    /// 失败原因
    pub cause: String,
}

impl GenerationFailure {
    pub fn new(stage: StageKind, cause: impl Into<String>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

/// 提示词阶段
///
/// `template` 把阶段输入渲染为提示词，`post_process` 清理模型输出。
pub struct PromptStage<I: ?Sized> {
    kind: StageKind,
    template: fn(&I) -> String,
    post_process: fn(&str) -> String,
}

impl<I: ?Sized> PromptStage<I> {
    pub const fn new(
        kind: StageKind,
        template: fn(&I) -> String,
        post_process: fn(&str) -> String,
    ) -> Self {
        Self {
            kind,
            template,
            post_process,
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// 渲染提示词
    pub fn render(&self, input: &I) -> String {
        (self.template)(input)
    }

    /// 调用一次模型
    ///
    /// 模型报错或后处理后为空都视为该阶段失败。
    pub async fn invoke(
        &self,
        oracle: &dyn TextGenerator,
        input: &I,
    ) -> Result<String, GenerationFailure> {
        let prompt = self.render(input);
        debug!(stage = %self.kind, prompt_chars = prompt.len(), "Invoking prompt stage");

        let completion = oracle.generate(&prompt).await.map_err(|e| {
            warn!(stage = %self.kind, error = %e, "Oracle call failed");
            GenerationFailure::new(self.kind, e.to_string())
        })?;

        let output = (self.post_process)(&completion);
        if output.is_empty() {
            warn!(stage = %self.kind, "Oracle returned an empty completion");
            return Err(GenerationFailure::new(
                self.kind,
                "completion was empty after post-processing",
            ));
        }
        Ok(output)
    }
}

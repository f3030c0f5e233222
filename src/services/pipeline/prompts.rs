//! 三个生成阶段的提示词模板与后处理

use crate::models::message::HistoryEntry;
use crate::models::persona::PersonaProfile;
use crate::services::pipeline::stage::{PromptStage, StageKind};

/// 新对话（无历史）时使用的固定上下文
pub const NEW_CONVERSATION_CONTEXT: &str = "Summary: New conversation. Recent turns: None";

/// 角色回复阶段的输入
#[derive(Debug, Clone, Copy)]
pub struct RespondInput<'a> {
    pub persona: &'a PersonaProfile,
    pub context: &'a str,
    pub user_message: &'a str,
}

/// 把历史渲染为逐行对话文本
pub fn render_transcript(history: &[HistoryEntry]) -> String {
    history
        .iter()
        .map(HistoryEntry::transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// 摘要阶段：整体摘要 + 最近几条原文
pub fn summarize_prompt(history: &[HistoryEntry]) -> String {
    format!(
        "Create a compact conversation summary that preserves continuity.

Requirements:
- Summarize the whole conversation in 2-3 sentences.
- Then include the last 2-3 actual messages word-for-word.
- This ensures no greeting repetition.
- Do NOT invent anything.

Conversation:
{transcript}

Return format:
<summary>
<recent_messages>",
        transcript = render_transcript(history)
    )
}

/// 角色阶段：固定角色名与语气，禁止重开对话
pub fn character_prompt(input: &RespondInput<'_>) -> String {
    let name = &input.persona.character_name;
    let background = input
        .persona
        .background
        .as_deref()
        .map(|b| format!("Character background: {}\n", b))
        .unwrap_or_default();

    format!(
        "You are {name}.
Tone: {tone}.
{background}
RULES:
- Continue the conversation naturally.
- DO NOT restart the conversation.
- DO NOT greet unless the user greets first.
- Do not summarize the conversation.
- Keep responses consistent with the last few turns included in the summary.
- Stay 100% in character.

Conversation Summary + Recent Turns:
{context}

User: {user_message}

Reply as {name}.",
        tone = input.persona.tone,
        context = input.context,
        user_message = input.user_message,
    )
}

/// 审核阶段：只清理，不改变含义
pub fn moderator_prompt(draft: &str) -> String {
    format!(
        "Clean the reply WITHOUT changing its meaning.
Do NOT add greetings.
Do NOT restart the conversation.
Only fix:
- unsafe content
- hallucinated details
- grammar if needed

Keep style, tone, and message content.

Reply to clean:
{draft}"
    )
}

/// 去除首尾空白
pub fn trim_completion(raw: &str) -> String {
    raw.trim().to_string()
}

/// 去除首尾空白以及模型偶尔包裹的一对引号
pub fn unquote_completion(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .filter(|inner| !inner.contains('"'))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

pub fn summarize_stage() -> PromptStage<[HistoryEntry]> {
    PromptStage::new(StageKind::Summarize, summarize_prompt, trim_completion)
}

pub fn respond_stage<'a>() -> PromptStage<RespondInput<'a>> {
    PromptStage::new(StageKind::Respond, character_prompt, trim_completion)
}

pub fn moderate_stage() -> PromptStage<str> {
    PromptStage::new(StageKind::Moderate, moderator_prompt, unquote_completion)
}

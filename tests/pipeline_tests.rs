//! 生成流水线集成测试
//!
//! 使用可编排的假模型与进程内存储，验证每轮的调用顺序、历史窗口与失败传播。

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use persona_chat::config::config::PipelineConfig;
use persona_chat::error::AppError;
use persona_chat::llm::{OracleError, TextGenerator};
use persona_chat::models::message::Sender;
use persona_chat::models::persona::{Persona, PersonaMode, PersonaProfile};
use persona_chat::observability::AppMetrics;
use persona_chat::services::chat::create_chat_service;
use persona_chat::services::pipeline::{
    ChatPipeline, NEW_CONVERSATION_CONTEXT, PipelineState, StageKind,
};
use persona_chat::storage::memory::InMemoryHistoryStore;
use persona_chat::storage::repository::{HistoryStore, Repository};
use persona_chat::storage::Repositories;

/// 记录全部提示词，按调用次序返回预设结果
struct ScriptedOracle {
    prompts: Mutex<Vec<String>>,
    replies: Vec<Result<String, OracleError>>,
}

impl ScriptedOracle {
    fn new(replies: Vec<Result<String, OracleError>>) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            replies,
        })
    }

    fn ok(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedOracle {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let mut prompts = self.prompts.lock();
        let index = prompts.len();
        prompts.push(prompt.to_string());
        self.replies
            .get(index)
            .cloned()
            .unwrap_or_else(|| Err(OracleError::Malformed("unscripted call".into())))
    }
}

/// 每次调用都等待较长时间
struct SlowOracle;

#[async_trait]
impl TextGenerator for SlowOracle {
    async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".to_string())
    }
}

fn nova() -> PersonaProfile {
    PersonaProfile::new("Nova", Some("friendly"))
}

fn pipeline(
    oracle: Arc<ScriptedOracle>,
    store: Arc<InMemoryHistoryStore>,
    history_limit: usize,
) -> ChatPipeline {
    let config = PipelineConfig {
        history_limit,
        ..Default::default()
    };
    ChatPipeline::new(oracle, store, &config, nova())
}

async fn seed(store: &InMemoryHistoryStore, persona_id: &str, count: usize) {
    for i in 1..=count {
        let sender = if i % 2 == 1 { Sender::User } else { Sender::Agent };
        store
            .append(persona_id, sender, &format!("turn {}", i))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_new_conversation_makes_two_calls() {
    let oracle = ScriptedOracle::ok(&["Hey! I'm Nova.", "Hey! I'm Nova."]);
    let store = Arc::new(InMemoryHistoryStore::new());
    let current = store.append("p1", Sender::User, "hi").await.unwrap();

    let outcome = pipeline(oracle.clone(), store, 10)
        .run("p1", "hi", Some(current.sequence))
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Hey! I'm Nova.");
    assert_eq!(outcome.history_len, 0);
    assert!(!outcome.summarized());

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].starts_with("You are Nova."));
    assert!(prompts[0].contains(NEW_CONVERSATION_CONTEXT));
    assert!(prompts[0].contains("User: hi"));
    assert!(prompts[1].ends_with("Hey! I'm Nova."));
}

#[tokio::test]
async fn test_continuing_conversation_makes_three_calls_in_order() {
    let oracle = ScriptedOracle::ok(&[
        "User adopted a cat named Pixel.\nuser: She likes boxes",
        "Boxes are Pixel's castle!",
        "  Boxes are Pixel's castle!  ",
    ]);
    let store = Arc::new(InMemoryHistoryStore::new());
    store.append("p1", Sender::User, "I adopted a cat named Pixel").await.unwrap();
    store.append("p1", Sender::Agent, "Pixel is a great name!").await.unwrap();
    store.append("p1", Sender::User, "She likes boxes").await.unwrap();
    store.append("p1", Sender::Agent, "Cats love boxes.").await.unwrap();
    let current = store.append("p1", Sender::User, "What's my cat's name?").await.unwrap();

    let outcome = pipeline(oracle.clone(), store, 10)
        .run("p1", "What's my cat's name?", Some(current.sequence))
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Boxes are Pixel's castle!");
    assert_eq!(outcome.history_len, 4);
    assert_eq!(
        outcome.path,
        vec![
            PipelineState::FetchHistory,
            PipelineState::Summarize,
            PipelineState::Respond,
            PipelineState::Moderate,
            PipelineState::Done,
        ]
    );

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 3);

    // 摘要输入按时间正序，且不含本轮消息
    let summary_prompt = &prompts[0];
    let first = summary_prompt.find("user: I adopted a cat named Pixel").unwrap();
    let last = summary_prompt.find("agent: Cats love boxes.").unwrap();
    assert!(first < last);
    assert!(!summary_prompt.contains("What's my cat's name?"));

    // 角色提示词携带摘要原文
    assert!(prompts[1].contains("User adopted a cat named Pixel.\nuser: She likes boxes"));
    assert!(prompts[1].contains("User: What's my cat's name?"));
    assert!(prompts[2].ends_with("Boxes are Pixel's castle!"));
}

#[tokio::test]
async fn test_small_window_is_raised_to_three() {
    let oracle = ScriptedOracle::ok(&["summary", "draft", "final"]);
    let store = Arc::new(InMemoryHistoryStore::new());
    seed(&store, "p1", 8).await;

    let outcome = pipeline(oracle.clone(), store, 1)
        .run("p1", "next", None)
        .await
        .unwrap();

    assert_eq!(outcome.history_len, 3);
    let summary_prompt = &oracle.prompts()[0];
    assert!(summary_prompt.contains("turn 6"));
    assert!(summary_prompt.contains("turn 8"));
    assert!(!summary_prompt.contains("turn 5"));
}

#[tokio::test]
async fn test_large_window_is_capped_at_thirty() {
    let oracle = ScriptedOracle::ok(&["summary", "draft", "final"]);
    let store = Arc::new(InMemoryHistoryStore::new());
    seed(&store, "p1", 40).await;

    let outcome = pipeline(oracle, store, 1000)
        .run("p1", "next", None)
        .await
        .unwrap();

    assert_eq!(outcome.history_len, 30);
}

#[tokio::test]
async fn test_short_history_is_summarized_as_is() {
    let oracle = ScriptedOracle::ok(&["summary", "draft", "final"]);
    let store = Arc::new(InMemoryHistoryStore::new());
    seed(&store, "p1", 2).await;

    let outcome = pipeline(oracle, store, 10)
        .run("p1", "next", None)
        .await
        .unwrap();

    assert_eq!(outcome.history_len, 2);
    assert!(outcome.summarized());
}

#[tokio::test]
async fn test_moderator_failure_discards_draft() {
    let oracle = ScriptedOracle::new(vec![
        Ok("summary".to_string()),
        Ok("Draft that never ships".to_string()),
        Err(OracleError::Api {
            status: 429,
            message: "quota exceeded".to_string(),
        }),
    ]);
    let store = Arc::new(InMemoryHistoryStore::new());
    seed(&store, "p1", 4).await;

    let err = pipeline(oracle.clone(), store, 10)
        .run("p1", "next", None)
        .await
        .unwrap_err();

    match err {
        AppError::Generation(failure) => {
            assert_eq!(failure.stage, StageKind::Moderate);
            assert!(failure.cause.contains("quota exceeded"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(oracle.prompts().len(), 3);
}

#[tokio::test]
async fn test_summarizer_failure_stops_before_responder() {
    let oracle = ScriptedOracle::new(vec![Err(OracleError::Transport("connection reset".into()))]);
    let store = Arc::new(InMemoryHistoryStore::new());
    seed(&store, "p1", 4).await;

    let err = pipeline(oracle.clone(), store, 10)
        .run("p1", "next", None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Generation(ref f) if f.stage == StageKind::Summarize));
    assert_eq!(oracle.prompts().len(), 1);
}

#[tokio::test]
async fn test_blank_draft_is_a_responder_failure() {
    let oracle = ScriptedOracle::ok(&["   \n  "]);
    let store = Arc::new(InMemoryHistoryStore::new());

    let err = pipeline(oracle.clone(), store, 10)
        .run("p1", "hi", None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Generation(ref f) if f.stage == StageKind::Respond));
    assert_eq!(oracle.prompts().len(), 1);
}

#[tokio::test]
async fn test_turns_persist_and_feed_next_turn() {
    let repos = Repositories::in_memory();
    let persona = Persona::new("user_1", "Nova", PersonaMode::Auto, Some("friendly"), None);
    repos.personas.create(&persona).await.unwrap();

    let oracle = ScriptedOracle::ok(&[
        "Hey! I'm Nova.",
        "Hey! I'm Nova.",
        "User said hi and Nova said hello.",
        "Sure, let's talk about space.",
        "Sure, let's talk about space.",
    ]);
    let service = create_chat_service(
        repos.personas.clone(),
        repos.history.clone(),
        oracle.clone(),
        PipelineConfig::default(),
        Arc::new(AppMetrics::default()),
    );

    let first = service.respond("user_1", &persona.id, "hi").await.unwrap();
    assert!(!first.summarized);

    let second = service
        .respond("user_1", &persona.id, "Tell me about space")
        .await
        .unwrap();
    assert!(second.summarized);
    assert_eq!(second.reply, "Sure, let's talk about space.");

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 5);
    assert!(prompts[2].contains("user: hi"));
    assert!(prompts[2].contains("agent: Hey! I'm Nova."));
    assert!(!prompts[2].contains("Tell me about space"));

    let stored = repos.history.list_by_persona(&persona.id).await.unwrap();
    let sequences: Vec<u64> = stored.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_turn_timeout() {
    let repos = Repositories::in_memory();
    let persona = Persona::new("user_1", "Nova", PersonaMode::Auto, None, None);
    repos.personas.create(&persona).await.unwrap();
    let metrics = Arc::new(AppMetrics::default());

    let service = create_chat_service(
        repos.personas.clone(),
        repos.history.clone(),
        Arc::new(SlowOracle),
        PipelineConfig {
            turn_timeout: 1,
            ..Default::default()
        },
        metrics.clone(),
    );

    let err = service.respond("user_1", &persona.id, "hi").await.unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
    assert_eq!(
        metrics
            .turn_timeouts_total
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
    assert_eq!(repos.history.count_by_persona(&persona.id).await.unwrap(), 1);
}

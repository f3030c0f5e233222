//! 服务模块

pub mod chat;
pub mod persona;
pub mod pipeline;
pub mod user;

pub use chat::{ChatService, ChatTurn, create_chat_service};
pub use persona::{NewPersona, PersonaService, PersonaWithCount, create_persona_service};
pub use pipeline::{ChatPipeline, GenerationFailure, HistoryWindow, PipelineState, StageKind, TurnOutcome};
pub use user::{UserService, create_user_service};

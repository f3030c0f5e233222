//! API Handlers

pub mod chat_handler;
pub mod persona_handler;
pub mod user_handler;

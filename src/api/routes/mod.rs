//! API Routes

pub mod chat_routes;
pub mod persona_routes;
pub mod user_routes;

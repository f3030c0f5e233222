//! DTO 模块
//!
//! 请求与响应的数据结构。

pub mod chat_dto;
pub mod persona_dto;
pub mod user_dto;

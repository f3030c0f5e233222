//! Persona Chat - 角色扮演对话服务
//!
//! 用户创建自定义角色并与之对话。每条回复经过三阶段大模型流水线生成：
//! 历史摘要、角色回复、回复审核。

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;

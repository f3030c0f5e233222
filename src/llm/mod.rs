//! 大模型（Oracle）模块
//!
//! 文本生成服务的抽象：输入提示词，输出自然语言文本。延迟与内容均不可控。

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiClient;

/// 文本生成失败原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// 网络或超时
    #[error("transport error: {0}")]
    Transport(String),

    /// 服务端返回错误（含配额）
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 响应中没有可用文本
    #[error("no text in completion")]
    EmptyCompletion,

    /// 响应格式无法解析
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// 文本生成服务 trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 根据提示词生成补全文本
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}

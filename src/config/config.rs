use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 存储后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SurrealDB（生产）
    #[default]
    Surrealdb,
    /// 进程内存储（开发/测试）
    Memory,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 存储后端
    pub backend: StorageBackend,
    /// SurrealDB 连接地址
    pub url: String,
    /// 命名空间
    pub namespace: String,
    /// 数据库名称
    pub database: String,
    /// 用户名
    pub username: String,
    /// 密码
    pub password: String,
    /// 连接超时（秒）
    pub connection_timeout: u64,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// 请求超时（秒）
    pub request_timeout: u64,
}

/// 大模型（Oracle）配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// API 密钥
    pub api_key: String,
    /// 模型名称
    pub model: String,
    /// API 基础地址
    pub base_url: String,
    /// 单次请求超时（秒）
    pub timeout: u64,
}

/// 生成流水线配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 读取的历史消息条数（会被钳制到 [3, 30]）
    pub history_limit: usize,
    /// 整轮对话超时（秒），0 表示不限制
    pub turn_timeout: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            turn_timeout: 0,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件路径
    pub log_dir: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 服务器配置
    pub server: ServerConfig,
    /// 大模型配置
    pub llm: LlmConfig,
    /// 流水线配置
    pub pipeline: PipelineConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig {
                backend: StorageBackend::Surrealdb,
                url: "ws://localhost:8000".into(),
                namespace: "persona_chat".into(),
                database: "chat".into(),
                username: "root".into(),
                password: "root".into(),
                connection_timeout: 30,
            },
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
                request_timeout: 120,
            },
            llm: LlmConfig {
                api_key: String::new(),
                model: "gemini-2.0-flash".into(),
                base_url: "https://generativelanguage.googleapis.com".into(),
                timeout: 60,
            },
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "persona-chat".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.pipeline.history_limit, 10);
        assert_eq!(config.pipeline.turn_timeout, 0);
        assert!(config.is_development());
    }

    #[test]
    fn test_production_overrides() {
        let config = AppConfig::production();
        assert_eq!(config.environment, "production");
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.structured);
        assert!(!config.is_development());
    }
}

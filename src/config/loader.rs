use crate::config::config::{AppConfig, StorageBackend};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序（后者覆盖前者）：
    /// 1. 开发环境默认值
    /// 2. ./config.toml
    /// 3. `PERSONA_` 前缀环境变量（`__` 分隔层级，如 `PERSONA_LLM__MODEL`）
    /// 4. `GOOGLE_API_KEY`
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PERSONA_").split("__"))
            .merge(
                Env::raw()
                    .only(&["GOOGLE_API_KEY"])
                    .map(|_| "llm.api_key".into()),
            )
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.database.backend == StorageBackend::Surrealdb && config.database.url.is_empty() {
            return Err(ConfigValidationError::MissingDatabaseUrl);
        }

        if config.llm.model.trim().is_empty() {
            return Err(ConfigValidationError::MissingModel);
        }

        if config.llm.api_key.is_empty() && !config.is_development() {
            return Err(ConfigValidationError::MissingApiKey);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("数据库连接 URL 未配置")]
    MissingDatabaseUrl,

    #[error("模型名称未配置")]
    MissingModel,

    #[error("大模型 API 密钥未配置（llm.api_key 或 GOOGLE_API_KEY）")]
    MissingApiKey,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

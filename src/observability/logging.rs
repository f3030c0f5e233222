//! 结构化日志初始化

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};

/// 日志文件名前缀（按天滚动）
const LOG_FILE_PREFIX: &str = "persona-chat.log";

/// 构造日志过滤器，`RUST_LOG` 优先于配置
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// 初始化全局日志
///
/// 配置了 `log_dir` 时额外写入按天滚动的 JSON 日志文件。返回的 guard 需要在进程退出前保持存活。
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let json_stdout = config
        .structured
        .then(|| fmt::layer().json().with_target(true));
    let text_stdout = (!config.structured).then(|| {
        fmt::layer()
            .with_target(true)
            .with_line_number(true)
    });

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(json_stdout)
        .with(text_stdout)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to set tracing subscriber: {}", e)))?;

    Ok(guard)
}

//! 可观测性模块
//!
//! 提供 Prometheus 指标、结构化日志和健康检查。

pub mod logging;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;

use crate::llm::{OracleError, TextGenerator};
use crate::services::pipeline::StageKind;
use crate::storage::Repositories;

pub use logging::init_tracing;

// ===== Metrics =====

/// 应用指标
#[derive(Default)]
pub struct AppMetrics {
    pub http_requests_total: AtomicU64,
    pub http_request_duration_sum: AtomicU64,
    pub active_connections: AtomicI64,
    pub turns_total: AtomicU64,
    pub turn_timeouts_total: AtomicU64,
    pub summarize_failures: AtomicU64,
    pub respond_failures: AtomicU64,
    pub moderate_failures: AtomicU64,
    pub oracle_calls_total: AtomicU64,
    pub oracle_errors_total: AtomicU64,
    pub oracle_latency_sum: AtomicU64,
}

impl AppMetrics {
    /// 记录 HTTP 请求
    pub fn record_http_request(&self, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        self.http_request_duration_sum
            .fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// 记录活跃连接
    pub fn record_connection(&self, delta: i64) {
        self.active_connections.fetch_add(delta, Ordering::Relaxed);
    }

    /// 记录完成的一轮对话
    pub fn record_turn(&self) {
        self.turns_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录某阶段的生成失败
    pub fn record_stage_failure(&self, stage: StageKind) {
        let counter = match stage {
            StageKind::Summarize => &self.summarize_failures,
            StageKind::Respond => &self.respond_failures,
            StageKind::Moderate => &self.moderate_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录整轮超时
    pub fn record_turn_timeout(&self) {
        self.turn_timeouts_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次模型调用
    pub fn record_oracle_call(&self, duration_ms: u64, ok: bool) {
        self.oracle_calls_total.fetch_add(1, Ordering::Relaxed);
        self.oracle_latency_sum
            .fetch_add(duration_ms, Ordering::Relaxed);
        if !ok {
            self.oracle_errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let oracle_calls = self.oracle_calls_total.load(Ordering::Relaxed);
        format!(
            r#"# HELP http_requests_total Total HTTP requests
# TYPE http_requests_total counter
http_requests_total {}
# HELP http_request_duration_seconds HTTP request duration in seconds
# TYPE http_request_duration_seconds summary
http_request_duration_seconds_sum {}
http_request_duration_seconds_count {}
# HELP active_connections Active HTTP connections
# TYPE active_connections gauge
active_connections {}
# HELP turns_total Completed chat turns
# TYPE turns_total counter
turns_total {}
# HELP turn_failures_total Chat turns aborted by a generation stage
# TYPE turn_failures_total counter
turn_failures_total{{stage="summarize"}} {}
turn_failures_total{{stage="respond"}} {}
turn_failures_total{{stage="moderate"}} {}
# HELP turn_timeouts_total Chat turns aborted by the turn timeout
# TYPE turn_timeouts_total counter
turn_timeouts_total {}
# HELP oracle_calls_total Text generation calls
# TYPE oracle_calls_total counter
oracle_calls_total {}
# HELP oracle_errors_total Failed text generation calls
# TYPE oracle_errors_total counter
oracle_errors_total {}
# HELP oracle_latency_seconds Text generation latency in seconds
# TYPE oracle_latency_seconds summary
oracle_latency_seconds_sum {}
oracle_latency_seconds_count {}
"#,
            self.http_requests_total.load(Ordering::Relaxed),
            self.http_request_duration_sum.load(Ordering::Relaxed) as f64 / 1000.0,
            self.http_requests_total.load(Ordering::Relaxed),
            self.active_connections.load(Ordering::Relaxed),
            self.turns_total.load(Ordering::Relaxed),
            self.summarize_failures.load(Ordering::Relaxed),
            self.respond_failures.load(Ordering::Relaxed),
            self.moderate_failures.load(Ordering::Relaxed),
            self.turn_timeouts_total.load(Ordering::Relaxed),
            oracle_calls,
            self.oracle_errors_total.load(Ordering::Relaxed),
            self.oracle_latency_sum.load(Ordering::Relaxed) as f64 / 1000.0,
            oracle_calls,
        )
    }
}

/// 带指标统计的文本生成器
pub struct MeteredGenerator {
    inner: Arc<dyn TextGenerator>,
    metrics: Arc<AppMetrics>,
}

impl MeteredGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, metrics: Arc<AppMetrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl TextGenerator for MeteredGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let start = Instant::now();
        let result = self.inner.generate(prompt).await;
        self.metrics
            .record_oracle_call(start.elapsed().as_millis() as u64, result.is_ok());
        result
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<HealthCheck>,
}

/// 单个健康检查项
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
    pub latency_ms: Option<u64>,
}

/// 可观测性路由状态
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<AppMetrics>,
    pub storage: Repositories,
    /// 最近一次存储检查
    pub last_check: Arc<Mutex<Option<HealthCheck>>>,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: impl Into<String>, metrics: Arc<AppMetrics>, storage: Repositories) -> Self {
        Self {
            metrics,
            storage,
            last_check: Arc::new(Mutex::new(None)),
            start_time: Utc::now(),
            version: version.into(),
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }

    /// 探测存储并记录结果
    pub async fn probe_storage(&self) -> HealthCheck {
        let start = Instant::now();
        let result = self.storage.health_check().await;
        let check = HealthCheck {
            name: "storage".to_string(),
            status: if result.is_ok() { "healthy" } else { "unhealthy" }.to_string(),
            message: result.err().map(|e| e.to_string()),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        };
        *self.last_check.lock().await = Some(check.clone());
        check
    }
}

// ===== Health Check Handlers =====

/// 获取完整健康状态
pub async fn health_check(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let check = state.probe_storage().await;
    let healthy = check.status == "healthy";

    let health_status = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        checks: vec![check],
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_status))
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// 就绪检查（检查存储）
pub async fn readiness(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    if state.probe_storage().await.status == "healthy" {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
    }
}

/// Prometheus 指标端点
pub async fn metrics(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics.gather())
}

/// 版本信息端点
pub async fn version(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Request Metrics Middleware =====

/// 记录请求指标的中间件
pub async fn metrics_middleware(
    State(metrics): State<Arc<AppMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    metrics.record_connection(1);

    let response = next.run(req).await;

    metrics.record_http_request(start.elapsed().as_millis() as u64);
    metrics.record_connection(-1);
    response
}

use std::sync::Arc;

use crate::config::config::PipelineConfig;
use crate::llm::TextGenerator;
use crate::observability::AppMetrics;
use crate::services::chat::{ChatService, create_chat_service};
use crate::services::persona::{PersonaService, create_persona_service};
use crate::services::user::{UserService, create_user_service};
use crate::storage::Repositories;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    /// User registration and login
    pub user_service: Arc<dyn UserService>,
    /// Persona CRUD
    pub persona_service: Arc<dyn PersonaService>,
    /// Chat turns and message history
    pub chat_service: Arc<dyn ChatService>,
    /// Shared application metrics
    pub metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("user_service", &"Arc<dyn UserService>")
            .field("persona_service", &"Arc<dyn PersonaService>")
            .field("chat_service", &"Arc<dyn ChatService>")
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        user_service: Arc<dyn UserService>,
        persona_service: Arc<dyn PersonaService>,
        chat_service: Arc<dyn ChatService>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            user_service,
            persona_service,
            chat_service,
            metrics,
        }
    }

    /// Wire all services over one repository set and text generator
    pub fn build(
        repos: &Repositories,
        oracle: Arc<dyn TextGenerator>,
        pipeline: PipelineConfig,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self::new(
            create_user_service(repos.users.clone()),
            create_persona_service(
                repos.users.clone(),
                repos.personas.clone(),
                repos.history.clone(),
            ),
            create_chat_service(
                repos.personas.clone(),
                repos.history.clone(),
                oracle,
                pipeline,
                metrics.clone(),
            ),
            metrics,
        )
    }
}

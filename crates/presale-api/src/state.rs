//! Application state wiring the orchestration core to concrete infra.
//!
//! The core is generic over its three seams; AppState pins them to the
//! SQLite record store, the OpenAI engine, and the HTTP identity
//! verifier.

use std::path::Path;
use std::sync::Arc;

use presale_core::assistant::AssistantCache;
use presale_core::orchestrator::ChatOrchestrator;
use presale_core::registry::ConnectionRegistry;
use presale_core::run::{PollConfig, RunCoordinator};
use presale_infra::auth::HttpIdentityVerifier;
use presale_infra::config::{self, ServiceConfig};
use presale_infra::openai::OpenAiEngine;
use presale_infra::sqlite::{DatabasePool, SqliteRecordStore};

/// Concrete type alias for the orchestrator generics pinned to infra
/// implementations.
pub type ConcreteOrchestrator =
    ChatOrchestrator<SqliteRecordStore, OpenAiEngine, HttpIdentityVerifier>;

/// Shared application state for the WebSocket server.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub config: ServiceConfig,
}

impl AppState {
    /// Initialize the application state: configuration, database,
    /// assistant catalog, and the orchestration stack.
    pub async fn init(data_dir: &Path) -> anyhow::Result<Self> {
        let service_config = config::load_config(data_dir).await;

        let pool = DatabasePool::new(&service_config.database_url).await?;
        let store = Arc::new(SqliteRecordStore::new(pool));

        let engine = Arc::new(
            OpenAiEngine::new(config::engine_api_key()?)
                .with_base_url(service_config.engine_base_url.clone()),
        );
        let verifier = Arc::new(HttpIdentityVerifier::new(
            service_config.auth_base_url.clone(),
            config::auth_service_key()?,
        ));

        let catalog = config::load_catalog(&service_config.assistants_dir).await?;
        let cache = Arc::new(AssistantCache::new(Arc::clone(&engine), catalog));
        let runner = Arc::new(RunCoordinator::new(
            Arc::clone(&engine),
            cache,
            PollConfig::default(),
        ));

        let registry = Arc::new(ConnectionRegistry::new());
        let orchestrator = Arc::new(ChatOrchestrator::new(
            Arc::clone(&registry),
            store,
            verifier,
            engine,
            runner,
        ));

        Ok(Self { registry, orchestrator, config: service_config })
    }
}

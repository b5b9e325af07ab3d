//! Assistant identity cache.
//!
//! Resolves a logical assistant role to a concrete external assistant id,
//! creating the assistant on first use and reusing it for the life of the
//! process. Entries are never invalidated or refreshed except by restart.
//!
//! A per-role [`OnceCell`] inside a [`DashMap`] guards first use: even
//! when two sessions race the first resolution of the same role, only one
//! lookup-or-create proceeds, so duplicate external assistants are not
//! created. A failed initialization leaves the cell empty and the next
//! caller retries.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use presale_types::assistant::{AssistantCatalog, AssistantRole, AssistantSpec};
use presale_types::engine::{AssistantInfo, CreateAssistant};
use presale_types::error::OrchestratorError;

use crate::engine::ConversationEngine;

/// How many assistants to fetch when scanning for an existing match.
const ASSISTANT_LIST_LIMIT: u32 = 20;

/// Process-lifetime cache of external assistant identifiers.
pub struct AssistantCache<E> {
    engine: Arc<E>,
    catalog: AssistantCatalog,
    entries: DashMap<AssistantRole, Arc<OnceCell<String>>>,
}

impl<E: ConversationEngine> AssistantCache<E> {
    pub fn new(engine: Arc<E>, catalog: AssistantCatalog) -> Self {
        Self { engine, catalog, entries: DashMap::new() }
    }

    /// Resolve a logical role to an external assistant id.
    ///
    /// Fails with a `ConfigError` when the role has no descriptor, and
    /// with an `EngineError` when the external lookup or creation fails.
    pub async fn resolve(&self, role: AssistantRole) -> Result<String, OrchestratorError> {
        let spec = self.catalog.spec(role)?.clone();
        let cell = {
            let entry = self.entries.entry(role).or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };
        let id = cell.get_or_try_init(|| self.lookup_or_create(&spec)).await?;
        Ok(id.clone())
    }

    /// Find an existing external assistant tagged with the descriptor's
    /// (type, version) metadata, or register a new one.
    async fn lookup_or_create(&self, spec: &AssistantSpec) -> Result<String, OrchestratorError> {
        let assistants = self.engine.list_assistants(ASSISTANT_LIST_LIMIT).await?;
        let matching = assistants.into_iter().filter(|a| {
            a.metadata.get("type") == Some(&spec.display_name)
                && a.metadata.get("version") == Some(&spec.version)
        });
        if let Some(found) = matching.max_by(|a, b| {
            metadata_version(a).total_cmp(&metadata_version(b))
        }) {
            tracing::debug!(role = %spec.role, assistant_id = %found.id, "reusing external assistant");
            return Ok(found.id);
        }

        let created = self
            .engine
            .create_assistant(&CreateAssistant {
                name: spec.external_name(),
                instructions: spec.instructions.clone(),
                temperature: spec.temperature,
                model: spec.model.clone(),
                metadata: [
                    ("type".to_string(), spec.display_name.clone()),
                    ("version".to_string(), spec.version.clone()),
                ]
                .into(),
            })
            .await?;
        tracing::info!(role = %spec.role, assistant_id = %created.id, "created external assistant");
        Ok(created.id)
    }
}

fn metadata_version(assistant: &AssistantInfo) -> f64 {
    assistant
        .metadata
        .get("version")
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0)
}

//! Tool registry
//!
//! Name-keyed lookup and execution for tool adapters.

use super::{Kind, Tool, ToolErrorType, ToolResult};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Tool descriptor as published to the harness
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub kind: Kind,
    pub parameters: Value,
}

/// Registry of tools available to an agent
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Tool>>> {
        self.tools.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Tool>>> {
        self.tools.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        tracing::debug!("Registering tool: {}", name);
        if self.write().insert(name.clone(), tool).is_some() {
            tracing::warn!("Tool '{}' replaced an existing registration", name);
        }
    }

    /// Returns true if the tool was found and removed
    pub fn unregister(&self, name: &str) -> bool {
        tracing::debug!("Unregistering tool: {}", name);
        self.write().remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Registered tool names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptors for every registered tool, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .read()
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                kind: tool.kind(),
                parameters: tool.parameters(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: &Value) -> ToolResult {
        self.execute_cancellable(name, args, &CancellationToken::new())
            .await
    }

    /// Execute a tool by name, passing `cancel` to tools that wait
    pub async fn execute_cancellable(
        &self,
        name: &str,
        args: &Value,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let span = tracing::info_span!(
            "codebolt.tool.execute",
            "codebolt.tool.name" = %name,
            "codebolt.tool.success" = tracing::field::Empty,
            "codebolt.tool.error_type" = tracing::field::Empty,
            "codebolt.tool.duration_ms" = tracing::field::Empty,
        );
        let start = std::time::Instant::now();

        let result = match self.get(name) {
            Some(tool) => tool.execute(args, cancel).instrument(span.clone()).await,
            None => ToolResult::error(
                ToolErrorType::ToolNotRegistered,
                format!("Unknown tool: {}", name),
            ),
        };

        span.record("codebolt.tool.success", result.error.is_none());
        if let Some(error) = &result.error {
            span.record("codebolt.tool.error_type", error.error_type.as_str());
        }
        span.record("codebolt.tool.duration_ms", start.elapsed().as_millis() as u64);

        result
    }
}

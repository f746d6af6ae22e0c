//! Knowledge retrieval tool

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::modules::rag::{ops, RagService};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
pub struct RetrieveParams {
    query: String,
    filename: String,
}

/// Retrieve indexed knowledge related to a query
pub struct RagRetrieveTool {
    rag: Arc<RagService>,
}

impl RagRetrieveTool {
    pub fn new(rag: Arc<RagService>) -> Self {
        Self { rag }
    }
}

#[async_trait]
impl DeclarativeTool for RagRetrieveTool {
    type Params = RetrieveParams;

    fn name(&self) -> &str {
        "rag_retrieve"
    }

    fn description(&self) -> &str {
        "Retrieves knowledge related to a query from an indexed file."
    }

    fn kind(&self) -> Kind {
        Kind::Search
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("query", "What to look for", true)
            .string("filename", "Indexed file to search", true)
    }

    fn validate(&self, params: &RetrieveParams) -> Result<(), String> {
        if params.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        Ok(())
    }

    async fn invoke(&self, params: RetrieveParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.rag
                .retrieve_related_knowledge(&params.query, &params.filename)
                .await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let content = match response.result(ops::RETRIEVE_RELATED_KNOWLEDGE.result) {
                    Some(Value::String(text)) => text,
                    Some(Value::Null) | None => "No related knowledge found.".to_string(),
                    Some(other) => pretty(&other),
                };
                ToolResult::success(content, format!("Searched {}", params.filename))
            },
        )
    }
}

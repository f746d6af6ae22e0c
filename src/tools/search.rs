//! Web search tool

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::modules::search::{ops, SearchService};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    query: String,
    #[serde(default)]
    first_link_only: bool,
}

/// Search the web through the backend's configured engine
pub struct WebSearchTool {
    search: Arc<SearchService>,
}

impl WebSearchTool {
    pub fn new(search: Arc<SearchService>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl DeclarativeTool for WebSearchTool {
    type Params = SearchParams;

    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web. With firstLinkOnly set, returns just the top result's URL."
    }

    fn kind(&self) -> Kind {
        Kind::Search
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("query", "Search query", true)
            .boolean("firstLinkOnly", "Return only the first result link", false)
    }

    fn validate(&self, params: &SearchParams) -> Result<(), String> {
        if params.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        Ok(())
    }

    async fn invoke(&self, params: SearchParams, _cancel: &CancellationToken) -> ToolResult {
        let (result, op) = if params.first_link_only {
            (self.search.get_first_link(&params.query).await, ops::GET_FIRST_LINK)
        } else {
            (self.search.search(&params.query).await, ops::SEARCH)
        };

        outcome(result, ToolErrorType::ExecutionFailed, |response| {
            let content = match response.result(op.result) {
                Some(Value::String(text)) => text,
                Some(Value::Null) | None => "No results.".to_string(),
                Some(other) => pretty(&other),
            };
            ToolResult::success(content, format!("Searched for \"{}\"", params.query))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::replying;
    use crate::tools::Tool;
    use serde_json::json;

    #[tokio::test]
    async fn test_first_link_routes_action() {
        let (transport, manager) = replying(
            "getFirstLinkResponse",
            json!({"data": "https://www.rust-lang.org"}),
        );
        let tool = WebSearchTool::new(Arc::new(SearchService::new(manager)));

        let result = tool
            .execute(
                &json!({"query": "rust", "firstLinkOnly": true}),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.llm_content, "https://www.rust-lang.org");
        assert_eq!(transport.last_sent().unwrap()["action"], "getFirstLink");
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let (transport, manager) = replying("searchResponse", json!({}));
        let tool = WebSearchTool::new(Arc::new(SearchService::new(manager)));

        let result = tool
            .execute(&json!({"query": "  "}), &CancellationToken::new())
            .await;
        assert_eq!(result.error_type(), Some(ToolErrorType::InvalidToolParams));
        assert_eq!(transport.sent_count(), 0);
    }
}

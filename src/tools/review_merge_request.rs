//! Review / merge request tools

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::modules::review_merge_request::{
    ops, CreateReviewRequest, ReviewMergeRequestService,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Open a review or review-and-merge request
pub struct ReviewRequestCreateTool {
    reviews: Arc<ReviewMergeRequestService>,
}

impl ReviewRequestCreateTool {
    pub fn new(reviews: Arc<ReviewMergeRequestService>) -> Self {
        Self { reviews }
    }
}

#[async_trait]
impl DeclarativeTool for ReviewRequestCreateTool {
    type Params = CreateReviewRequest;

    fn name(&self) -> &str {
        "review_request_create"
    }

    fn description(&self) -> &str {
        "Opens a review request (or review-and-merge request) for work an agent has finished."
    }

    fn kind(&self) -> Kind {
        Kind::Edit
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string_enum("type", "Request type", &["review", "review_merge"], true)
            .string("title", "Short title", true)
            .string("description", "What changed and why", true)
            .string("initialTask", "Task the change was made for", true)
            .string("authorAgentId", "Agent that made the change", true)
            .string_array("majorFilesChanged", "Most relevant changed files", false)
            .string("diffPatch", "Unified diff of the change", false)
            .string("swarmId", "Swarm the author belongs to", false)
            .string_array("issuesFaced", "Problems hit along the way", false)
            .string_array("remainingTasks", "Follow-up work left open", false)
    }

    fn validate(&self, params: &CreateReviewRequest) -> Result<(), String> {
        if params.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }

    async fn invoke(&self, params: CreateReviewRequest, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.reviews.create(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let created = response.result(ops::CREATE.result).unwrap_or(Value::Null);
                let id = created
                    .pointer("/request/id")
                    .or_else(|| created.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                ToolResult::success(
                    format!("Review request {} created: {}", id, params.title),
                    format!("Created review request {}", id),
                )
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewIdParams {
    id: String,
}

/// Fetch a review request
pub struct ReviewRequestGetTool {
    reviews: Arc<ReviewMergeRequestService>,
}

impl ReviewRequestGetTool {
    pub fn new(reviews: Arc<ReviewMergeRequestService>) -> Self {
        Self { reviews }
    }
}

#[async_trait]
impl DeclarativeTool for ReviewRequestGetTool {
    type Params = ReviewIdParams;

    fn name(&self) -> &str {
        "review_request_get"
    }

    fn description(&self) -> &str {
        "Returns a review request with its reviews, linked jobs and status."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().string("id", "Review request id", true)
    }

    async fn invoke(&self, params: ReviewIdParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.reviews.get(&params.id).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let request = response.result(ops::GET.result).unwrap_or(Value::Null);
                ToolResult::success(pretty(&request), format!("Review request {}", params.id))
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeParams {
    id: String,
    merged_by: String,
}

/// Merge an approved request
pub struct ReviewRequestMergeTool {
    reviews: Arc<ReviewMergeRequestService>,
}

impl ReviewRequestMergeTool {
    pub fn new(reviews: Arc<ReviewMergeRequestService>) -> Self {
        Self { reviews }
    }
}

#[async_trait]
impl DeclarativeTool for ReviewRequestMergeTool {
    type Params = MergeParams;

    fn name(&self) -> &str {
        "review_request_merge"
    }

    fn description(&self) -> &str {
        "Merges a review request. The backend refuses requests that are not approved."
    }

    fn kind(&self) -> Kind {
        Kind::Execute
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("id", "Review request id", true)
            .string("mergedBy", "Agent or user performing the merge", true)
    }

    async fn invoke(&self, params: MergeParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.reviews.merge(&params.id, &params.merged_by).await,
            ToolErrorType::ExecutionFailed,
            |_| {
                ToolResult::success(
                    format!("Review request {} merged by {}.", params.id, params.merged_by),
                    format!("Merged {}", params.id),
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::replying;
    use crate::tools::Tool;
    use serde_json::json;

    fn create_args() -> Value {
        json!({
            "type": "review_merge",
            "title": "Add retry",
            "description": "Retries failed uploads",
            "initialTask": "Make uploads reliable",
            "authorAgentId": "a1"
        })
    }

    #[tokio::test]
    async fn test_create_wraps_request_in_data() {
        let (transport, manager) = replying(
            "reviewMergeRequestResponse",
            json!({"data": {"request": {"id": "rmr-1"}}}),
        );
        let tool = ReviewRequestCreateTool::new(Arc::new(ReviewMergeRequestService::new(manager)));

        let result = tool.execute(&create_args(), &CancellationToken::new()).await;

        assert_eq!(result.llm_content, "Review request rmr-1 created: Add retry");
        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["action"], "create");
        assert_eq!(sent["params"]["data"]["type"], "review_merge");
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_type() {
        let (transport, manager) = replying("reviewMergeRequestResponse", json!({}));
        let tool = ReviewRequestCreateTool::new(Arc::new(ReviewMergeRequestService::new(manager)));

        let mut args = create_args();
        args["type"] = json!("merge");
        let result = tool.execute(&args, &CancellationToken::new()).await;
        assert_eq!(result.error_type(), Some(ToolErrorType::InvalidToolParams));
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_merge_refused() {
        let (_transport, manager) = replying(
            "reviewMergeRequestResponse",
            json!({"success": false, "error": "Request is not approved"}),
        );
        let tool = ReviewRequestMergeTool::new(Arc::new(ReviewMergeRequestService::new(manager)));

        let result = tool
            .execute(&json!({"id": "rmr-1", "mergedBy": "a2"}), &CancellationToken::new())
            .await;
        assert_eq!(result.error.unwrap().message, "Request is not approved");
    }
}

//! Review and merge requests raised by agents

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub mod ops {
    use crate::protocol::Operation;

    const fn review_op(action: &'static str) -> Operation {
        Operation::new("reviewMergeRequestEvent", "reviewMergeRequestResponse").with_action(action)
    }

    pub const LIST: Operation = review_op("list");
    pub const GET: Operation = review_op("get");
    pub const GET_REVIEW_INFO: Operation = review_op("getReviewInfo");
    pub const CREATE: Operation = review_op("create");
    pub const UPDATE: Operation = review_op("update");
    pub const DELETE: Operation = review_op("delete");
    pub const ADD_REVIEW: Operation = review_op("addReview");
    pub const UPDATE_STATUS: Operation = review_op("updateStatus");
    pub const MERGE: Operation = review_op("merge");
    pub const ADD_LINKED_JOB: Operation = review_op("addLinkedJob");
    pub const REMOVE_LINKED_JOB: Operation = review_op("removeLinkedJob");
    pub const ADD_EMBEDDED_AGENT: Operation = review_op("addEmbeddedAgent");
    pub const REMOVE_EMBEDDED_AGENT: Operation = review_op("removeEmbeddedAgent");
    pub const ADD_MENTIONED_USER: Operation = review_op("addMentionedUser");
    pub const PENDING: Operation = review_op("pending");
    pub const READY_TO_MERGE: Operation = review_op("readyToMerge");
    pub const BY_AGENT: Operation = review_op("byAgent");
    pub const BY_SWARM: Operation = review_op("bySwarm");
    pub const STATISTICS: Operation = review_op("statistics");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewRequestType {
    Review,
    ReviewMerge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewRequestStatus {
    Draft,
    PendingReview,
    InReview,
    ChangesRequested,
    Approved,
    ReviewCompleted,
    Merged,
    Rejected,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Approve,
    RequestChanges,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[serde(rename = "type")]
    pub request_type: ReviewRequestType,
    pub title: String,
    pub description: String,
    pub initial_task: String,
    pub author_agent_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub major_files_changed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swarm_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues_faced: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_tasks: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReviewParams {
    pub agent_id: String,
    pub agent_name: String,
    #[serde(rename = "type")]
    pub verdict: ReviewVerdict,
    pub comment: String,
}

/// Filters for `list`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<ReviewRequestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swarm_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

pub struct ReviewMergeRequestService {
    manager: Arc<MessageManager>,
}

impl ReviewMergeRequestService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    pub async fn list(&self, filters: &ReviewListFilters) -> Result<Response> {
        self.manager
            .call(&ops::LIST, json!({ "filters": filters }))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Response> {
        self.manager.call(&ops::GET, json!({ "id": id })).await
    }

    /// Condensed view for a reviewer: summary, changed files, open reviews
    pub async fn get_review_info(&self, id: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET_REVIEW_INFO, json!({ "id": id }))
            .await
    }

    pub async fn create(&self, request: &CreateReviewRequest) -> Result<Response> {
        self.manager
            .call(&ops::CREATE, json!({ "data": request }))
            .await
    }

    pub async fn update(&self, id: &str, updates: Value) -> Result<Response> {
        self.manager
            .call(&ops::UPDATE, json!({ "id": id, "data": updates }))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<Response> {
        self.manager.call(&ops::DELETE, json!({ "id": id })).await
    }

    pub async fn add_review(&self, id: &str, review: &AddReviewParams) -> Result<Response> {
        self.manager
            .call(&ops::ADD_REVIEW, json!({ "id": id, "data": review }))
            .await
    }

    pub async fn update_status(&self, id: &str, status: ReviewRequestStatus) -> Result<Response> {
        self.manager
            .call(&ops::UPDATE_STATUS, json!({ "id": id, "status": status }))
            .await
    }

    pub async fn merge(&self, id: &str, merged_by: &str) -> Result<Response> {
        self.manager
            .call(&ops::MERGE, json!({ "id": id, "mergedBy": merged_by }))
            .await
    }

    pub async fn add_linked_job(&self, id: &str, job_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::ADD_LINKED_JOB, json!({ "id": id, "jobId": job_id }))
            .await
    }

    pub async fn remove_linked_job(&self, id: &str, job_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::REMOVE_LINKED_JOB, json!({ "id": id, "jobId": job_id }))
            .await
    }

    pub async fn add_embedded_agent(&self, id: &str, agent_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::ADD_EMBEDDED_AGENT, json!({ "id": id, "agentId": agent_id }))
            .await
    }

    pub async fn remove_embedded_agent(&self, id: &str, agent_id: &str) -> Result<Response> {
        self.manager
            .call(
                &ops::REMOVE_EMBEDDED_AGENT,
                json!({ "id": id, "agentId": agent_id }),
            )
            .await
    }

    pub async fn add_mentioned_user(&self, id: &str, user_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::ADD_MENTIONED_USER, json!({ "id": id, "userId": user_id }))
            .await
    }

    /// Requests waiting for a reviewer
    pub async fn pending(&self) -> Result<Response> {
        self.manager.call(&ops::PENDING, json!({})).await
    }

    pub async fn ready_to_merge(&self) -> Result<Response> {
        self.manager.call(&ops::READY_TO_MERGE, json!({})).await
    }

    pub async fn by_agent(&self, agent_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::BY_AGENT, json!({ "agentId": agent_id }))
            .await
    }

    pub async fn by_swarm(&self, swarm_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::BY_SWARM, json!({ "swarmId": swarm_id }))
            .await
    }

    pub async fn statistics(&self) -> Result<Response> {
        self.manager.call(&ops::STATISTICS, json!({})).await
    }
}

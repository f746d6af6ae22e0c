//! Agent discovery and delegation

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub mod ops {
    use crate::protocol::{BodyStyle, Operation};

    const fn agent_op(action: &'static str, reply: &'static str) -> Operation {
        Operation::new("agentEvent", reply)
            .with_action(action)
            .with_body(BodyStyle::Inline)
    }

    pub const FIND_AGENT: Operation = agent_op("findAgent", "findAgentByTaskResponse");
    pub const START_AGENT: Operation = agent_op("startAgent", "taskCompletionResponse");
    pub const LIST_AGENTS: Operation = agent_op("listAgents", "listAgentsResponse");
    pub const AGENTS_DETAIL: Operation = agent_op("agentsDetail", "agentsDetailResponse");
}

/// Where to look for agents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLocation {
    #[default]
    All,
    LocalOnly,
    RemoteOnly,
}

/// How `find_agent` matches the task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterUsing {
    #[default]
    UseVectorDb,
    UseAi,
    UseBoth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindAgentParams {
    pub task: String,
    pub max_result: u32,
    /// Restrict the search to these agent ids
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub agent_location: AgentLocation,
    #[serde(default)]
    pub get_from: FilterUsing,
}

impl FindAgentParams {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            max_result: 1,
            agents: Vec::new(),
            agent_location: AgentLocation::default(),
            get_from: FilterUsing::default(),
        }
    }
}

pub struct AgentService {
    manager: Arc<MessageManager>,
}

impl AgentService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    /// Agents able to handle a task, best match first
    pub async fn find_agent(&self, params: &FindAgentParams) -> Result<Response> {
        self.manager.call(&ops::FIND_AGENT, params).await
    }

    /// Hand `task` to `agent_id` and wait for it to finish
    pub async fn start_agent(&self, agent_id: &str, task: &str) -> Result<Response> {
        self.manager
            .call(&ops::START_AGENT, json!({ "agentId": agent_id, "task": task }))
            .await
    }

    pub async fn list_agents(&self, location: AgentLocation) -> Result<Response> {
        self.manager
            .call(&ops::LIST_AGENTS, json!({ "agentLocation": location }))
            .await
    }

    pub async fn agents_detail(&self, agent_ids: &[String]) -> Result<Response> {
        self.manager
            .call(&ops::AGENTS_DETAIL, json!({ "agentList": agent_ids }))
            .await
    }
}

//! Agent discovery and delegation tools

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::modules::agent::{AgentLocation, AgentService, FilterUsing, FindAgentParams};
use crate::protocol::Response;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LOCATIONS: &[&str] = &["all", "local_only", "remote_only"];

fn data(response: &Response) -> Value {
    response.data.clone().unwrap_or(Value::Null)
}

fn agent_count(data: &Value) -> usize {
    data.get("agents")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindParams {
    task: String,
    #[serde(default)]
    max_result: Option<u32>,
    #[serde(default)]
    agents: Vec<String>,
    #[serde(default)]
    agent_location: AgentLocation,
    #[serde(default)]
    get_from: FilterUsing,
}

/// Find agents suited to a task
pub struct AgentFindTool {
    agents: Arc<AgentService>,
}

impl AgentFindTool {
    pub fn new(agents: Arc<AgentService>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl DeclarativeTool for AgentFindTool {
    type Params = FindParams;

    fn name(&self) -> &str {
        "agent_find"
    }

    fn description(&self) -> &str {
        "Finds agents able to handle a task, best match first."
    }

    fn kind(&self) -> Kind {
        Kind::Search
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("task", "Task the agent should handle", true)
            .integer("maxResult", "Maximum number of agents (default 1)", false)
            .string_array("agents", "Restrict the search to these agent ids", false)
            .string_enum("agentLocation", "Where to look", LOCATIONS, false)
            .string_enum("getFrom", "Matching strategy", &["useVectorDb", "useAi", "useBoth"], false)
    }

    fn validate(&self, params: &FindParams) -> Result<(), String> {
        if params.task.trim().is_empty() {
            return Err("task must not be empty".to_string());
        }
        if params.max_result == Some(0) {
            return Err("maxResult must be at least 1".to_string());
        }
        Ok(())
    }

    async fn invoke(&self, params: FindParams, _cancel: &CancellationToken) -> ToolResult {
        let mut request = FindAgentParams::new(params.task);
        request.max_result = params.max_result.unwrap_or(1);
        request.agents = params.agents;
        request.agent_location = params.agent_location;
        request.get_from = params.get_from;

        outcome(
            self.agents.find_agent(&request).await,
            ToolErrorType::AgentNotFound,
            |response| {
                let found = data(response);
                let count = agent_count(&found);
                if count == 0 {
                    return ToolResult::error(
                        ToolErrorType::AgentNotFound,
                        format!("No agent found for task: {}", request.task),
                    );
                }
                ToolResult::success(
                    format!("Found {} agent(s).\n{}", count, pretty(&found)),
                    format!("Found {} agent(s)", count),
                )
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartParams {
    agent_id: String,
    task: String,
}

/// Start an agent on a task and wait for it to finish
pub struct AgentStartTool {
    agents: Arc<AgentService>,
}

impl AgentStartTool {
    pub fn new(agents: Arc<AgentService>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl DeclarativeTool for AgentStartTool {
    type Params = StartParams;

    fn name(&self) -> &str {
        "agent_start"
    }

    fn description(&self) -> &str {
        "Starts an agent on a task and waits for it to report completion."
    }

    fn kind(&self) -> Kind {
        Kind::Execute
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("agentId", "Agent to start", true)
            .string("task", "Task for the agent", true)
    }

    async fn invoke(&self, params: StartParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.agents.start_agent(&params.agent_id, &params.task).await,
            ToolErrorType::AgentNotFound,
            |response| {
                ToolResult::success(
                    format!("Agent {} completed the task.\n{}", params.agent_id, pretty(&data(response))),
                    format!("Agent {} completed", params.agent_id),
                )
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    agent_location: AgentLocation,
}

/// List available agents
pub struct AgentListTool {
    agents: Arc<AgentService>,
}

impl AgentListTool {
    pub fn new(agents: Arc<AgentService>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl DeclarativeTool for AgentListTool {
    type Params = ListParams;

    fn name(&self) -> &str {
        "agent_list"
    }

    fn description(&self) -> &str {
        "Lists the agents available to this workspace."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().string_enum("agentLocation", "Where to look", LOCATIONS, false)
    }

    async fn invoke(&self, params: ListParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.agents.list_agents(params.agent_location).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let listed = data(response);
                let count = agent_count(&listed);
                ToolResult::success(
                    format!("{} agent(s) available.\n{}", count, pretty(&listed)),
                    format!("{} agent(s)", count),
                )
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsParams {
    agent_ids: Vec<String>,
}

/// Details for specific agents
pub struct AgentDetailsTool {
    agents: Arc<AgentService>,
}

impl AgentDetailsTool {
    pub fn new(agents: Arc<AgentService>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl DeclarativeTool for AgentDetailsTool {
    type Params = DetailsParams;

    fn name(&self) -> &str {
        "agent_details"
    }

    fn description(&self) -> &str {
        "Returns details (description, capabilities) for the given agents."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().string_array("agentIds", "Agents to describe", true)
    }

    fn validate(&self, params: &DetailsParams) -> Result<(), String> {
        if params.agent_ids.is_empty() {
            return Err("agentIds must contain at least one id".to_string());
        }
        Ok(())
    }

    async fn invoke(&self, params: DetailsParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.agents.agents_detail(&params.agent_ids).await,
            ToolErrorType::AgentNotFound,
            |response| {
                ToolResult::success(
                    pretty(&data(response)),
                    format!("Details for {} agent(s)", params.agent_ids.len()),
                )
            },
        )
    }
}

//! Task management tools

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::modules::task::{CreateTaskParams, TaskListFilters, TaskService};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const STATUSES: &[&str] = &["pending", "created", "processing", "completed", "failed", "cancelled"];
const PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdParams {
    task_id: String,
}

fn task_id_schema() -> ParameterSchema {
    ParameterSchema::new().string("taskId", "ID of the task", true)
}

fn blank_id(task_id: &str) -> Result<(), String> {
    if task_id.trim().is_empty() {
        return Err("taskId must not be empty".to_string());
    }
    Ok(())
}

fn body(response: &crate::protocol::Response) -> Value {
    response.data.clone().unwrap_or(Value::Null)
}

/// Create a task
pub struct TaskCreateTool {
    tasks: Arc<TaskService>,
}

impl TaskCreateTool {
    pub fn new(tasks: Arc<TaskService>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl DeclarativeTool for TaskCreateTool {
    type Params = CreateTaskParams;

    fn name(&self) -> &str {
        "task_create"
    }

    fn description(&self) -> &str {
        "Creates a task, optionally inside a thread and assigned to an agent."
    }

    fn kind(&self) -> Kind {
        Kind::Edit
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("name", "Task name", true)
            .string("description", "What the task involves", false)
            .string("threadId", "Thread the task belongs to", false)
            .string_enum("priority", "Task priority", PRIORITIES, false)
            .string("assignedTo", "Agent to assign the task to", false)
            .string_array("dependencies", "IDs of tasks this one depends on", false)
    }

    fn validate(&self, params: &CreateTaskParams) -> Result<(), String> {
        if params.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        Ok(())
    }

    async fn invoke(&self, params: CreateTaskParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.tasks.create_task(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let data = body(response);
                let id = data
                    .pointer("/task/id")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                ToolResult::success(
                    format!("Task '{}' created with id {}.\n{}", params.name, id, pretty(&data)),
                    format!("Created task {}", id),
                )
            },
        )
    }
}

/// List tasks
pub struct TaskListTool {
    tasks: Arc<TaskService>,
}

impl TaskListTool {
    pub fn new(tasks: Arc<TaskService>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl DeclarativeTool for TaskListTool {
    type Params = TaskListFilters;

    fn name(&self) -> &str {
        "task_list"
    }

    fn description(&self) -> &str {
        "Lists tasks, optionally filtered by thread or status."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("threadId", "Only tasks in this thread", false)
            .string_enum("status", "Only tasks with this status", STATUSES, false)
            .integer("limit", "Maximum number of tasks", false)
            .integer("offset", "Tasks to skip", false)
    }

    async fn invoke(&self, params: TaskListFilters, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.tasks.get_task_list(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let data = body(response);
                let count = data
                    .get("tasks")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                ToolResult::success(
                    format!("Found {} task(s).\n{}", count, pretty(&data)),
                    format!("{} task(s)", count),
                )
            },
        )
    }
}

/// Fetch one task
pub struct TaskGetTool {
    tasks: Arc<TaskService>,
}

impl TaskGetTool {
    pub fn new(tasks: Arc<TaskService>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl DeclarativeTool for TaskGetTool {
    type Params = TaskIdParams;

    fn name(&self) -> &str {
        "task_get"
    }

    fn description(&self) -> &str {
        "Returns the details of a task."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        task_id_schema()
    }

    fn validate(&self, params: &TaskIdParams) -> Result<(), String> {
        blank_id(&params.task_id)
    }

    async fn invoke(&self, params: TaskIdParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.tasks.get_task_detail(&params.task_id).await,
            ToolErrorType::TaskNotFound,
            |response| {
                ToolResult::success(pretty(&body(response)), format!("Task {}", params.task_id))
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateParams {
    task_id: String,
    #[serde(flatten)]
    updates: Map<String, Value>,
}

/// Apply a partial update to a task
pub struct TaskUpdateTool {
    tasks: Arc<TaskService>,
}

impl TaskUpdateTool {
    pub fn new(tasks: Arc<TaskService>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl DeclarativeTool for TaskUpdateTool {
    type Params = TaskUpdateParams;

    fn name(&self) -> &str {
        "task_update"
    }

    fn description(&self) -> &str {
        "Updates fields of an existing task (name, description, status, priority, assignedTo)."
    }

    fn kind(&self) -> Kind {
        Kind::Edit
    }

    fn schema(&self) -> ParameterSchema {
        task_id_schema()
            .string("name", "New task name", false)
            .string("description", "New description", false)
            .string_enum("status", "New status", STATUSES, false)
            .string_enum("priority", "New priority", PRIORITIES, false)
            .string("assignedTo", "Agent to reassign the task to", false)
    }

    fn validate(&self, params: &TaskUpdateParams) -> Result<(), String> {
        blank_id(&params.task_id)?;
        if params.updates.is_empty() {
            return Err("At least one field to update is required".to_string());
        }
        Ok(())
    }

    async fn invoke(&self, params: TaskUpdateParams, _cancel: &CancellationToken) -> ToolResult {
        let fields: Vec<String> = params.updates.keys().cloned().collect();
        outcome(
            self.tasks
                .update_task(&params.task_id, Value::Object(params.updates))
                .await,
            ToolErrorType::TaskNotFound,
            |_| {
                ToolResult::success(
                    format!("Task {} updated: {}.", params.task_id, fields.join(", ")),
                    format!("Updated task {}", params.task_id),
                )
            },
        )
    }
}

/// Delete a task
pub struct TaskDeleteTool {
    tasks: Arc<TaskService>,
}

impl TaskDeleteTool {
    pub fn new(tasks: Arc<TaskService>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl DeclarativeTool for TaskDeleteTool {
    type Params = TaskIdParams;

    fn name(&self) -> &str {
        "task_delete"
    }

    fn description(&self) -> &str {
        "Deletes a task."
    }

    fn kind(&self) -> Kind {
        Kind::Delete
    }

    fn schema(&self) -> ParameterSchema {
        task_id_schema()
    }

    fn validate(&self, params: &TaskIdParams) -> Result<(), String> {
        blank_id(&params.task_id)
    }

    async fn invoke(&self, params: TaskIdParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.tasks.delete_task(&params.task_id).await,
            ToolErrorType::TaskNotFound,
            |_| {
                ToolResult::success(
                    format!("Task {} deleted.", params.task_id),
                    format!("Deleted task {}", params.task_id),
                )
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignParams {
    task_id: String,
    agent_id: String,
    #[serde(default)]
    start: bool,
}

/// Assign an agent to a task, optionally starting it
pub struct TaskAssignAgentTool {
    tasks: Arc<TaskService>,
}

impl TaskAssignAgentTool {
    pub fn new(tasks: Arc<TaskService>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl DeclarativeTool for TaskAssignAgentTool {
    type Params = AssignParams;

    fn name(&self) -> &str {
        "task_assign_agent"
    }

    fn description(&self) -> &str {
        "Assigns an agent to a task. With start set, the agent also begins working on it."
    }

    fn kind(&self) -> Kind {
        Kind::Execute
    }

    fn schema(&self) -> ParameterSchema {
        task_id_schema()
            .string("agentId", "Agent to assign", true)
            .boolean("start", "Start the task with the agent immediately", false)
    }

    fn validate(&self, params: &AssignParams) -> Result<(), String> {
        blank_id(&params.task_id)
    }

    async fn invoke(&self, params: AssignParams, _cancel: &CancellationToken) -> ToolResult {
        let result = if params.start {
            self.tasks
                .start_task_with_agent(&params.task_id, &params.agent_id)
                .await
        } else {
            self.tasks
                .assign_agent_to_task(&params.task_id, &params.agent_id)
                .await
        };
        outcome(result, ToolErrorType::TaskNotFound, |_| {
            let verb = if params.start { "started with" } else { "assigned to" };
            ToolResult::success(
                format!("Task {} {} agent {}.", params.task_id, verb, params.agent_id),
                format!("Task {} {} {}", params.task_id, verb, params.agent_id),
            )
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
    async fn test_missing_task_maps_to_not_found() {
        let (_transport, manager) = replying(
            "getTaskDetailResponse",
            json!({"success": false, "message": "Task t9 not found"}),
        );
        let tool = TaskGetTool::new(Arc::new(TaskService::new(manager)));

        let result = tool
            .execute(&json!({"taskId": "t9"}), &CancellationToken::new())
            .await;
        let error = result.error.unwrap();
        assert_eq!(error.error_type, ToolErrorType::TaskNotFound);
        assert_eq!(error.message, "Task t9 not found");
    }

    #[tokio::test]
    async fn test_update_sends_only_given_fields() {
        let (transport, manager) = replying("updateTaskResponse", json!({}));
        let tool = TaskUpdateTool::new(Arc::new(TaskService::new(manager)));

        let result = tool
            .execute(
                &json!({"taskId": "t1", "status": "completed"}),
                &CancellationToken::new(),
            )
            .await;

        assert!(!result.is_error());
        assert_eq!(
            transport.last_sent().unwrap()["message"],
            json!({"taskId": "t1", "status": "completed"})
        );
    }

    #[tokio::test]
    async fn test_update_without_fields_rejected() {
        let (transport, manager) = replying("updateTaskResponse", json!({}));
        let tool = TaskUpdateTool::new(Arc::new(TaskService::new(manager)));

        let result = tool
            .execute(&json!({"taskId": "t1"}), &CancellationToken::new())
            .await;
        assert_eq!(result.error_type(), Some(ToolErrorType::InvalidToolParams));
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_assign_with_start_uses_start_action() {
        let (transport, manager) = replying("startTaskWithAgentResponse", json!({}));
        let tool = TaskAssignAgentTool::new(Arc::new(TaskService::new(manager)));

        tool.execute(
            &json!({"taskId": "t1", "agentId": "a1", "start": true}),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(transport.last_sent().unwrap()["action"], "startTaskWithAgent");
    }

    #[tokio::test]
    async fn test_create_failure_is_execution_failed() {
        let (_transport, manager) =
            replying("createTaskResponse", json!({"success": false, "error": "boom"}));
        let tool = TaskCreateTool::new(Arc::new(TaskService::new(manager)));

        let result = tool
            .execute(&json!({"name": "Docs"}), &CancellationToken::new())
            .await;
        assert_eq!(result.error_type(), Some(ToolErrorType::ExecutionFailed));
    }
}

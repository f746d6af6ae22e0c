//! Task management

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub mod ops {
    use crate::protocol::{BodyStyle, Operation};

    macro_rules! task_op {
        ($name:ident, $action:literal) => {
            pub const $name: Operation = Operation::new("taskEvent", concat!($action, "Response"))
                .with_action($action)
                .with_body(BodyStyle::Message);
        };
    }

    task_op!(CREATE_TASK, "createTask");
    task_op!(GET_TASK_LIST, "getTaskList");
    task_op!(GET_TASK_DETAIL, "getTaskDetail");
    task_op!(UPDATE_TASK, "updateTask");
    task_op!(DELETE_TASK, "deleteTask");
    task_op!(ASSIGN_AGENT_TO_TASK, "assignAgentToTask");
    task_op!(START_TASK_WITH_AGENT, "startTaskWithAgent");
    task_op!(GET_TASK_STATUS, "getTaskStatus");
    task_op!(GET_TASK_SUMMARY, "getTaskSummary");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Created,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

pub struct TaskService {
    manager: Arc<MessageManager>,
}

impl TaskService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    pub async fn create_task(&self, params: &CreateTaskParams) -> Result<Response> {
        self.manager.call(&ops::CREATE_TASK, params).await
    }

    pub async fn get_task_list(&self, filters: &TaskListFilters) -> Result<Response> {
        self.manager.call(&ops::GET_TASK_LIST, filters).await
    }

    pub async fn get_task_detail(&self, task_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET_TASK_DETAIL, json!({ "taskId": task_id }))
            .await
    }

    /// Apply a partial update (`name`, `status`, `priority`, ...)
    pub async fn update_task(&self, task_id: &str, updates: Value) -> Result<Response> {
        let mut body = json!({ "taskId": task_id });
        if let (Some(body), Value::Object(updates)) = (body.as_object_mut(), updates) {
            body.extend(updates);
        }
        self.manager.call(&ops::UPDATE_TASK, body).await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::DELETE_TASK, json!({ "taskId": task_id }))
            .await
    }

    pub async fn assign_agent_to_task(&self, task_id: &str, agent_id: &str) -> Result<Response> {
        self.manager
            .call(
                &ops::ASSIGN_AGENT_TO_TASK,
                json!({ "taskId": task_id, "agentId": agent_id }),
            )
            .await
    }

    pub async fn start_task_with_agent(&self, task_id: &str, agent_id: &str) -> Result<Response> {
        self.manager
            .call(
                &ops::START_TASK_WITH_AGENT,
                json!({ "taskId": task_id, "agentId": agent_id }),
            )
            .await
    }

    pub async fn get_task_status(&self, task_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET_TASK_STATUS, json!({ "taskId": task_id }))
            .await
    }

    pub async fn get_task_summary(&self, task_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET_TASK_SUMMARY, json!({ "taskId": task_id }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::replying;

    #[tokio::test]
    async fn test_create_task_message_body() {
        let (transport, manager) = replying(
            "createTaskResponse",
            json!({"data": {"task": {"id": "t1", "name": "Write docs"}}}),
        );
        let tasks = TaskService::new(manager);

        tasks
            .create_task(&CreateTaskParams {
                name: "Write docs".into(),
                priority: Some(TaskPriority::High),
                ..Default::default()
            })
            .await
            .unwrap();

        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["type"], "taskEvent");
        assert_eq!(sent["action"], "createTask");
        assert_eq!(sent["message"], json!({"name": "Write docs", "priority": "high"}));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let (transport, manager) = replying("updateTaskResponse", json!({}));
        let tasks = TaskService::new(manager);

        tasks
            .update_task("t1", json!({"status": "completed"}))
            .await
            .unwrap();

        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["message"], json!({"taskId": "t1", "status": "completed"}));
    }
}

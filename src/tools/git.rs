//! Git tool

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::error::Result;
use crate::modules::git::GitService;
use crate::protocol::Response;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ACTIONS: &[&str] = &[
    "init", "pull", "push", "status", "add", "commit", "checkout", "branch", "logs", "diff",
    "clone",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitAction {
    Init,
    Pull,
    Push,
    Status,
    Add,
    Commit,
    Checkout,
    Branch,
    Logs,
    Diff,
    Clone,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitParams {
    action: GitAction,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    commit_hash: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Run one git operation in the project workspace
pub struct GitActionTool {
    git: Arc<GitService>,
}

impl GitActionTool {
    pub fn new(git: Arc<GitService>) -> Self {
        Self { git }
    }

    async fn run(&self, params: &GitParams) -> Result<Response> {
        // validate() guarantees the fields each arm reads
        let text = |value: &Option<String>| present(value).unwrap_or_default().to_string();
        match params.action {
            GitAction::Init => self.git.init(present(&params.path).unwrap_or(".")).await,
            GitAction::Pull => self.git.pull().await,
            GitAction::Push => self.git.push().await,
            GitAction::Status => self.git.status().await,
            GitAction::Add => self.git.add_all().await,
            GitAction::Commit => self.git.commit(&text(&params.message)).await,
            GitAction::Checkout => self.git.checkout(&text(&params.branch)).await,
            GitAction::Branch => self.git.branch(&text(&params.branch)).await,
            GitAction::Logs => self.git.logs(present(&params.path)).await,
            GitAction::Diff => self.git.diff(&text(&params.commit_hash)).await,
            GitAction::Clone => {
                self.git
                    .clone_repository(&text(&params.url), present(&params.path))
                    .await
            }
        }
    }
}

#[async_trait]
impl DeclarativeTool for GitActionTool {
    type Params = GitParams;

    fn name(&self) -> &str {
        "git_action"
    }

    fn description(&self) -> &str {
        "Runs a git operation (init, pull, push, status, add, commit, checkout, branch, logs, diff, clone) in the project workspace."
    }

    fn kind(&self) -> Kind {
        Kind::Execute
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string_enum("action", "Git operation to run", ACTIONS, true)
            .string("path", "Repository path (init, logs, clone)", false)
            .string("message", "Commit message (commit)", false)
            .string("branch", "Branch name (checkout, branch)", false)
            .string("commitHash", "Commit to diff (diff)", false)
            .string("url", "Remote URL (clone)", false)
    }

    fn validate(&self, params: &GitParams) -> std::result::Result<(), String> {
        let needs = |field: &Option<String>, name: &str, action: &str| {
            present(field)
                .map(|_| ())
                .ok_or_else(|| format!("'{}' is required for the {} action", name, action))
        };
        match params.action {
            GitAction::Commit => needs(&params.message, "message", "commit"),
            GitAction::Checkout => needs(&params.branch, "branch", "checkout"),
            GitAction::Branch => needs(&params.branch, "branch", "branch"),
            GitAction::Diff => needs(&params.commit_hash, "commitHash", "diff"),
            GitAction::Clone => needs(&params.url, "url", "clone"),
            _ => Ok(()),
        }
    }

    async fn invoke(&self, params: GitParams, _cancel: &CancellationToken) -> ToolResult {
        let action = ACTIONS[params.action as usize];
        tracing::debug!(action, "Running git action");
        outcome(
            self.run(&params).await,
            ToolErrorType::GitExecutionError,
            |response| {
                let body = response.data.clone().unwrap_or(Value::Null);
                let content = if body.is_null() {
                    format!("git {} completed.", action)
                } else {
                    format!("git {} completed.\n{}", action, pretty(&body))
                };
                ToolResult::success(content, format!("git {} completed", action))
            },
        )
    }
}

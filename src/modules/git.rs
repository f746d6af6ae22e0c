//! Git operations executed by the backend in the project workspace

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde_json::json;
use std::sync::Arc;

pub mod ops {
    use crate::protocol::{BodyStyle, Operation};

    macro_rules! git_op {
        ($name:ident, $action:literal, $reply:literal) => {
            pub const $name: Operation = Operation::new("gitEvent", $reply)
                .with_action($action)
                .with_body(BodyStyle::Inline);
        };
    }

    git_op!(INIT, "Init", "gitInitResponse");
    git_op!(PULL, "Pull", "gitPullResponse");
    git_op!(PUSH, "Push", "gitPushResponse");
    git_op!(STATUS, "Status", "gitStatusResponse");
    git_op!(ADD, "Add", "gitAddResponse");
    git_op!(COMMIT, "Commit", "gitCommitResponse");
    git_op!(CHECKOUT, "Checkout", "gitCheckoutResponse");
    git_op!(BRANCH, "Branch", "gitBranchResponse");
    git_op!(LOGS, "Logs", "gitLogsResponse");
    git_op!(DIFF, "Diff", "gitDiffResponse");
    git_op!(CLONE, "Clone", "gitCloneResponse");
}

pub struct GitService {
    manager: Arc<MessageManager>,
}

impl GitService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    pub async fn init(&self, path: &str) -> Result<Response> {
        self.manager.call(&ops::INIT, json!({ "path": path })).await
    }

    pub async fn pull(&self) -> Result<Response> {
        self.manager.call(&ops::PULL, json!({})).await
    }

    pub async fn push(&self) -> Result<Response> {
        self.manager.call(&ops::PUSH, json!({})).await
    }

    pub async fn status(&self) -> Result<Response> {
        self.manager.call(&ops::STATUS, json!({})).await
    }

    /// Stage all changes
    pub async fn add_all(&self) -> Result<Response> {
        self.manager.call(&ops::ADD, json!({})).await
    }

    pub async fn commit(&self, message: &str) -> Result<Response> {
        self.manager
            .call(&ops::COMMIT, json!({ "message": message }))
            .await
    }

    pub async fn checkout(&self, branch: &str) -> Result<Response> {
        self.manager
            .call(&ops::CHECKOUT, json!({ "branch": branch }))
            .await
    }

    /// Create a branch
    pub async fn branch(&self, branch: &str) -> Result<Response> {
        self.manager
            .call(&ops::BRANCH, json!({ "branch": branch }))
            .await
    }

    pub async fn logs(&self, path: Option<&str>) -> Result<Response> {
        self.manager.call(&ops::LOGS, json!({ "path": path })).await
    }

    /// Diff of a single commit
    pub async fn diff(&self, commit_hash: &str) -> Result<Response> {
        self.manager
            .call(&ops::DIFF, json!({ "commitHash": commit_hash }))
            .await
    }

    pub async fn clone_repository(&self, url: &str, path: Option<&str>) -> Result<Response> {
        let mut body = json!({ "url": url });
        if let Some(path) = path {
            body["path"] = json!(path);
        }
        self.manager.call(&ops::CLONE, body).await
    }
}

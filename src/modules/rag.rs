//! Retrieval-augmented generation index

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde_json::json;
use std::sync::Arc;

pub mod ops {
    use crate::protocol::{BodyStyle, Operation, ResultField};

    const fn rag_op(action: &'static str) -> Operation {
        Operation::new("ragEvent", "ragResponse")
            .with_action(action)
            .with_body(BodyStyle::Inline)
            .with_result(ResultField::Payload)
    }

    pub const INIT: Operation = rag_op("init");
    pub const ADD_FILE: Operation = rag_op("addFile");
    pub const RETRIEVE_RELATED_KNOWLEDGE: Operation = rag_op("retrieveRelatedKnowledge");
}

pub struct RagService {
    manager: Arc<MessageManager>,
}

impl RagService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    pub async fn init(&self) -> Result<Response> {
        self.manager.call(&ops::INIT, json!({})).await
    }

    /// Index a file under `filename`
    pub async fn add_file(&self, filename: &str, file_path: &str) -> Result<Response> {
        self.manager
            .call(
                &ops::ADD_FILE,
                json!({ "filename": filename, "file_path": file_path }),
            )
            .await
    }

    /// Knowledge related to `query`, scoped to `filename`
    pub async fn retrieve_related_knowledge(&self, query: &str, filename: &str) -> Result<Response> {
        self.manager
            .call(
                &ops::RETRIEVE_RELATED_KNOWLEDGE,
                json!({ "query": query, "filename": filename }),
            )
            .await
    }
}

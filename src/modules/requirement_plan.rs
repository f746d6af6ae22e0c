//! Requirement plan documents and their sections

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub mod ops {
    use crate::protocol::{Operation, ResultField};

    const fn plan_op(action: &'static str) -> Operation {
        Operation::new("requirementPlanEvent", "requirementPlanResponse")
            .with_action(action)
            .with_result(ResultField::Payload)
    }

    pub const CREATE: Operation = plan_op("create");
    pub const GET: Operation = plan_op("get");
    pub const UPDATE: Operation = plan_op("update");
    pub const LIST: Operation = plan_op("list");
    pub const ADD_SECTION: Operation = plan_op("addSection");
    pub const UPDATE_SECTION: Operation = plan_op("updateSection");
    pub const REMOVE_SECTION: Operation = plan_op("removeSection");
    pub const REORDER_SECTIONS: Operation = plan_op("reorderSections");
    pub const REVIEW: Operation = plan_op("review");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionType {
    Markdown,
    SpecsLink,
    ActionplanLink,
    UiflowLink,
    CodeBlock,
}

/// One section of a plan document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_path: Option<String>,
}

pub struct RequirementPlanService {
    manager: Arc<MessageManager>,
}

impl RequirementPlanService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    pub async fn create(&self, file_name: &str) -> Result<Response> {
        self.manager
            .call(&ops::CREATE, json!({ "fileName": file_name }))
            .await
    }

    pub async fn get(&self, file_path: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET, json!({ "filePath": file_path }))
            .await
    }

    /// Replace the document; `content` is raw text or a structured document
    pub async fn update(&self, file_path: &str, content: Value) -> Result<Response> {
        self.manager
            .call(&ops::UPDATE, json!({ "filePath": file_path, "content": content }))
            .await
    }

    pub async fn list(&self) -> Result<Response> {
        self.manager.call(&ops::LIST, json!({})).await
    }

    /// Insert after `after_index`, or append when `None`
    pub async fn add_section(
        &self,
        file_path: &str,
        section: &PlanSection,
        after_index: Option<usize>,
    ) -> Result<Response> {
        let mut params = json!({ "filePath": file_path, "section": section });
        if let Some(index) = after_index {
            params["afterIndex"] = json!(index);
        }
        self.manager.call(&ops::ADD_SECTION, params).await
    }

    pub async fn update_section(
        &self,
        file_path: &str,
        section_id: &str,
        updates: Value,
    ) -> Result<Response> {
        self.manager
            .call(
                &ops::UPDATE_SECTION,
                json!({ "filePath": file_path, "sectionId": section_id, "updates": updates }),
            )
            .await
    }

    pub async fn remove_section(&self, file_path: &str, section_id: &str) -> Result<Response> {
        self.manager
            .call(
                &ops::REMOVE_SECTION,
                json!({ "filePath": file_path, "sectionId": section_id }),
            )
            .await
    }

    pub async fn reorder_sections(&self, file_path: &str, section_ids: &[String]) -> Result<Response> {
        self.manager
            .call(
                &ops::REORDER_SECTIONS,
                json!({ "filePath": file_path, "sectionIds": section_ids }),
            )
            .await
    }

    /// Submit the plan for review
    pub async fn review(&self, file_path: &str) -> Result<Response> {
        self.manager
            .call(&ops::REVIEW, json!({ "filePath": file_path }))
            .await
    }
}

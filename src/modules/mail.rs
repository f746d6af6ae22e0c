//! Agent mail: registry, threads, messages and advisory file reservations

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub mod ops {
    use crate::protocol::Operation;

    macro_rules! mail_op {
        ($name:ident, $wire:literal) => {
            pub const $name: Operation = Operation::new($wire, $wire);
        };
    }

    mail_op!(REGISTER_AGENT, "mail.registerAgent");
    mail_op!(LIST_AGENTS, "mail.listAgents");
    mail_op!(GET_AGENT, "mail.getAgent");
    mail_op!(CREATE_THREAD, "mail.createThread");
    mail_op!(FIND_OR_CREATE_THREAD, "mail.findOrCreateThread");
    mail_op!(LIST_THREADS, "mail.listThreads");
    mail_op!(GET_THREAD, "mail.getThread");
    mail_op!(UPDATE_THREAD_STATUS, "mail.updateThreadStatus");
    mail_op!(ARCHIVE_THREAD, "mail.archiveThread");
    mail_op!(FETCH_INBOX, "mail.fetchInbox");
    mail_op!(SEND_MESSAGE, "mail.sendMessage");
    mail_op!(REPLY_MESSAGE, "mail.replyMessage");
    mail_op!(GET_MESSAGE, "mail.getMessage");
    mail_op!(GET_MESSAGES, "mail.getMessages");
    mail_op!(MARK_READ, "mail.markRead");
    mail_op!(ACKNOWLEDGE, "mail.acknowledge");
    mail_op!(SEARCH, "mail.search");
    mail_op!(SUMMARIZE_THREAD, "mail.summarizeThread");
    mail_op!(RESERVE_FILES, "mail.reserveFiles");
    mail_op!(RELEASE_FILES, "mail.releaseFiles");
    mail_op!(FORCE_RESERVE_FILES, "mail.forceReserveFiles");
    mail_op!(LIST_RESERVATIONS, "mail.listReservations");
    mail_op!(CHECK_CONFLICTS, "mail.checkConflicts");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAgentParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadParams {
    pub subject: String,
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListThreadsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchInboxParams {
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageParams {
    pub sender_id: String,
    pub recipients: Vec<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMessageParams {
    pub message_id: String,
    pub sender_id: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Advisory reservation request (`reserveFiles` / `forceReserveFiles`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveFilesParams {
    pub agent_id: String,
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFilesParams {
    pub agent_id: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReservationsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConflictsParams {
    pub agent_id: String,
    pub files: Vec<String>,
}

/// A reservation record as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReservation {
    pub path: String,
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Mail service module
pub struct MailService {
    manager: Arc<MessageManager>,
}

impl MailService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    pub async fn register_agent(&self, params: &RegisterAgentParams) -> Result<Response> {
        self.manager.call(&ops::REGISTER_AGENT, params).await
    }

    pub async fn list_agents(&self) -> Result<Response> {
        self.manager.call(&ops::LIST_AGENTS, json!({})).await
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET_AGENT, json!({ "agentId": agent_id }))
            .await
    }

    pub async fn create_thread(&self, params: &CreateThreadParams) -> Result<Response> {
        self.manager.call(&ops::CREATE_THREAD, params).await
    }

    /// Return the thread with this subject and participants, creating it if needed
    pub async fn find_or_create_thread(&self, params: &CreateThreadParams) -> Result<Response> {
        self.manager.call(&ops::FIND_OR_CREATE_THREAD, params).await
    }

    pub async fn list_threads(&self, params: &ListThreadsParams) -> Result<Response> {
        self.manager.call(&ops::LIST_THREADS, params).await
    }

    pub async fn get_thread(&self, thread_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET_THREAD, json!({ "threadId": thread_id }))
            .await
    }

    pub async fn update_thread_status(&self, thread_id: &str, status: &str) -> Result<Response> {
        self.manager
            .call(
                &ops::UPDATE_THREAD_STATUS,
                json!({ "threadId": thread_id, "status": status }),
            )
            .await
    }

    pub async fn archive_thread(&self, thread_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::ARCHIVE_THREAD, json!({ "threadId": thread_id }))
            .await
    }

    pub async fn fetch_inbox(&self, params: &FetchInboxParams) -> Result<Response> {
        self.manager.call(&ops::FETCH_INBOX, params).await
    }

    pub async fn send_message(&self, params: &SendMessageParams) -> Result<Response> {
        self.manager.call(&ops::SEND_MESSAGE, params).await
    }

    pub async fn reply_message(&self, params: &ReplyMessageParams) -> Result<Response> {
        self.manager.call(&ops::REPLY_MESSAGE, params).await
    }

    pub async fn get_message(&self, message_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET_MESSAGE, json!({ "messageId": message_id }))
            .await
    }

    /// All messages of a thread
    pub async fn get_messages(&self, thread_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET_MESSAGES, json!({ "threadId": thread_id }))
            .await
    }

    pub async fn mark_read(&self, message_id: &str, agent_id: &str) -> Result<Response> {
        self.manager
            .call(
                &ops::MARK_READ,
                json!({ "messageId": message_id, "agentId": agent_id }),
            )
            .await
    }

    pub async fn acknowledge(&self, message_id: &str, agent_id: &str) -> Result<Response> {
        self.manager
            .call(
                &ops::ACKNOWLEDGE,
                json!({ "messageId": message_id, "agentId": agent_id }),
            )
            .await
    }

    pub async fn search(&self, params: &SearchParams) -> Result<Response> {
        self.manager.call(&ops::SEARCH, params).await
    }

    pub async fn summarize_thread(&self, thread_id: &str) -> Result<Response> {
        self.manager
            .call(&ops::SUMMARIZE_THREAD, json!({ "threadId": thread_id }))
            .await
    }

    /// Claim files for an agent; conflicts are reported, not enforced
    pub async fn reserve_files(&self, params: &ReserveFilesParams) -> Result<Response> {
        self.manager.call(&ops::RESERVE_FILES, params).await
    }

    pub async fn release_files(&self, params: &ReleaseFilesParams) -> Result<Response> {
        self.manager.call(&ops::RELEASE_FILES, params).await
    }

    /// Claim files even when another agent holds them
    pub async fn force_reserve_files(&self, params: &ReserveFilesParams) -> Result<Response> {
        self.manager.call(&ops::FORCE_RESERVE_FILES, params).await
    }

    pub async fn list_reservations(&self, params: &ListReservationsParams) -> Result<Response> {
        self.manager.call(&ops::LIST_RESERVATIONS, params).await
    }

    /// Read-only check of `files` against existing reservations
    pub async fn check_conflicts(&self, params: &CheckConflictsParams) -> Result<Response> {
        self.manager.call(&ops::CHECK_CONFLICTS, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::replying;

    #[tokio::test]
    async fn test_reserve_files_request_shape() {
        let (transport, manager) = replying("mail.reserveFiles", json!({"data": {"reserved": 1}}));
        let mail = MailService::new(manager);

        mail.reserve_files(&ReserveFilesParams {
            agent_id: "a1".into(),
            files: vec!["x.ts".into()],
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(transport.sent_count(), 1);
        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["type"], "mail.reserveFiles");
        assert_eq!(sent["params"], json!({"agentId": "a1", "files": ["x.ts"]}));
    }

    #[tokio::test]
    async fn test_request_ids_are_fresh() {
        let (transport, manager) = replying("mail.listAgents", json!({"data": {"agents": []}}));
        let mail = MailService::new(manager);

        mail.list_agents().await.unwrap();
        mail.list_agents().await.unwrap();

        let sent = transport.sent_messages();
        assert_ne!(sent[0]["requestId"], sent[1]["requestId"]);
    }

    #[tokio::test]
    async fn test_failure_passes_through() {
        let (_t, manager) = replying(
            "mail.getThread",
            json!({"success": false, "error": "thread not found"}),
        );
        let mail = MailService::new(manager);

        let response = mail.get_thread("t-404").await.unwrap();
        assert!(!response.is_success());
        assert_eq!(response.error_message().as_deref(), Some("thread not found"));
    }

    #[tokio::test]
    async fn test_id_only_operations() {
        let (transport, manager) = replying("mail.markRead", json!({}));
        let mail = MailService::new(manager);

        mail.mark_read("m1", "a1").await.unwrap();
        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["params"], json!({"messageId": "m1", "agentId": "a1"}));
    }

    #[test]
    fn test_reservation_record() {
        let record: FileReservation = serde_json::from_value(json!({
            "path": "src/lib.rs",
            "agentId": "a1",
            "expiresAt": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.agent_id, "a1");
        assert!(record.reason.is_none());
    }
}

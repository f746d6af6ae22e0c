//! Agent mail tools

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::modules::mail::{
    CheckConflictsParams, FetchInboxParams, ListReservationsParams, MailService,
    RegisterAgentParams, ReleaseFilesParams, ReserveFilesParams, SendMessageParams,
};
use crate::protocol::Response;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn data(response: &Response) -> Value {
    response.data.clone().unwrap_or(Value::Null)
}

fn count(value: &Value, key: &str) -> usize {
    value.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}

fn require_files(files: &[String]) -> Result<(), String> {
    if files.is_empty() {
        return Err("files must contain at least one path".to_string());
    }
    Ok(())
}

/// Register an agent with the mail system
pub struct MailRegisterAgentTool {
    mail: Arc<MailService>,
}

impl MailRegisterAgentTool {
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl DeclarativeTool for MailRegisterAgentTool {
    type Params = RegisterAgentParams;

    fn name(&self) -> &str {
        "mail_register_agent"
    }

    fn description(&self) -> &str {
        "Registers an agent with the mail system so it can send and receive messages."
    }

    fn kind(&self) -> Kind {
        Kind::Execute
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("name", "Agent name", true)
            .string("program", "Program the agent runs in", false)
            .string("model", "Model backing the agent", false)
            .string("taskDescription", "What the agent is working on", false)
    }

    async fn invoke(&self, params: RegisterAgentParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.mail.register_agent(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let agent = data(response);
                let id = agent
                    .pointer("/agent/id")
                    .or_else(|| agent.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                ToolResult::success(
                    format!("Registered agent '{}' with id {}.\n{}", params.name, id, pretty(&agent)),
                    format!("Registered {}", params.name),
                )
            },
        )
    }
}

/// Send a mail message
pub struct MailSendMessageTool {
    mail: Arc<MailService>,
}

impl MailSendMessageTool {
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl DeclarativeTool for MailSendMessageTool {
    type Params = SendMessageParams;

    fn name(&self) -> &str {
        "mail_send_message"
    }

    fn description(&self) -> &str {
        "Sends a message to one or more agents, optionally inside an existing thread."
    }

    fn kind(&self) -> Kind {
        Kind::Execute
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("senderId", "Sending agent id", true)
            .string_array("recipients", "Recipient agent ids", true)
            .string("body", "Message body", true)
            .string("subject", "Subject line", false)
            .string("threadId", "Existing thread to post into", false)
            .string_enum("importance", "Message importance", &["low", "normal", "high", "urgent"], false)
            .boolean("ackRequired", "Whether recipients must acknowledge", false)
    }

    fn validate(&self, params: &SendMessageParams) -> Result<(), String> {
        if params.recipients.is_empty() {
            return Err("recipients must contain at least one agent id".to_string());
        }
        Ok(())
    }

    async fn invoke(&self, params: SendMessageParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.mail.send_message(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let sent = data(response);
                let message_id = sent
                    .pointer("/message/id")
                    .or_else(|| sent.get("messageId"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                ToolResult::success(
                    format!(
                        "Message {} sent to {}.",
                        message_id,
                        params.recipients.join(", ")
                    ),
                    format!("Sent to {} recipient(s)", params.recipients.len()),
                )
            },
        )
    }
}

/// Read an agent's inbox
pub struct MailFetchInboxTool {
    mail: Arc<MailService>,
}

impl MailFetchInboxTool {
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl DeclarativeTool for MailFetchInboxTool {
    type Params = FetchInboxParams;

    fn name(&self) -> &str {
        "mail_fetch_inbox"
    }

    fn description(&self) -> &str {
        "Fetches messages addressed to an agent."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("agentId", "Agent whose inbox to read", true)
            .boolean("unreadOnly", "Only return unread messages", false)
            .integer("limit", "Maximum number of messages", false)
            .integer("offset", "Messages to skip", false)
    }

    async fn invoke(&self, params: FetchInboxParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.mail.fetch_inbox(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let inbox = data(response);
                let messages = count(&inbox, "messages");
                ToolResult::success(
                    format!("Inbox of {} holds {} message(s).\n{}", params.agent_id, messages, pretty(&inbox)),
                    format!("{} message(s)", messages),
                )
            },
        )
    }
}

/// Reserve files for exclusive editing
pub struct MailReserveFilesTool {
    mail: Arc<MailService>,
}

impl MailReserveFilesTool {
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl DeclarativeTool for MailReserveFilesTool {
    type Params = ReserveFilesParams;

    fn name(&self) -> &str {
        "mail_reserve_files"
    }

    fn description(&self) -> &str {
        "Reserves files for an agent so other agents know not to edit them. Reservations are advisory."
    }

    fn kind(&self) -> Kind {
        Kind::Edit
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("agentId", "Agent claiming the files", true)
            .string_array("files", "File paths to reserve", true)
            .string("reason", "Why the files are reserved", false)
            .integer("duration", "Reservation length in seconds", false)
    }

    fn validate(&self, params: &ReserveFilesParams) -> Result<(), String> {
        require_files(&params.files)
    }

    async fn invoke(&self, params: ReserveFilesParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.mail.reserve_files(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let result = data(response);
                let conflicts = count(&result, "conflicts");
                let mut content = format!(
                    "Reserved {} file(s) for {}.",
                    params.files.len(),
                    params.agent_id
                );
                if conflicts > 0 {
                    content.push_str(&format!(
                        "\nWarning: {} conflict(s) with existing reservations:\n{}",
                        conflicts,
                        pretty(&result["conflicts"])
                    ));
                }
                ToolResult::success(content, format!("Reserved {} file(s)", params.files.len()))
            },
        )
    }
}

/// Release reserved files
pub struct MailReleaseFilesTool {
    mail: Arc<MailService>,
}

impl MailReleaseFilesTool {
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl DeclarativeTool for MailReleaseFilesTool {
    type Params = ReleaseFilesParams;

    fn name(&self) -> &str {
        "mail_release_files"
    }

    fn description(&self) -> &str {
        "Releases file reservations held by an agent."
    }

    fn kind(&self) -> Kind {
        Kind::Edit
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("agentId", "Agent holding the reservations", true)
            .string_array("files", "File paths to release", true)
    }

    fn validate(&self, params: &ReleaseFilesParams) -> Result<(), String> {
        require_files(&params.files)
    }

    async fn invoke(&self, params: ReleaseFilesParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.mail.release_files(&params).await,
            ToolErrorType::ExecutionFailed,
            |_| {
                ToolResult::success(
                    format!("Released {} file(s) for {}.", params.files.len(), params.agent_id),
                    format!("Released {} file(s)", params.files.len()),
                )
            },
        )
    }
}

/// Check files against existing reservations
pub struct MailCheckConflictsTool {
    mail: Arc<MailService>,
}

impl MailCheckConflictsTool {
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl DeclarativeTool for MailCheckConflictsTool {
    type Params = CheckConflictsParams;

    fn name(&self) -> &str {
        "mail_check_conflicts"
    }

    fn description(&self) -> &str {
        "Checks whether files are reserved by other agents, without reserving them."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("agentId", "Agent that wants the files", true)
            .string_array("files", "File paths to check", true)
    }

    fn validate(&self, params: &CheckConflictsParams) -> Result<(), String> {
        require_files(&params.files)
    }

    async fn invoke(&self, params: CheckConflictsParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.mail.check_conflicts(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let result = data(response);
                let conflicts = count(&result, "conflicts");
                if conflicts == 0 {
                    return ToolResult::success("No conflicts found.", "No conflicts");
                }
                ToolResult::success(
                    format!("{} conflict(s) found:\n{}", conflicts, pretty(&result["conflicts"])),
                    format!("{} conflict(s)", conflicts),
                )
            },
        )
    }
}

/// List active reservations
pub struct MailListReservationsTool {
    mail: Arc<MailService>,
}

impl MailListReservationsTool {
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl DeclarativeTool for MailListReservationsTool {
    type Params = ListReservationsParams;

    fn name(&self) -> &str {
        "mail_list_reservations"
    }

    fn description(&self) -> &str {
        "Lists active file reservations, optionally filtered by agent or path."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("agentId", "Only reservations held by this agent", false)
            .string("path", "Only reservations covering this path", false)
    }

    async fn invoke(&self, params: ListReservationsParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.mail.list_reservations(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let result = data(response);
                let reservations = count(&result, "reservations");
                ToolResult::success(
                    format!("{} active reservation(s).\n{}", reservations, pretty(&result)),
                    format!("{} reservation(s)", reservations),
                )
            },
        )
    }
}

//! Client facade: one connection, every domain module

use crate::config::ClientConfig;
use crate::error::Result;
use crate::manager::MessageManager;
use crate::modules::{
    AgentEventQueue, AgentService, BackgroundChildThreads, BrowserService, ContextRuleEngine,
    CrawlerService, GitService, MailService, RagService, RequirementPlanService,
    ReviewMergeRequestService, SearchService, TaskService,
};
use crate::tools::ToolRegistry;
use crate::transport::{Transport, WebSocketTransport};
use std::sync::Arc;

/// Connected SDK client
///
/// Modules share one [`MessageManager`]; handles returned by the accessors
/// are cheap to clone and can outlive the borrow of the client.
pub struct CodeboltClient {
    config: ClientConfig,
    manager: Arc<MessageManager>,
    event_queue: Arc<AgentEventQueue>,
    background_threads: Arc<BackgroundChildThreads>,
    mail: Arc<MailService>,
    context_rules: Arc<ContextRuleEngine>,
    requirement_plans: Arc<RequirementPlanService>,
    review_requests: Arc<ReviewMergeRequestService>,
    crawler: Arc<CrawlerService>,
    git: Arc<GitService>,
    browser: Arc<BrowserService>,
    tasks: Arc<TaskService>,
    agents: Arc<AgentService>,
    rag: Arc<RagService>,
    search: Arc<SearchService>,
}

impl CodeboltClient {
    /// Open a WebSocket connection to `config.url`
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let transport = WebSocketTransport::connect(&config).await?;
        Self::with_transport(Arc::new(transport), config)
    }

    /// Build a client over an existing transport
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let manager = Arc::new(MessageManager::new(transport, &config)?);

        let client = Self {
            event_queue: Arc::new(AgentEventQueue::new(manager.clone(), &config)),
            background_threads: Arc::new(BackgroundChildThreads::new(&manager, &config)),
            mail: Arc::new(MailService::new(manager.clone())),
            context_rules: Arc::new(ContextRuleEngine::new(manager.clone())),
            requirement_plans: Arc::new(RequirementPlanService::new(manager.clone())),
            review_requests: Arc::new(ReviewMergeRequestService::new(manager.clone())),
            crawler: Arc::new(CrawlerService::new(manager.clone())),
            git: Arc::new(GitService::new(manager.clone())),
            browser: Arc::new(BrowserService::new(manager.clone())),
            tasks: Arc::new(TaskService::new(manager.clone())),
            agents: Arc::new(AgentService::new(manager.clone())),
            rag: Arc::new(RagService::new(manager.clone())),
            search: Arc::new(SearchService::new(manager.clone())),
            manager,
            config,
        };

        tracing::info!(url = %client.config.url, "Codebolt client ready");
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The shared correlator, for operations no module wraps
    pub fn manager(&self) -> &Arc<MessageManager> {
        &self.manager
    }

    pub fn event_queue(&self) -> &Arc<AgentEventQueue> {
        &self.event_queue
    }

    pub fn background_threads(&self) -> &Arc<BackgroundChildThreads> {
        &self.background_threads
    }

    pub fn mail(&self) -> &Arc<MailService> {
        &self.mail
    }

    pub fn context_rules(&self) -> &Arc<ContextRuleEngine> {
        &self.context_rules
    }

    pub fn requirement_plans(&self) -> &Arc<RequirementPlanService> {
        &self.requirement_plans
    }

    pub fn review_requests(&self) -> &Arc<ReviewMergeRequestService> {
        &self.review_requests
    }

    pub fn crawler(&self) -> &Arc<CrawlerService> {
        &self.crawler
    }

    pub fn git(&self) -> &Arc<GitService> {
        &self.git
    }

    pub fn browser(&self) -> &Arc<BrowserService> {
        &self.browser
    }

    pub fn tasks(&self) -> &Arc<TaskService> {
        &self.tasks
    }

    pub fn agents(&self) -> &Arc<AgentService> {
        &self.agents
    }

    pub fn rag(&self) -> &Arc<RagService> {
        &self.rag
    }

    pub fn search(&self) -> &Arc<SearchService> {
        &self.search
    }

    /// Registry holding every built-in tool, bound to this client
    pub fn tool_registry(&self) -> ToolRegistry {
        crate::tools::builtin_registry(self)
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Close the connection; outstanding calls fail with `Disconnected`
    pub async fn close(&self) -> Result<()> {
        tracing::info!(url = %self.config.url, "Closing Codebolt client");
        self.manager.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::transport::MemoryTransport;

    #[tokio::test]
    async fn test_with_transport_rejects_invalid_config() {
        let transport = Arc::new(MemoryTransport::new());
        let config = ClientConfig::default().with_event_cache_capacity(0);
        let result = CodeboltClient::with_transport(transport, config);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_transport_inbound_owned_once() {
        let transport = Arc::new(MemoryTransport::new());
        let _first = CodeboltClient::with_transport(transport.clone(), ClientConfig::default()).unwrap();
        let second = CodeboltClient::with_transport(transport, ClientConfig::default());
        assert!(matches!(second, Err(ClientError::Connection(_))));
    }

    #[tokio::test]
    async fn test_close_disconnects() {
        let transport = Arc::new(MemoryTransport::new());
        let client = CodeboltClient::with_transport(transport, ClientConfig::default()).unwrap();
        assert!(client.is_connected());

        client.close().await.unwrap();
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_registry_has_every_tool() {
        let transport = Arc::new(MemoryTransport::new());
        let client = CodeboltClient::with_transport(transport, ClientConfig::default()).unwrap();
        let registry = client.tool_registry();

        assert!(registry.contains("eventqueue_add_event"));
        assert!(registry.contains("git_action"));
        assert!(registry.contains("browser_action"));
        assert!(registry.contains("mail_reserve_files"));
        assert_eq!(registry.len(), registry.definitions().len());
    }
}

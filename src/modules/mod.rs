//! Domain modules, one per backend service
//!
//! Each module holds a shared [`MessageManager`](crate::manager::MessageManager)
//! and a routing table (`ops`) with one [`Operation`](crate::protocol::Operation)
//! per backend call. Calls return the backend's [`Response`](crate::protocol::Response)
//! unchanged; only the event queue and the background thread tracker keep
//! client-side state.

pub mod agent;
pub mod agent_event_queue;
pub mod background_child_threads;
pub mod browser;
pub mod context_rule_engine;
pub mod crawler;
pub mod git;
pub mod mail;
pub mod rag;
mod recent_ids;
pub mod requirement_plan;
pub mod review_merge_request;
pub mod search;
pub mod task;

pub use agent::AgentService;
pub use agent_event_queue::AgentEventQueue;
pub use background_child_threads::BackgroundChildThreads;
pub use browser::BrowserService;
pub use context_rule_engine::ContextRuleEngine;
pub use crawler::CrawlerService;
pub use git::GitService;
pub use mail::MailService;
pub use rag::RagService;
pub use requirement_plan::RequirementPlanService;
pub use review_merge_request::ReviewMergeRequestService;
pub use search::SearchService;
pub use task::TaskService;

//! Web search

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde_json::json;
use std::sync::Arc;

pub mod ops {
    use crate::protocol::{BodyStyle, Operation};

    const fn search_op(action: &'static str, reply: &'static str) -> Operation {
        Operation::new("searchEvent", reply)
            .with_action(action)
            .with_body(BodyStyle::Inline)
    }

    pub const INIT: Operation = search_op("init", "searchInitResponse");
    pub const SEARCH: Operation = search_op("search", "searchResponse");
    pub const GET_FIRST_LINK: Operation = search_op("getFirstLink", "getFirstLinkResponse");
}

pub struct SearchService {
    manager: Arc<MessageManager>,
}

impl SearchService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    /// Select the search engine, `bing` when `None`
    pub async fn init(&self, engine: Option<&str>) -> Result<Response> {
        self.manager
            .call(&ops::INIT, json!({ "engine": engine.unwrap_or("bing") }))
            .await
    }

    pub async fn search(&self, query: &str) -> Result<Response> {
        self.manager.call(&ops::SEARCH, json!({ "query": query })).await
    }

    pub async fn get_first_link(&self, query: &str) -> Result<Response> {
        self.manager
            .call(&ops::GET_FIRST_LINK, json!({ "query": query }))
            .await
    }
}

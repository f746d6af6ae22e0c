//! Headless crawler control

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde_json::json;
use std::sync::Arc;

pub mod ops {
    use crate::protocol::{BodyStyle, Operation, ResultField};

    const fn crawler_op(action: &'static str) -> Operation {
        Operation::new("crawlerEvent", "crawlResponse")
            .with_action(action)
            .with_body(BodyStyle::Inline)
            .with_result(ResultField::Payload)
    }

    pub const START: Operation = crawler_op("start");
    pub const SCREENSHOT: Operation = crawler_op("screenshot");
    pub const GO_TO_PAGE: Operation = crawler_op("goToPage");
    pub const SCROLL: Operation = crawler_op("scroll");
    pub const CLICK: Operation = crawler_op("click");
}

pub struct CrawlerService {
    manager: Arc<MessageManager>,
}

impl CrawlerService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    pub async fn start(&self) -> Result<Response> {
        self.manager.call(&ops::START, json!({})).await
    }

    pub async fn screenshot(&self) -> Result<Response> {
        self.manager.call(&ops::SCREENSHOT, json!({})).await
    }

    pub async fn go_to_page(&self, url: &str) -> Result<Response> {
        self.manager.call(&ops::GO_TO_PAGE, json!({ "url": url })).await
    }

    /// `direction` is `up`, `down`, `left` or `right`
    pub async fn scroll(&self, direction: &str) -> Result<Response> {
        self.manager
            .call(&ops::SCROLL, json!({ "direction": direction }))
            .await
    }

    /// Click the element the crawler labelled `id`
    pub async fn click(&self, id: &str) -> Result<Response> {
        self.manager.call(&ops::CLICK, json!({ "id": id })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::replying;

    #[tokio::test]
    async fn test_inline_body() {
        let (transport, manager) = replying("crawlResponse", json!({"payload": {"ok": true}}));
        let crawler = CrawlerService::new(manager);

        let response = crawler.go_to_page("https://example.com").await.unwrap();
        assert_eq!(response.payload.unwrap()["ok"], true);

        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["type"], "crawlerEvent");
        assert_eq!(sent["action"], "goToPage");
        assert_eq!(sent["url"], "https://example.com");
        assert!(sent.get("params").is_none());
    }
}

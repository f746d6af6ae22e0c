//! Browser automation
//!
//! Every action targets the backend's current page unless a new one is
//! opened with `new_page`.

use crate::error::Result;
use crate::manager::MessageManager;
use crate::protocol::Response;
use serde_json::json;
use std::sync::Arc;

pub mod ops {
    use crate::protocol::{BodyStyle, Operation, ResultField};

    macro_rules! browser_op {
        ($name:ident, $action:literal) => {
            pub const $name: Operation = Operation::new("browserEvent", concat!($action, "Response"))
                .with_action($action)
                .with_body(BodyStyle::Inline)
                .with_result(ResultField::Payload);
        };
    }

    browser_op!(NEW_PAGE, "newPage");
    browser_op!(GET_URL, "getUrl");
    browser_op!(GO_TO_PAGE, "goToPage");
    browser_op!(SCREENSHOT, "screenshot");
    browser_op!(GET_HTML, "getHTML");
    browser_op!(GET_MARKDOWN, "getMarkDown");
    browser_op!(GET_CONTENT, "getContent");
    browser_op!(GET_SNAPSHOT, "getSnapShot");
    browser_op!(GET_BROWSER_INFO, "getBrowserInfo");
    browser_op!(EXTRACT_TEXT, "extractText");
    browser_op!(CLICK, "click");
    browser_op!(TYPE, "type");
    browser_op!(SCROLL, "scroll");
    browser_op!(ENTER, "enter");
    browser_op!(SEARCH, "search");
    browser_op!(CLOSE, "close");
}

pub struct BrowserService {
    manager: Arc<MessageManager>,
}

impl BrowserService {
    pub fn new(manager: Arc<MessageManager>) -> Self {
        Self { manager }
    }

    pub async fn new_page(&self) -> Result<Response> {
        self.manager.call(&ops::NEW_PAGE, json!({})).await
    }

    pub async fn get_url(&self) -> Result<Response> {
        self.manager.call(&ops::GET_URL, json!({})).await
    }

    pub async fn go_to_page(&self, url: &str) -> Result<Response> {
        self.manager.call(&ops::GO_TO_PAGE, json!({ "url": url })).await
    }

    pub async fn screenshot(&self, full_page: bool) -> Result<Response> {
        self.manager
            .call(&ops::SCREENSHOT, json!({ "fullPage": full_page }))
            .await
    }

    pub async fn get_html(&self) -> Result<Response> {
        self.manager.call(&ops::GET_HTML, json!({})).await
    }

    pub async fn get_markdown(&self) -> Result<Response> {
        self.manager.call(&ops::GET_MARKDOWN, json!({})).await
    }

    pub async fn get_content(&self) -> Result<Response> {
        self.manager.call(&ops::GET_CONTENT, json!({})).await
    }

    /// Accessibility-tree snapshot of the page
    pub async fn get_snapshot(&self) -> Result<Response> {
        self.manager.call(&ops::GET_SNAPSHOT, json!({})).await
    }

    /// Viewport, scroll position and page metadata
    pub async fn get_browser_info(&self) -> Result<Response> {
        self.manager.call(&ops::GET_BROWSER_INFO, json!({})).await
    }

    pub async fn extract_text(&self) -> Result<Response> {
        self.manager.call(&ops::EXTRACT_TEXT, json!({})).await
    }

    pub async fn click(&self, selector: &str) -> Result<Response> {
        self.manager
            .call(&ops::CLICK, json!({ "selector": selector }))
            .await
    }

    pub async fn type_text(&self, selector: &str, text: &str) -> Result<Response> {
        self.manager
            .call(&ops::TYPE, json!({ "selector": selector, "text": text }))
            .await
    }

    pub async fn scroll(&self, direction: &str, pixels: Option<u32>) -> Result<Response> {
        let mut body = json!({ "direction": direction });
        if let Some(pixels) = pixels {
            body["pixels"] = json!(pixels);
        }
        self.manager.call(&ops::SCROLL, body).await
    }

    /// Press Enter in the focused element
    pub async fn enter(&self) -> Result<Response> {
        self.manager.call(&ops::ENTER, json!({})).await
    }

    /// Type `query` into `selector` and submit
    pub async fn search(&self, selector: &str, query: &str) -> Result<Response> {
        self.manager
            .call(&ops::SEARCH, json!({ "selector": selector, "query": query }))
            .await
    }

    pub async fn close(&self) -> Result<Response> {
        self.manager.call(&ops::CLOSE, json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::replying;

    #[tokio::test]
    async fn test_type_text_request() {
        let (transport, manager) = replying("typeResponse", json!({"payload": {"typed": true}}));
        let browser = BrowserService::new(manager);

        let response = browser.type_text("#q", "rust").await.unwrap();
        assert_eq!(response.payload.unwrap()["typed"], true);

        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["type"], "browserEvent");
        assert_eq!(sent["action"], "type");
        assert_eq!(sent["selector"], "#q");
        assert_eq!(sent["text"], "rust");
    }

    #[test]
    fn test_reply_type_follows_action() {
        assert_eq!(ops::GET_HTML.response_type, "getHTMLResponse");
        assert_eq!(ops::GET_MARKDOWN.response_type, "getMarkDownResponse");
        assert_eq!(ops::NEW_PAGE.response_type, "newPageResponse");
    }
}

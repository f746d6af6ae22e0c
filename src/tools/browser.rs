//! Browser automation tool

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::error::Result;
use crate::modules::browser::BrowserService;
use crate::protocol::{Response, ResultField};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ACTIONS: &[&str] = &[
    "newPage",
    "getUrl",
    "goToPage",
    "screenshot",
    "getHtml",
    "getMarkdown",
    "getContent",
    "getSnapshot",
    "getBrowserInfo",
    "extractText",
    "click",
    "type",
    "scroll",
    "enter",
    "search",
    "close",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BrowserAction {
    NewPage,
    GetUrl,
    GoToPage,
    Screenshot,
    GetHtml,
    GetMarkdown,
    GetContent,
    GetSnapshot,
    GetBrowserInfo,
    ExtractText,
    Click,
    Type,
    Scroll,
    Enter,
    Search,
    Close,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserParams {
    action: BrowserAction,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    pixels: Option<u32>,
    #[serde(default)]
    full_page: bool,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Render a payload for the model: plain text when the backend sent text
fn page_output(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Object(map) => ["content", "text", "markdown", "html", "url"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| pretty(payload)),
        other => pretty(other),
    }
}

/// Drive the backend's browser session
pub struct BrowserActionTool {
    browser: Arc<BrowserService>,
}

impl BrowserActionTool {
    pub fn new(browser: Arc<BrowserService>) -> Self {
        Self { browser }
    }

    async fn run(&self, params: &BrowserParams) -> Result<Response> {
        let text = |value: &Option<String>| present(value).unwrap_or_default().to_string();
        let browser = &self.browser;
        match params.action {
            BrowserAction::NewPage => browser.new_page().await,
            BrowserAction::GetUrl => browser.get_url().await,
            BrowserAction::GoToPage => browser.go_to_page(&text(&params.url)).await,
            BrowserAction::Screenshot => browser.screenshot(params.full_page).await,
            BrowserAction::GetHtml => browser.get_html().await,
            BrowserAction::GetMarkdown => browser.get_markdown().await,
            BrowserAction::GetContent => browser.get_content().await,
            BrowserAction::GetSnapshot => browser.get_snapshot().await,
            BrowserAction::GetBrowserInfo => browser.get_browser_info().await,
            BrowserAction::ExtractText => browser.extract_text().await,
            BrowserAction::Click => browser.click(&text(&params.selector)).await,
            BrowserAction::Type => {
                browser
                    .type_text(&text(&params.selector), &text(&params.text))
                    .await
            }
            BrowserAction::Scroll => {
                let direction = present(&params.direction).unwrap_or("down");
                browser.scroll(direction, params.pixels).await
            }
            BrowserAction::Enter => browser.enter().await,
            BrowserAction::Search => {
                browser
                    .search(&text(&params.selector), &text(&params.query))
                    .await
            }
            BrowserAction::Close => browser.close().await,
        }
    }
}

#[async_trait]
impl DeclarativeTool for BrowserActionTool {
    type Params = BrowserParams;

    fn name(&self) -> &str {
        "browser_action"
    }

    fn description(&self) -> &str {
        "Controls the browser: navigate, read page content, take screenshots, click, type and scroll."
    }

    fn kind(&self) -> Kind {
        Kind::Fetch
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string_enum("action", "Browser action to perform", ACTIONS, true)
            .string("url", "URL to open (goToPage)", false)
            .string("selector", "CSS selector of the target element (click, type, search)", false)
            .string("text", "Text to type (type)", false)
            .string("query", "Search query (search)", false)
            .string_enum("direction", "Scroll direction (scroll)", &["up", "down", "left", "right"], false)
            .integer("pixels", "Scroll distance in pixels (scroll)", false)
            .boolean("fullPage", "Capture the whole page (screenshot)", false)
    }

    fn validate(&self, params: &BrowserParams) -> std::result::Result<(), String> {
        let action = ACTIONS[params.action as usize];
        let missing = |name: &str| -> std::result::Result<(), String> {
            Err(format!("'{}' is required for the {} action", name, action))
        };
        match params.action {
            BrowserAction::GoToPage if present(&params.url).is_none() => missing("url"),
            BrowserAction::Click if present(&params.selector).is_none() => missing("selector"),
            BrowserAction::Type if present(&params.selector).is_none() => missing("selector"),
            BrowserAction::Type if params.text.is_none() => missing("text"),
            BrowserAction::Search if present(&params.selector).is_none() => missing("selector"),
            BrowserAction::Search if present(&params.query).is_none() => missing("query"),
            _ => Ok(()),
        }
    }

    async fn invoke(&self, params: BrowserParams, _cancel: &CancellationToken) -> ToolResult {
        let action = ACTIONS[params.action as usize];
        outcome(
            self.run(&params).await,
            ToolErrorType::BrowserExecutionError,
            |response| match response.result(ResultField::Payload) {
                Some(payload) if !payload.is_null() => ToolResult::success(
                    page_output(&payload),
                    format!("Browser {} completed", action),
                ),
                _ => ToolResult::success(
                    format!("Browser {} completed.", action),
                    format!("Browser {} completed", action),
                ),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::replying;
    use crate::tools::Tool;
    use crate::transport::MemoryTransport;
    use serde_json::json;

    fn tool(reply: &'static str, body: Value) -> (Arc<MemoryTransport>, BrowserActionTool) {
        let (transport, manager) = replying(reply, body);
        (transport, BrowserActionTool::new(Arc::new(BrowserService::new(manager))))
    }

    #[tokio::test]
    async fn test_go_to_page_requires_url() {
        let (transport, tool) = tool("goToPageResponse", json!({}));
        let result = tool
            .execute(&json!({"action": "goToPage"}), &CancellationToken::new())
            .await;
        assert_eq!(result.error_type(), Some(ToolErrorType::InvalidToolParams));
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_type_requires_text() {
        let (transport, tool) = tool("typeResponse", json!({}));
        let result = tool
            .execute(&json!({"action": "type", "selector": "#q"}), &CancellationToken::new())
            .await;
        assert!(result.error.unwrap().message.contains("text"));
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_markdown_payload_rendered_as_text() {
        let (transport, tool) = tool(
            "getMarkDownResponse",
            json!({"payload": {"content": "# Title"}}),
        );
        let result = tool
            .execute(&json!({"action": "getMarkdown"}), &CancellationToken::new())
            .await;

        assert_eq!(result.llm_content, "# Title");
        let sent = transport.last_sent().unwrap();
        assert_eq!(sent["type"], "browserEvent");
        assert_eq!(sent["action"], "getMarkDown");
    }

    #[tokio::test]
    async fn test_failure_is_browser_error() {
        let (_transport, tool) = tool("clickResponse", json!({"success": false, "error": "boom"}));
        let result = tool
            .execute(&json!({"action": "click", "selector": "#go"}), &CancellationToken::new())
            .await;
        let error = result.error.unwrap();
        assert_eq!(error.error_type, ToolErrorType::BrowserExecutionError);
        assert_eq!(error.message, "boom");
    }

    #[test]
    fn test_action_names_line_up() {
        for (index, name) in ACTIONS.iter().enumerate() {
            let action: BrowserAction = serde_json::from_value(json!(name)).unwrap();
            assert_eq!(action as usize, index);
        }
    }
}

//! Crawler tool

use super::{outcome, pretty, DeclarativeTool, Kind, ParameterSchema, ToolErrorType, ToolResult};
use crate::error::Result;
use crate::modules::crawler::CrawlerService;
use crate::protocol::{Response, ResultField};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ACTIONS: &[&str] = &["start", "screenshot", "goToPage", "scroll", "click"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrawlerAction {
    Start,
    Screenshot,
    GoToPage,
    Scroll,
    Click,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerParams {
    action: CrawlerAction,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    element_id: Option<String>,
}

/// Drive the headless crawler
pub struct CrawlerActionTool {
    crawler: Arc<CrawlerService>,
}

impl CrawlerActionTool {
    pub fn new(crawler: Arc<CrawlerService>) -> Self {
        Self { crawler }
    }

    async fn run(&self, params: &CrawlerParams) -> Result<Response> {
        match params.action {
            CrawlerAction::Start => self.crawler.start().await,
            CrawlerAction::Screenshot => self.crawler.screenshot().await,
            CrawlerAction::GoToPage => {
                self.crawler
                    .go_to_page(params.url.as_deref().unwrap_or_default())
                    .await
            }
            CrawlerAction::Scroll => {
                self.crawler
                    .scroll(params.direction.as_deref().unwrap_or("down"))
                    .await
            }
            CrawlerAction::Click => {
                self.crawler
                    .click(params.element_id.as_deref().unwrap_or_default())
                    .await
            }
        }
    }
}

#[async_trait]
impl DeclarativeTool for CrawlerActionTool {
    type Params = CrawlerParams;

    fn name(&self) -> &str {
        "crawler_action"
    }

    fn description(&self) -> &str {
        "Controls the headless crawler: start it, open a URL, scroll, click a labelled element or take a screenshot."
    }

    fn kind(&self) -> Kind {
        Kind::Fetch
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string_enum("action", "Crawler action to perform", ACTIONS, true)
            .string("url", "URL to open (goToPage)", false)
            .string_enum("direction", "Scroll direction (scroll)", &["up", "down", "left", "right"], false)
            .string("elementId", "Label of the element to click (click)", false)
    }

    fn validate(&self, params: &CrawlerParams) -> std::result::Result<(), String> {
        let blank = |value: &Option<String>| value.as_deref().map_or(true, str::is_empty);
        match params.action {
            CrawlerAction::GoToPage if blank(&params.url) => {
                Err("'url' is required for the goToPage action".to_string())
            }
            CrawlerAction::Click if blank(&params.element_id) => {
                Err("'elementId' is required for the click action".to_string())
            }
            _ => Ok(()),
        }
    }

    async fn invoke(&self, params: CrawlerParams, _cancel: &CancellationToken) -> ToolResult {
        let action = ACTIONS[params.action as usize];
        outcome(
            self.run(&params).await,
            ToolErrorType::BrowserExecutionError,
            |response| {
                let mut content = format!("Crawler {} completed.", action);
                if let Some(payload) = response.result(ResultField::Payload) {
                    content.push('\n');
                    content.push_str(&pretty(&payload));
                }
                ToolResult::success(content, format!("Crawler {} completed", action))
            },
        )
    }
}

//! Browser surfaces the coordinator drives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snauth_core_types::{FrameType, LoadStatus, TabId};
use thiserror::Error;
use url::form_urlencoded;

use crate::config::CoordinatorConfig;

/// Failures reported by the browser surfaces. All of them are recovered per tab.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("tab {0} not found")]
    TabNotFound(TabId),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("prompt unavailable: {0}")]
    PromptUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: Option<String>,
}

/// Tab query and navigation surface.
#[async_trait]
pub trait TabControl: Send + Sync {
    async fn get_tab(&self, tab: TabId) -> Result<TabInfo, PortError>;
    async fn update_tab(&self, tab: TabId, url: &str) -> Result<(), PortError>;
}

/// Launches the decision prompt. The prompt answers later through a runtime message.
#[async_trait]
pub trait PromptLauncher: Send + Sync {
    async fn open_prompt(&self, request: PromptRequest) -> Result<(), PortError>;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptRequest {
    pub tab: TabId,
    pub instance: String,
    /// Extension-relative page carrying the tab and instance as query parameters.
    pub page_url: String,
    pub width: u32,
    pub height: u32,
}

impl PromptRequest {
    pub fn new(tab: TabId, instance: &str, config: &CoordinatorConfig) -> Self {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("tabId", &tab.to_string())
            .append_pair("instance", instance)
            .finish();
        Self {
            tab,
            instance: instance.to_string(),
            page_url: format!("prompt.html?{query}"),
            width: config.prompt_width,
            height: config.prompt_height,
        }
    }
}

/// A request as seen by the blocking interception hook.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestDetails {
    pub tab: TabId,
    pub url: String,
    pub frame_type: FrameType,
}

impl RequestDetails {
    pub fn main_frame(tab: TabId, url: impl Into<String>) -> Self {
        Self {
            tab,
            url: url.into(),
            frame_type: FrameType::MainFrame,
        }
    }
}

/// Synchronous answer to the interception hook.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockingResponse {
    pub cancel: bool,
}

impl BlockingResponse {
    pub const fn allow() -> Self {
        Self { cancel: false }
    }

    pub const fn cancel() -> Self {
        Self { cancel: true }
    }
}

/// Tab lifecycle notifications fanned out to login monitors.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TabEvent {
    Updated {
        tab: TabId,
        status: Option<LoadStatus>,
        url: Option<String>,
    },
    Removed {
        tab: TabId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_url_encodes_instance() {
        let request = PromptRequest::new(
            TabId(12),
            "foo bar.service-now.com",
            &CoordinatorConfig::default(),
        );
        assert_eq!(
            request.page_url,
            "prompt.html?tabId=12&instance=foo+bar.service-now.com"
        );
        assert_eq!((request.width, request.height), (500, 400));
    }
}

//! In-memory browser used by tests and the scenario simulator.
//!
//! Navigations only move the recorded tab URL; nothing is fed back into the coordinator. Callers
//! replay the resulting requests and status updates themselves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use serde::Serialize;
use snauth_core_types::TabId;

use crate::ports::{PortError, PromptLauncher, PromptRequest, TabControl, TabInfo};

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Navigation {
    pub tab: TabId,
    pub url: String,
}

#[derive(Default)]
pub struct InMemoryBrowser {
    tabs: DashMap<TabId, Option<String>>,
    navigations: Mutex<Vec<Navigation>>,
    prompts: Mutex<Vec<PromptRequest>>,
    failing_lookups: DashSet<TabId>,
    failing_updates: Mutex<HashMap<TabId, usize>>,
    prompts_unavailable: AtomicBool,
    lookup_delay_ms: AtomicU64,
}

impl InMemoryBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open_tab(&self, tab: TabId, url: impl Into<String>) {
        self.tabs.insert(tab, Some(url.into()));
    }

    /// A tab that exists but has not committed any URL yet.
    pub fn open_empty_tab(&self, tab: TabId) {
        self.tabs.insert(tab, None);
    }

    pub fn close_tab(&self, tab: TabId) {
        self.tabs.remove(&tab);
    }

    pub fn tab_url(&self, tab: TabId) -> Option<String> {
        self.tabs.get(&tab).and_then(|entry| entry.value().clone())
    }

    pub fn navigations(&self) -> Vec<Navigation> {
        self.navigations.lock().clone()
    }

    pub fn navigations_for(&self, tab: TabId) -> Vec<String> {
        self.navigations
            .lock()
            .iter()
            .filter(|nav| nav.tab == tab)
            .map(|nav| nav.url.clone())
            .collect()
    }

    pub fn prompts(&self) -> Vec<PromptRequest> {
        self.prompts.lock().clone()
    }

    pub fn fail_lookups_for(&self, tab: TabId) {
        self.failing_lookups.insert(tab);
    }

    /// Make the next `count` navigations of `tab` fail.
    pub fn fail_next_updates(&self, tab: TabId, count: usize) {
        *self.failing_updates.lock().entry(tab).or_insert(0) += count;
    }

    pub fn set_prompts_unavailable(&self, unavailable: bool) {
        self.prompts_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_lookup_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.lookup_delay_ms.store(millis, Ordering::SeqCst);
    }

    fn take_update_failure(&self, tab: TabId) -> bool {
        let mut failing = self.failing_updates.lock();
        match failing.get_mut(&tab) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl TabControl for InMemoryBrowser {
    async fn get_tab(&self, tab: TabId) -> Result<TabInfo, PortError> {
        let delay = self.lookup_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing_lookups.contains(&tab) {
            return Err(PortError::Internal(format!("lookup of tab {tab} failed")));
        }
        let url = self
            .tabs
            .get(&tab)
            .map(|entry| entry.value().clone())
            .ok_or(PortError::TabNotFound(tab))?;
        Ok(TabInfo { id: tab, url })
    }

    async fn update_tab(&self, tab: TabId, url: &str) -> Result<(), PortError> {
        if self.take_update_failure(tab) {
            return Err(PortError::Navigation(format!("navigation to {url} aborted")));
        }
        let mut entry = self.tabs.get_mut(&tab).ok_or(PortError::TabNotFound(tab))?;
        *entry.value_mut() = Some(url.to_string());
        drop(entry);
        self.navigations.lock().push(Navigation {
            tab,
            url: url.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl PromptLauncher for InMemoryBrowser {
    async fn open_prompt(&self, request: PromptRequest) -> Result<(), PortError> {
        if self.prompts_unavailable.load(Ordering::SeqCst) {
            return Err(PortError::PromptUnavailable(
                "window creation refused".to_string(),
            ));
        }
        self.prompts.lock().push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_failures_are_consumed_in_order() {
        let browser = InMemoryBrowser::new();
        let tab = TabId(1);
        browser.open_tab(tab, "https://foo.service-now.com/home.do");
        browser.fail_next_updates(tab, 1);

        assert!(browser.update_tab(tab, "https://a/").await.is_err());
        browser.update_tab(tab, "https://b/").await.unwrap();
        assert_eq!(browser.navigations_for(tab), vec!["https://b/".to_string()]);
        assert_eq!(browser.tab_url(tab).as_deref(), Some("https://b/"));
    }

    #[test]
    fn oversized_lookup_delay_saturates() {
        let browser = InMemoryBrowser::new();
        browser.set_lookup_delay(Duration::MAX);
        assert_eq!(browser.lookup_delay_ms.load(Ordering::SeqCst), u64::MAX);
    }

    #[tokio::test]
    async fn closed_tabs_are_not_found() {
        let browser = InMemoryBrowser::new();
        browser.open_tab(TabId(2), "https://x/");
        browser.close_tab(TabId(2));
        assert_eq!(
            browser.get_tab(TabId(2)).await,
            Err(PortError::TabNotFound(TabId(2)))
        );
    }
}

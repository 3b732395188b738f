#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use snauth_coordinator::memory::InMemoryBrowser;
use snauth_coordinator::{Coordinator, CoordinatorConfig, CoordinatorEvent, RequestDetails};
use snauth_core_types::{LoadStatus, TabId};
use snauth_navigation::InstanceRegistry;
use tokio::sync::broadcast;
use tokio::time::timeout;

pub const INSTANCE: &str = "foo.service-now.com";
pub const ORIGINAL: &str = "https://foo.service-now.com/incident.do?sys_id=42";
pub const REDIRECT: &str = "https://foo.service-now.com/oauth_redirect.do";
pub const SSO: &str = "https://foo.service-now.com/sso.do";
pub const LOGIN: &str = "https://foo.service-now.com/login.do";
pub const MFA: &str = "https://foo.service-now.com/validate_mfa_code.do";
pub const HOME: &str = "https://foo.service-now.com/home.do";
pub const TAB: TabId = TabId(7);

pub struct Harness {
    pub coordinator: Arc<Coordinator>,
    pub browser: Arc<InMemoryBrowser>,
    pub events: broadcast::Receiver<CoordinatorEvent>,
}

pub fn harness() -> Harness {
    harness_with(&[INSTANCE])
}

pub fn harness_with(instances: &[&str]) -> Harness {
    let browser = InMemoryBrowser::new();
    let registry = Arc::new(InstanceRegistry::with_instances(instances.iter()));
    let coordinator = Coordinator::new(
        CoordinatorConfig::default(),
        registry,
        browser.clone(),
        browser.clone(),
    );
    let events = coordinator.subscribe();
    browser.open_tab(TAB, ORIGINAL);
    Harness {
        coordinator,
        browser,
        events,
    }
}

impl Harness {
    pub fn navigate(&self, url: &str) -> bool {
        self.coordinator
            .on_before_request(&RequestDetails::main_frame(TAB, url))
            .cancel
    }

    pub async fn tab_updated(&self, status: LoadStatus, url: &str) {
        self.coordinator
            .on_tab_updated(TAB, Some(status), Some(url.to_string()))
            .await;
    }

    /// Wait for the first event matching `pred`, skipping the others.
    pub async fn wait_for<F>(&mut self, mut pred: F) -> CoordinatorEvent
    where
        F: FnMut(&CoordinatorEvent) -> bool,
    {
        let events = &mut self.events;
        timeout(Duration::from_secs(3600), async move {
            loop {
                let event = events.recv().await.expect("event channel open");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("expected coordinator event")
    }

    /// Let spawned continuations run without reaching any of the flow timers.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    /// Run the interception up to the opened prompt.
    pub async fn intercept_and_prompt(&mut self) {
        assert!(self.navigate(REDIRECT), "qualifying navigation is cancelled");
        self.wait_for(|e| matches!(e, CoordinatorEvent::PromptOpened { .. }))
            .await;
    }
}

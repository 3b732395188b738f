//! Background coordinator for the ServiceNow auth helper.
//!
//! The coordinator owns all per-tab state. The browser calls in through four entry points:
//! [`Coordinator::on_before_request`] (blocking, synchronous), [`Coordinator::on_tab_updated`],
//! [`Coordinator::on_tab_removed`] and [`Coordinator::handle_message`]. Everything that has to wait
//! on the browser runs on spawned tasks which re-check the store before acting, so a continuation
//! that lost a race with tab closure or a newer flow quietly does nothing.

pub mod config;
mod decision;
pub mod events;
mod interception;
pub mod memory;
pub mod messages;
pub mod metrics;
mod monitor;
pub mod ports;

use std::sync::Arc;

use dashmap::DashMap;
use snauth_core_types::{FlowId, LoadStatus, TabId};
use snauth_event_bus::{EventBus, InMemoryBus, Subscription};
use snauth_navigation::{InstanceRegistry, NavigationClassifier};
use snauth_tab_state::{StoreSnapshot, TabMembership, TabStateStore};
use tokio::sync::broadcast;
use tracing::{debug, info};

pub use crate::config::CoordinatorConfig;
pub use crate::events::{CoordinatorEvent, PromptSkip};
pub use crate::messages::RuntimeMessage;
pub use crate::metrics::{CoordinatorMetrics, MetricsSnapshot};
pub use crate::ports::{
    BlockingResponse, PortError, PromptLauncher, PromptRequest, RequestDetails, TabControl,
    TabEvent, TabInfo,
};

pub struct Coordinator {
    config: CoordinatorConfig,
    classifier: NavigationClassifier,
    store: TabStateStore,
    tabs: Arc<dyn TabControl>,
    prompts: Arc<dyn PromptLauncher>,
    tab_events: Arc<InMemoryBus<TabEvent>>,
    monitors: DashMap<TabId, (FlowId, Subscription)>,
    events: broadcast::Sender<CoordinatorEvent>,
    metrics: CoordinatorMetrics,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        registry: Arc<InstanceRegistry>,
        tabs: Arc<dyn TabControl>,
        prompts: Arc<dyn PromptLauncher>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let tab_events = InMemoryBus::new(config.event_buffer);
        Arc::new(Self {
            classifier: NavigationClassifier::new(registry),
            store: TabStateStore::new(),
            tabs,
            prompts,
            tab_events,
            monitors: DashMap::new(),
            events,
            metrics: CoordinatorMetrics::default(),
            config,
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn classifier(&self) -> &NavigationClassifier {
        &self.classifier
    }

    pub fn store(&self) -> &TabStateStore {
        &self.store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// True while a login monitor is registered for the tab.
    pub fn is_monitoring(&self, tab: TabId) -> bool {
        self.monitors
            .get(&tab)
            .is_some_and(|entry| entry.value().1.is_active())
    }

    /// Dispatch a message from the prompt or the settings page.
    pub fn handle_message(self: &Arc<Self>, message: RuntimeMessage) {
        match message {
            RuntimeMessage::UseAdminLogin { tab_id } => {
                info!(tab = %tab_id, "admin login chosen");
                self.handle_admin_login(tab_id);
            }
            RuntimeMessage::UseOAuth { tab_id } => {
                info!(tab = %tab_id, "oauth chosen");
                self.handle_oauth_login(tab_id);
            }
            RuntimeMessage::UpdateInstances { instances } => {
                let count = self.classifier.registry().replace(instances);
                info!(count, "instances updated");
                self.emit(CoordinatorEvent::InstancesUpdated { count });
            }
        }
    }

    /// Forward a tab status change to any login monitor watching the tab.
    pub async fn on_tab_updated(&self, tab: TabId, status: Option<LoadStatus>, url: Option<String>) {
        let _ = self
            .tab_events
            .publish(TabEvent::Updated { tab, status, url })
            .await;
    }

    /// Drop every trace of a closed tab.
    pub async fn on_tab_removed(&self, tab: TabId) {
        if let Some((_, (flow, subscription))) = self.monitors.remove(&tab) {
            if subscription.dispose() {
                debug!(%tab, %flow, "login monitor disposed on tab close");
            }
        }
        let removed = self.store.forget_tab(tab);
        if !removed.is_empty() {
            debug!(%tab, ?removed, "cleaned up closed tab");
            self.metrics.record_tab_cleaned();
            self.emit(CoordinatorEvent::TabCleaned { tab, removed });
        }
        let _ = self.tab_events.publish(TabEvent::Removed { tab }).await;
    }

    fn emit(&self, event: CoordinatorEvent) {
        let _ = self.events.send(event);
    }

    fn emit_released(&self, tab: TabId, flow: FlowId, released: TabMembership) {
        if !released.is_empty() {
            self.emit(CoordinatorEvent::StateReleased {
                tab,
                flow,
                released,
            });
        }
    }
}

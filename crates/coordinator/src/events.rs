//! Observer events published by the coordinator.

use serde::Serialize;
use snauth_core_types::{FlowId, TabId};
use snauth_tab_state::TabMembership;

/// Why an interception ended without showing the prompt.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromptSkip {
    LookupFailed,
    BlankPage,
    LoginPage,
    AdminLoginActive,
    Superseded,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    Intercepted {
        tab: TabId,
        flow: FlowId,
        redirect_url: String,
    },
    DuplicateSuppressed {
        tab: TabId,
        url: String,
    },
    PromptOpened {
        tab: TabId,
        flow: FlowId,
        instance: String,
    },
    PromptSkipped {
        tab: TabId,
        flow: FlowId,
        reason: PromptSkip,
    },
    PromptFallback {
        tab: TabId,
        flow: FlowId,
        error: String,
    },
    AdminLoginStarted {
        tab: TabId,
        flow: FlowId,
        login_url: String,
    },
    MonitorStarted {
        tab: TabId,
        flow: FlowId,
    },
    LoginCompleted {
        tab: TabId,
        flow: FlowId,
        landing_url: String,
    },
    ReturnedToOriginal {
        tab: TabId,
        flow: FlowId,
        url: String,
    },
    MonitorTimedOut {
        tab: TabId,
        flow: FlowId,
    },
    OAuthDispatched {
        tab: TabId,
        flow: FlowId,
        redirect_url: String,
    },
    NavigationFailed {
        tab: TabId,
        flow: FlowId,
        target: String,
        error: String,
    },
    /// Flow-scoped cleanup removed the listed memberships.
    StateReleased {
        tab: TabId,
        flow: FlowId,
        released: TabMembership,
    },
    /// The tab closed; the listed memberships were dropped.
    TabCleaned {
        tab: TabId,
        removed: TabMembership,
    },
    InstancesUpdated {
        count: usize,
    },
}

impl CoordinatorEvent {
    pub fn tab(&self) -> Option<TabId> {
        match self {
            CoordinatorEvent::Intercepted { tab, .. }
            | CoordinatorEvent::DuplicateSuppressed { tab, .. }
            | CoordinatorEvent::PromptOpened { tab, .. }
            | CoordinatorEvent::PromptSkipped { tab, .. }
            | CoordinatorEvent::PromptFallback { tab, .. }
            | CoordinatorEvent::AdminLoginStarted { tab, .. }
            | CoordinatorEvent::MonitorStarted { tab, .. }
            | CoordinatorEvent::LoginCompleted { tab, .. }
            | CoordinatorEvent::ReturnedToOriginal { tab, .. }
            | CoordinatorEvent::MonitorTimedOut { tab, .. }
            | CoordinatorEvent::OAuthDispatched { tab, .. }
            | CoordinatorEvent::NavigationFailed { tab, .. }
            | CoordinatorEvent::StateReleased { tab, .. }
            | CoordinatorEvent::TabCleaned { tab, .. } => Some(*tab),
            CoordinatorEvent::InstancesUpdated { .. } => None,
        }
    }
}

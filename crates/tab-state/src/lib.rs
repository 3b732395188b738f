//! Tab state store.
//!
//! Three collections keyed by tab: the interception records, the tabs whitelisted while an OAuth
//! navigation is in flight, and the tabs running the native admin login. Every mutation is a
//! guarded transition; the ones issued by delayed work name the [`FlowId`] they were scheduled for
//! and turn into no-ops once that flow no longer owns the entry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use snauth_core_types::{FlowId, TabId};
use thiserror::Error;
use tracing::debug;

/// Bookkeeping for one intercepted tab.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TabInterceptionRecord {
    pub flow: FlowId,
    pub original_url: Option<String>,
    pub redirect_url: String,
    pub instance: String,
    pub timestamp: DateTime<Utc>,
}

/// Login path a tab has been dispatched to.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoginPath {
    OAuth,
    AdminLogin,
}

/// Rejected transitions.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("tab {0} is already being handled")]
    AlreadyHandled(TabId),
    #[error("no interception record for tab {0}")]
    NoRecord(TabId),
    #[error("tab {tab} is already on the {path:?} path")]
    PathTaken { tab: TabId, path: LoginPath },
}

/// Which collections held a tab, as reported by [`TabStateStore::forget_tab`].
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct TabMembership {
    pub intercepted: bool,
    pub oauth_whitelisted: bool,
    pub admin_login: bool,
}

impl TabMembership {
    pub fn is_empty(&self) -> bool {
        !(self.intercepted || self.oauth_whitelisted || self.admin_login)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TabSnapshot {
    pub tab: TabId,
    pub record: Option<TabInterceptionRecord>,
    pub oauth_whitelisted: bool,
    pub admin_login: bool,
}

/// Point-in-time copy of the store, ordered by tab id.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub tabs: Vec<TabSnapshot>,
}

impl StoreSnapshot {
    pub fn tab(&self, tab: TabId) -> Option<&TabSnapshot> {
        self.tabs.iter().find(|entry| entry.tab == tab)
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

#[derive(Default)]
struct TabTables {
    intercepted: HashMap<TabId, TabInterceptionRecord>,
    oauth_whitelisted: HashMap<TabId, FlowId>,
    admin_login: HashMap<TabId, FlowId>,
}

/// Owner of all per-tab state. One instance per coordinator.
#[derive(Default)]
pub struct TabStateStore {
    tables: Mutex<TabTables>,
}

impl TabStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_intercepted(&self, tab: TabId) -> bool {
        self.tables.lock().intercepted.contains_key(&tab)
    }

    pub fn is_oauth_whitelisted(&self, tab: TabId) -> bool {
        self.tables.lock().oauth_whitelisted.contains_key(&tab)
    }

    pub fn is_admin_login(&self, tab: TabId) -> bool {
        self.tables.lock().admin_login.contains_key(&tab)
    }

    pub fn record(&self, tab: TabId) -> Option<TabInterceptionRecord> {
        self.tables.lock().intercepted.get(&tab).cloned()
    }

    /// True while `flow` still owns the tab's interception record.
    pub fn owns_record(&self, tab: TabId, flow: FlowId) -> bool {
        self.tables
            .lock()
            .intercepted
            .get(&tab)
            .is_some_and(|record| record.flow == flow)
    }

    pub fn is_admin_flow(&self, tab: TabId, flow: FlowId) -> bool {
        self.tables.lock().admin_login.get(&tab) == Some(&flow)
    }

    pub fn is_oauth_flow(&self, tab: TabId, flow: FlowId) -> bool {
        self.tables.lock().oauth_whitelisted.get(&tab) == Some(&flow)
    }

    /// Insert a fresh record unless the tab is already intercepted or in the admin login.
    pub fn begin_interception(
        &self,
        tab: TabId,
        redirect_url: impl Into<String>,
        instance: impl Into<String>,
    ) -> Result<FlowId, TransitionError> {
        let mut tables = self.tables.lock();
        if tables.intercepted.contains_key(&tab) || tables.admin_login.contains_key(&tab) {
            return Err(TransitionError::AlreadyHandled(tab));
        }
        let flow = FlowId::new();
        tables.intercepted.insert(
            tab,
            TabInterceptionRecord {
                flow,
                original_url: None,
                redirect_url: redirect_url.into(),
                instance: instance.into(),
                timestamp: Utc::now(),
            },
        );
        debug!(%tab, %flow, "interception record created");
        Ok(flow)
    }

    /// Fill in the pre-interception URL. Only the owning flow may write it.
    pub fn set_original_url(&self, tab: TabId, flow: FlowId, url: impl Into<String>) -> bool {
        let mut tables = self.tables.lock();
        match tables.intercepted.get_mut(&tab) {
            Some(record) if record.flow == flow => {
                record.original_url = Some(url.into());
                true
            }
            _ => false,
        }
    }

    /// Move an intercepted tab onto the admin login path.
    pub fn enter_admin_login(&self, tab: TabId) -> Result<TabInterceptionRecord, TransitionError> {
        let mut tables = self.tables.lock();
        let record = tables
            .intercepted
            .get(&tab)
            .cloned()
            .ok_or(TransitionError::NoRecord(tab))?;
        if tables.admin_login.contains_key(&tab) {
            return Err(TransitionError::PathTaken {
                tab,
                path: LoginPath::AdminLogin,
            });
        }
        if tables.oauth_whitelisted.contains_key(&tab) {
            return Err(TransitionError::PathTaken {
                tab,
                path: LoginPath::OAuth,
            });
        }
        tables.admin_login.insert(tab, record.flow);
        Ok(record)
    }

    /// Move an intercepted tab onto the OAuth path.
    pub fn enter_oauth(&self, tab: TabId) -> Result<TabInterceptionRecord, TransitionError> {
        let mut tables = self.tables.lock();
        let record = tables
            .intercepted
            .get(&tab)
            .cloned()
            .ok_or(TransitionError::NoRecord(tab))?;
        if tables.oauth_whitelisted.contains_key(&tab) {
            return Err(TransitionError::PathTaken {
                tab,
                path: LoginPath::OAuth,
            });
        }
        if tables.admin_login.contains_key(&tab) {
            return Err(TransitionError::PathTaken {
                tab,
                path: LoginPath::AdminLogin,
            });
        }
        tables.oauth_whitelisted.insert(tab, record.flow);
        Ok(record)
    }

    /// Drop the interception record if `flow` still owns it.
    pub fn release_intercepted(&self, tab: TabId, flow: FlowId) -> bool {
        let mut tables = self.tables.lock();
        if tables
            .intercepted
            .get(&tab)
            .is_some_and(|record| record.flow == flow)
        {
            tables.intercepted.remove(&tab);
            return true;
        }
        false
    }

    pub fn release_admin_login(&self, tab: TabId, flow: FlowId) -> bool {
        release_owned(&mut self.tables.lock().admin_login, tab, flow)
    }

    pub fn release_oauth(&self, tab: TabId, flow: FlowId) -> bool {
        release_owned(&mut self.tables.lock().oauth_whitelisted, tab, flow)
    }

    /// Remove the tab from every collection regardless of flow.
    pub fn forget_tab(&self, tab: TabId) -> TabMembership {
        let mut tables = self.tables.lock();
        TabMembership {
            intercepted: tables.intercepted.remove(&tab).is_some(),
            oauth_whitelisted: tables.oauth_whitelisted.remove(&tab).is_some(),
            admin_login: tables.admin_login.remove(&tab).is_some(),
        }
    }

    pub fn membership(&self, tab: TabId) -> TabMembership {
        let tables = self.tables.lock();
        TabMembership {
            intercepted: tables.intercepted.contains_key(&tab),
            oauth_whitelisted: tables.oauth_whitelisted.contains_key(&tab),
            admin_login: tables.admin_login.contains_key(&tab),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.lock();
        let mut tabs: Vec<TabId> = tables
            .intercepted
            .keys()
            .chain(tables.oauth_whitelisted.keys())
            .chain(tables.admin_login.keys())
            .copied()
            .collect();
        tabs.sort();
        tabs.dedup();
        StoreSnapshot {
            tabs: tabs
                .into_iter()
                .map(|tab| TabSnapshot {
                    tab,
                    record: tables.intercepted.get(&tab).cloned(),
                    oauth_whitelisted: tables.oauth_whitelisted.contains_key(&tab),
                    admin_login: tables.admin_login.contains_key(&tab),
                })
                .collect(),
        }
    }
}

fn release_owned(table: &mut HashMap<TabId, FlowId>, tab: TabId, flow: FlowId) -> bool {
    if table.get(&tab) == Some(&flow) {
        table.remove(&tab);
        true
    } else {
        false
    }
}

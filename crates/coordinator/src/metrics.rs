use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct CoordinatorMetrics {
    intercepted: AtomicU64,
    duplicates_suppressed: AtomicU64,
    prompts_opened: AtomicU64,
    prompt_fallbacks: AtomicU64,
    admin_logins: AtomicU64,
    oauth_dispatches: AtomicU64,
    logins_completed: AtomicU64,
    returns: AtomicU64,
    monitor_timeouts: AtomicU64,
    navigation_failures: AtomicU64,
    tabs_cleaned: AtomicU64,
}

fn increment(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl CoordinatorMetrics {
    pub fn record_intercepted(&self) {
        increment(&self.intercepted);
    }

    pub fn record_duplicate(&self) {
        increment(&self.duplicates_suppressed);
    }

    pub fn record_prompt_opened(&self) {
        increment(&self.prompts_opened);
    }

    pub fn record_prompt_fallback(&self) {
        increment(&self.prompt_fallbacks);
    }

    pub fn record_admin_login(&self) {
        increment(&self.admin_logins);
    }

    pub fn record_oauth_dispatch(&self) {
        increment(&self.oauth_dispatches);
    }

    pub fn record_login_completed(&self) {
        increment(&self.logins_completed);
    }

    pub fn record_return(&self) {
        increment(&self.returns);
    }

    pub fn record_monitor_timeout(&self) {
        increment(&self.monitor_timeouts);
    }

    pub fn record_navigation_failure(&self) {
        increment(&self.navigation_failures);
    }

    pub fn record_tab_cleaned(&self) {
        increment(&self.tabs_cleaned);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            intercepted: self.intercepted.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            prompts_opened: self.prompts_opened.load(Ordering::Relaxed),
            prompt_fallbacks: self.prompt_fallbacks.load(Ordering::Relaxed),
            admin_logins: self.admin_logins.load(Ordering::Relaxed),
            oauth_dispatches: self.oauth_dispatches.load(Ordering::Relaxed),
            logins_completed: self.logins_completed.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            monitor_timeouts: self.monitor_timeouts.load(Ordering::Relaxed),
            navigation_failures: self.navigation_failures.load(Ordering::Relaxed),
            tabs_cleaned: self.tabs_cleaned.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub intercepted: u64,
    pub duplicates_suppressed: u64,
    pub prompts_opened: u64,
    pub prompt_fallbacks: u64,
    pub admin_logins: u64,
    pub oauth_dispatches: u64,
    pub logins_completed: u64,
    pub returns: u64,
    pub monitor_timeouts: u64,
    pub navigation_failures: u64,
    pub tabs_cleaned: u64,
}

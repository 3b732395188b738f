//! Login completion monitor.
//!
//! One listener per admin login. Completion and timeout race for the same [`Subscription`]; the
//! one whose `dispose` call wins performs the follow-up, the other becomes a no-op.

use std::sync::Arc;

use snauth_core_types::{FlowId, LoadStatus, TabId};
use snauth_event_bus::Subscription;
use snauth_navigation::{is_login_page, is_mfa_interstitial, is_on_host, is_return_excluded};
use snauth_tab_state::TabMembership;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::events::CoordinatorEvent;
use crate::ports::TabEvent;
use crate::Coordinator;

/// Observation of one tab event against an in-progress admin login.
#[derive(Debug, PartialEq, Eq)]
enum LoginProgress {
    Unrelated,
    MfaInterstitial,
    Pending,
    Completed(String),
}

fn assess(event: &TabEvent, tab: TabId, instance: &str) -> LoginProgress {
    let TabEvent::Updated {
        tab: updated,
        status,
        url,
    } = event
    else {
        return LoginProgress::Unrelated;
    };
    if *updated != tab {
        return LoginProgress::Unrelated;
    }
    let Some(url) = url.as_deref() else {
        return LoginProgress::Pending;
    };
    if is_mfa_interstitial(url) {
        return LoginProgress::MfaInterstitial;
    }
    if *status == Some(LoadStatus::Complete) && !is_login_page(url) && is_on_host(url, instance) {
        return LoginProgress::Completed(url.to_string());
    }
    LoginProgress::Pending
}

/// Where to send the tab once the login finished, if anywhere.
fn return_target(original_url: Option<String>, landing_url: &str, instance: &str) -> Option<String> {
    original_url.filter(|original| {
        original != landing_url && !is_return_excluded(original) && is_on_host(original, instance)
    })
}

impl Coordinator {
    pub(crate) fn monitor_login_completion(
        self: &Arc<Self>,
        tab: TabId,
        flow: FlowId,
        instance: String,
        original_url: Option<String>,
    ) {
        debug!(%tab, %flow, return_to = ?original_url, "monitoring login");

        let this = Arc::clone(self);
        let watched_instance = instance.clone();
        let subscription = self.tab_events.listen(move |event, subscription| {
            match assess(&event, tab, &watched_instance) {
                LoginProgress::Unrelated | LoginProgress::Pending => {}
                LoginProgress::MfaInterstitial => {
                    debug!(%tab, "on mfa page, continuing to monitor");
                }
                LoginProgress::Completed(landing_url) => {
                    if !subscription.dispose() {
                        return;
                    }
                    this.finish_admin_login(
                        tab,
                        flow,
                        &watched_instance,
                        landing_url,
                        original_url.clone(),
                    );
                }
            }
        });

        if let Some((previous_flow, previous)) =
            self.monitors.insert(tab, (flow, subscription.clone()))
        {
            debug!(%tab, flow = %previous_flow, "replacing stale login monitor");
            previous.dispose();
        }

        // Tab may have closed while the login navigation was in flight.
        if !self.store.is_admin_flow(tab, flow) {
            self.stop_monitor(tab, flow, &subscription);
            return;
        }

        self.emit(CoordinatorEvent::MonitorStarted { tab, flow });
        self.spawn_monitor_timeout(tab, flow, subscription);
    }

    fn spawn_monitor_timeout(self: &Arc<Self>, tab: TabId, flow: FlowId, subscription: Subscription) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = subscription.disposed() => {}
                _ = sleep(this.config.login_monitor_timeout()) => {
                    if !this.stop_monitor(tab, flow, &subscription) {
                        return;
                    }
                    // Only the admin flag goes; the interception record stays until the tab closes.
                    let released = TabMembership {
                        admin_login: this.store.release_admin_login(tab, flow),
                        ..TabMembership::default()
                    };
                    warn!(%tab, %flow, "login monitoring timed out");
                    this.metrics.record_monitor_timeout();
                    this.emit(CoordinatorEvent::MonitorTimedOut { tab, flow });
                    this.emit_released(tab, flow, released);
                }
            }
        });
    }

    /// Dispose the monitor and forget it if it still belongs to `flow`.
    fn stop_monitor(&self, tab: TabId, flow: FlowId, subscription: &Subscription) -> bool {
        self.monitors.remove_if(&tab, |_, (owner, _)| *owner == flow);
        subscription.dispose()
    }

    fn finish_admin_login(
        self: &Arc<Self>,
        tab: TabId,
        flow: FlowId,
        instance: &str,
        landing_url: String,
        original_url: Option<String>,
    ) {
        self.monitors.remove_if(&tab, |_, (owner, _)| *owner == flow);
        if !self.store.is_admin_flow(tab, flow) {
            debug!(%tab, %flow, "login completed for a flow that already ended");
            return;
        }

        info!(%tab, %flow, landing_url = %landing_url, "login successful");
        self.metrics.record_login_completed();
        self.emit(CoordinatorEvent::LoginCompleted {
            tab,
            flow,
            landing_url: landing_url.clone(),
        });

        let Some(target) = return_target(original_url, &landing_url, instance) else {
            debug!(%tab, "no valid original url to return to");
            let released = TabMembership {
                intercepted: self.store.release_intercepted(tab, flow),
                ..TabMembership::default()
            };
            self.emit_released(tab, flow, released);
            self.schedule_admin_release(tab, flow);
            return;
        };

        info!(%tab, %flow, target = %target, "returning to original page");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            sleep(this.config.return_delay()).await;
            if !this.store.is_admin_flow(tab, flow) {
                debug!(%tab, %flow, "admin flow ended before return navigation");
                return;
            }
            match this.tabs.update_tab(tab, &target).await {
                Ok(()) => {
                    info!(%tab, %flow, "returned to original page");
                    this.metrics.record_return();
                    this.emit(CoordinatorEvent::ReturnedToOriginal {
                        tab,
                        flow,
                        url: target,
                    });
                    let released = TabMembership {
                        intercepted: this.store.release_intercepted(tab, flow),
                        ..TabMembership::default()
                    };
                    this.emit_released(tab, flow, released);
                    this.schedule_admin_release(tab, flow);
                }
                Err(err) => {
                    warn!(%tab, %flow, error = %err, "failed to return to original page");
                    this.metrics.record_navigation_failure();
                    this.emit(CoordinatorEvent::NavigationFailed {
                        tab,
                        flow,
                        target,
                        error: err.to_string(),
                    });
                    let released = TabMembership {
                        intercepted: this.store.release_intercepted(tab, flow),
                        admin_login: this.store.release_admin_login(tab, flow),
                        ..TabMembership::default()
                    };
                    this.emit_released(tab, flow, released);
                }
            }
        });
    }

    /// Keep the tab exempt a little longer so a half-established session does not re-prompt.
    fn schedule_admin_release(self: &Arc<Self>, tab: TabId, flow: FlowId) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            sleep(this.config.admin_release_grace()).await;
            let released = TabMembership {
                admin_login: this.store.release_admin_login(tab, flow),
                ..TabMembership::default()
            };
            if released.admin_login {
                debug!(%tab, %flow, "removed from admin login after delay");
            }
            this.emit_released(tab, flow, released);
        });
    }
}

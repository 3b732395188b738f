use std::sync::Arc;

use snauth_core_types::{FlowId, TabId};
use snauth_tab_state::{TabMembership, TransitionError};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::events::CoordinatorEvent;
use crate::ports::PromptRequest;
use crate::Coordinator;

impl Coordinator {
    /// Open the decision prompt; if it cannot be shown, proceed with OAuth.
    pub(crate) async fn show_prompt(self: &Arc<Self>, tab: TabId, flow: FlowId, instance: String) {
        info!(%tab, %flow, instance = %instance, "opening prompt");
        let request = PromptRequest::new(tab, &instance, &self.config);
        match self.prompts.open_prompt(request).await {
            Ok(()) => {
                self.metrics.record_prompt_opened();
                self.emit(CoordinatorEvent::PromptOpened {
                    tab,
                    flow,
                    instance,
                });
            }
            Err(err) => {
                warn!(%tab, %flow, error = %err, "failed to open prompt");
                if self.store.is_admin_login(tab) {
                    info!(%tab, "skipping oauth fallback, admin login already running");
                    return;
                }
                self.metrics.record_prompt_fallback();
                self.emit(CoordinatorEvent::PromptFallback {
                    tab,
                    flow,
                    error: err.to_string(),
                });
                self.handle_oauth_login(tab);
            }
        }
    }

    /// Send the tab to the instance's native login page and watch for completion.
    pub(crate) fn handle_admin_login(self: &Arc<Self>, tab: TabId) {
        let record = match self.store.enter_admin_login(tab) {
            Ok(record) => record,
            Err(TransitionError::NoRecord(_)) => {
                debug!(%tab, "no interception record for admin login, already cleaned up");
                return;
            }
            Err(err) => {
                debug!(%tab, error = %err, "ignoring admin login request");
                return;
            }
        };

        let flow = record.flow;
        let login_url = format!("https://{}/login.do", record.instance);
        info!(%tab, %flow, login_url = %login_url, "navigating to native login");
        self.metrics.record_admin_login();
        self.emit(CoordinatorEvent::AdminLoginStarted {
            tab,
            flow,
            login_url: login_url.clone(),
        });

        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = this.tabs.update_tab(tab, &login_url).await {
                warn!(%tab, %flow, error = %err, "navigation to login page failed");
                this.metrics.record_navigation_failure();
                this.emit(CoordinatorEvent::NavigationFailed {
                    tab,
                    flow,
                    target: login_url,
                    error: err.to_string(),
                });
                let released = TabMembership {
                    admin_login: this.store.release_admin_login(tab, flow),
                    intercepted: this.store.release_intercepted(tab, flow),
                    ..TabMembership::default()
                };
                this.emit_released(tab, flow, released);
                return;
            }

            if !this.store.is_admin_flow(tab, flow) {
                debug!(%tab, %flow, "admin flow ended before monitoring started");
                return;
            }
            // The record may have gained its original url after the decision was made.
            let original_url = this
                .store
                .record(tab)
                .filter(|current| current.flow == flow)
                .and_then(|current| current.original_url)
                .or(record.original_url);
            this.monitor_login_completion(tab, flow, record.instance, original_url);
        });
    }

    /// Let the original redirect through for this tab.
    pub(crate) fn handle_oauth_login(self: &Arc<Self>, tab: TabId) {
        let record = match self.store.enter_oauth(tab) {
            Ok(record) => record,
            Err(TransitionError::NoRecord(_)) => {
                debug!(%tab, "no interception record for oauth, already cleaned up");
                return;
            }
            Err(err) => {
                debug!(%tab, error = %err, "ignoring oauth request");
                return;
            }
        };

        let flow = record.flow;
        debug!(%tab, %flow, redirect_url = %record.redirect_url, "tab whitelisted for oauth");

        let this = Arc::clone(self);
        tokio::spawn(async move {
            sleep(this.config.oauth_renavigate_delay()).await;
            if !this.store.is_oauth_flow(tab, flow) {
                debug!(%tab, %flow, "oauth flow ended before redirect replay");
                return;
            }

            match this.tabs.update_tab(tab, &record.redirect_url).await {
                Ok(()) => {
                    info!(%tab, %flow, "oauth redirect replayed");
                    this.metrics.record_oauth_dispatch();
                    this.emit(CoordinatorEvent::OAuthDispatched {
                        tab,
                        flow,
                        redirect_url: record.redirect_url.clone(),
                    });

                    sleep(this.config.oauth_cleanup_grace()).await;
                    let released = TabMembership {
                        intercepted: this.store.release_intercepted(tab, flow),
                        oauth_whitelisted: this.store.release_oauth(tab, flow),
                        ..TabMembership::default()
                    };
                    debug!(%tab, %flow, ?released, "oauth whitelist cleaned up");
                    this.emit_released(tab, flow, released);
                }
                Err(err) => {
                    // The record stays so the next qualifying navigation is treated as in flight.
                    warn!(%tab, %flow, error = %err, "oauth navigation failed");
                    this.metrics.record_navigation_failure();
                    this.emit(CoordinatorEvent::NavigationFailed {
                        tab,
                        flow,
                        target: record.redirect_url.clone(),
                        error: err.to_string(),
                    });
                    let released = TabMembership {
                        oauth_whitelisted: this.store.release_oauth(tab, flow),
                        ..TabMembership::default()
                    };
                    this.emit_released(tab, flow, released);
                }
            }
        });
    }
}

use std::sync::Arc;

use snauth_core_types::{FlowId, TabId};
use snauth_navigation::{host_of, in_origin_family, is_blank_page, is_login_page};
use snauth_tab_state::TabMembership;
use tracing::{debug, info, warn};

use crate::events::{CoordinatorEvent, PromptSkip};
use crate::ports::{BlockingResponse, RequestDetails};
use crate::Coordinator;

impl Coordinator {
    /// Blocking interception hook. Decides synchronously; follow-up work is spawned.
    ///
    /// The record for a qualifying navigation is inserted before this returns, so a second
    /// qualifying navigation on the same tab is cancelled as a duplicate even if the first one's
    /// tab lookup is still pending.
    pub fn on_before_request(self: &Arc<Self>, details: &RequestDetails) -> BlockingResponse {
        let tab = details.tab;
        let url = details.url.as_str();

        if !details.frame_type.is_top_level() || !tab.is_tab() {
            return BlockingResponse::allow();
        }
        if !in_origin_family(url, &self.config.origin_family) {
            return BlockingResponse::allow();
        }

        debug!(%tab, url, "request");

        if self.store.is_admin_login(tab) {
            debug!(%tab, "tab in admin login flow, allowing");
            return BlockingResponse::allow();
        }
        if self.store.is_oauth_whitelisted(tab) {
            debug!(%tab, "tab whitelisted for oauth, allowing");
            return BlockingResponse::allow();
        }
        if !self.classifier.is_qualifying(url) {
            return BlockingResponse::allow();
        }

        let instance = host_of(url).unwrap_or_default();
        let flow = match self.store.begin_interception(tab, url, instance.clone()) {
            Ok(flow) => flow,
            Err(_) => {
                debug!(%tab, "already handling tab, blocking silently");
                self.metrics.record_duplicate();
                self.emit(CoordinatorEvent::DuplicateSuppressed {
                    tab,
                    url: url.to_string(),
                });
                return BlockingResponse::cancel();
            }
        };

        info!(%tab, %flow, url, "blocking oauth redirect");
        self.metrics.record_intercepted();
        self.emit(CoordinatorEvent::Intercepted {
            tab,
            flow,
            redirect_url: url.to_string(),
        });

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.resolve_original_url(tab, flow, instance).await;
        });

        BlockingResponse::cancel()
    }

    async fn resolve_original_url(self: Arc<Self>, tab: TabId, flow: FlowId, instance: String) {
        let lookup = self.tabs.get_tab(tab).await;

        // A decision may have arrived while the lookup was pending; the admin flow owns the record.
        if self.store.is_admin_flow(tab, flow) {
            if let Ok(info) = &lookup {
                let url = info.url.as_deref().unwrap_or_default();
                if !is_blank_page(url) && !is_login_page(url) {
                    self.store.set_original_url(tab, flow, url);
                }
            }
            debug!(%tab, "tab already in admin login flow, skipping prompt");
            self.emit(CoordinatorEvent::PromptSkipped {
                tab,
                flow,
                reason: PromptSkip::AdminLoginActive,
            });
            return;
        }

        let info = match lookup {
            Ok(info) => info,
            Err(err) => {
                warn!(%tab, %flow, error = %err, "failed to read tab");
                self.abandon(tab, flow, PromptSkip::LookupFailed);
                return;
            }
        };

        let original_url = info.url.unwrap_or_default();
        debug!(%tab, %flow, original_url = %original_url, "original url");

        if is_blank_page(&original_url) {
            debug!(%tab, "skipping prompt on blank page");
            self.abandon(tab, flow, PromptSkip::BlankPage);
            return;
        }
        if is_login_page(&original_url) {
            debug!(%tab, "skipping prompt on login page");
            self.abandon(tab, flow, PromptSkip::LoginPage);
            return;
        }
        if !self.store.set_original_url(tab, flow, original_url) {
            debug!(%tab, %flow, "interception superseded before prompt");
            self.emit(CoordinatorEvent::PromptSkipped {
                tab,
                flow,
                reason: PromptSkip::Superseded,
            });
            return;
        }
        if self.store.is_admin_login(tab) {
            debug!(%tab, "tab already in admin login flow, skipping prompt");
            self.emit(CoordinatorEvent::PromptSkipped {
                tab,
                flow,
                reason: PromptSkip::AdminLoginActive,
            });
            return;
        }

        self.show_prompt(tab, flow, instance).await;
    }

    fn abandon(&self, tab: TabId, flow: FlowId, reason: PromptSkip) {
        let released = TabMembership {
            intercepted: self.store.release_intercepted(tab, flow),
            ..TabMembership::default()
        };
        self.emit(CoordinatorEvent::PromptSkipped { tab, flow, reason });
        self.emit_released(tab, flow, released);
    }
}

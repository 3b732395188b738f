//! Navigation classification for the auth helper.
//!
//! All predicates are pure: they never panic on malformed input and simply answer `false`.

pub mod patterns;
pub mod registry;

use std::sync::Arc;

use serde::Serialize;
use url::Url;

pub use patterns::{
    LOGIN_PAGE_FRAGMENT, MFA_INTERSTITIAL_FRAGMENTS, OAUTH_REDIRECT_PATTERNS,
    RETURN_EXCLUDED_FRAGMENTS, SERVICE_NOW_DOMAIN,
};
pub use registry::{normalize_instances, validate_instances, InstanceRegistry, RegistryError};

/// Classifier bound to a live instance registry.
#[derive(Clone, Debug)]
pub struct NavigationClassifier {
    registry: Arc<InstanceRegistry>,
}

/// Result of classifying a single URL, used for diagnostics output.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Classification {
    pub url: String,
    pub host: Option<String>,
    pub trusted_instance: bool,
    pub oauth_redirect: bool,
    pub qualifying: bool,
}

impl NavigationClassifier {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// True iff the URL's hostname contains a registered instance string.
    pub fn is_trusted_instance(&self, url: &str) -> bool {
        match host_of(url) {
            Some(host) => self.registry.matches_host(&host),
            None => false,
        }
    }

    /// A navigation the coordinator intercepts: a redirect endpoint on a trusted instance.
    pub fn is_qualifying(&self, url: &str) -> bool {
        self.is_trusted_instance(url) && is_oauth_redirect(url)
    }

    pub fn classify(&self, url: &str) -> Classification {
        let trusted_instance = self.is_trusted_instance(url);
        let oauth_redirect = is_oauth_redirect(url);
        Classification {
            url: url.to_string(),
            host: host_of(url),
            trusted_instance,
            oauth_redirect,
            qualifying: trusted_instance && oauth_redirect,
        }
    }
}

/// True iff the URL matches one of the OAuth/SSO redirect patterns.
pub fn is_oauth_redirect(url: &str) -> bool {
    patterns::OAUTH_REDIRECT_SET.is_match(url)
}

pub fn is_mfa_interstitial(url: &str) -> bool {
    MFA_INTERSTITIAL_FRAGMENTS
        .iter()
        .any(|fragment| url.contains(fragment))
}

pub fn is_login_page(url: &str) -> bool {
    url.contains(LOGIN_PAGE_FRAGMENT)
}

/// Empty URLs and `about:blank` mean the tab has not loaded anything worth returning to.
pub fn is_blank_page(url: &str) -> bool {
    let trimmed = url.trim();
    trimmed.is_empty() || trimmed == "about:blank"
}

/// URLs that must never be used as a post-login return target.
pub fn is_return_excluded(url: &str) -> bool {
    RETURN_EXCLUDED_FRAGMENTS
        .iter()
        .any(|fragment| url.contains(fragment))
}

/// Lowercased hostname of `url`, if it parses and has one.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(|host| host.to_ascii_lowercase())
}

/// True when `url` is served by exactly `host`.
pub fn is_on_host(url: &str, host: &str) -> bool {
    host_of(url).is_some_and(|candidate| candidate.eq_ignore_ascii_case(host))
}

/// True when the URL's host is one of `family` or a subdomain of one.
pub fn in_origin_family(url: &str, family: &[String]) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    family.iter().any(|domain| {
        let domain = domain.trim_start_matches('.').to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    })
}

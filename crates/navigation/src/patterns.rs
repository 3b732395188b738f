//! URL patterns recognised by the classifier.

use once_cell::sync::Lazy;
use regex::RegexSet;

/// ServiceNow OAuth/SSO redirect endpoints and the external identity provider host.
pub const OAUTH_REDIRECT_PATTERNS: [&str; 5] = [
    r"auth_redirect\.do",
    r"oauth_redirect\.do",
    r"navpage\.do",
    r"login\.microsoftonline\.com",
    r"sso\.do",
];

/// Path fragments of the multi-factor verification pages shown during a native login.
pub const MFA_INTERSTITIAL_FRAGMENTS: [&str; 2] = [
    "validate_multifactor_auth_code.do",
    "validate_mfa_code.do",
];

/// Native instance login page.
pub const LOGIN_PAGE_FRAGMENT: &str = "/login.do";

/// A return target containing any of these is itself part of a redirect chain.
pub const RETURN_EXCLUDED_FRAGMENTS: [&str; 3] = ["auth_redirect", "oauth_redirect", "sso.do"];

/// Suffix every configured instance must carry.
pub const SERVICE_NOW_DOMAIN: &str = ".service-now.com";

pub(crate) static OAUTH_REDIRECT_SET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new(OAUTH_REDIRECT_PATTERNS).expect("static oauth redirect patterns compile")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles_into_the_set() {
        assert_eq!(OAUTH_REDIRECT_SET.len(), OAUTH_REDIRECT_PATTERNS.len());
    }
}

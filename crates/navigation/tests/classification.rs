use std::sync::Arc;

use snauth_navigation::{
    is_login_page, is_mfa_interstitial, is_oauth_redirect, is_return_excluded, InstanceRegistry,
    NavigationClassifier,
};

fn classifier(instances: &[&str]) -> NavigationClassifier {
    NavigationClassifier::new(Arc::new(InstanceRegistry::with_instances(instances.iter())))
}

#[test]
fn trusted_instance_is_substring_of_hostname() {
    let classifier = classifier(&["foo.service-now.com"]);
    assert!(classifier.is_trusted_instance("https://foo.service-now.com/home.do"));
    assert!(classifier.is_trusted_instance("http://foo.service-now.com/"));
    assert!(classifier.is_trusted_instance("https://foo.service-now.com:8443/nav_to.do?uri=x"));
    assert!(!classifier.is_trusted_instance("https://bar.service-now.com/home.do"));
    // Path and query never make a host trusted.
    assert!(!classifier.is_trusted_instance("https://example.com/foo.service-now.com"));
}

#[test]
fn short_entries_match_any_containing_host() {
    let classifier = classifier(&["acme"]);
    assert!(classifier.is_trusted_instance("https://acme.service-now.com/"));
    assert!(classifier.is_trusted_instance("https://acmedev.service-now.com/"));
    assert!(!classifier.is_trusted_instance("https://other.service-now.com/"));
}

#[test]
fn malformed_urls_are_never_trusted() {
    let classifier = classifier(&["foo.service-now.com"]);
    assert!(!classifier.is_trusted_instance(""));
    assert!(!classifier.is_trusted_instance("foo.service-now.com/oauth_redirect.do"));
    assert!(!classifier.is_trusted_instance("http://[::1"));
}

#[test]
fn empty_registry_trusts_nothing() {
    let classifier = classifier(&[]);
    assert!(!classifier.is_trusted_instance("https://foo.service-now.com/"));
}

#[test]
fn oauth_redirect_matches_each_pattern_class() {
    for url in [
        "https://foo.service-now.com/auth_redirect.do?sysparm_stack=no",
        "https://foo.service-now.com/oauth_redirect.do",
        "https://foo.service-now.com/navpage.do",
        "https://login.microsoftonline.com/tenant/oauth2/authorize",
        "https://foo.service-now.com/sso.do?RelayState=x",
    ] {
        assert!(is_oauth_redirect(url), "{url} should be an oauth redirect");
    }
    assert!(!is_oauth_redirect("https://foo.service-now.com/home.do"));
    assert!(!is_oauth_redirect("https://foo.service-now.com/ssoXdo"));
}

#[test]
fn classify_reports_qualifying_only_when_both_hold() {
    let classifier = classifier(&["foo.service-now.com"]);
    let hit = classifier.classify("https://foo.service-now.com/oauth_redirect.do");
    assert!(hit.trusted_instance && hit.oauth_redirect && hit.qualifying);
    assert_eq!(hit.host.as_deref(), Some("foo.service-now.com"));

    let untrusted = classifier.classify("https://bar.service-now.com/oauth_redirect.do");
    assert!(!untrusted.qualifying);

    let plain = classifier.classify("https://foo.service-now.com/home.do");
    assert!(plain.trusted_instance && !plain.qualifying);
}

#[test]
fn registry_updates_are_seen_by_existing_classifier() {
    let registry = Arc::new(InstanceRegistry::new());
    let classifier = NavigationClassifier::new(Arc::clone(&registry));
    assert!(!classifier.is_qualifying("https://foo.service-now.com/sso.do"));
    registry.replace(["foo.service-now.com"]);
    assert!(classifier.is_qualifying("https://foo.service-now.com/sso.do"));
}

#[test]
fn login_flow_page_predicates() {
    assert!(is_login_page("https://foo.service-now.com/login.do"));
    assert!(is_mfa_interstitial(
        "https://foo.service-now.com/validate_multifactor_auth_code.do"
    ));
    assert!(is_mfa_interstitial("https://foo.service-now.com/validate_mfa_code.do"));
    assert!(!is_mfa_interstitial("https://foo.service-now.com/home.do"));
    assert!(is_return_excluded("https://foo.service-now.com/oauth_redirect.do"));
    assert!(!is_return_excluded("https://foo.service-now.com/incident.do?sys_id=1"));
}

#[test]
fn classification_serializes_for_cli_output() {
    let classifier = classifier(&["foo.service-now.com"]);
    let value = serde_json::to_value(classifier.classify("https://foo.service-now.com/sso.do")).unwrap();
    assert_eq!(value["qualifying"], true);
    assert_eq!(value["host"], "foo.service-now.com");
}

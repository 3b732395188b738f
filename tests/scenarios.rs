use std::path::Path;

use snauth_core_types::TabId;
use snauth_helper::scenario::{simulate, Scenario, ScenarioReport};
use snauth_helper::{Config, CoordinatorEvent};

fn replay(fixture: &str) -> ScenarioReport {
    let path = Path::new("tests/fixtures").join(fixture);
    let raw = std::fs::read_to_string(&path).expect("fixture readable");
    let scenario = Scenario::from_yaml(&raw).expect("fixture parses");
    simulate(&scenario, &Config::default()).expect("simulation runs")
}

fn first_at(report: &ScenarioReport, pred: impl Fn(&CoordinatorEvent) -> bool) -> u64 {
    report
        .events
        .iter()
        .find(|timed| pred(&timed.event))
        .map(|timed| timed.at_ms)
        .expect("event present")
}

#[test]
fn admin_login_returns_to_the_original_page() {
    let report = replay("admin_login.yaml");

    let cancelled: Vec<_> = report.cancelled().map(|r| r.url.as_str()).collect();
    assert_eq!(
        cancelled,
        vec![
            "https://foo.service-now.com/oauth_redirect.do",
            "https://foo.service-now.com/sso.do"
        ]
    );
    assert_eq!(report.prompts.len(), 1, "duplicate redirect opens no second prompt");
    assert_eq!(report.metrics.duplicates_suppressed, 1);

    let urls: Vec<_> = report.navigations.iter().map(|n| n.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://foo.service-now.com/login.do",
            "https://foo.service-now.com/incident.do?sys_id=42"
        ]
    );

    let completed = first_at(&report, |e| matches!(e, CoordinatorEvent::LoginCompleted { .. }));
    let returned = first_at(&report, |e| {
        matches!(e, CoordinatorEvent::ReturnedToOriginal { .. })
    });
    assert!(returned >= completed + 500);
    assert!(report.state.is_empty());
}

#[test]
fn unavailable_prompt_falls_back_to_oauth() {
    let report = replay("oauth_fallback.yaml");

    assert!(report.prompts.is_empty());
    assert!(report.requests[0].cancelled);
    assert!(!report.requests[1].cancelled, "replayed redirect passes while whitelisted");
    assert_eq!(report.navigations.len(), 1);
    assert_eq!(
        report.navigations[0].url,
        "https://foo.service-now.com/oauth_redirect.do?code=abc"
    );
    assert_eq!(report.metrics.prompt_fallbacks, 1);
    assert_eq!(report.metrics.oauth_dispatches, 1);

    let dispatched = first_at(&report, |e| matches!(e, CoordinatorEvent::OAuthDispatched { .. }));
    let released = first_at(&report, |e| matches!(e, CoordinatorEvent::StateReleased { .. }));
    assert!(released >= dispatched + 10_000);
    assert!(report.state.is_empty());
}

#[test]
fn closed_tab_leaves_nothing_behind() {
    let report = replay("tab_closed.yaml");

    let urls: Vec<_> = report.navigations.iter().map(|n| n.url.as_str()).collect();
    assert_eq!(urls, vec!["https://foo.service-now.com/login.do"]);
    assert_eq!(report.metrics.tabs_cleaned, 1);
    assert_eq!(report.metrics.logins_completed, 0);
    assert!(report.state.is_empty());
}

#[test]
fn monitor_timeout_keeps_the_interception_record() {
    let report = replay("monitor_timeout.yaml");

    assert_eq!(report.metrics.monitor_timeouts, 1);
    assert!(report.requests.iter().all(|r| r.cancelled));
    assert_eq!(report.prompts.len(), 1);
    assert_eq!(report.metrics.duplicates_suppressed, 1);

    let tab = report.state.tab(TabId(9)).expect("record left in place");
    assert!(tab.record.is_some());
    assert!(!tab.admin_login);
    assert!(!tab.oauth_whitelisted);
}

#[test]
fn scenario_instances_override_the_configured_ones() {
    let scenario = Scenario::from_yaml(
        r#"
tabs:
  - id: 1
    url: https://bar.service-now.com/incident.do
steps:
  - step: navigate
    tab: 1
    url: https://bar.service-now.com/sso.do
  - step: update_instances
    instances: [bar.service-now.com]
  - step: navigate
    tab: 1
    url: https://bar.service-now.com/sso.do
"#,
    )
    .unwrap();
    let mut config = Config::default();
    config.set_instances(["foo.service-now.com"]).unwrap();

    let report = simulate(&scenario, &config).unwrap();
    assert!(!report.requests[0].cancelled, "bar is not trusted yet");
    assert!(report.requests[1].cancelled);
    assert!(report
        .events
        .iter()
        .any(|timed| timed.event == CoordinatorEvent::InstancesUpdated { count: 1 }));
}

mod common;

use std::time::Duration;

use common::*;
use snauth_coordinator::{CoordinatorEvent, PromptSkip, RuntimeMessage};
use snauth_core_types::LoadStatus;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn closing_during_lookup_skips_the_prompt() {
    let mut h = harness();
    h.browser.set_lookup_delay(Duration::from_secs(1));

    assert!(h.navigate(REDIRECT));
    h.coordinator.on_tab_removed(TAB).await;
    let cleaned = h
        .wait_for(|e| matches!(e, CoordinatorEvent::TabCleaned { .. }))
        .await;
    assert!(matches!(
        cleaned,
        CoordinatorEvent::TabCleaned { removed, .. } if removed.intercepted
    ));

    let skipped = h
        .wait_for(|e| matches!(e, CoordinatorEvent::PromptSkipped { .. }))
        .await;
    assert!(matches!(
        skipped,
        CoordinatorEvent::PromptSkipped {
            reason: PromptSkip::Superseded,
            ..
        }
    ));
    assert!(h.browser.prompts().is_empty());
    assert!(h.coordinator.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn closing_during_admin_login_stops_the_monitor() {
    let mut h = harness();
    h.intercept_and_prompt().await;
    h.coordinator
        .handle_message(RuntimeMessage::UseAdminLogin { tab_id: TAB });
    h.wait_for(|e| matches!(e, CoordinatorEvent::MonitorStarted { .. }))
        .await;

    h.coordinator.on_tab_removed(TAB).await;
    assert!(!h.coordinator.is_monitoring(TAB));
    assert!(h.coordinator.snapshot().is_empty());

    h.tab_updated(LoadStatus::Complete, HOME).await;
    sleep(Duration::from_secs(400)).await;

    assert_eq!(h.browser.navigations_for(TAB), vec![LOGIN.to_string()]);
    let metrics = h.coordinator.metrics();
    assert_eq!(metrics.logins_completed, 0);
    assert_eq!(metrics.monitor_timeouts, 0);
    assert_eq!(metrics.tabs_cleaned, 1);
}

#[tokio::test(start_paused = true)]
async fn closing_before_oauth_replay_cancels_it() {
    let mut h = harness();
    h.intercept_and_prompt().await;
    h.coordinator
        .handle_message(RuntimeMessage::UseOAuth { tab_id: TAB });
    h.coordinator.on_tab_removed(TAB).await;

    sleep(Duration::from_secs(11)).await;
    assert!(h.browser.navigations().is_empty());
    assert!(h.coordinator.snapshot().is_empty());
    assert_eq!(h.coordinator.metrics().oauth_dispatches, 0);
}

#[tokio::test(start_paused = true)]
async fn stale_timers_leave_a_reused_tab_id_alone() {
    let mut h = harness();
    h.intercept_and_prompt().await;
    h.coordinator
        .handle_message(RuntimeMessage::UseOAuth { tab_id: TAB });
    h.wait_for(|e| matches!(e, CoordinatorEvent::OAuthDispatched { .. }))
        .await;

    // Close inside the grace window and reuse the id for a new interception.
    h.coordinator.on_tab_removed(TAB).await;
    h.browser.open_tab(TAB, ORIGINAL);
    h.intercept_and_prompt().await;
    let fresh = h.coordinator.store().record(TAB).expect("fresh record");

    sleep(Duration::from_secs(11)).await;
    let record = h.coordinator.store().record(TAB).expect("fresh record survives");
    assert_eq!(record.flow, fresh.flow);
    assert!(!h.coordinator.store().is_oauth_whitelisted(TAB));
    assert_eq!(h.browser.prompts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn closing_an_untracked_tab_is_quiet() {
    let h = harness();
    h.coordinator.on_tab_removed(TAB).await;
    h.settle().await;
    assert_eq!(h.coordinator.metrics().tabs_cleaned, 0);
}

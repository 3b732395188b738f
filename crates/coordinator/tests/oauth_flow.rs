mod common;

use std::time::Duration;

use common::*;
use snauth_coordinator::{CoordinatorEvent, RuntimeMessage};
use tokio::time::{sleep, Instant};

#[tokio::test(start_paused = true)]
async fn choosing_oauth_replays_the_redirect_then_cleans_up() {
    let mut h = harness();
    h.intercept_and_prompt().await;

    h.coordinator
        .handle_message(RuntimeMessage::UseOAuth { tab_id: TAB });
    let chosen_at = Instant::now();
    assert!(h.coordinator.store().is_oauth_whitelisted(TAB));

    h.wait_for(|e| matches!(e, CoordinatorEvent::OAuthDispatched { .. }))
        .await;
    let dispatched_at = Instant::now();
    assert!(dispatched_at - chosen_at >= Duration::from_millis(100));
    assert_eq!(h.browser.navigations_for(TAB), vec![REDIRECT.to_string()]);

    // The replayed redirect and anything after it are let through.
    assert!(!h.navigate(REDIRECT));
    assert!(!h.navigate(SSO));

    let released = h
        .wait_for(|e| matches!(e, CoordinatorEvent::StateReleased { .. }))
        .await;
    assert!(Instant::now() - dispatched_at >= Duration::from_secs(10));
    assert!(matches!(
        released,
        CoordinatorEvent::StateReleased { released, .. }
            if released.intercepted && released.oauth_whitelisted && !released.admin_login
    ));
    assert!(h.coordinator.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn prompt_failure_falls_back_to_oauth() {
    let mut h = harness();
    h.browser.set_prompts_unavailable(true);

    assert!(h.navigate(REDIRECT));
    h.wait_for(|e| matches!(e, CoordinatorEvent::PromptFallback { .. }))
        .await;
    assert!(h.coordinator.store().is_oauth_whitelisted(TAB));

    h.wait_for(|e| matches!(e, CoordinatorEvent::OAuthDispatched { .. }))
        .await;
    assert_eq!(h.browser.navigations_for(TAB), vec![REDIRECT.to_string()]);
    assert!(h.browser.prompts().is_empty());

    sleep(Duration::from_secs(11)).await;
    assert!(h.coordinator.snapshot().is_empty());
    assert_eq!(h.coordinator.metrics().prompt_fallbacks, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_oauth_navigation_keeps_the_record() {
    let mut h = harness();
    h.intercept_and_prompt().await;
    h.browser.fail_next_updates(TAB, 1);

    h.coordinator
        .handle_message(RuntimeMessage::UseOAuth { tab_id: TAB });
    h.wait_for(|e| matches!(e, CoordinatorEvent::NavigationFailed { .. }))
        .await;

    assert!(!h.coordinator.store().is_oauth_whitelisted(TAB));
    assert!(h.coordinator.store().is_intercepted(TAB));

    // Until the tab closes, further redirects are cancelled without a prompt.
    assert!(h.navigate(REDIRECT));
    h.settle().await;
    assert_eq!(h.browser.prompts().len(), 1);

    h.coordinator.on_tab_removed(TAB).await;
    assert!(h.coordinator.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn oauth_request_without_record_is_ignored() {
    let h = harness();
    h.coordinator
        .handle_message(RuntimeMessage::UseOAuth { tab_id: TAB });
    sleep(Duration::from_secs(1)).await;

    assert!(h.browser.navigations().is_empty());
    assert!(h.coordinator.snapshot().is_empty());
}

//! Scripted browser sessions replayed against the in-memory browser.
//!
//! A scenario declares the tabs that exist up front and then a list of steps: navigations seen by
//! the interception hook, tab status updates, the user's answer to the prompt, tab closures and
//! failure injection. [`simulate`] replays it on a paused tokio clock, so the coordinator's real
//! timings apply but the replay finishes instantly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snauth_coordinator::memory::{InMemoryBrowser, Navigation};
use snauth_coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorEvent, MetricsSnapshot, PromptRequest,
    RequestDetails, RuntimeMessage,
};
use snauth_core_types::{FrameType, LoadStatus, TabId};
use snauth_navigation::InstanceRegistry;
use snauth_tab_state::StoreSnapshot;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;

const DEFAULT_DRAIN_MS: u64 = 15_000;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse scenario {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("scenario has no steps")]
    Empty,
    #[error("step {index} refers to tab {tab}, which is never opened")]
    UnknownTab { index: usize, tab: TabId },
    #[error("failed to start the simulation runtime: {0}")]
    Runtime(std::io::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    /// Overrides the configured instance list for this run.
    #[serde(default)]
    pub instances: Option<Vec<String>>,
    /// Overrides the configured coordinator timings for this run.
    #[serde(default)]
    pub coordinator: Option<CoordinatorConfig>,
    #[serde(default)]
    pub tabs: Vec<TabSetup>,
    pub steps: Vec<Step>,
    /// Virtual time allowed for pending timers after the last step.
    #[serde(default = "default_drain_ms")]
    pub drain_ms: u64,
}

fn default_drain_ms() -> u64 {
    DEFAULT_DRAIN_MS
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabSetup {
    pub id: TabId,
    /// Current page; omitted for a tab that has not loaded anything.
    #[serde(default)]
    pub url: Option<String>,
}

/// The user's answer in the prompt window.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Choice {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "oauth")]
    OAuth,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// A request reaching the interception hook.
    Navigate {
        tab: TabId,
        url: String,
        #[serde(default = "main_frame")]
        frame: FrameType,
    },
    TabUpdated {
        tab: TabId,
        #[serde(default)]
        status: Option<LoadStatus>,
        #[serde(default)]
        url: Option<String>,
    },
    Choose {
        tab: TabId,
        choice: Choice,
    },
    /// Leave the prompt alone until its countdown picks OAuth.
    LetPromptExpire {
        tab: TabId,
    },
    OpenTab {
        tab: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    CloseTab {
        tab: TabId,
    },
    UpdateInstances {
        instances: Vec<String>,
    },
    FailNextUpdate {
        tab: TabId,
        #[serde(default = "one")]
        count: usize,
    },
    FailLookups {
        tab: TabId,
    },
    FailPrompts {
        #[serde(default = "enabled")]
        enabled: bool,
    },
    Wait {
        ms: u64,
    },
}

fn main_frame() -> FrameType {
    FrameType::MainFrame
}

fn one() -> usize {
    1
}

fn enabled() -> bool {
    true
}

impl Step {
    fn tab(&self) -> Option<TabId> {
        match self {
            Step::Navigate { tab, .. }
            | Step::TabUpdated { tab, .. }
            | Step::Choose { tab, .. }
            | Step::LetPromptExpire { tab }
            | Step::OpenTab { tab, .. }
            | Step::CloseTab { tab }
            | Step::FailNextUpdate { tab, .. }
            | Step::FailLookups { tab } => Some(*tab),
            Step::UpdateInstances { .. } | Step::FailPrompts { .. } | Step::Wait { .. } => None,
        }
    }
}

impl Scenario {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub async fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScenarioError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(&raw).map_err(|source| ScenarioError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Every step must target a tab declared up front or opened by an earlier step.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.steps.is_empty() {
            return Err(ScenarioError::Empty);
        }
        let mut known: HashSet<TabId> = self.tabs.iter().map(|tab| tab.id).collect();
        for (index, step) in self.steps.iter().enumerate() {
            if let Step::OpenTab { tab, .. } = step {
                known.insert(*tab);
                continue;
            }
            if let Some(tab) = step.tab() {
                if !known.contains(&tab) {
                    return Err(ScenarioError::UnknownTab { index, tab });
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RequestOutcome {
    pub step: usize,
    pub at_ms: u64,
    pub tab: TabId,
    pub url: String,
    pub cancelled: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TimedEvent {
    pub at_ms: u64,
    pub event: CoordinatorEvent,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub name: Option<String>,
    pub elapsed_ms: u64,
    pub requests: Vec<RequestOutcome>,
    pub events: Vec<TimedEvent>,
    pub navigations: Vec<Navigation>,
    pub prompts: Vec<PromptRequest>,
    pub state: StoreSnapshot,
    pub metrics: MetricsSnapshot,
}

impl ScenarioReport {
    pub fn cancelled(&self) -> impl Iterator<Item = &RequestOutcome> {
        self.requests.iter().filter(|request| request.cancelled)
    }
}

/// Replay `scenario` on a fresh single-threaded runtime with a paused clock.
///
/// Must not be called from inside another runtime's worker thread.
pub fn simulate(scenario: &Scenario, config: &Config) -> Result<ScenarioReport, ScenarioError> {
    scenario.validate()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(ScenarioError::Runtime)?;
    Ok(runtime.block_on(run(scenario, config)))
}

/// Replay `scenario` on the current runtime.
pub async fn run(scenario: &Scenario, config: &Config) -> ScenarioReport {
    let coordinator_config = scenario
        .coordinator
        .clone()
        .unwrap_or_else(|| config.coordinator.clone());
    let instances = scenario.instances.as_ref().unwrap_or(&config.instances);
    let registry = Arc::new(InstanceRegistry::with_instances(instances));

    let browser = InMemoryBrowser::new();
    for tab in &scenario.tabs {
        open_tab(&browser, tab.id, tab.url.as_deref());
    }
    let coordinator = Coordinator::new(
        coordinator_config.clone(),
        registry,
        browser.clone(),
        browser.clone(),
    );

    let started = Instant::now();
    let (stop, stopped) = oneshot::channel();
    let collector = collect_events(coordinator.subscribe(), started, stopped);
    info!(
        name = scenario.name.as_deref().unwrap_or("unnamed"),
        steps = scenario.steps.len(),
        "replaying scenario"
    );

    let mut requests = Vec::new();
    for (index, step) in scenario.steps.iter().enumerate() {
        debug!(step = index, ?step, "replaying step");
        match step {
            Step::Navigate { tab, url, frame } => {
                let details = RequestDetails {
                    tab: *tab,
                    url: url.clone(),
                    frame_type: *frame,
                };
                let response = coordinator.on_before_request(&details);
                if !response.cancel && frame.is_top_level() {
                    browser.open_tab(*tab, url.clone());
                }
                requests.push(RequestOutcome {
                    step: index,
                    at_ms: elapsed_ms(started),
                    tab: *tab,
                    url: url.clone(),
                    cancelled: response.cancel,
                });
            }
            Step::TabUpdated { tab, status, url } => {
                if let Some(url) = url {
                    browser.open_tab(*tab, url.clone());
                }
                coordinator.on_tab_updated(*tab, *status, url.clone()).await;
            }
            Step::Choose { tab, choice } => {
                let message = match choice {
                    Choice::Admin => RuntimeMessage::UseAdminLogin { tab_id: *tab },
                    Choice::OAuth => RuntimeMessage::UseOAuth { tab_id: *tab },
                };
                coordinator.handle_message(message);
            }
            Step::LetPromptExpire { tab } => {
                sleep(coordinator_config.prompt_countdown()).await;
                coordinator.handle_message(RuntimeMessage::UseOAuth { tab_id: *tab });
            }
            Step::OpenTab { tab, url } => open_tab(&browser, *tab, url.as_deref()),
            Step::CloseTab { tab } => {
                browser.close_tab(*tab);
                coordinator.on_tab_removed(*tab).await;
            }
            Step::UpdateInstances { instances } => {
                coordinator.handle_message(RuntimeMessage::UpdateInstances {
                    instances: instances.clone(),
                });
            }
            Step::FailNextUpdate { tab, count } => browser.fail_next_updates(*tab, *count),
            Step::FailLookups { tab } => browser.fail_lookups_for(*tab),
            Step::FailPrompts { enabled } => browser.set_prompts_unavailable(*enabled),
            Step::Wait { ms } => sleep(Duration::from_millis(*ms)).await,
        }
        tokio::task::yield_now().await;
    }

    sleep(Duration::from_millis(scenario.drain_ms)).await;
    let _ = stop.send(());
    let events = match collector.await {
        Ok(events) => events,
        Err(err) => {
            warn!(error = %err, "event collector stopped unexpectedly");
            Vec::new()
        }
    };

    ScenarioReport {
        name: scenario.name.clone(),
        elapsed_ms: elapsed_ms(started),
        requests,
        events,
        navigations: browser.navigations(),
        prompts: browser.prompts(),
        state: coordinator.snapshot(),
        metrics: coordinator.metrics(),
    }
}

fn open_tab(browser: &InMemoryBrowser, tab: TabId, url: Option<&str>) {
    match url {
        Some(url) => browser.open_tab(tab, url),
        None => browser.open_empty_tab(tab),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn collect_events(
    mut events: broadcast::Receiver<CoordinatorEvent>,
    started: Instant,
    mut stop: oneshot::Receiver<()>,
) -> JoinHandle<Vec<TimedEvent>> {
    tokio::spawn(async move {
        let mut log = Vec::new();
        loop {
            tokio::select! {
                biased;
                received = events.recv() => match received {
                    Ok(event) => log.push(TimedEvent { at_ms: elapsed_ms(started), event }),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "scenario event log lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = &mut stop => {
                    while let Ok(event) = events.try_recv() {
                        log.push(TimedEvent { at_ms: elapsed_ms(started), event });
                    }
                    break;
                }
            }
        }
        log
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_step_kind() {
        let scenario = Scenario::from_yaml(
            r#"
name: kitchen sink
tabs:
  - id: 1
    url: https://foo.service-now.com/incident.do
steps:
  - step: navigate
    tab: 1
    url: https://foo.service-now.com/sso.do
  - step: navigate
    tab: 1
    url: https://foo.service-now.com/sso.do
    frame: sub_frame
  - step: tab_updated
    tab: 1
    status: complete
    url: https://foo.service-now.com/home.do
  - step: choose
    tab: 1
    choice: admin
  - step: let_prompt_expire
    tab: 1
  - step: open_tab
    tab: 2
  - step: close_tab
    tab: 2
  - step: update_instances
    instances: [foo.service-now.com]
  - step: fail_next_update
    tab: 1
  - step: fail_lookups
    tab: 1
  - step: fail_prompts
  - step: wait
    ms: 250
"#,
        )
        .expect("parse");

        assert_eq!(scenario.steps.len(), 12);
        assert_eq!(scenario.drain_ms, DEFAULT_DRAIN_MS);
        assert_eq!(
            scenario.steps[1],
            Step::Navigate {
                tab: TabId(1),
                url: "https://foo.service-now.com/sso.do".into(),
                frame: FrameType::SubFrame,
            }
        );
        assert_eq!(
            scenario.steps[8],
            Step::FailNextUpdate {
                tab: TabId(1),
                count: 1
            }
        );
        assert_eq!(scenario.steps[10], Step::FailPrompts { enabled: true });
        scenario.validate().expect("valid");
    }

    #[test]
    fn steps_on_undeclared_tabs_are_rejected() {
        let scenario = Scenario::from_yaml(
            r#"
steps:
  - step: close_tab
    tab: 4
"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::UnknownTab { index: 0, tab: TabId(4) })
        ));

        let empty = Scenario::from_yaml("steps: []").unwrap();
        assert!(matches!(empty.validate(), Err(ScenarioError::Empty)));
    }

    #[test]
    fn prompt_expiry_takes_the_oauth_path() {
        let scenario = Scenario::from_yaml(
            r#"
instances: [foo.service-now.com]
tabs:
  - id: 3
    url: https://foo.service-now.com/incident.do
steps:
  - step: navigate
    tab: 3
    url: https://foo.service-now.com/oauth_redirect.do
  - step: let_prompt_expire
    tab: 3
"#,
        )
        .unwrap();

        let report = simulate(&scenario, &Config::default()).expect("simulate");
        assert_eq!(report.prompts.len(), 1);
        assert_eq!(report.navigations.len(), 1);
        assert_eq!(
            report.navigations[0].url,
            "https://foo.service-now.com/oauth_redirect.do"
        );
        assert!(report.state.is_empty());
        assert!(report.elapsed_ms >= 10_000);

        let dispatched = report
            .events
            .iter()
            .find(|timed| matches!(timed.event, CoordinatorEvent::OAuthDispatched { .. }))
            .expect("dispatched");
        assert!(dispatched.at_ms >= 10_100);
    }
}

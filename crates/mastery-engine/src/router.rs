//! Post-outcome routing.
//!
//! The router shows the outcome for an observation delay, then clears the
//! attempt's scores and navigates. Clear always happens before navigate, so a
//! restarted attempt can never see scores of the previous one. The clear goes
//! through the attempt's own handle: if another attempt opened the unit
//! during the delay, its session is left alone.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mastery_core::obs;
use mastery_core::{Outcome, Route, UnitRoutes, METRICS};
use mastery_store::{ScoreStore, SessionHandle};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::signal::{CountdownPurpose, EngineEvent, EventSink, LearnerSignal};
use crate::timer::Countdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Passed: go to the next unit.
    Advance,
    /// Failed: start this unit over from its first task.
    Restart,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Advance => "advance",
            TransitionKind::Restart => "restart",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A navigation that has been performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub kind: TransitionKind,
    pub route: Route,
    /// The learner cut the observation delay short.
    pub skipped_delay: bool,
}

/// Performs navigation on the learner-facing surface.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &Route);
}

/// Navigator that only remembers where it was sent.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    visited: Mutex<Vec<Route>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<Route> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.visited().pop()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, route: &Route) {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.clone());
    }
}

pub struct Router {
    store: Arc<dyn ScoreStore>,
    navigator: Arc<dyn Navigator>,
    delay: Duration,
    events: EventSink,
}

impl Router {
    pub fn new(store: Arc<dyn ScoreStore>, navigator: Arc<dyn Navigator>, delay: Duration) -> Self {
        Self {
            store,
            navigator,
            delay,
            events: EventSink::disabled(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Where an outcome leads. Remediation is always a full restart.
    pub fn destination(outcome: &Outcome, routes: &UnitRoutes) -> (TransitionKind, Route) {
        if outcome.passed {
            (TransitionKind::Advance, routes.advance.clone())
        } else {
            (TransitionKind::Restart, routes.restart.clone())
        }
    }

    /// Wait out the observation delay, then clear the attempt's session and
    /// navigate.
    ///
    /// `ContinueNow` or `Leave` ends the wait early; the clear and navigate
    /// sequence is the same either way.
    pub async fn transition(
        &self,
        session: &SessionHandle,
        outcome: &Outcome,
        routes: &UnitRoutes,
        signals: &mut mpsc::Receiver<LearnerSignal>,
    ) -> Transition {
        let (kind, route) = Self::destination(outcome, routes);
        let skipped_delay = self.observe(signals).await;

        if let Err(e) = self.store.clear(session).await {
            warn!(unit = %outcome.unit, error = %e, "Failed to clear session before navigating");
        }
        self.navigator.navigate(&route);

        match kind {
            TransitionKind::Advance => METRICS.inc_advances(),
            TransitionKind::Restart => METRICS.inc_restarts(),
        }
        obs::emit_transition(
            &outcome.unit.to_string(),
            kind.as_str(),
            route.as_str(),
            skipped_delay,
        );

        let transition = Transition {
            kind,
            route,
            skipped_delay,
        };
        self.events.emit(EngineEvent::Navigated {
            transition: transition.clone(),
        });
        transition
    }

    /// Returns `true` when the learner ended the delay early.
    async fn observe(&self, signals: &mut mpsc::Receiver<LearnerSignal>) -> bool {
        if self.delay.is_zero() {
            return false;
        }
        let events = self.events.clone();
        let mut countdown = Countdown::start(self.delay, move |remaining_secs| {
            events.emit(EngineEvent::Countdown {
                purpose: CountdownPurpose::Transition,
                remaining_secs,
            })
        });

        let mut closed = false;
        loop {
            tokio::select! {
                _ = countdown.expired() => return false,
                signal = signals.recv(), if !closed => match signal {
                    Some(LearnerSignal::ContinueNow | LearnerSignal::Leave) => {
                        countdown.cancel();
                        return true;
                    }
                    Some(other) => debug!(signal = ?other, "Ignoring signal during observation delay"),
                    None => closed = true,
                },
            }
        }
    }
}

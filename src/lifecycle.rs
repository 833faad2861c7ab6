//! Worker lifecycle as an explicit finite-state machine.
//!
//! The three handlers (install, activate, fetch) share one lifecycle.
//! `step` is a pure transition function from phase and event to the next
//! phase plus the client-control signals to emit, which keeps the
//! ordering rules testable without a host runtime.

use tracing::warn;

/// Where a worker version is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, install not yet started.
    New,
    /// Install handler running.
    Installing,
    /// Installed, waiting to be activated.
    Waiting,
    /// Authoritative version, controls clients.
    Active,
    /// Failed install or superseded by a newer version.
    Redundant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    InstallStarted,
    InstallSucceeded,
    InstallFailed,
    Activated,
    Superseded,
}

/// Client-control side effects a transition asks the host for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    SkipWaiting,
    ClaimClients,
}

/// Pure lifecycle transition. Out-of-order events keep the current phase
/// and emit nothing.
pub fn step(phase: Phase, event: LifecycleEvent) -> (Phase, Vec<Signal>) {
    match (phase, event) {
        (Phase::New, LifecycleEvent::InstallStarted) => (Phase::Installing, vec![]),
        (Phase::Installing, LifecycleEvent::InstallSucceeded) => {
            (Phase::Waiting, vec![Signal::SkipWaiting])
        }
        (Phase::Installing, LifecycleEvent::InstallFailed) => (Phase::Redundant, vec![]),
        (Phase::Waiting, LifecycleEvent::Activated) => (Phase::Active, vec![Signal::ClaimClients]),
        (Phase::Active, LifecycleEvent::Superseded) => (Phase::Redundant, vec![]),
        (phase, event) => {
            warn!(?phase, ?event, "ignoring out-of-order lifecycle event");
            (phase, vec![])
        }
    }
}

/// Mutable wrapper the worker holds.
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { phase: Phase::New }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Apply an event, returning the signals to forward to the host.
    pub fn apply(&mut self, event: LifecycleEvent) -> Vec<Signal> {
        let (next, signals) = step(self.phase, event);
        self.phase = next;
        signals
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Host controller capability.
//!
//! The worker never talks to its host runtime directly; lifecycle signals
//! go through this injected capability object, so the core logic runs and
//! tests without a real host.

use tracing::debug;

/// Client-control operations the host runtime exposes to the worker.
pub trait HostController: Send + Sync {
    /// Ask the host to promote this worker version without waiting for old
    /// clients to close.
    fn skip_waiting(&self);

    /// Ask the host to hand control of already-open clients to this worker.
    fn claim_clients(&self);
}

/// Host controller for embeddings with no lifecycle integration. Signals
/// are logged and dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedHost;

impl HostController for DetachedHost {
    fn skip_waiting(&self) {
        debug!("skip-waiting signaled with no host attached");
    }

    fn claim_clients(&self) {
        debug!("claim-clients signaled with no host attached");
    }
}

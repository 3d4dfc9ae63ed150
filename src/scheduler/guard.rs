//! Skip-if-running guard for scheduled runs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

/// Single-slot flag shared by all firings of one job.
#[derive(Debug, Clone, Default)]
pub struct OverlapGuard {
    running: Arc<AtomicBool>,
}

impl OverlapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot without waiting. `None` if a run already holds it.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// RAII permit that frees the [`OverlapGuard`] slot on drop, including when
/// the run unwinds.
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        debug!("Run permit released");
    }
}

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::report::TERMINAL_STATUS;

/// Host callback receiving the job's new status.
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Fires the host callback at most once per tracking session.
pub struct TerminalNotifier {
    callback: Option<StatusCallback>,
    fired: AtomicBool,
}

impl TerminalNotifier {
    pub fn new(callback: Option<StatusCallback>) -> Self {
        Self {
            callback,
            fired: AtomicBool::new(false),
        }
    }

    /// Report completion. Returns true only for the call that fired.
    pub fn notify(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(callback) = &self.callback {
            callback(TERMINAL_STATUS);
        }
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for TerminalNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalNotifier")
            .field("has_callback", &self.callback.is_some())
            .field("fired", &self.has_fired())
            .finish()
    }
}

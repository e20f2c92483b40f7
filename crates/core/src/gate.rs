//! Distinguishes "user closed the window" from "the program is quitting".

use crate::shell::Shell;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide close gate.
///
/// Holds `true` until a quit begins. The quit action flips it before asking
/// the shell to terminate, so the close request that termination produces
/// is allowed through instead of hiding the window again.
#[derive(Debug)]
pub struct LifecycleGate {
    user_initiated_close: AtomicBool,
}

/// Answer to a window close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Window was hidden; keep the process running
    Prevent,
    Allow,
}

impl LifecycleGate {
    pub fn new() -> Self {
        Self {
            user_initiated_close: AtomicBool::new(true),
        }
    }

    pub fn is_user_initiated_close(&self) -> bool {
        self.user_initiated_close.load(Ordering::SeqCst)
    }

    /// Mark a program-initiated quit as in progress
    pub fn begin_quit(&self) {
        if self.user_initiated_close.swap(false, Ordering::SeqCst) {
            tracing::info!("Quit requested, window close will be allowed");
        }
    }

    /// Hide instead of closing while the close is user-initiated
    pub fn on_close_requested(&self, shell: &dyn Shell) -> CloseDecision {
        if self.is_user_initiated_close() {
            tracing::debug!("Close requested by user, hiding window");
            shell.hide_window();
            CloseDecision::Prevent
        } else {
            tracing::debug!("Close requested during quit, allowing");
            CloseDecision::Allow
        }
    }
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::new()
    }
}

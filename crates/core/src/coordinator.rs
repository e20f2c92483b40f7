//! Binds the scheduler, the close gate and the shell together.
//!
//! Both control surfaces (window and tray) act only through this type, so
//! the quit ordering lives in one place:
//! 1. remove the tray icon
//! 2. flip the lifecycle gate
//! 3. stop the scheduler (joins the loop thread)
//! 4. ask the shell to terminate

use crate::error::{ChangeError, SchedulerError};
use crate::feed::Candidate;
use crate::gate::{CloseDecision, LifecycleGate};
use crate::scheduler::{ChangeOutcome, Scheduler, Selection};
use crate::shell::Shell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Coordinator {
    scheduler: Arc<Scheduler>,
    gate: Arc<LifecycleGate>,
    shell: Arc<dyn Shell>,
    quitting: AtomicBool,
}

impl Coordinator {
    pub fn new(scheduler: Arc<Scheduler>, gate: Arc<LifecycleGate>, shell: Arc<dyn Shell>) -> Self {
        Self {
            scheduler,
            gate,
            shell,
            quitting: AtomicBool::new(false),
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn gate(&self) -> &Arc<LifecycleGate> {
        &self.gate
    }

    pub fn start(&self) -> Result<(), SchedulerError> {
        self.scheduler.start()
    }

    pub fn show_window(&self) {
        self.shell.show_window();
    }

    pub fn change_now(&self, selection: Selection) -> Result<ChangeOutcome, ChangeError> {
        self.scheduler.change_now(selection)
    }

    pub fn apply_candidate(&self, candidate: &Candidate) -> Result<ChangeOutcome, ChangeError> {
        self.scheduler.apply_candidate(candidate)
    }

    pub fn candidates(&self) -> Result<Vec<Candidate>, ChangeError> {
        self.scheduler.candidates()
    }

    pub fn thumbnail(&self, candidate: &Candidate) -> Result<Vec<u8>, ChangeError> {
        self.scheduler.thumbnail(candidate)
    }

    pub fn handle_close_request(&self) -> CloseDecision {
        self.gate.on_close_requested(self.shell.as_ref())
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    /// Full quit sequence. Only the first call has any effect.
    pub fn quit(&self) {
        if self.quitting.swap(true, Ordering::SeqCst) {
            tracing::debug!("Quit already in progress");
            return;
        }

        tracing::info!("Quitting");
        self.shell.remove_tray();
        self.gate.begin_quit();
        self.scheduler.stop();
        self.shell.quit_process();
    }

    /// Stop background work after the window runtime has returned
    pub fn shutdown(&self) {
        self.scheduler.stop();
    }
}

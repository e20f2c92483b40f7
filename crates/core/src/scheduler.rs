//! Wallpaper scheduler
//!
//! Architecture:
//! - One supervised background thread changes the wallpaper every interval
//! - `change_now` may be called from any thread (tray, window) at any time
//! - A single-flight slot guarantees at most one change runs at a time;
//!   a request arriving while one runs is dropped and reported as `Skipped`
//! - `stop` fires a one-shot cancellation signal and joins the thread

use crate::applier::{AppliedWallpaper, WallpaperApplier};
use crate::config::{AppConfig, MAX_CANDIDATES};
use crate::error::{ChangeError, SchedulerError};
use crate::feed::{Candidate, WallpaperFeed};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use parking_lot::Mutex;
use rand::Rng;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How a candidate is chosen from the fetched list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Newest image; used by the automatic cycle
    First,
    /// Uniformly random; used by manual "change now"
    Random,
}

impl Selection {
    pub fn pick(self, candidates: &[Candidate]) -> Option<&Candidate> {
        self.pick_with(candidates, &mut rand::rng())
    }

    fn pick_with<'a, R: Rng + ?Sized>(
        self,
        candidates: &'a [Candidate],
        rng: &mut R,
    ) -> Option<&'a Candidate> {
        if candidates.is_empty() {
            return None;
        }
        match self {
            Selection::First => candidates.first(),
            Selection::Random => candidates.get(rng.random_range(0..candidates.len())),
        }
    }
}

/// Non-error result of a change request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied {
        candidate: Candidate,
        wallpaper: AppliedWallpaper,
    },
    /// The feed returned an empty list; nothing was touched
    NoCandidates,
    /// Another change was already in flight
    Skipped,
}

impl ChangeOutcome {
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            ChangeOutcome::Applied { wallpaper, .. } => Some(&wallpaper.local_path),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOutcome::Applied {
                candidate,
                wallpaper,
            } => {
                let name = if candidate.title.is_empty() {
                    candidate.url.as_str()
                } else {
                    candidate.title.as_str()
                };
                write!(f, "Applied \"{}\" ({})", name, wallpaper.local_path.display())
            }
            ChangeOutcome::NoCandidates => write!(f, "No wallpapers available right now"),
            ChangeOutcome::Skipped => write!(f, "A wallpaper change is already in progress"),
        }
    }
}

/// At most one holder at a time; acquisition never blocks
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

impl SingleFlight {
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flight: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the slot on drop, including on unwind
pub struct FlightGuard<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.busy.store(false, Ordering::Release);
    }
}

/// One-shot stop token.
///
/// Firing drops the only sender, which disconnects the channel: every
/// current and future `recv` on the observer returns immediately.
pub struct CancellationSignal {
    trigger: Mutex<Option<Sender<()>>>,
    observer: Receiver<()>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            trigger: Mutex::new(Some(tx)),
            observer: rx,
        }
    }

    /// Returns true only for the call that actually fired
    pub fn fire(&self) -> bool {
        self.trigger.lock().take().is_some()
    }

    pub fn is_fired(&self) -> bool {
        self.trigger.lock().is_none()
    }

    pub fn observer(&self) -> Receiver<()> {
        self.observer.clone()
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of the background loop; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Active,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    pub interval: Duration,
    pub candidate_count: usize,
    /// Run one automatic change as soon as the loop starts
    pub apply_on_startup: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            candidate_count: MAX_CANDIDATES,
            apply_on_startup: false,
        }
    }
}

impl From<&AppConfig> for ScheduleOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            interval: config.refresh_interval(),
            candidate_count: config.candidate_count(),
            apply_on_startup: config.apply_on_startup,
        }
    }
}

struct LoopControl {
    state: LoopState,
    worker: Option<JoinHandle<()>>,
}

/// Owns the periodic loop and serializes every wallpaper change
pub struct Scheduler {
    feed: Arc<dyn WallpaperFeed>,
    applier: Arc<dyn WallpaperApplier>,
    options: ScheduleOptions,
    flight: SingleFlight,
    cancel: CancellationSignal,
    control: Mutex<LoopControl>,
}

impl Scheduler {
    pub fn new(
        feed: Arc<dyn WallpaperFeed>,
        applier: Arc<dyn WallpaperApplier>,
        options: ScheduleOptions,
    ) -> Self {
        Self {
            feed,
            applier,
            options,
            flight: SingleFlight::default(),
            cancel: CancellationSignal::new(),
            control: Mutex::new(LoopControl {
                state: LoopState::NotStarted,
                worker: None,
            }),
        }
    }

    pub fn state(&self) -> LoopState {
        self.control.lock().state
    }

    pub fn is_changing(&self) -> bool {
        self.flight.is_busy()
    }

    /// Spawn the periodic loop. Valid once, and only before `stop`.
    pub fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let mut control = self.control.lock();
        match control.state {
            LoopState::Active => return Err(SchedulerError::AlreadyStarted),
            LoopState::Stopped => return Err(SchedulerError::AlreadyStopped),
            LoopState::NotStarted => {}
        }

        let scheduler = Arc::clone(self);
        let ticker = tick(self.options.interval);
        let cancelled = self.cancel.observer();

        let worker = thread::Builder::new()
            .name("bing-wallpaper-scheduler".to_string())
            .spawn(move || scheduler.run_loop(ticker, cancelled))
            .map_err(|e| SchedulerError::Spawn(e.to_string()))?;

        control.worker = Some(worker);
        control.state = LoopState::Active;
        tracing::info!(
            interval_secs = self.options.interval.as_secs(),
            "Wallpaper scheduler started"
        );
        Ok(())
    }

    /// Cancel the loop and wait for it to exit.
    ///
    /// Idempotent: later calls return immediately without blocking.
    pub fn stop(&self) {
        let worker = {
            let mut control = self.control.lock();
            if control.state == LoopState::Stopped {
                return;
            }
            control.state = LoopState::Stopped;
            self.cancel.fire();
            control.worker.take()
        };

        tracing::info!("Wallpaper scheduler stopping");

        if let Some(handle) = worker {
            // Joining from the loop thread itself would deadlock
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Wallpaper scheduler thread panicked");
            }
        }
        tracing::info!("Wallpaper scheduler stopped");
    }

    fn run_loop(&self, ticker: Receiver<std::time::Instant>, cancelled: Receiver<()>) {
        if self.options.apply_on_startup && !self.cancel.is_fired() {
            tracing::info!("Applying wallpaper on startup");
            self.run_cycle();
        }

        loop {
            select! {
                recv(ticker) -> _ => {
                    if self.cancel.is_fired() {
                        break;
                    }
                    tracing::debug!("Scheduler tick");
                    self.run_cycle();
                }
                recv(cancelled) -> _ => break,
            }
        }

        tracing::debug!("Wallpaper loop exited");
    }

    fn run_cycle(&self) {
        // Failures are logged inside change_now; the loop keeps going
        let _ = self.change_now(Selection::First);
    }

    /// Fetch candidates, pick one by `selection`, download and apply it.
    pub fn change_now(&self, selection: Selection) -> Result<ChangeOutcome, ChangeError> {
        let Some(_flight) = self.flight.try_acquire() else {
            tracing::info!(?selection, "Wallpaper change already in progress, request dropped");
            return Ok(ChangeOutcome::Skipped);
        };

        let result = self.fetch_and_apply(selection);
        log_result(&result);
        result
    }

    /// Apply a specific candidate, sharing the single-flight slot.
    pub fn apply_candidate(&self, candidate: &Candidate) -> Result<ChangeOutcome, ChangeError> {
        let Some(_flight) = self.flight.try_acquire() else {
            tracing::info!(url = %candidate.url, "Wallpaper change already in progress, request dropped");
            return Ok(ChangeOutcome::Skipped);
        };

        let result = self
            .applier
            .apply(&candidate.url)
            .map(|wallpaper| ChangeOutcome::Applied {
                candidate: candidate.clone(),
                wallpaper,
            });
        log_result(&result);
        result
    }

    /// Current candidate list, without applying anything
    pub fn candidates(&self) -> Result<Vec<Candidate>, ChangeError> {
        self.feed.fetch(self.options.candidate_count)
    }

    /// Preview bytes for a candidate; does not take the change slot
    pub fn thumbnail(&self, candidate: &Candidate) -> Result<Vec<u8>, ChangeError> {
        self.feed.thumbnail(candidate)
    }

    fn fetch_and_apply(&self, selection: Selection) -> Result<ChangeOutcome, ChangeError> {
        let candidates = self.feed.fetch(self.options.candidate_count)?;

        let Some(candidate) = selection.pick(&candidates) else {
            return Ok(ChangeOutcome::NoCandidates);
        };

        tracing::info!(url = %candidate.url, title = %candidate.title, "Applying wallpaper");
        let wallpaper = self.applier.apply(&candidate.url)?;

        Ok(ChangeOutcome::Applied {
            candidate: candidate.clone(),
            wallpaper,
        })
    }
}

fn log_result(result: &Result<ChangeOutcome, ChangeError>) {
    match result {
        Ok(outcome) => tracing::info!("{}", outcome),
        Err(e) => tracing::error!(error = %e, "Wallpaper change failed"),
    }
}

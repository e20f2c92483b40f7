//! Bing Wallpaper Core Library
//!
//! Everything that runs without a display: fetching the daily image archive,
//! applying a wallpaper, the periodic scheduler and the lifecycle rules that
//! tie the window and the tray together.
//!
//! Architecture:
//! - `Scheduler` owns the background loop and the single-flight slot
//! - `Coordinator` is the only thing the window and tray talk to
//! - The runner binary implements `Shell` on top of iced and tray-icon

pub mod applier;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod feed;
pub mod gate;
pub mod scheduler;
pub mod shell;
pub mod tray;

#[cfg(test)]
mod test_server;

pub use applier::{AppliedWallpaper, DesktopApplier, SystemDesktop, WallpaperApplier};
pub use coordinator::Coordinator;
pub use error::{ChangeError, SchedulerError};
pub use feed::{BingFeed, Candidate, WallpaperFeed};
pub use gate::{CloseDecision, LifecycleGate};
pub use scheduler::{ChangeOutcome, LoopState, ScheduleOptions, Scheduler, Selection};
pub use shell::Shell;

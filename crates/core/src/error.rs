//! Error types for wallpaper changes and the scheduling loop.

use thiserror::Error;

/// Why a single wallpaper change failed.
///
/// Every variant is handled at the change operation itself: it is logged and
/// reported to the caller, never retried within the same cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeError {
    /// The image archive could not be reached or returned an unusable body.
    #[error("wallpaper feed unavailable: {0}")]
    FeedUnavailable(String),

    /// The selected image could not be downloaded or written to disk.
    #[error("wallpaper download failed: {0}")]
    DownloadFailed(String),

    /// The OS refused to set the desktop background.
    #[error("failed to apply wallpaper: {0}")]
    ApplyFailed(String),
}

/// Misuse of the scheduler's loop state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("scheduler loop is already running")]
    AlreadyStarted,

    #[error("scheduler has been stopped and cannot be restarted")]
    AlreadyStopped,

    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_error_display() {
        let err = ChangeError::FeedUnavailable("timed out".to_string());
        assert_eq!(err.to_string(), "wallpaper feed unavailable: timed out");

        let err = ChangeError::DownloadFailed("HTTP 404".to_string());
        assert_eq!(err.to_string(), "wallpaper download failed: HTTP 404");

        let err = ChangeError::ApplyFailed("access denied".to_string());
        assert_eq!(err.to_string(), "failed to apply wallpaper: access denied");
    }

    #[test]
    fn test_scheduler_error_display() {
        assert_eq!(
            SchedulerError::AlreadyStarted.to_string(),
            "scheduler loop is already running"
        );
        assert!(SchedulerError::Spawn("no threads".to_string())
            .to_string()
            .contains("no threads"));
    }
}

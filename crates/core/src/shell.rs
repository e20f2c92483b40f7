//! Window and tray runtime as seen by the coordinator.

/// Display primitives of the window and tray runtimes.
///
/// Implementations forward to their UI thread and must not block on it;
/// every method may be called from any thread.
pub trait Shell: Send + Sync {
    fn show_window(&self);
    fn hide_window(&self);
    fn remove_tray(&self);
    /// Ask the window runtime to exit. Produces a close request.
    fn quit_process(&self);
}

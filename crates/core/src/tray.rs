//! Tray command multiplexer
//!
//! The tray runtime pushes clicks into three channels (show, change now,
//! quit). One dispatcher thread waits on all three and handles them one at
//! a time in arrival order. No debouncing: every "change now" click runs a
//! full change, subject to the scheduler's single-flight slot.

use crate::coordinator::Coordinator;
use crate::scheduler::Selection;
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Producer side, owned by the tray runtime
#[derive(Clone)]
pub struct TraySenders {
    pub show: Sender<()>,
    pub change: Sender<()>,
    pub quit: Sender<()>,
}

/// Consumer side, owned by the dispatcher
pub struct TrayReceivers {
    pub show: Receiver<()>,
    pub change: Receiver<()>,
    pub quit: Receiver<()>,
}

pub fn tray_channels() -> (TraySenders, TrayReceivers) {
    let (show_tx, show_rx) = unbounded();
    let (change_tx, change_rx) = unbounded();
    let (quit_tx, quit_rx) = unbounded();
    (
        TraySenders {
            show: show_tx,
            change: change_tx,
            quit: quit_tx,
        },
        TrayReceivers {
            show: show_rx,
            change: change_rx,
            quit: quit_rx,
        },
    )
}

/// Why the dispatch loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchExit {
    Quit,
    /// The tray runtime went away without sending quit
    Disconnected,
}

/// Run until quit is clicked or the senders are dropped.
pub fn run_dispatch_loop(receivers: TrayReceivers, coordinator: &Coordinator) -> DispatchExit {
    tracing::debug!("Tray dispatcher running");

    loop {
        select! {
            recv(receivers.show) -> msg => {
                if msg.is_err() {
                    break;
                }
                tracing::debug!("Tray: show window");
                coordinator.show_window();
            }
            recv(receivers.change) -> msg => {
                if msg.is_err() {
                    break;
                }
                tracing::debug!("Tray: change wallpaper now");
                if let Err(e) = coordinator.change_now(Selection::Random) {
                    tracing::warn!(error = %e, "Tray wallpaper change failed");
                }
            }
            recv(receivers.quit) -> msg => {
                if msg.is_err() {
                    break;
                }
                tracing::info!("Tray: quit");
                coordinator.quit();
                return DispatchExit::Quit;
            }
        }
    }

    tracing::debug!("Tray channels closed, dispatcher exiting");
    DispatchExit::Disconnected
}

/// Run the dispatch loop on its own named thread
pub fn spawn_dispatcher(
    receivers: TrayReceivers,
    coordinator: Arc<Coordinator>,
) -> io::Result<JoinHandle<DispatchExit>> {
    thread::Builder::new()
        .name("bing-wallpaper-tray".to_string())
        .spawn(move || run_dispatch_loop(receivers, &coordinator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::{AppliedWallpaper, WallpaperApplier};
    use crate::error::ChangeError;
    use crate::feed::{Candidate, WallpaperFeed};
    use crate::gate::LifecycleGate;
    use crate::scheduler::{ScheduleOptions, Scheduler};
    use crate::shell::testing::RecordingShell;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OneFeed;

    impl WallpaperFeed for OneFeed {
        fn fetch(&self, _count: usize) -> Result<Vec<Candidate>, ChangeError> {
            Ok(vec![Candidate {
                url: "https://img.example/a.jpg".to_string(),
                title: "A".to_string(),
                copyright: String::new(),
                start_date: "20240101".to_string(),
            }])
        }
    }

    #[derive(Default)]
    struct CountingApplier {
        count: AtomicUsize,
    }

    impl WallpaperApplier for CountingApplier {
        fn apply(&self, _url: &str) -> Result<AppliedWallpaper, ChangeError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(AppliedWallpaper {
                local_path: PathBuf::from("a.jpg"),
            })
        }
    }

    fn coordinator(applier: Arc<CountingApplier>, shell: Arc<RecordingShell>) -> Arc<Coordinator> {
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(OneFeed),
            applier,
            ScheduleOptions::default(),
        ));
        Arc::new(Coordinator::new(
            scheduler,
            Arc::new(LifecycleGate::new()),
            shell,
        ))
    }

    #[test]
    fn test_every_change_click_runs() {
        let applier = Arc::new(CountingApplier::default());
        let shell = Arc::new(RecordingShell::default());
        let coordinator = coordinator(applier.clone(), shell.clone());
        let (senders, receivers) = tray_channels();
        let handle = spawn_dispatcher(receivers, coordinator).unwrap();

        for _ in 0..5 {
            senders.change.send(()).unwrap();
        }
        senders.show.send(()).unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while (applier.count.load(Ordering::SeqCst) < 5 || shell.calls().is_empty())
            && std::time::Instant::now() < deadline
        {
            thread::sleep(std::time::Duration::from_millis(5));
        }

        drop(senders);
        assert_eq!(handle.join().unwrap(), DispatchExit::Disconnected);
        assert_eq!(applier.count.load(Ordering::SeqCst), 5);
        assert_eq!(shell.calls(), vec!["show_window"]);
    }

    #[test]
    fn test_quit_ends_dispatcher() {
        let applier = Arc::new(CountingApplier::default());
        let shell = Arc::new(RecordingShell::default());
        let coordinator = coordinator(applier, shell.clone());
        coordinator.start().unwrap();

        let (senders, receivers) = tray_channels();
        let handle = spawn_dispatcher(receivers, coordinator.clone()).unwrap();

        senders.quit.send(()).unwrap();
        assert_eq!(handle.join().unwrap(), DispatchExit::Quit);

        assert_eq!(shell.calls(), vec!["remove_tray", "quit_process"]);
        assert!(!coordinator.gate().is_user_initiated_close());
        // Later clicks have no listener
        assert!(senders.show.send(()).is_err());
    }
}

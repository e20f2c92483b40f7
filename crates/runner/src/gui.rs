/// ICED window for Bing Wallpaper
///
/// Architecture:
/// - The window is one of two control surfaces; the tray is the other
/// - All actions go through the core `Coordinator`
/// - Blocking work (HTTP, disk) runs on short-lived named threads and reports
///   back through the `UiEvent` channel, which a subscription awaits without
///   tying up an executor thread
/// - `GuiShell` is the `Shell` implementation: it turns show/hide/quit
///   requests from any thread into `UiEvent`s handled on the UI thread
use crate::tray_icon::TrayIconManager;
use bing_wallpaper_core::tray::TraySenders;
use bing_wallpaper_core::{
    config, Candidate, ChangeError, ChangeOutcome, CloseDecision, Coordinator, Selection, Shell,
};
use iced::futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use iced::futures::StreamExt;
use iced::widget::{image, Button, Column, Container, Image, Row, Scrollable, Space, Text};
use iced::{
    event, executor, window, Alignment, Application, Command, Element, Event, Length, Settings,
    Size, Subscription, Theme,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Requests the coordinator makes of the window runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    Show,
    Hide,
    RemoveTray,
    Quit,
}

/// Everything that reaches the UI thread from other threads
#[derive(Debug, Clone)]
pub enum UiEvent {
    Shell(ShellCommand),
    Candidates(Result<Vec<Candidate>, ChangeError>),
    ChangeFinished(Result<ChangeOutcome, ChangeError>),
    Preview(Vec<u8>),
    Thumbnail { url: String, bytes: Vec<u8> },
}

/// Deliver `event` to the window, logging if it has already gone away
fn deliver(events: &UnboundedSender<UiEvent>, event: UiEvent) {
    if let Err(e) = events.unbounded_send(event) {
        tracing::debug!(event = ?e.into_inner(), "Window runtime has exited, event dropped");
    }
}

/// `Shell` backed by the iced window and the tray it owns
pub struct GuiShell {
    events: UnboundedSender<UiEvent>,
}

impl GuiShell {
    pub fn new(events: UnboundedSender<UiEvent>) -> Self {
        Self { events }
    }

    fn send(&self, command: ShellCommand) {
        deliver(&self.events, UiEvent::Shell(command));
    }
}

impl Shell for GuiShell {
    fn show_window(&self) {
        self.send(ShellCommand::Show);
    }

    fn hide_window(&self) {
        self.send(ShellCommand::Hide);
    }

    fn remove_tray(&self) {
        self.send(ShellCommand::RemoveTray);
    }

    fn quit_process(&self) {
        self.send(ShellCommand::Quit);
    }
}

/// Startup flags for the window
pub struct GuiFlags {
    pub coordinator: Arc<Coordinator>,
    pub events: UnboundedReceiver<UiEvent>,
    pub event_sender: UnboundedSender<UiEvent>,
    pub tray_senders: TraySenders,
    pub image_path: PathBuf,
}

#[derive(Debug, Clone)]
pub enum Message {
    InstallTray,
    Ui(UiEvent),
    CloseRequested,
    Refresh,
    ChangeNow,
    ApplyCandidate(usize),
    OpenFolder,
}

/// Subscription state: the receiver is handed over once, on first poll
enum UiEventSource {
    Pending(Arc<Mutex<Option<UnboundedReceiver<UiEvent>>>>),
    Ready(UnboundedReceiver<UiEvent>),
}

/// Await the next `UiEvent` without blocking the executor
async fn next_ui_event(source: UiEventSource) -> (Message, UiEventSource) {
    let mut events = match source {
        UiEventSource::Ready(events) => events,
        UiEventSource::Pending(slot) => {
            let taken = slot.lock().take();
            match taken {
                Some(events) => events,
                // Already handed to an earlier subscription instance
                None => return std::future::pending().await,
            }
        }
    };

    match events.next().await {
        Some(event) => (Message::Ui(event), UiEventSource::Ready(events)),
        // All senders gone: nothing more will ever arrive
        None => std::future::pending().await,
    }
}

struct BingWallpaperApp {
    coordinator: Arc<Coordinator>,
    events: Arc<Mutex<Option<UnboundedReceiver<UiEvent>>>>,
    event_sender: UnboundedSender<UiEvent>,
    tray_senders: TraySenders,
    tray: Option<TrayIconManager>,
    image_path: PathBuf,
    candidates: Vec<Candidate>,
    thumbnails: HashMap<String, image::Handle>,
    preview: Option<image::Handle>,
    status_message: String,
    loading: bool,
    changing: bool,
}

impl BingWallpaperApp {
    /// Run `task` on a named thread; it reports to the UI as it goes
    fn spawn_task<F>(&self, name: &str, task: F)
    where
        F: FnOnce(&UnboundedSender<UiEvent>) + Send + 'static,
    {
        let sender = self.event_sender.clone();
        let thread_name = format!("bing-wallpaper-{}", name);
        let spawned = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || task(&sender));
        if let Err(e) = spawned {
            tracing::error!(thread = %thread_name, error = %e, "Failed to spawn thread");
        }
    }

    fn start_change<F>(&mut self, change: F)
    where
        F: FnOnce(&Coordinator) -> Result<ChangeOutcome, ChangeError> + Send + 'static,
    {
        self.changing = true;
        self.status_message = "Changing wallpaper...".to_string();
        let coordinator = Arc::clone(&self.coordinator);

        self.spawn_task("change", move |events| {
            let result = change(&coordinator);
            if let Some(bytes) = result
                .as_ref()
                .ok()
                .and_then(|outcome| outcome.local_path())
                .and_then(|path| std::fs::read(path).ok())
            {
                deliver(events, UiEvent::Preview(bytes));
            }
            deliver(events, UiEvent::ChangeFinished(result));
        });
    }

    fn handle_shell(&mut self, command: ShellCommand) -> Command<Message> {
        match command {
            ShellCommand::Show => Command::batch([
                window::change_mode(window::Id::MAIN, window::Mode::Windowed),
                window::gain_focus(window::Id::MAIN),
            ]),
            ShellCommand::Hide => window::change_mode(window::Id::MAIN, window::Mode::Hidden),
            ShellCommand::RemoveTray => {
                self.tray = None;
                Command::none()
            }
            ShellCommand::Quit => window::close(window::Id::MAIN),
        }
    }

    fn handle_close_requested(&mut self) -> Command<Message> {
        if self.tray.is_some() || self.coordinator.is_quitting() {
            return match self.coordinator.handle_close_request() {
                CloseDecision::Prevent => Command::none(),
                CloseDecision::Allow => window::close(window::Id::MAIN),
            };
        }

        // Without a tray a hidden window could never come back, so close quits.
        // quit joins the scheduler thread, which may be mid-download.
        self.status_message = "Quitting...".to_string();
        let coordinator = Arc::clone(&self.coordinator);
        self.spawn_task("quit", move |_| coordinator.quit());
        Command::none()
    }
}

impl Application for BingWallpaperApp {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = GuiFlags;

    fn new(flags: GuiFlags) -> (Self, Command<Message>) {
        let preview = std::fs::read(&flags.image_path)
            .ok()
            .map(image::Handle::from_memory);

        let app = BingWallpaperApp {
            coordinator: flags.coordinator,
            events: Arc::new(Mutex::new(Some(flags.events))),
            event_sender: flags.event_sender,
            tray_senders: flags.tray_senders,
            tray: None,
            image_path: flags.image_path,
            candidates: Vec::new(),
            thumbnails: HashMap::new(),
            preview,
            status_message: "Welcome to Bing Wallpaper".to_string(),
            loading: false,
            changing: false,
        };

        tracing::info!("Window initialized");

        let cmd = Command::batch([
            Command::perform(async {}, |_| Message::InstallTray),
            Command::perform(async {}, |_| Message::Refresh),
        ]);

        (app, cmd)
    }

    fn title(&self) -> String {
        String::from("Bing Wallpaper")
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn subscription(&self) -> Subscription<Message> {
        struct UiEvents;

        let ui_events = iced::subscription::unfold(
            std::any::TypeId::of::<UiEvents>(),
            UiEventSource::Pending(Arc::clone(&self.events)),
            next_ui_event,
        );

        let close_requests = event::listen_with(|event, _status| match event {
            Event::Window(_, window::Event::CloseRequested) => Some(Message::CloseRequested),
            _ => None,
        });

        Subscription::batch([ui_events, close_requests])
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::InstallTray => match TrayIconManager::new(self.tray_senders.clone()) {
                Ok(tray) => self.tray = Some(tray),
                Err(e) => {
                    tracing::warn!(error = %e, "Tray unavailable, closing the window will quit")
                }
            },
            Message::Ui(UiEvent::Shell(command)) => return self.handle_shell(command),
            Message::Ui(UiEvent::Candidates(result)) => {
                self.loading = false;
                match result {
                    Ok(candidates) => {
                        self.status_message = format!("{} wallpapers available", candidates.len());
                        self.candidates = candidates;
                    }
                    Err(e) => self.status_message = format!("Failed to load wallpapers: {}", e),
                }
            }
            Message::Ui(UiEvent::ChangeFinished(result)) => {
                self.changing = false;
                self.status_message = match result {
                    Ok(outcome) => outcome.to_string(),
                    Err(e) => format!("Failed: {}", e),
                };
            }
            Message::Ui(UiEvent::Preview(bytes)) => {
                self.preview = Some(image::Handle::from_memory(bytes));
            }
            Message::Ui(UiEvent::Thumbnail { url, bytes }) => {
                self.thumbnails.insert(url, image::Handle::from_memory(bytes));
            }
            Message::CloseRequested => return self.handle_close_requested(),
            Message::Refresh => {
                self.loading = true;
                self.status_message = "Loading wallpapers...".to_string();
                self.thumbnails.clear();
                let coordinator = Arc::clone(&self.coordinator);
                self.spawn_task("refresh", move |events| {
                    let result = coordinator.candidates();
                    let candidates = result.as_ref().ok().cloned().unwrap_or_default();
                    deliver(events, UiEvent::Candidates(result));

                    for candidate in candidates {
                        match coordinator.thumbnail(&candidate) {
                            Ok(bytes) => deliver(
                                events,
                                UiEvent::Thumbnail {
                                    url: candidate.url,
                                    bytes,
                                },
                            ),
                            Err(e) => {
                                tracing::debug!(url = %candidate.url, error = %e, "Thumbnail unavailable")
                            }
                        }
                    }
                });
            }
            Message::ChangeNow => {
                self.start_change(|coordinator| coordinator.change_now(Selection::Random));
            }
            Message::ApplyCandidate(index) => {
                if let Some(candidate) = self.candidates.get(index).cloned() {
                    self.start_change(move |coordinator| coordinator.apply_candidate(&candidate));
                }
            }
            Message::OpenFolder => {
                let folder = self
                    .image_path
                    .parent()
                    .map(|p| p.to_path_buf())
                    .or_else(|| config::pictures_directory().ok());
                if let Some(folder) = folder {
                    if let Err(e) = open::that(&folder) {
                        tracing::warn!(error = %e, "Failed to open folder");
                        self.status_message = format!("Failed to open {}: {}", folder.display(), e);
                    }
                }
            }
        }

        Command::none()
    }

    fn view(&self) -> Element<'_, Message> {
        let busy = self.loading || self.changing;

        let action = |label: &str, message: Message, enabled: bool| {
            let button = Button::new(Text::new(label.to_string()).size(14)).padding([6, 14]);
            if enabled {
                button.on_press(message)
            } else {
                button
            }
        };

        let header = Row::new()
            .spacing(10)
            .align_items(Alignment::Center)
            .push(Text::new("Bing Wallpaper").size(24))
            .push(Space::with_width(Length::Fill))
            .push(action("Refresh", Message::Refresh, !busy))
            .push(action("Change now", Message::ChangeNow, !busy))
            .push(action("Open folder", Message::OpenFolder, true));

        let mut content = Column::new()
            .spacing(12)
            .padding(16)
            .push(header)
            .push(Text::new(self.status_message.clone()).size(13));

        if let Some(handle) = &self.preview {
            content = content.push(
                Image::new(handle.clone())
                    .width(Length::Fill)
                    .height(Length::Fixed(280.0)),
            );
        }

        let mut list = Column::new().spacing(8);
        for (i, candidate) in self.candidates.iter().enumerate() {
            let title = if candidate.title.is_empty() {
                candidate.url.clone()
            } else {
                candidate.title.clone()
            };

            let details = Column::new()
                .spacing(2)
                .width(Length::Fill)
                .push(Text::new(title).size(16))
                .push(Text::new(candidate.copyright.clone()).size(12))
                .push(Text::new(format_date(&candidate.start_date)).size(12));

            let mut row = Row::new().spacing(10).align_items(Alignment::Center);
            if let Some(handle) = self.thumbnails.get(&candidate.url) {
                let thumbnail = Button::new(
                    Image::new(handle.clone())
                        .width(Length::Fixed(192.0))
                        .height(Length::Fixed(108.0)),
                )
                .padding(0);
                row = row.push(if busy {
                    thumbnail
                } else {
                    thumbnail.on_press(Message::ApplyCandidate(i))
                });
            }
            let row = row
                .push(details)
                .push(action("Set as wallpaper", Message::ApplyCandidate(i), !busy));

            list = list.push(Container::new(row).padding(8).width(Length::Fill));
        }

        if self.candidates.is_empty() && !self.loading {
            list = list.push(Text::new("No wallpapers loaded. Press Refresh to try again.").size(13));
        }

        content = content.push(Scrollable::new(list).height(Length::Fill));

        Container::new(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

/// `20240131` -> `2024-01-31`; anything else is shown as-is
fn format_date(start_date: &str) -> String {
    if start_date.len() == 8 && start_date.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &start_date[..4], &start_date[4..6], &start_date[6..])
    } else {
        start_date.to_string()
    }
}

/// Run the window until the coordinator asks it to close
pub fn run(flags: GuiFlags) -> iced::Result {
    BingWallpaperApp::run(Settings {
        window: iced::window::Settings {
            size: Size::new(900.0, 720.0),
            min_size: Some(Size::new(640.0, 480.0)),
            exit_on_close_request: false,
            ..Default::default()
        },
        ..Settings::with_flags(flags)
    })
}

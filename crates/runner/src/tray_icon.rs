/// System tray icon for the window process.
///
/// Menu clicks are not handled here: each item only pushes a unit message
/// into the matching tray channel, and the core dispatcher thread acts on it.
/// The tray is available on Windows and macOS only.
use anyhow::Result;
use bing_wallpaper_core::tray::TraySenders;

#[cfg(any(windows, target_os = "macos"))]
use anyhow::anyhow;
#[cfg(any(windows, target_os = "macos"))]
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
#[cfg(any(windows, target_os = "macos"))]
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

/// Load the tray icon from icon.png / icon.ico next to the executable
#[cfg(any(windows, target_os = "macos"))]
fn load_app_icon() -> Result<Icon> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));

    let candidates = ["icon.png", "icon.ico"]
        .iter()
        .filter_map(|name| exe_dir.as_ref().map(|dir| dir.join(name)));

    for path in candidates {
        if !path.exists() {
            continue;
        }
        let icon_data = std::fs::read(&path)
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

        let img = image::load_from_memory(&icon_data)
            .map_err(|e| anyhow!("Failed to decode icon: {}", e))?;

        let img = img.resize_exact(32, 32, image::imageops::FilterType::Lanczos3);
        let rgba = img.to_rgba8();

        return Icon::from_rgba(rgba.into_raw(), 32, 32)
            .map_err(|e| anyhow!("Failed to create icon from image: {:?}", e));
    }

    // Fallback: Bing teal square
    let icon_rgba: Vec<u8> = (0..32 * 32)
        .flat_map(|_| [0x00, 0x80, 0x9D, 0xFF])
        .collect();
    Icon::from_rgba(icon_rgba, 32, 32)
        .map_err(|e| anyhow!("Failed to create fallback icon: {:?}", e))
}

/// Owns the tray icon; dropping it removes the icon and the menu handler
pub struct TrayIconManager {
    #[cfg(any(windows, target_os = "macos"))]
    _tray_icon: TrayIcon,
}

impl TrayIconManager {
    /// Create the tray icon and route its menu into `senders`
    #[cfg(any(windows, target_os = "macos"))]
    pub fn new(senders: TraySenders) -> Result<Self> {
        tracing::info!("Creating tray icon");

        let icon = load_app_icon()?;

        let menu = Menu::new();
        let show_item = MenuItem::new("Show window", true, None);
        let change_item = MenuItem::new("Change wallpaper now", true, None);
        let separator = PredefinedMenuItem::separator();
        let quit_item = MenuItem::new("Quit", true, None);

        menu.append(&show_item)
            .map_err(|e| anyhow!("Failed to add show item: {}", e))?;
        menu.append(&change_item)
            .map_err(|e| anyhow!("Failed to add change item: {}", e))?;
        menu.append(&separator)
            .map_err(|e| anyhow!("Failed to add separator: {}", e))?;
        menu.append(&quit_item)
            .map_err(|e| anyhow!("Failed to add quit item: {}", e))?;

        let show_id = show_item.id().clone();
        let change_id = change_item.id().clone();
        let quit_id = quit_item.id().clone();

        MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
            tracing::debug!("Menu event: {:?}", event);
            let target = if event.id == show_id {
                &senders.show
            } else if event.id == change_id {
                &senders.change
            } else if event.id == quit_id {
                &senders.quit
            } else {
                return;
            };
            if target.send(()).is_err() {
                tracing::debug!("Tray dispatcher has exited, menu click dropped");
            }
        }));

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip("Bing Wallpaper")
            .with_title("Bing Wallpaper")
            .with_icon(icon)
            .with_menu(Box::new(menu))
            .build()
            .map_err(|e| anyhow!("Failed to create tray icon: {}", e))?;

        tracing::info!("Tray icon created successfully with context menu");

        Ok(Self {
            _tray_icon: tray_icon,
        })
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    pub fn new(_senders: TraySenders) -> Result<Self> {
        anyhow::bail!("System tray is not supported on this platform")
    }
}

#[cfg(any(windows, target_os = "macos"))]
impl Drop for TrayIconManager {
    fn drop(&mut self) {
        MenuEvent::set_event_handler(None::<fn(MenuEvent)>);
        tracing::info!("Tray icon removed");
    }
}

//! Download an image to the fixed wallpaper path and hand it to the OS.

use crate::error::ChangeError;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Location of the most recently applied image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedWallpaper {
    pub local_path: PathBuf,
}

/// Downloads and applies one wallpaper
pub trait WallpaperApplier: Send + Sync {
    fn apply(&self, url: &str) -> Result<AppliedWallpaper, ChangeError>;
}

/// OS "set desktop background" primitive
pub trait DesktopBackground: Send + Sync {
    fn set(&self, path: &Path) -> Result<(), String>;
}

/// The platform's own desktop background setter
pub struct SystemDesktop;

#[cfg(windows)]
impl DesktopBackground for SystemDesktop {
    fn set(&self, path: &Path) -> Result<(), String> {
        use std::os::windows::ffi::OsStrExt;
        use windows::Win32::UI::WindowsAndMessaging::{
            SystemParametersInfoW, SPIF_SENDCHANGE, SPIF_UPDATEINIFILE, SPI_SETDESKWALLPAPER,
        };

        let mut wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();

        unsafe {
            SystemParametersInfoW(
                SPI_SETDESKWALLPAPER,
                0,
                Some(wide.as_mut_ptr() as *mut _),
                SPIF_UPDATEINIFILE | SPIF_SENDCHANGE,
            )
        }
        .map_err(|e| format!("SystemParametersInfoW failed: {}", e))
    }
}

#[cfg(not(windows))]
impl DesktopBackground for SystemDesktop {
    fn set(&self, path: &Path) -> Result<(), String> {
        let path = path
            .to_str()
            .ok_or_else(|| format!("path is not valid UTF-8: {}", path.display()))?;
        wallpaper::set_from_path(path).map_err(|e| e.to_string())
    }
}

/// Write `reader` to `dest`, replacing any previous file.
///
/// Data goes to `<dest>.part` first and is renamed over `dest` once complete,
/// so `dest` is either the previous image or the new one, never a mix.
pub fn store_image(reader: &mut dyn Read, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut part_name = dest.as_os_str().to_os_string();
    part_name.push(".part");
    let part = PathBuf::from(part_name);

    let written = File::create(&part).and_then(|mut file| {
        let n = io::copy(reader, &mut file)?;
        file.sync_all()?;
        Ok(n)
    });

    match written.and_then(|n| fs::rename(&part, dest).map(|_| n)) {
        Ok(n) => Ok(n),
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(e)
        }
    }
}

/// Applier that downloads over HTTP into a single fixed file
pub struct DesktopApplier {
    client: reqwest::blocking::Client,
    target: PathBuf,
    desktop: Box<dyn DesktopBackground>,
}

impl DesktopApplier {
    pub fn new(
        client: reqwest::blocking::Client,
        target: PathBuf,
        desktop: Box<dyn DesktopBackground>,
    ) -> Self {
        Self {
            client,
            target,
            desktop,
        }
    }

    fn download(&self, url: &str) -> Result<u64, ChangeError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ChangeError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChangeError::DownloadFailed(format!("HTTP {} for {}", status, url)));
        }

        store_image(&mut response, &self.target).map_err(|e| {
            ChangeError::DownloadFailed(format!(
                "failed to write {}: {}",
                self.target.display(),
                e
            ))
        })
    }
}

impl WallpaperApplier for DesktopApplier {
    fn apply(&self, url: &str) -> Result<AppliedWallpaper, ChangeError> {
        let bytes = self.download(url)?;
        tracing::debug!(path = %self.target.display(), bytes, "Image downloaded");

        self.desktop
            .set(&self.target)
            .map_err(ChangeError::ApplyFailed)?;

        Ok(AppliedWallpaper {
            local_path: self.target.clone(),
        })
    }
}

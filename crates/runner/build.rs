//! Build script for BingWallpaper
//! Embeds Windows resource metadata and the app icon when present

fn main() {
    #[cfg(windows)]
    {
        let mut res = winresource::WindowsResource::new();
        res.set("FileDescription", "Bing Wallpaper");
        res.set("ProductName", "Bing Wallpaper");
        res.set("InternalName", "BingWallpaper");
        res.set("OriginalFilename", "BingWallpaper.exe");
        res.set("LegalCopyright", "Copyright © 2026");

        if std::path::Path::new("icon.ico").exists() {
            res.set_icon("icon.ico");
        }
        println!("cargo:rerun-if-changed=icon.ico");

        if let Err(e) = res.compile() {
            println!("cargo:warning=Failed to compile Windows resources: {}", e);
        }
    }
}

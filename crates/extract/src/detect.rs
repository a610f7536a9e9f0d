//! Browser detection and install guidance.

use std::path::PathBuf;

/// Known Chromium-based executable names to search for. All of these speak
/// CDP (Chrome DevTools Protocol).
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "chrome",
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "msedge",
    "microsoft-edge-stable",
    "brave-browser",
];

/// macOS app bundle paths for Chromium-based browsers.
#[cfg(target_os = "macos")]
const MACOS_APP_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];

/// Locate a Chromium-based browser.
///
/// Checks (in order):
/// 1. Explicit path from config
/// 2. `CHROME` environment variable
/// 3. Platform-specific installation paths (more reliable than PATH, which
///    can contain broken wrapper scripts)
/// 4. Known executable names in PATH
pub fn detect_browser(custom_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = custom_path {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    if let Ok(path) = std::env::var("CHROME") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Some(p);
        }
    }

    #[cfg(target_os = "macos")]
    for path in MACOS_APP_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    CHROMIUM_EXECUTABLES
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Platform-specific install instructions for the launch-failure message.
pub fn install_instructions() -> String {
    let instructions = if cfg!(target_os = "macos") {
        "  brew install --cask google-chrome"
    } else if cfg!(target_os = "linux") {
        "  Debian/Ubuntu: sudo apt install chromium-browser\n  \
         Fedora:         sudo dnf install chromium\n  \
         Arch:           sudo pacman -S chromium"
    } else {
        "  Download from https://www.google.com/chrome/"
    };

    format!(
        "No Chromium-based browser found. Install one:\n\n\
         {instructions}\n\n\
         Or set `extract.chrome_path` in chatspout.toml, or the CHROME \
         environment variable."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_custom_path_falls_through() {
        // Must not report the bogus path back as found.
        let found = detect_browser(Some("/nonexistent/chrome-binary"));
        if let Some(path) = found {
            assert_ne!(path, PathBuf::from("/nonexistent/chrome-binary"));
        }
    }

    #[test]
    fn install_instructions_mention_config_override() {
        assert!(install_instructions().contains("extract.chrome_path"));
    }
}

//! Browser binary discovery.

use crate::config::Config;
use crate::error::{LatchError, Result};
use std::path::{Path, PathBuf};

/// Resolve the browser binary to launch.
///
/// An explicit `LATCH_BROWSER` wins; otherwise the per-OS candidate list is
/// swept, with `which` resolving bare names against `PATH`.
pub fn resolve_browser(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.browser_path {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(LatchError::UserError(format!(
            "LATCH_BROWSER points at '{}', which does not exist",
            path.display()
        )));
    }

    find_browser_executable().ok_or_else(|| {
        LatchError::LaunchFailed(
            "could not find a Chromium-family browser; set LATCH_BROWSER to the binary path"
                .to_string(),
        )
    })
}

fn find_browser_executable() -> Option<PathBuf> {
    for candidate in candidates() {
        if looks_like_path(&candidate) {
            if Path::new(&candidate).exists() {
                return Some(PathBuf::from(candidate));
            }
        } else if let Ok(found) = which::which(&candidate) {
            return Some(found);
        }
    }
    None
}

fn looks_like_path(candidate: &str) -> bool {
    candidate.starts_with('/') || candidate.contains('\\') || candidate.contains(':')
}

fn candidates() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    } else if cfg!(target_os = "windows") {
        windows_candidates()
    } else {
        vec![
            "google-chrome-stable",
            "google-chrome",
            "chromium-browser",
            "chromium",
            "brave-browser",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
            "/snap/bin/chromium",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }
}

fn windows_candidates() -> Vec<String> {
    let mut candidates = Vec::new();

    let mut roots = Vec::new();
    for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
        if let Ok(value) = std::env::var(key) {
            roots.push(PathBuf::from(value));
        }
    }
    if roots.is_empty() {
        roots.push(PathBuf::from(r"C:\Program Files"));
        roots.push(PathBuf::from(r"C:\Program Files (x86)"));
    }

    let suffixes: &[&[&str]] = &[
        &["Google", "Chrome", "Application", "chrome.exe"],
        &["Microsoft", "Edge", "Application", "msedge.exe"],
        &["Chromium", "Application", "chrome.exe"],
    ];

    for root in roots {
        for suffix in suffixes {
            let mut path = root.clone();
            for component in *suffix {
                path.push(component);
            }
            candidates.push(path.to_string_lossy().to_string());
        }
    }

    candidates.extend(["chrome".to_string(), "msedge.exe".to_string()]);
    candidates
}

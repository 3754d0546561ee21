//! Short-timeout probes against the browser's DevTools endpoint.

use serde::Deserialize;
use std::time::Duration;

/// Ceiling for a single probe so status and acquire stay responsive.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(800);

/// `/json/version` response subset from the DevTools protocol.
#[derive(Debug, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Browser")]
    pub browser: Option<String>,

    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: Option<String>,
}

/// Fetch `/json/version` from the debugging port, or `None` if nothing
/// healthy answers within the probe timeout.
pub fn fetch_version(port: u16) -> Option<VersionInfo> {
    let client = reqwest::blocking::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .ok()?;

    for host in ["127.0.0.1", "localhost"] {
        let url = format!("http://{}:{}/json/version", host, port);
        let Ok(response) = client.get(&url).send() else {
            continue;
        };
        if !response.status().is_success() {
            continue;
        }
        if let Ok(info) = response.json::<VersionInfo>() {
            return Some(info);
        }
    }

    None
}

/// Whether a healthy browser answers on `port`.
pub fn is_healthy(port: u16) -> bool {
    fetch_version(port).is_some()
}

//! Shared helpers for tests that need a browser-shaped endpoint.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

/// A minimal HTTP listener that answers `/json/version` like a browser's
/// DevTools endpoint. Lets supervisor and orchestrator tests exercise the
/// adopt/health paths without a real browser installed.
pub(crate) struct FakeCdpEndpoint {
    pub port: u16,
}

impl FakeCdpEndpoint {
    /// Bind an ephemeral port and serve version payloads until the test
    /// process exits.
    pub(crate) fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind fake endpoint");
        let port = listener.local_addr().unwrap().port();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let _ = stream.set_read_timeout(Some(Duration::from_millis(500)));

                // Drain the request line and headers; the reply is the same
                // regardless of what was asked.
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);

                let body = format!(
                    "{{\"Browser\":\"FakeChrome/1.0\",\"Protocol-Version\":\"1.3\",\
                     \"webSocketDebuggerUrl\":\"ws://127.0.0.1:{}/devtools/browser/fake\"}}",
                    port
                );
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Self { port }
    }

    /// Whether the endpoint still accepts connections.
    pub(crate) fn is_listening(&self) -> bool {
        TcpStream::connect_timeout(
            &format!("127.0.0.1:{}", self.port).parse().unwrap(),
            Duration::from_millis(500),
        )
        .is_ok()
    }
}

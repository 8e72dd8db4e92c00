pub mod stream;

use anyhow::{Result, anyhow};
use log::{info, warn};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server, StatusCode};
use url::Url;

use crate::forwarder::progress::WriteSink;
use crate::forwarder::{Forwarder, WINDOW_HOURS};
use crate::trigger::stream::pipe;

/// Query parameter that asks for an immediate run.
pub const RUN_FLAG: &str = "run_error_check";

/// HTTP endpoint for admin-initiated runs. Answers with the run's progress
/// as plain text and ends the request when the run is over.
pub struct TriggerServer {
    server: Server,
    forwarder: Arc<Forwarder>,
    admin_token: String,
    headers: Vec<Header>,
}

impl TriggerServer {
    pub fn bind(addr: &str, forwarder: Arc<Forwarder>, admin_token: String) -> Result<Self> {
        if admin_token.is_empty() {
            return Err(anyhow!("Refusing to start trigger server without an admin token"));
        }
        let server = Server::http(addr)
            .map_err(|e| anyhow!("Failed to bind trigger server on {addr}: {e}"))?;
        let headers = vec![
            header("Content-Type", "text/plain; charset=utf-8")?,
            header("Cache-Control", "no-cache, must-revalidate, max-age=0")?,
        ];
        Ok(Self {
            server,
            forwarder,
            admin_token,
            headers,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.server_addr()
    }

    /// Serves requests one at a time until `running` is cleared.
    pub fn serve(&self, running: &AtomicBool) {
        info!("manual trigger listening on http://{}", self.local_addr());

        while running.load(Ordering::SeqCst) {
            let Ok(maybe_request) = self.server.recv_timeout(Duration::from_millis(500)) else {
                continue;
            };
            let Some(request) = maybe_request else {
                continue;
            };
            self.handle(request);
        }

        info!("manual trigger stopped");
    }

    fn handle(&self, request: Request) {
        // request.url() is only path+query
        let full = format!("http://localhost{}", request.url());
        let wants_run = Url::parse(&full)
            .map(|u| u.query_pairs().any(|(k, _)| k == RUN_FLAG))
            .unwrap_or(false);

        if !wants_run {
            respond_text(request, 404, "Not found\n");
            return;
        }
        if !self.is_admin(&request) {
            warn!("manual trigger rejected: missing or wrong admin token");
            respond_text(request, 403, "Forbidden\n");
            return;
        }

        info!("manual error check requested");

        let (mut writer, reader) = pipe();
        let forwarder = Arc::clone(&self.forwarder);
        let worker = thread::spawn(move || {
            let _ = writeln!(
                writer,
                "Running error check for last {WINDOW_HOURS} hours...\n"
            );
            let result = forwarder.run(&mut WriteSink::new(&mut writer));
            match result {
                Ok(summary) => {
                    let _ = writeln!(
                        writer,
                        "\nCheck complete. Total sent to webhook: {}",
                        summary.sent_count
                    );
                }
                Err(e) => {
                    let _ = writeln!(writer, "\nCheck failed: {e:#}");
                }
            }
        });

        let response = Response::new(StatusCode(200), self.headers.clone(), reader, None, None);
        if let Err(e) = request.respond(response) {
            warn!("failed to stream manual run output: {e}");
        }
        if worker.join().is_err() {
            warn!("manual run panicked");
        }
    }

    fn is_admin(&self, request: &Request) -> bool {
        request
            .headers()
            .iter()
            .filter(|h| h.field.equiv("Authorization"))
            .filter_map(|h| h.value.as_str().strip_prefix("Bearer "))
            .any(|token| tokens_match(token.trim(), &self.admin_token))
    }
}

/// Compares every byte regardless of where the first mismatch is.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|_| anyhow!("invalid header {name}: {value}"))
}

fn respond_text(request: Request, status: u16, body: &str) {
    let response = Response::from_string(body).with_status_code(status);
    if let Err(e) = request.respond(response) {
        warn!("failed to answer trigger request: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_comparison() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3cres", "s3cret"));
        assert!(!tokens_match("s3cret ", "s3cret"));
        assert!(!tokens_match("", "s3cret"));
    }
}

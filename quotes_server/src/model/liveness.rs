//! Keep-alive tracker for connected clients.
//!
//! Records the last time each client (identified by its `ClientId`) showed a sign of
//! life, i.e. `connect`, `subscribe` or `ping`. The gateway also keeps clients with a
//! running stream session. Operations:
//!
//! - `ClientMonitor::touch(client)` — record activity for a client.
//! - `ClientMonitor::check_timeouts()` — return and forget the clients silent for longer
//!   than the configured timeout; the gateway disconnects each one that is not streaming.
//! - `ClientMonitor::is_client_active(client)` — read-only check, used when a ping arrives.
//!
//! Time is measured with `std::time::Instant`. The monitor is not synchronized; the
//! gateway keeps it behind a mutex.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use quotes_common::ClientId;

/// Tracks client activity and reports clients that went silent.
pub struct ClientMonitor {
    last_seen: HashMap<ClientId, Instant>,
    timeout: Duration,
}

impl ClientMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_seen: HashMap::new(),
            timeout,
        }
    }

    /// Record activity for `client`, registering it if unknown.
    pub fn touch(&mut self, client: &ClientId) {
        let now = Instant::now();
        self.last_seen
            .entry(client.clone())
            .and_modify(|seen| *seen = now)
            .or_insert(now);
    }

    /// Remove and return every client silent for longer than the timeout.
    pub fn check_timeouts(&mut self) -> Vec<ClientId> {
        let now = Instant::now();
        let timeout = self.timeout;
        let mut timed_out = Vec::new();

        self.last_seen.retain(|client, seen| {
            if now.duration_since(*seen) > timeout {
                timed_out.push(client.clone());
                false
            } else {
                true
            }
        });
        timed_out
    }

    /// Whether `client` is known and within its timeout.
    pub fn is_client_active(&self, client: &ClientId) -> bool {
        self.last_seen
            .get(client)
            .map(|seen| seen.elapsed() <= self.timeout)
            .unwrap_or(false)
    }

    /// Stop tracking `client`.
    pub fn forget(&mut self, client: &ClientId) {
        self.last_seen.remove(client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn touched_client_is_active() {
        let mut monitor = ClientMonitor::new(Duration::from_secs(5));
        let client = ClientId::new("c1");
        assert!(!monitor.is_client_active(&client));
        monitor.touch(&client);
        assert!(monitor.is_client_active(&client));
        assert!(monitor.check_timeouts().is_empty());
    }

    #[test]
    fn silent_client_times_out_once() {
        let mut monitor = ClientMonitor::new(Duration::from_millis(20));
        let client = ClientId::new("c1");
        monitor.touch(&client);
        thread::sleep(Duration::from_millis(40));

        assert_eq!(monitor.check_timeouts(), vec![client.clone()]);
        assert!(monitor.check_timeouts().is_empty());
        assert!(!monitor.is_client_active(&client));
    }

    #[test]
    fn forget_stops_tracking() {
        let mut monitor = ClientMonitor::new(Duration::from_millis(1));
        let client = ClientId::new("c1");
        monitor.touch(&client);
        monitor.forget(&client);
        thread::sleep(Duration::from_millis(5));
        assert!(monitor.check_timeouts().is_empty());
    }
}

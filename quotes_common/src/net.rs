//! Shared networking constants and helpers used by client and server.

/// TCP port the gateway listens on.
pub const SERVER_PORT: u16 = 10200;
/// Default host for clients.
pub const LOCAL_HOST: &str = "127.0.0.1";
/// Default pause between two emissions of a subscribed stream.
pub const EMISSION_INTERVAL_MS: u64 = 1000;
/// A stream emission not taken by the consumer within this window reclaims the subscription.
pub const ACK_TIMEOUT_MS: u64 = 5000;
/// A client silent for longer than this is treated as disconnected.
pub const CLIENT_TIMEOUT_SECS: u64 = 5;
/// How often clients send `ping`.
pub const PING_INTERVAL_MS: u64 = 2000;

/// Helper to format an address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}

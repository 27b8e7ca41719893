//! Server and orchestration configuration.

use std::time::Duration;

use rondo_protocol::DEFAULT_DELIMITER;

/// Settings for a [`Server`](crate::Server).
///
/// `port` 0 binds an ephemeral port; read the actual one back with
/// [`Server::local_addr`](crate::Server::local_addr) after `start`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host name or address to bind the listener on.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Listen backlog, also used to size the pending-connection queue.
    pub backlog: u32,
    /// How long a single RPC call waits for the client's reply.
    pub rpc_timeout: Duration,
    /// Frame delimiter byte. Must match what connecting clients use.
    pub delimiter: u8,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            backlog: 128,
            rpc_timeout: Duration::from_millis(1000),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// Settings for a [`TurnBasedServer`](crate::TurnBasedServer).
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Number of players that must connect before the game starts.
    pub players_required: usize,
    /// Kick a player once this many of their turns have failed.
    /// 0 disables kicking.
    pub errors_before_kick: u32,
}

impl TurnConfig {
    pub fn new(players_required: usize) -> Self {
        Self {
            players_required,
            errors_before_kick: 3,
        }
    }

    pub fn errors_before_kick(mut self, threshold: u32) -> Self {
        self.errors_before_kick = threshold;
        self
    }
}

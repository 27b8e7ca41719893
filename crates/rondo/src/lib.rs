//! Rondo server: TCP RPC to connected clients plus turn-based game
//! orchestration.
//!
//! The server owns every conversation. It listens for TCP connections,
//! handshakes each one into an identified client, and invokes methods on
//! clients with [`Server::call`]; clients only ever answer. On top of that,
//! [`TurnBasedServer`] runs a full game session: gate on a player count,
//! initialize everyone, hand out turns round-robin, kick players whose turns
//! keep failing, and tear the session down when the game ends.
//!
//! ```no_run
//! use rondo::{Server, ServerConfig, SessionState, TurnBasedGame, TurnBasedServer, TurnConfig};
//! use rondo::{ClientId, ServerError};
//!
//! struct CountingGame {
//!     turns: u32,
//! }
//!
//! impl TurnBasedGame for CountingGame {
//!     fn has_game_ended(&self) -> bool {
//!         self.turns >= 10
//!     }
//!
//!     async fn player_action(
//!         &mut self,
//!         server: &mut rondo::Server,
//!         player: &ClientId,
//!     ) -> Result<(), ServerError> {
//!         self.turns += 1;
//!         let roll = server.call(player, "roll", None).await?;
//!         tracing::info!(%player, %roll, "player rolled");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ServerError> {
//!     let server = Server::new(ServerConfig::new("127.0.0.1", 10101));
//!     let mut session = TurnBasedServer::new(server, CountingGame { turns: 0 }, TurnConfig::new(2));
//!     session.run().await?;
//!     assert_eq!(session.state(), SessionState::Closed);
//!     Ok(())
//! }
//! ```

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod rpc;
mod server;
mod turn;

pub use config::{ServerConfig, TurnConfig};
pub use error::ServerError;
pub use rpc::{AcceptAll, RpcError, RpcValidator};
pub use server::{ClientConnection, Server};
pub use turn::{SessionState, TurnBasedGame, TurnBasedServer, TurnOrder};

pub use rondo_protocol::{ClientId, Message};
pub use rondo_transport::TransportError;

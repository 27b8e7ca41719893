//! The client half of a Rondo session.
//!
//! A client process connects to the server, completes the identity
//! handshake, and then sits in a dispatch loop: the server invokes named
//! methods on it over the RPC protocol, the client looks each one up in
//! its [`MethodTable`] and reports the result (or failure) back.
//!
//! ```no_run
//! use rondo_client::{Client, ClientConfig, MethodTable};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), rondo_client::ClientError> {
//! let mut methods = MethodTable::new();
//! methods.register_fn("getTime", |_params| {
//!     Ok(json!(chrono_free_timestamp()))
//! });
//!
//! let mut client = Client::connect(&ClientConfig::new("127.0.0.1", 10101)).await?;
//! client.serve(&methods).await?;   // runs until the server sends END
//! client.close().await?;
//! # Ok(())
//! # }
//! # fn chrono_free_timestamp() -> u64 { 0 }
//! ```

mod client;
mod error;
mod methods;

pub use client::{Client, ClientConfig};
pub use error::ClientError;
pub use methods::MethodTable;

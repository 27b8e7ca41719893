//! Dice Duel bot: connects to the server and answers `roll` requests until
//! the game ends or it gets kicked.

use rand::Rng;
use rondo_client::{Client, ClientConfig, MethodTable};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

fn duel_table() -> MethodTable {
    let mut table = MethodTable::new();
    table.register_fn("hello", |params| {
        let name = params.first().and_then(Value::as_str).unwrap_or("?");
        tracing::info!(name, "joined the duel");
        Ok(Value::Null)
    });
    table.register_fn("roll", |params| {
        let sides = params
            .first()
            .and_then(Value::as_i64)
            .filter(|s| *s >= 1)
            .ok_or_else(|| "roll needs a positive number of sides".to_string())?;
        let roll = rand::rng().random_range(1..=sides);
        tracing::info!(sides, roll, "rolled");
        Ok(json!(roll))
    });
    table.register_fn("game_over", |params| {
        let winner = params.first().and_then(Value::as_str).unwrap_or("?");
        tracing::info!(winner, "game over");
        Ok(Value::Null)
    });
    // "taunt" is deliberately left out; the server tolerates the
    // not-implemented reply.
    table
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::args()
        .nth(1)
        .map(|p| p.parse())
        .transpose()?
        .unwrap_or(10101);
    eprintln!("connecting to dice-duel server on 127.0.0.1:{port}");

    let mut client = Client::connect(&ClientConfig::new("127.0.0.1", port)).await?;
    tracing::info!(id = %client.id(), "connected");
    client.serve(&duel_table()).await?;
    tracing::info!("session ended");
    Ok(())
}

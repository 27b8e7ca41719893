//! Dice Duel server: two players roll a d6 on alternating turns, first to
//! reach 30 points wins.
//!
//! Run the bots from another terminal:
//!
//! ```text
//! cargo run --bin dice-duel-server
//! cargo run --bin dice-duel-bot   # twice
//! ```

use std::collections::HashMap;

use rondo::{
    ClientId, RpcValidator, Server, ServerConfig, SessionState, TurnBasedGame, TurnBasedServer,
    TurnConfig,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

const TARGET_SCORE: i64 = 30;
const DIE_SIDES: i64 = 6;

struct DiceDuel {
    scores: HashMap<ClientId, i64>,
    winner: Option<ClientId>,
}

impl DiceDuel {
    fn new() -> Self {
        Self {
            scores: HashMap::new(),
            winner: None,
        }
    }
}

impl TurnBasedGame for DiceDuel {
    async fn init_player(
        &mut self,
        server: &mut Server,
        player: &ClientId,
    ) -> Result<(), rondo::ServerError> {
        self.scores.insert(player.clone(), 0);
        server
            .call(player, "hello", Some(vec![json!(player.as_str())]))
            .await?;
        Ok(())
    }

    fn has_game_ended(&self) -> bool {
        self.winner.is_some()
    }

    async fn player_action(
        &mut self,
        server: &mut Server,
        player: &ClientId,
    ) -> Result<(), rondo::ServerError> {
        let roll = server
            .call(player, "roll", Some(vec![json!(DIE_SIDES)]))
            .await?;
        let points = roll.as_i64().unwrap_or(0);
        let score = self.scores.entry(player.clone()).or_insert(0);
        *score += points;
        let score = *score;
        tracing::info!(%player, points, score, "player rolled");

        if score >= TARGET_SCORE {
            self.winner = Some(player.clone());
        } else if score >= TARGET_SCORE - DIE_SIDES {
            // Close to winning: invite a taunt. No bot implements it, so
            // this shows the not-implemented reply without failing the turn.
            if let Err(error) = server.call(player, "taunt", None).await {
                tracing::debug!(%player, %error, "taunt declined");
            }
        }
        Ok(())
    }

    async fn end_game(&mut self, server: &mut Server) -> Result<(), rondo::ServerError> {
        // No winner when every player dropped out before the target score.
        let Some(winner) = self.winner.clone() else {
            tracing::info!("duel abandoned");
            return Ok(());
        };
        tracing::info!(%winner, score = self.scores[&winner], "game over");
        for id in server.client_ids() {
            if let Err(error) = server
                .call(&id, "game_over", Some(vec![json!(winner.as_str())]))
                .await
            {
                tracing::debug!(client_id = %id, %error, "could not deliver result");
            }
        }
        Ok(())
    }

    fn on_client_disconnection(&mut self, player: &ClientId) {
        tracing::info!(%player, "player left the duel");
        self.scores.remove(player);
    }
}

/// A `roll` reply must be an integer the die can actually produce.
struct DieValidator;

impl RpcValidator for DieValidator {
    fn validate(&self, method: &str, result: &Value) -> bool {
        if method != "roll" {
            return true;
        }
        matches!(result.as_i64(), Some(n) if (1..=DIE_SIDES).contains(&n))
    }
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
    eprintln!("starting dice-duel server on 127.0.0.1:{port}");

    let server = Server::new(ServerConfig::new("127.0.0.1", port)).with_validator(DieValidator);
    let mut session = TurnBasedServer::new(server, DiceDuel::new(), TurnConfig::new(2));
    session.run().await?;
    assert_eq!(session.state(), SessionState::Closed);
    Ok(())
}

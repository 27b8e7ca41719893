//! Turn-based game orchestration on top of [`Server`].
//!
//! [`TurnBasedServer::run`] drives a full session: wait for the required
//! number of players, initialize them, hand out turns round-robin, and tear
//! the session down once the game reports it has ended. Game rules plug in
//! through the [`TurnBasedGame`] trait.

use std::collections::HashMap;

use rondo_protocol::ClientId;

use crate::config::TurnConfig;
use crate::error::ServerError;
use crate::server::Server;

/// Game rules driven by a [`TurnBasedServer`].
///
/// Only [`has_game_ended`](Self::has_game_ended) and
/// [`player_action`](Self::player_action) are required; the lifecycle hooks
/// default to doing nothing.
pub trait TurnBasedGame: Send {
    /// Called once per player after the session gates open, before
    /// [`start_game`](Self::start_game). An error here aborts the session.
    async fn init_player(
        &mut self,
        _server: &mut Server,
        _player: &ClientId,
    ) -> Result<(), ServerError> {
        Ok(())
    }

    /// Called once, after every player has been initialized.
    async fn start_game(&mut self, _server: &mut Server) -> Result<(), ServerError> {
        Ok(())
    }

    /// Checked before every turn; returning `true` ends the session.
    fn has_game_ended(&self) -> bool;

    /// Executes one turn for `player`. Errors count toward the player's
    /// kick threshold but do not end the session.
    async fn player_action(
        &mut self,
        server: &mut Server,
        player: &ClientId,
    ) -> Result<(), ServerError>;

    /// Called once the game has ended, before connections are closed.
    async fn end_game(&mut self, _server: &mut Server) -> Result<(), ServerError> {
        Ok(())
    }

    /// A handshaken client was registered. During a running session the
    /// client is registered but does not join the turn rotation.
    fn on_client_connection(&mut self, _player: &ClientId) {}

    /// A player left the rotation: kicked, or their connection died.
    fn on_client_disconnection(&mut self, _player: &ClientId) {}
}

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingForPlayers,
    Running,
    Ending,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::WaitingForPlayers => "waiting_for_players",
            SessionState::Running => "running",
            SessionState::Ending => "ending",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Round-robin turn rotation.
///
/// The cursor starts before the first player, so the first
/// [`advance`](Self::advance) yields the first player pushed. Removing a
/// player does not touch the cursor; the modulo in `advance` absorbs any
/// resulting overshoot.
#[derive(Debug, Default)]
pub struct TurnOrder {
    order: Vec<ClientId>,
    current: Option<usize>,
}

impl TurnOrder {
    pub fn push(&mut self, id: ClientId) {
        self.order.push(id);
    }

    /// Moves the cursor to the next player and returns them, or `None` if
    /// the rotation is empty.
    pub fn advance(&mut self) -> Option<ClientId> {
        if self.order.is_empty() {
            self.current = None;
            return None;
        }
        let next = match self.current {
            None => 0,
            Some(i) => (i + 1) % self.order.len(),
        };
        self.current = Some(next);
        Some(self.order[next].clone())
    }

    /// Removes a player from the rotation. Returns `false` if they were not
    /// in it.
    pub fn remove(&mut self, id: &ClientId) -> bool {
        let Some(pos) = self.order.iter().position(|p| p == id) else {
            return false;
        };
        self.order.remove(pos);
        if self.order.is_empty() {
            self.current = None;
        }
        true
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.order.iter().any(|p| p == id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn players(&self) -> &[ClientId] {
        &self.order
    }
}

/// Runs one game session over a [`Server`].
pub struct TurnBasedServer<G: TurnBasedGame> {
    server: Server,
    game: G,
    config: TurnConfig,
    state: SessionState,
    order: TurnOrder,
    errors: HashMap<ClientId, u32>,
}

impl<G: TurnBasedGame> TurnBasedServer<G> {
    pub fn new(server: Server, game: G, config: TurnConfig) -> Self {
        Self {
            server,
            game,
            config,
            state: SessionState::WaitingForPlayers,
            order: TurnOrder::default(),
            errors: HashMap::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut Server {
        &mut self.server
    }

    /// Drives a full session and returns once it has closed.
    ///
    /// Starts the server if the caller has not already done so. Errors from
    /// `init_player`, `start_game`, and `end_game` abort the session; errors
    /// from `player_action` are counted per player instead.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.server.start().await?;

        self.wait_for_players().await?;
        self.start().await?;

        while !self.game.has_game_ended() {
            // Late joiners get registered and announced, nothing more.
            for id in self.server.poll_clients() {
                tracing::info!(client_id = %id, "connection during running session");
                self.game.on_client_connection(&id);
            }
            let Some(player) = self.order.advance() else {
                tracing::warn!("no players left in rotation, ending session");
                break;
            };
            if let Err(error) = self.game.player_action(&mut self.server, &player).await {
                self.handle_turn_error(&player, error).await;
            }
        }

        self.shutdown().await
    }

    async fn wait_for_players(&mut self) -> Result<(), ServerError> {
        while self.order.len() < self.config.players_required {
            let Some(id) = self.server.next_client().await else {
                return Err(ServerError::Stopped);
            };
            self.order.push(id.clone());
            self.game.on_client_connection(&id);
            tracing::info!(
                client_id = %id,
                players = self.order.len(),
                required = self.config.players_required,
                "player joined"
            );
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<(), ServerError> {
        self.state = SessionState::Running;
        tracing::info!(players = self.order.len(), "starting game");
        for id in self.order.players().to_vec() {
            self.errors.insert(id.clone(), 0);
            self.game.init_player(&mut self.server, &id).await?;
        }
        self.game.start_game(&mut self.server).await
    }

    async fn handle_turn_error(&mut self, player: &ClientId, error: ServerError) {
        if !self.server.is_connected(player) {
            tracing::warn!(client_id = %player, %error, "player disconnected during turn");
            self.remove_player(player);
            return;
        }

        let count = self.errors.entry(player.clone()).or_insert(0);
        *count += 1;
        let count = *count;
        tracing::warn!(
            client_id = %player,
            %error,
            errors = count,
            threshold = self.config.errors_before_kick,
            "player turn failed"
        );

        if self.config.errors_before_kick > 0 && count >= self.config.errors_before_kick {
            tracing::warn!(client_id = %player, "kicking player after repeated failures");
            if let Err(error) = self.server.close_client(player).await {
                tracing::debug!(client_id = %player, %error, "kick close failed");
            }
            self.remove_player(player);
        }
    }

    fn remove_player(&mut self, player: &ClientId) {
        self.order.remove(player);
        self.errors.remove(player);
        self.game.on_client_disconnection(player);
    }

    async fn shutdown(&mut self) -> Result<(), ServerError> {
        self.state = SessionState::Ending;
        tracing::info!("game over, closing session");
        self.game.end_game(&mut self.server).await?;
        for id in self.server.client_ids() {
            if let Err(error) = self.server.close_client(&id).await {
                tracing::debug!(client_id = %id, %error, "close failed during shutdown");
            }
        }
        self.errors.clear();
        self.server.stop();
        self.state = SessionState::Closed;
        Ok(())
    }
}

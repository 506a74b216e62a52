//! Lobby operations over the control connection.
//!
//! Each call builds one packet and writes it straight through. Replies
//! arrive later through [`Client::update`] as [`ClientEvent`]s.
//!
//! [`ClientEvent`]: crate::ClientEvent

use coopnet_protocol::{
    LobbyCreate, LobbyDetails, LobbyId, LobbyJoin, LobbyLeave, LobbyListGet,
};
use coopnet_transport::Transport;

use crate::{Client, CoopnetError};

impl<T: Transport> Client<T> {
    /// Asks the server to create a lobby. Answered by
    /// [`ClientEvent::LobbyCreated`](crate::ClientEvent::LobbyCreated).
    pub fn lobby_create(
        &mut self,
        game: &str,
        version: &str,
        title: &str,
        max_connections: u16,
    ) -> Result<(), CoopnetError> {
        tracing::info!(game, title, max_connections, "lobby create");
        self.send_control(
            LobbyCreate {
                max_connections,
                details: LobbyDetails::new(game, version, title),
            }
            .into(),
        )
    }

    pub fn lobby_join(&mut self, lobby_id: LobbyId) -> Result<(), CoopnetError> {
        tracing::info!(%lobby_id, "lobby join");
        self.send_control(LobbyJoin { lobby_id }.into())
    }

    pub fn lobby_leave(&mut self, lobby_id: LobbyId) -> Result<(), CoopnetError> {
        tracing::info!(%lobby_id, "lobby leave");
        self.send_control(LobbyLeave { lobby_id }.into())
    }

    /// Requests the lobbies running `game`. Each match comes back as a
    /// separate [`ClientEvent::LobbyListEntry`](crate::ClientEvent::LobbyListEntry).
    pub fn lobby_list_get(&mut self, game: &str) -> Result<(), CoopnetError> {
        tracing::info!(game, "lobby list");
        self.send_control(LobbyListGet { game: game.to_string() }.into())
    }
}

/// Connection lifecycle: accept loop, name prompt, session hand-off

use crate::core::NameClaim;
use crate::error::Result;
use crate::model::{Character, User};
use crate::network::{LineReader, LineWriter, TcpServer};
use crate::session::dispatcher::Session;
use crate::state::ServerState;
use crate::text::{simplify, validate_name};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

const BANNER: &str = "Welcome to mudhost!";

/// Accept connections forever, one task per connection
pub async fn serve(server: TcpServer, state: ServerState) -> Result<()> {
    loop {
        let (stream, peer) = match server.accept().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };

        info!(%peer, "Client connected");
        let state = state.clone();

        tokio::spawn(async move {
            match handle_connection(stream, state).await {
                Ok(()) => info!(%peer, "Client disconnected"),
                Err(e) => debug!(%peer, "Connection ended: {}", e),
            }
        });
    }
}

/// Ask for a character name, then run that character's session
pub async fn handle_connection<S>(stream: S, state: ServerState) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = LineReader::new(read_half, state.config.max_line_len);
    let mut out = LineWriter::new(write_half);

    out.write_line(BANNER).await?;

    let Some((claim, user, player)) = login(&state, &mut reader, &mut out).await? else {
        out.write_line("Goodbye").await?;
        return Ok(());
    };

    let result = Session::start(state, reader, out, user, player)?.exec().await;
    drop(claim);
    result
}

/// Prompt until a usable name is given; `None` if the client backs out
///
/// The returned claim keeps other connections off the name until it drops.
async fn login<R, W>(
    state: &ServerState,
    reader: &mut LineReader<R>,
    out: &mut LineWriter<W>,
) -> Result<Option<(NameClaim, Arc<User>, Arc<Character>)>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        out.write_str("What is your name? ").await?;
        let name = simplify(&reader.read_line().await?);

        if name.is_empty() || name == "x" {
            return Ok(None);
        }

        if let Err(e) = validate_name(&name) {
            out.write_line(&e.to_string()).await?;
            continue;
        }

        let Some(claim) = state.world.claim_name(&name) else {
            out.write_line("That character is already playing").await?;
            continue;
        };

        match state.world.character_by_name(&name) {
            Some(character) if character.is_npc() => {
                out.write_line("That name is unavailable").await?;
            }
            Some(character) if character.is_online() || state.events.is_registered(character.id()) => {
                out.write_line("That character is already playing").await?;
            }
            Some(character) => match character.user_id().and_then(|id| state.world.user(id)) {
                Some(user) => {
                    info!(user = %user.name(), "Returning player");
                    return Ok(Some((claim, user, character)));
                }
                None => {
                    warn!(character = %character.id(), "Character has no account");
                    out.write_line("That character cannot be played").await?;
                }
            },
            None => {
                let room = state.world.start_room()?;
                let user = state.world.create_user(&name)?;
                let player = state.world.create_player(&name, user.id(), room.id())?;
                info!(name = %name, "New player created");
                return Ok(Some((claim, user, player)));
            }
        }
    }
}

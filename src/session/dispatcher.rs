/// Per-connection session: reader task plus dispatcher
///
/// The reader task owns the input half of the connection. It waits for a
/// mode request, reads one line or keystroke, applies the input throttle,
/// and hands the result back. Failures travel on a dedicated oneshot
/// channel.
///
/// The dispatcher (everything on `Session`) runs all interactive logic.
/// `get_user_input` writes the prompt, asks the reader for input, and then
/// waits on three things at once: the input, the next mailbox event, and a
/// reader failure. Events are printed above a redrawn prompt while the wait
/// continues, so a session is never blind to the world, even mid-menu.

use crate::core::{EntityId, Event, Mailbox};
use crate::error::{MudError, Result};
use crate::model::{Character, Room, User, Zone};
use crate::network::{colorize, Color, ColorMode, LineReader, LineWriter};
use crate::session::menu::Menu;
use crate::session::render::{describe_room, describe_room_editor};
use crate::session::throttle::Throttle;
use crate::state::ServerState;
use crate::text::{argify, simplify};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const PROMPT: &str = "> ";

/// How the reader should interpret the next input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Trimmed and lowercased line
    Clean,
    /// Line exactly as typed
    Raw,
    /// A single keystroke
    Key,
}

/// A lone `x` backs out of any question
fn cancel_x(input: String) -> String {
    if input.trim().eq_ignore_ascii_case("x") {
        String::new()
    } else {
        input
    }
}

async fn read_input<R>(
    mut reader: LineReader<R>,
    mut requests: mpsc::Receiver<InputMode>,
    input: mpsc::Sender<String>,
    failure: oneshot::Sender<MudError>,
    mut throttle: Throttle,
) where
    R: AsyncRead + Unpin,
{
    while let Some(mode) = requests.recv().await {
        let line = match mode {
            InputMode::Clean => reader.read_line().await.map(|line| simplify(&line)),
            InputMode::Raw => reader.read_line().await,
            InputMode::Key => reader.read_key().await,
        };

        match line {
            Ok(line) => {
                throttle.accept().await;
                if input.send(cancel_x(line)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                if matches!(e, MudError::ConnectionClosed) {
                    debug!("Connection closed by client");
                } else {
                    warn!("Input reader failed: {}", e);
                }
                let _ = failure.send(e);
                return;
            }
        }
    }

    debug!("Input reader stopped");
}

pub struct Session<W> {
    pub(crate) state: ServerState,
    out: LineWriter<W>,
    pub(crate) user: Arc<User>,
    pub(crate) player: Arc<Character>,
    pub(crate) room: Arc<Room>,
    pub(crate) zone: Arc<Zone>,
    mailbox: Mailbox,
    requests: mpsc::Sender<InputMode>,
    input: mpsc::Receiver<String>,
    failure: oneshot::Receiver<MudError>,
    reader: JoinHandle<()>,
}

impl<W: AsyncWrite + Unpin + Send> Session<W> {
    /// Register the player's mailbox and spawn the reader task
    pub fn start<R>(
        state: ServerState,
        reader: LineReader<R>,
        out: LineWriter<W>,
        user: Arc<User>,
        player: Arc<Character>,
    ) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let room = state.room_of(&player)?;
        let zone = state.zone_of(&room)?;

        let (request_tx, request_rx) = mpsc::channel(1);
        let (input_tx, input_rx) = mpsc::channel(1);
        let (failure_tx, failure_rx) = oneshot::channel();
        let throttle = Throttle::new(state.config.input_delay());

        let handle = tokio::spawn(read_input(reader, request_rx, input_tx, failure_tx, throttle));
        let mailbox = state.events.register(player.id());

        Ok(Self {
            state,
            out,
            user,
            player,
            room,
            zone,
            mailbox,
            requests: request_tx,
            input: input_rx,
            failure: failure_rx,
            reader: handle,
        })
    }

    /// Run the session to completion, then unregister and mark the player offline
    pub async fn exec(mut self) -> Result<()> {
        let name = self.player.pretty_name();
        info!(player = %name, "Session started");

        let result = self.main_loop().await;

        if let Err(e) = self.state.logout(&self.player) {
            error!(player = %name, "Failed to record logout: {}", e);
        }
        self.reader.abort();
        self.state.events.unregister(self.mailbox);

        if let Err(e) = self.out.shutdown().await {
            debug!(player = %name, "Failed to shut down output: {}", e);
        }

        match &result {
            Ok(()) => info!(player = %name, "Session ended"),
            Err(MudError::ConnectionClosed) => info!(player = %name, "Session ended by disconnect"),
            Err(e) => warn!(player = %name, "Session ended abnormally: {}", e),
        }
        result
    }

    async fn main_loop(&mut self) -> Result<()> {
        let login = self.state.login(&self.player);
        self.check(login).await?;

        let welcome = format!("Welcome, {}", self.player.pretty_name());
        self.print_line_color(Color::White, &welcome).await?;
        self.print_room().await?;

        loop {
            let input = self.get_user_input(InputMode::Raw, PROMPT).await?;
            let input = input.trim();

            if input.is_empty() || input == "logout" {
                return self.print_line("Goodbye").await;
            }

            match input.strip_prefix('/') {
                Some(command) => {
                    let (command, args) = argify(command);
                    self.process_command(&command.to_lowercase(), &args).await?;
                }
                None => {
                    let (action, args) = argify(input);
                    self.handle_action(&action.to_lowercase(), &args).await?;
                }
            }
        }
    }

    /// Prompt and wait for input while still delivering events
    pub async fn get_user_input(&mut self, mode: InputMode, prompt: &str) -> Result<String> {
        let prompt = colorize(self.color_mode(), Color::White, prompt);

        self.out.write_str(&prompt).await?;
        self.requests.send(mode).await.map_err(|_| MudError::SessionClosed)?;

        loop {
            tokio::select! {
                biased;

                line = self.input.recv() => {
                    // The reader reports its failure before dropping the input channel
                    return match line {
                        Some(line) => Ok(line),
                        None => Err(self.failure.try_recv().unwrap_or(MudError::SessionClosed)),
                    };
                }
                Some(event) = self.mailbox.recv() => {
                    if let Some(message) = self.process_event(event) {
                        self.out.clear_line().await?;
                        self.out.write_line(&message).await?;
                        self.out.write_str(&prompt).await?;
                    }
                }
                failure = &mut self.failure => {
                    return Err(failure.unwrap_or_else(|_| MudError::ReaderFailed("input reader stopped".to_string())));
                }
            }
        }
    }

    /// Refresh cached state and render the event for this player
    fn process_event(&mut self, event: Event) -> Option<String> {
        match &event {
            Event::RoomUpdate { room } if *room == self.room.id() => {
                if let Some(room) = self.state.world.room(*room) {
                    self.room = room;
                }
            }
            Event::ZoneUpdate { zone, .. } if *zone == self.zone.id() => {
                if let Some(zone) = self.state.world.zone(*zone) {
                    self.zone = zone;
                }
            }
            _ => {}
        }

        let message = event.render(self.player.id())?;
        Some(colorize(self.color_mode(), event.color(), &message))
    }

    /// Show a menu until the player picks one of its actions or nothing
    pub async fn exec_menu(&mut self, menu: &Menu) -> Result<(String, Option<EntityId>)> {
        loop {
            let text = menu.render(self.color_mode());
            self.out.write_line(&text).await?;

            let choice = self.get_user_input(InputMode::Clean, &menu.prompt()).await?;
            if choice.is_empty() || menu.has_action(&choice) {
                let data = menu.data(&choice);
                return Ok((choice, data));
            }
        }
    }

    /// Pass recoverable errors to the player; return fatal ones
    pub(crate) async fn check<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.print_error(&e.to_string()).await?;
                Ok(None)
            }
        }
    }

    pub(crate) fn color_mode(&self) -> ColorMode {
        self.user.color_mode()
    }

    pub(crate) async fn print_line_color(&mut self, color: Color, line: &str) -> Result<()> {
        let line = colorize(self.color_mode(), color, line);
        self.out.write_line(&line).await
    }

    pub(crate) async fn print_line(&mut self, line: &str) -> Result<()> {
        self.print_line_color(Color::White, line).await
    }

    pub(crate) async fn print_error(&mut self, line: &str) -> Result<()> {
        self.print_line_color(Color::Red, line).await
    }

    pub(crate) async fn print_room(&mut self) -> Result<()> {
        let world = &self.state.world;
        let players = world.players_in(self.room.id(), Some(self.player.id()));
        let npcs = world.npcs_in(self.room.id());
        let items = world.items(&self.room.item_ids());

        let text = describe_room(&self.room, self.color_mode(), &players, &npcs, &items);
        self.out.write_line(&text).await
    }

    pub(crate) async fn print_room_editor(&mut self) -> Result<()> {
        let text = describe_room_editor(&self.room, self.color_mode());
        self.out.write_line(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, StorageKind};
    use crate::core::store::MemoryStore;
    use crate::core::World;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::time::{timeout, Instant};

    fn state(delay_ms: u64) -> ServerState {
        let world = Arc::new(World::new(Arc::new(MemoryStore::new())));
        world.start_room().unwrap();
        let config = ServerConfig::builder()
            .storage(StorageKind::Memory)
            .input_delay_ms(delay_ms)
            .max_line_len(64)
            .build()
            .unwrap();
        ServerState::new(world, config)
    }

    /// Start a session for a fresh player; returns the client end
    fn connect(state: &ServerState, name: &str) -> (JoinHandle<Result<()>>, DuplexStream, EntityId) {
        let room = state.world.start_room().unwrap();
        let user = state.world.create_user(name).unwrap();
        let player = state.world.create_player(name, user.id(), room.id()).unwrap();
        let id = player.id();

        let (client, server) = tokio::io::duplex(64 * 1024);
        let (read_half, write_half) = tokio::io::split(server);
        let session = Session::start(
            state.clone(),
            LineReader::new(read_half, state.config.max_line_len),
            LineWriter::new(write_half),
            user,
            player,
        )
        .unwrap();

        (tokio::spawn(session.exec()), client, id)
    }

    async fn read_until(client: &mut DuplexStream, needle: &str) -> String {
        let mut output = Vec::new();
        let mut buf = [0u8; 1024];

        timeout(Duration::from_secs(10), async {
            while !String::from_utf8_lossy(&output).contains(needle) {
                let n = client.read(&mut buf).await.unwrap();
                assert!(n > 0, "Connection closed before {:?} appeared", needle);
                output.extend_from_slice(&buf[..n]);
            }
        })
        .await
        .unwrap_or_else(|_| panic!("Timed out waiting for {:?}", needle));

        String::from_utf8_lossy(&output).into_owned()
    }

    #[test]
    fn test_x_cancels() {
        assert_eq!(cancel_x("x".to_string()), "");
        assert_eq!(cancel_x(" X ".to_string()), "");
        assert_eq!(cancel_x("xyzzy".to_string()), "xyzzy");
    }

    #[tokio::test]
    async fn test_logout_ends_session_and_unregisters() {
        let state = state(0);
        let (handle, mut client, id) = connect(&state, "alice");

        read_until(&mut client, "Welcome, Alice").await;
        assert!(state.events.is_registered(id));

        client.write_all(b"logout\r\n").await.unwrap();
        read_until(&mut client, "Goodbye").await;

        assert!(handle.await.unwrap().is_ok());
        assert!(!state.events.is_registered(id));
        assert!(!state.world.character(id).unwrap().is_online());
    }

    #[tokio::test]
    async fn test_empty_line_ends_session() {
        let state = state(0);
        let (handle, mut client, _id) = connect(&state, "alice");

        client.write_all(b"\r\n").await.unwrap();

        assert!(handle.await.unwrap().is_ok());
        read_until(&mut client, "Goodbye").await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reader_failure_propagates() {
        let state = state(0);

        for i in 0..40 {
            let (handle, mut client, id) = connect(&state, &format!("player{}", i));
            read_until(&mut client, PROMPT).await;

            client.write_all(&[b'a'; 200]).await.unwrap();

            let result = handle.await.unwrap();
            assert!(
                matches!(result, Err(MudError::LineTooLong { max: 64 })),
                "Session {} ended with {:?}",
                i,
                result
            );
            assert!(!state.events.is_registered(id));
        }
    }

    #[tokio::test]
    async fn test_disconnect_ends_session() {
        let state = state(0);
        let (handle, client, _id) = connect(&state, "alice");

        drop(client);

        // Either the next write or the next read notices the hangup
        assert!(handle.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_event_printed_while_waiting_for_input() {
        let state = state(0);
        let (_handle, mut client, _id) = connect(&state, "alice");
        read_until(&mut client, "Exits:").await;

        let bob_user = state.world.create_user("bob").unwrap();
        let room = state.world.start_room().unwrap();
        let bob = state.world.create_player("bob", bob_user.id(), room.id()).unwrap();
        state.say(&bob, "anyone home?");

        let output = read_until(&mut client, "Bob says, \"anyone home?\"").await;
        assert!(output.contains("\r\x1b[2K"), "Event should clear the prompt line first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_inputs_are_throttled() {
        let state = state(200);
        let (_handle, mut client, _id) = connect(&state, "alice");
        read_until(&mut client, "Exits:").await;

        let start = Instant::now();
        client
            .write_all(b"/say 1\r\n/say 2\r\n/say 3\r\n/say 4\r\n/say 5\r\n")
            .await
            .unwrap();

        read_until(&mut client, "You say, \"5\"").await;
        assert!(Instant::now() - start >= Duration::from_millis(800));
    }
}

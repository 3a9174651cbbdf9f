/// Integration tests for mudhost
///
/// Runs the real accept loop on a loopback port and drives it with TCP
/// clients, covering event fan-out between sessions, interactive menus that
/// keep receiving events, and persistence across a world reload.

use mudhost_lib::{
    config::StorageKind,
    core::{JsonFileStore, MemoryStore, Store, World},
    network::TcpServer,
    session::serve,
    ServerConfig, ServerState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

// ============================================================================
// Helpers
// ============================================================================

async fn start_server(store: Arc<dyn Store>) -> (SocketAddr, ServerState) {
    let config = ServerConfig::builder()
        .listen_addr("127.0.0.1:0")
        .storage(StorageKind::Memory)
        .input_delay_ms(0)
        .build()
        .expect("Config should be valid");

    let world = Arc::new(World::load(store).expect("World should load"));
    let server = TcpServer::bind(&config.listen_addr).await.expect("Bind should succeed");
    let addr = server.local_addr().unwrap();
    let state = ServerState::new(world, config);

    tokio::spawn(serve(server, state.clone()));
    (addr, state)
}

struct Client {
    stream: TcpStream,
    pending: String,
}

impl Client {
    /// Connect and log in, returning once the first room has been shown
    async fn login(addr: SocketAddr, name: &str) -> Self {
        let stream = TcpStream::connect(addr).await.expect("Connect should succeed");
        let mut client = Self {
            stream,
            pending: String::new(),
        };

        client.expect("What is your name? ").await;
        client.send(name).await;
        client.expect("Exits:").await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .expect("Write should succeed");
    }

    /// Consume output up to and including `needle`, returning it
    async fn expect(&mut self, needle: &str) -> String {
        let mut buf = [0u8; 4096];

        let found = timeout(Duration::from_secs(10), async {
            loop {
                if let Some(pos) = self.pending.find(needle) {
                    return self.pending.drain(..pos + needle.len()).collect::<String>();
                }

                let n = self.stream.read(&mut buf).await.expect("Read should succeed");
                assert!(n > 0, "Server closed the connection before {:?}", needle);
                self.pending.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
        })
        .await;

        found.unwrap_or_else(|_| panic!("Timed out waiting for {:?}; got {:?}", needle, self.pending))
    }
}

// ============================================================================
// Event fan-out
// ============================================================================

#[tokio::test]
async fn test_say_reaches_room_but_not_other_rooms() {
    let (addr, _state) = start_server(Arc::new(MemoryStore::new())).await;

    let mut alice = Client::login(addr, "alice").await;
    let mut bob = Client::login(addr, "bob").await;
    let mut carol = Client::login(addr, "carol").await;

    // Carol digs her way into a room of her own
    carol.send("//e").await;
    carol.expect("Exits:").await;
    alice.expect("Carol has left the room to the east").await;
    bob.expect("Carol has left the room to the east").await;

    alice.send("/say hello").await;
    let heard = bob.expect("Alice says, \"hello\"").await;
    assert!(!heard.contains("You say"));
    alice.expect("You say, \"hello\"").await;

    // Mailboxes are FIFO, so anything Carol heard would come before this
    alice.send("/broadcast done").await;
    let carol_saw = carol.expect("Broadcast from Alice: done").await;
    assert!(!carol_saw.contains("hello"), "Carol must not hear the say: {:?}", carol_saw);
    bob.expect("Broadcast from Alice: done").await;
}

#[tokio::test]
async fn test_tell_is_private() {
    let (addr, _state) = start_server(Arc::new(MemoryStore::new())).await;

    let mut alice = Client::login(addr, "alice").await;
    let mut bob = Client::login(addr, "bob").await;
    let mut carol = Client::login(addr, "carol").await;

    alice.send("/tell bob meet me upstairs").await;
    alice.expect("Message sent to Bob").await;
    bob.expect("Message from Alice: meet me upstairs").await;

    alice.send("/broadcast marker").await;
    let carol_saw = carol.expect("Broadcast from Alice: marker").await;
    assert!(!carol_saw.contains("upstairs"));
}

#[tokio::test]
async fn test_login_and_logout_are_announced() {
    let (addr, state) = start_server(Arc::new(MemoryStore::new())).await;

    let mut alice = Client::login(addr, "alice").await;
    let mut bob = Client::login(addr, "bob").await;
    alice.expect("Bob has connected").await;

    bob.send("logout").await;
    bob.expect("Goodbye").await;
    alice.expect("Bob has disconnected").await;

    let bob_character = state.world.character_by_name("bob").unwrap();
    assert!(!bob_character.is_online());

    // The mailbox goes away once the session task has wound down
    timeout(Duration::from_secs(5), async {
        while state.events.is_registered(bob_character.id()) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Bob's mailbox should be unregistered");
}

// ============================================================================
// Interactive flows
// ============================================================================

#[tokio::test]
async fn test_menu_redraws_prompt_after_event() {
    let (addr, state) = start_server(Arc::new(MemoryStore::new())).await;

    let mut alice = Client::login(addr, "alice").await;
    let mut bob = Client::login(addr, "bob").await;

    alice.send("/npc").await;
    alice.expect("NPCs> ").await;

    bob.send("/say psst").await;
    let before = alice.expect("Bob says, \"psst\"").await;
    assert!(before.contains("\r\x1b[2K"), "The prompt line is cleared first");

    // The prompt comes straight back and the menu still takes its choice
    let redraw = alice.expect("NPCs> ").await;
    assert!(!redraw.contains("[N]"), "Only the prompt is redrawn, not the whole menu");

    alice.send("n").await;
    alice.expect("Desired NPC name: ").await;
    alice.send("guard").await;
    alice.expect("Guard").await;

    let room = state.world.start_room().unwrap();
    assert_eq!(state.world.npcs_in(room.id()).len(), 1);
    bob.expect("Guard has entered the room").await;
}

#[tokio::test]
async fn test_room_editor_and_exit_toggle() {
    let (addr, state) = start_server(Arc::new(MemoryStore::new())).await;
    let mut alice = Client::login(addr, "alice").await;

    alice.send("/edit").await;
    alice.expect("Select a section to edit: ").await;
    alice.send("1").await;
    alice.expect("Enter new title: ").await;
    alice.send("Hall of Mirrors").await;
    alice.expect("Select a section to edit: ").await;

    alice.send("3").await;
    alice.expect("Edit Exits> ").await;
    alice.send("n").await;
    alice.expect("Edit Exits> ").await;
    alice.send("").await;
    alice.expect("Select a section to edit: ").await;
    alice.send("").await;
    alice.expect("Hall of Mirrors").await;

    let room = state.world.start_room().unwrap();
    assert_eq!(room.title(), "Hall of Mirrors");
    assert_eq!(room.exits(), vec![mudhost_lib::model::Direction::North]);

    alice.send("n").await;
    alice.expect("Exits:").await;
    let alice_character = state.world.character_by_name("alice").unwrap();
    assert_ne!(alice_character.room_id(), room.id());
}

#[tokio::test]
async fn test_invalid_commands_do_not_end_session() {
    let (addr, _state) = start_server(Arc::new(MemoryStore::new())).await;
    let mut alice = Client::login(addr, "alice").await;

    alice.send("/frobnicate").await;
    alice.expect("Unrecognized command: frobnicate").await;
    alice.send("w").await;
    alice.expect("You can't go that way").await;
    alice.send("/cash give lots").await;
    alice.expect("Usage: /cash give <amount>").await;

    alice.send("/cash give 12").await;
    alice.expect("Received: 12 monies").await;
    alice.send("inventory").await;
    alice.expect("Cash: 12").await;
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_world_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn Store> = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let (addr, _state) = start_server(store).await;

    let mut alice = Client::login(addr, "alice").await;
    alice.send("/zone new Forest").await;
    alice.expect("Exits:").await;
    alice.send("/create acorn").await;
    alice.expect("Item created").await;
    alice.send("logout").await;
    alice.expect("Goodbye").await;

    let reopened: Arc<dyn Store> = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let world = World::load(reopened).unwrap();

    let forest = world.zone_by_name("forest").expect("Zone should persist");
    let alice_character = world.character_by_name("alice").unwrap();
    let room = world.room(alice_character.room_id()).unwrap();

    assert_eq!(room.zone_id(), forest.id());
    assert_eq!(world.items(&room.item_ids())[0].name(), "acorn");
    assert!(!alice_character.is_online());
}

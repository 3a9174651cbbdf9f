/// Player commands and actions
///
/// `/command args` lines go through `process_command`; anything else is an
/// in-world action handled by `handle_action`. Invalid input is reported to
/// the player and never ends the session.

use crate::core::EntityId;
use crate::error::Result;
use crate::model::{Coordinate, Direction};
use crate::network::{Color, ColorMode};
use crate::session::dispatcher::{InputMode, Session};
use crate::session::menu::{exit_menu, npc_menu, specific_npc_menu, EditorState, NpcState};
use crate::text::{best_match, BestMatch};
use tokio::io::AsyncWrite;
use tracing::debug;

const HELP: &[(&str, &str)] = &[
    ("<direction>", "Walk through an exit (n, ne, e, se, s, sw, w, nw, u, d)"),
    ("look", "Describe the room"),
    ("inventory", "Show what you carry"),
    ("talk <npc>", "Talk to someone here"),
    ("/say <message>", "Speak to the room"),
    ("/me <action>", "Emote to the room"),
    ("/tell <player> <message>", "Whisper to one player"),
    ("/broadcast <message>", "Speak to everyone online"),
    ("/who", "List online players"),
    ("/edit", "Edit this room"),
    ("//<direction>", "Dig a new room in that direction"),
    ("/destroyroom <direction>", "Remove the neighbouring room"),
    ("/teleport <zone>|<x> <y> <z>", "Jump elsewhere"),
    ("/zone [list|new <name>|rename <name>]", "Zone management"),
    ("/area [list|new <name>]", "Area management"),
    ("/npc", "Manage NPCs in this room"),
    ("/create <item>", "Create an item here"),
    ("/destroyitem <item>", "Destroy an item here"),
    ("/cash give <amount>", "Receive money"),
    ("/colormode [none|light|dark]", "Show or set the color mode"),
    ("/location, /roomid", "Where am I?"),
    ("logout", "Leave the game"),
];

impl<W: AsyncWrite + Unpin + Send> Session<W> {
    pub(crate) async fn process_command(&mut self, command: &str, args: &[String]) -> Result<()> {
        debug!(command, ?args, "Processing command");

        // `//n` digs north
        if let Some(direction) = command.strip_prefix('/').and_then(Direction::parse) {
            return self.dig(direction).await;
        }

        match command {
            "help" | "?" => self.help().await,
            "edit" => self.edit_room().await,
            "loc" | "location" => {
                let location = self.room.location().to_string();
                self.print_line(&location).await
            }
            "roomid" => {
                let line = format!("Room ID: {}", self.room.id());
                self.print_line(&line).await
            }
            "zone" => self.zone_command(args).await,
            "area" => self.area_command(args).await,
            "broadcast" | "b" => {
                if args.is_empty() {
                    return self.print_error("Nothing to say").await;
                }
                self.state.broadcast(&self.player, &args.join(" "));
                Ok(())
            }
            "say" | "s" => {
                if args.is_empty() {
                    return self.print_error("Nothing to say").await;
                }
                self.state.say(&self.player, &args.join(" "));
                Ok(())
            }
            "me" => {
                if args.is_empty() {
                    return self.print_error("Usage: /me <action>").await;
                }
                self.state.emote(&self.player, &args.join(" "));
                Ok(())
            }
            "whisper" | "tell" | "w" => self.tell(args).await,
            "teleport" | "tel" => self.teleport(args).await,
            "who" => self.who().await,
            "colors" => self.colors().await,
            "colormode" | "cm" => self.color_mode_command(args).await,
            "destroyroom" => self.destroy_room(args).await,
            "npc" => self.npc_flow().await,
            "create" => self.create_item(args).await,
            "destroyitem" => self.destroy_item(args).await,
            "cash" => self.cash(args).await,
            _ => {
                let line = format!("Unrecognized command: {}", command);
                self.print_error(&line).await
            }
        }
    }

    pub(crate) async fn handle_action(&mut self, action: &str, args: &[String]) -> Result<()> {
        if let Some(direction) = Direction::parse(action) {
            let moved = self.state.move_character(&self.player, direction);
            if let Some(room) = self.check(moved).await? {
                self.room = room;
                self.print_room().await?;
            }
            return Ok(());
        }

        match action {
            "l" | "look" => self.print_room().await,
            "i" | "inv" | "inventory" => {
                let line = format!("Cash: {}", self.player.cash());
                self.print_line(&line).await
            }
            "talk" => self.talk(args).await,
            _ => self.print_error("You can't do that").await,
        }
    }

    async fn help(&mut self) -> Result<()> {
        self.print_line_color(Color::Blue, "Commands").await?;
        self.print_line_color(Color::Blue, "--------").await?;
        for (usage, text) in HELP {
            let line = format!("{:<40} {}", usage, text);
            self.print_line(&line).await?;
        }
        Ok(())
    }

    async fn dig(&mut self, direction: Direction) -> Result<()> {
        let dug = self.state.dig(&self.player, direction);
        if let Some(room) = self.check(dug).await? {
            self.room = room;
            self.print_room().await?;
        }
        Ok(())
    }

    // ========================================
    // Room editor
    // ========================================

    async fn edit_room(&mut self) -> Result<()> {
        let mut state = EditorState::Sections;
        self.print_room_editor().await?;

        loop {
            state = match state {
                EditorState::Sections => {
                    let choice = self
                        .get_user_input(InputMode::Clean, "Select a section to edit: ")
                        .await?;
                    match EditorState::from_section(&choice) {
                        Some(next) => next,
                        None => {
                            self.print_error("Invalid selection").await?;
                            EditorState::Sections
                        }
                    }
                }
                EditorState::Title => {
                    let title = self.get_user_input(InputMode::Raw, "Enter new title: ").await?;
                    if !title.is_empty() {
                        let room = self.room.clone();
                        let result = self.state.set_room_title(&room, &title);
                        self.check(result).await?;
                    }
                    self.print_room_editor().await?;
                    EditorState::Sections
                }
                EditorState::Description => {
                    let description = self
                        .get_user_input(InputMode::Raw, "Enter new description: ")
                        .await?;
                    if !description.is_empty() {
                        let room = self.room.clone();
                        let result = self.state.set_room_description(&room, &description);
                        self.check(result).await?;
                    }
                    self.print_room_editor().await?;
                    EditorState::Sections
                }
                EditorState::Exits => {
                    let menu = exit_menu(self.color_mode(), &self.room.exits());
                    let (choice, _) = self.exec_menu(&menu).await?;

                    match Direction::parse(&choice) {
                        Some(direction) => {
                            let room = self.room.clone();
                            let result = self.state.toggle_exit(&room, direction);
                            self.check(result).await?;
                            EditorState::Exits
                        }
                        None => {
                            self.print_room_editor().await?;
                            EditorState::Sections
                        }
                    }
                }
                EditorState::Done => break,
            };
        }

        self.print_room().await
    }

    // ========================================
    // Zones and areas
    // ========================================

    async fn zone_command(&mut self, args: &[String]) -> Result<()> {
        match args {
            [] => {
                let mut line = format!("Current zone: {}", self.zone.name());
                if let Some((min, max)) = self.state.world.zone_corners(self.zone.id()) {
                    line.push_str(&format!(" (spanning {} to {})", min, max));
                }
                self.print_line(&line).await
            }
            [list] if list == "list" => {
                self.print_line_color(Color::Blue, "Zones").await?;
                self.print_line_color(Color::Blue, "-----").await?;
                for zone in self.state.world.zones() {
                    self.print_line(&zone.name()).await?;
                }
                Ok(())
            }
            [verb, name] if verb == "rename" => {
                let zone = self.zone.clone();
                let result = self.state.rename_zone(&zone, name);
                if self.check(result).await?.is_some() {
                    let line = format!("Zone renamed to {}", name);
                    self.print_line(&line).await?;
                }
                Ok(())
            }
            [verb, name] if verb == "new" => {
                let created = self.state.new_zone(&self.player, name);
                if let Some((zone, room)) = self.check(created).await? {
                    self.zone = zone;
                    self.room = room;
                    self.print_room().await?;
                }
                Ok(())
            }
            _ => self.print_error("Usage: /zone [list|rename <name>|new <name>]").await,
        }
    }

    async fn area_command(&mut self, args: &[String]) -> Result<()> {
        match args {
            [] | [_] if args.first().map_or(true, |a| a == "list") => {
                let mut names: Vec<String> = self
                    .state
                    .world
                    .areas_in_zone(self.zone.id())
                    .iter()
                    .map(|a| a.name())
                    .collect();
                names.sort();

                self.print_line_color(Color::Blue, "Areas").await?;
                self.print_line_color(Color::Blue, "-----").await?;
                for name in names {
                    self.print_line(&name).await?;
                }
                Ok(())
            }
            [verb, name] if verb == "new" => {
                let zone = self.zone.clone();
                let created = self.state.new_area(&zone, name);
                if self.check(created).await?.is_some() {
                    let line = format!("Area {} created", name);
                    self.print_line(&line).await?;
                }
                Ok(())
            }
            _ => self.print_error("Usage: /area [list|new <name>]").await,
        }
    }

    // ========================================
    // Communication
    // ========================================

    async fn tell(&mut self, args: &[String]) -> Result<()> {
        let [name, message @ ..] = args else {
            return self.print_error("Usage: /whisper <player> <message>").await;
        };
        if message.is_empty() {
            return self.print_error("Usage: /whisper <player> <message>").await;
        }

        let Some(target) = self.state.world.character_by_name(name) else {
            let line = format!("Player '{}' not found", name);
            return self.print_error(&line).await;
        };

        if !target.is_online() {
            let line = format!("Player '{}' is not online", target.pretty_name());
            return self.print_error(&line).await;
        }

        self.state.tell(&self.player, &target, &message.join(" "));
        let line = format!("Message sent to {}", target.pretty_name());
        self.print_line_color(Color::Magenta, &line).await
    }

    async fn who(&mut self) -> Result<()> {
        let mut names: Vec<String> = self
            .state
            .world
            .online_characters()
            .iter()
            .map(|c| c.pretty_name())
            .collect();
        names.sort();

        self.print_line("").await?;
        self.print_line("Online Players").await?;
        self.print_line("--------------").await?;
        for name in names {
            self.print_line(&name).await?;
        }
        self.print_line("").await
    }

    async fn talk(&mut self, args: &[String]) -> Result<()> {
        let [name] = args else {
            return self.print_error("Usage: talk <npc>").await;
        };

        let npcs = self.state.world.npcs_in(self.room.id());
        let names: Vec<String> = npcs.iter().map(|n| n.name()).collect();

        match best_match(name, &names) {
            BestMatch::Found(index) => {
                let npc = &npcs[index];
                let line = match npc.conversation() {
                    text if text.is_empty() => format!("{} has nothing to say", npc.pretty_name()),
                    text => format!("{} says, \"{}\"", npc.pretty_name(), text),
                };
                self.print_line(&line).await
            }
            BestMatch::Ambiguous => self.print_error("Which one do you mean?").await,
            BestMatch::NotFound => self.print_error("Nobody by that name here").await,
        }
    }

    // ========================================
    // Movement
    // ========================================

    async fn teleport(&mut self, args: &[String]) -> Result<()> {
        const USAGE: &str = "Usage: /teleport [<zone>|<X> <Y> <Z>]";

        let (zone, location) = match args {
            [name] => {
                let Some(zone) = self.state.world.zone_by_name(name) else {
                    return self.print_error("Zone not found").await;
                };
                if zone.id() == self.room.zone_id() {
                    return self.print_line("You're already in that zone").await;
                }

                let location = self
                    .state
                    .world
                    .rooms_in_zone(zone.id())
                    .first()
                    .map(|r| r.location())
                    .unwrap_or_default();
                (zone, location)
            }
            [x, y, z] => match (x.parse(), y.parse(), z.parse()) {
                (Ok(x), Ok(y), Ok(z)) => (self.zone.clone(), Coordinate::new(x, y, z)),
                _ => return self.print_error(USAGE).await,
            },
            _ => return self.print_error(USAGE).await,
        };

        let moved = self.state.teleport(&self.player, zone.id(), location);
        if let Some(room) = self.check(moved).await? {
            self.room = room;
            self.zone = zone;
            self.print_room().await?;
        }
        Ok(())
    }

    async fn destroy_room(&mut self, args: &[String]) -> Result<()> {
        let [direction] = args else {
            return self.print_error("Usage: /destroyroom <direction>").await;
        };
        let Some(direction) = Direction::parse(direction) else {
            return self.print_error("Not a valid direction").await;
        };

        let room = self.room.clone();
        let result = self.state.destroy_room(&room, direction);
        if self.check(result).await?.is_some() {
            self.print_line("Room destroyed").await?;
        }
        Ok(())
    }

    // ========================================
    // Preferences
    // ========================================

    async fn colors(&mut self) -> Result<()> {
        for (color, name) in [
            (Color::Red, "Red"),
            (Color::Green, "Green"),
            (Color::Yellow, "Yellow"),
            (Color::Blue, "Blue"),
            (Color::Magenta, "Magenta"),
            (Color::Cyan, "Cyan"),
            (Color::White, "White"),
            (Color::Gray, "Gray"),
        ] {
            self.print_line_color(color, name).await?;
        }
        Ok(())
    }

    async fn color_mode_command(&mut self, args: &[String]) -> Result<()> {
        match args {
            [] => {
                let line = format!("Current color mode is: {}", self.color_mode());
                self.print_line(&line).await
            }
            [name] => match ColorMode::parse(name) {
                Some(mode) => {
                    let result = self.user.set_color_mode(mode);
                    if self.check(result).await?.is_some() {
                        let line = format!("Color mode set to: {}", mode);
                        self.print_line(&line).await?;
                    }
                    Ok(())
                }
                None => self.print_line("Valid color modes are: None, Light, Dark").await,
            },
            _ => self.print_line("Valid color modes are: None, Light, Dark").await,
        }
    }

    // ========================================
    // NPCs
    // ========================================

    async fn npc_flow(&mut self) -> Result<()> {
        let mut state = NpcState::Choose;

        loop {
            state = match state {
                NpcState::Choose => {
                    let npcs: Vec<(EntityId, String)> = self
                        .state
                        .world
                        .npcs_in(self.room.id())
                        .iter()
                        .map(|n| (n.id(), n.pretty_name()))
                        .collect();

                    match self.exec_menu(&npc_menu(&npcs)).await? {
                        (choice, _) if choice == "n" => NpcState::Create,
                        (_, Some(id)) => NpcState::Selected(id),
                        _ => NpcState::Done,
                    }
                }
                NpcState::Create => {
                    if let Some(name) = self.ask_npc_name().await? {
                        let room = self.room.clone();
                        let created = self.state.create_npc(&room, &name);
                        self.check(created).await?;
                    }
                    NpcState::Done
                }
                NpcState::Selected(id) => {
                    let Some(npc) = self.state.world.character(id) else {
                        self.print_error("That NPC is gone").await?;
                        break;
                    };

                    match self.exec_menu(&specific_npc_menu(&npc.pretty_name())).await?.0.as_str() {
                        "r" => NpcState::Rename(id),
                        "c" => NpcState::Conversation(id),
                        "d" => {
                            let prompt = format!("Delete {}? [y/n] ", npc.pretty_name());
                            if self.get_user_input(InputMode::Key, &prompt).await?.eq_ignore_ascii_case("y") {
                                let result = self.state.delete_npc(&npc);
                                self.check(result).await?;
                            }
                            NpcState::Done
                        }
                        _ => NpcState::Done,
                    }
                }
                NpcState::Rename(id) => {
                    if let (Some(name), Some(npc)) = (self.ask_npc_name().await?, self.state.world.character(id)) {
                        let result = self.state.rename_npc(&npc, &name);
                        self.check(result).await?;
                    }
                    NpcState::Done
                }
                NpcState::Conversation(id) => {
                    if let Some(npc) = self.state.world.character(id) {
                        let current = match npc.conversation() {
                            text if text.is_empty() => "<empty>".to_string(),
                            text => text,
                        };
                        self.print_line(&format!("Conversation: {}", current)).await?;

                        let text = self.get_user_input(InputMode::Raw, "New conversation text: ").await?;
                        if !text.is_empty() {
                            let result = npc.set_conversation(text);
                            self.check(result).await?;
                        }
                    }
                    NpcState::Done
                }
                NpcState::Done => break,
            };
        }

        self.print_room().await
    }

    /// Ask until the player gives a usable NPC name or backs out
    async fn ask_npc_name(&mut self) -> Result<Option<String>> {
        loop {
            let name = self.get_user_input(InputMode::Clean, "Desired NPC name: ").await?;
            if name.is_empty() {
                return Ok(None);
            }

            let valid = self.state.check_character_name(&name);
            if self.check(valid).await?.is_some() {
                return Ok(Some(name));
            }
        }
    }

    // ========================================
    // Items and cash
    // ========================================

    async fn create_item(&mut self, args: &[String]) -> Result<()> {
        let [name] = args else {
            return self.print_error("Usage: /create <item name>").await;
        };

        let room = self.room.clone();
        let created = self.state.create_item(&room, name);
        if self.check(created).await?.is_some() {
            self.print_line("Item created").await?;
        }
        Ok(())
    }

    async fn destroy_item(&mut self, args: &[String]) -> Result<()> {
        let [name] = args else {
            return self.print_error("Usage: /destroyitem <item name>").await;
        };

        let room = self.room.clone();
        let destroyed = self.state.destroy_item(&room, name);
        match self.check(destroyed).await? {
            Some(true) => self.print_line("Item destroyed").await,
            Some(false) => self.print_error("Item not found").await,
            None => Ok(()),
        }
    }

    async fn cash(&mut self, args: &[String]) -> Result<()> {
        const USAGE: &str = "Usage: /cash give <amount>";

        let [verb, amount] = args else {
            return self.print_error(USAGE).await;
        };
        let (true, Ok(amount)) = (verb == "give", amount.parse::<i64>()) else {
            return self.print_error(USAGE).await;
        };

        let result = self.state.give_cash(&self.player, amount);
        if self.check(result).await?.is_some() {
            let line = format!("Received: {} monies", amount);
            self.print_line(&line).await?;
        }
        Ok(())
    }
}

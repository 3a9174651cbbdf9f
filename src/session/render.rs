/// Text shown for rooms and the room editor

use crate::model::{Character, Item, Room};
use crate::network::{colorize, Color, ColorMode};
use std::sync::Arc;

fn exit_list(room: &Room) -> String {
    let exits: Vec<&str> = room.exits().into_iter().map(|d| d.short()).collect();
    if exits.is_empty() {
        "None".to_string()
    } else {
        exits.join(" ")
    }
}

/// What a player sees on entering or looking at a room
pub fn describe_room(
    room: &Room,
    mode: ColorMode,
    players: &[Arc<Character>],
    npcs: &[Arc<Character>],
    items: &[Arc<Item>],
) -> String {
    let mut out = vec![
        String::new(),
        format!(" {}", colorize(mode, Color::White, &format!(">>> {} <<<", room.title()))),
        String::new(),
        format!(" {}", colorize(mode, Color::White, &room.description())),
        String::new(),
    ];

    if !players.is_empty() || !npcs.is_empty() {
        let mut names: Vec<String> = players
            .iter()
            .map(|p| colorize(mode, Color::Blue, &p.pretty_name()))
            .collect();
        names.extend(npcs.iter().map(|n| colorize(mode, Color::Yellow, &n.pretty_name())));

        out.push(format!(" {} {}", colorize(mode, Color::Blue, "Also here:"), names.join(", ")));
    }

    if !items.is_empty() {
        let names: Vec<String> = items
            .iter()
            .map(|i| colorize(mode, Color::Yellow, &i.pretty_name()))
            .collect();
        out.push(format!(" {} {}", colorize(mode, Color::Blue, "Items:"), names.join(", ")));
    }

    out.push(format!(
        " {} {}",
        colorize(mode, Color::Blue, "Exits:"),
        colorize(mode, Color::White, &exit_list(room))
    ));
    out.push(String::new());

    out.join("\n")
}

/// Numbered sections of the room editor
pub fn describe_room_editor(room: &Room, mode: ColorMode) -> String {
    let section = |n: u8, label: &str, value: &str| {
        format!(
            " {} {}: {}",
            colorize(mode, Color::Blue, &format!("[{}]", n)),
            label,
            colorize(mode, Color::White, value)
        )
    };

    [
        String::new(),
        section(1, "Title", &room.title()),
        section(2, "Description", &room.description()),
        section(3, "Exits", &exit_list(room)),
        String::new(),
    ]
    .join("\n")
}

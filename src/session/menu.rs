/// Menus and the states of interactive editing flows

use crate::core::EntityId;
use crate::model::Direction;
use crate::network::{colorize, Color, ColorMode};

const MENU_PROMPT: &str = "> ";

#[derive(Debug, Clone)]
struct MenuAction {
    key: String,
    text: String,
    data: Option<EntityId>,
}

/// A titled list of keyed choices
#[derive(Debug, Clone)]
pub struct Menu {
    title: String,
    actions: Vec<MenuAction>,
}

impl Menu {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            actions: Vec::new(),
        }
    }

    /// Add a choice selected by typing `key`
    pub fn add_action(&mut self, key: &str, text: impl Into<String>) {
        self.actions.push(MenuAction {
            key: key.to_lowercase(),
            text: text.into(),
            data: None,
        });
    }

    /// Add a numbered choice carrying an entity id
    pub fn add_action_data(&mut self, index: usize, text: impl Into<String>, data: EntityId) {
        self.actions.push(MenuAction {
            key: index.to_string(),
            text: text.into(),
            data: Some(data),
        });
    }

    pub fn has_action(&self, choice: &str) -> bool {
        self.find(choice).is_some()
    }

    /// Entity attached to a choice, if any
    pub fn data(&self, choice: &str) -> Option<EntityId> {
        self.find(choice).and_then(|a| a.data)
    }

    pub fn prompt(&self) -> String {
        format!("{}{}", self.title, MENU_PROMPT)
    }

    fn find(&self, choice: &str) -> Option<&MenuAction> {
        let choice = choice.to_lowercase();
        self.actions.iter().find(|a| a.key == choice)
    }

    pub fn render(&self, mode: ColorMode) -> String {
        let border = "-".repeat(self.title.len() + 4);
        let mut out = vec![
            String::new(),
            colorize(mode, Color::White, &border),
            colorize(mode, Color::White, &format!("  {}", self.title)),
            colorize(mode, Color::White, &border),
        ];

        for action in &self.actions {
            out.push(format!(
                "  {} {}",
                colorize(mode, Color::Blue, &format!("[{}]", action.key.to_uppercase())),
                colorize(mode, Color::White, &action.text)
            ));
        }

        out.push(String::new());
        out.join("\n")
    }
}

/// Room editor: section list, free-text questions, exit toggling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Sections,
    Title,
    Description,
    Exits,
    Done,
}

impl EditorState {
    /// Next state for a choice made on the section list
    pub fn from_section(choice: &str) -> Option<Self> {
        match choice {
            "" => Some(EditorState::Done),
            "1" => Some(EditorState::Title),
            "2" => Some(EditorState::Description),
            "3" => Some(EditorState::Exits),
            _ => None,
        }
    }
}

/// NPC management flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcState {
    /// Pick an NPC in the room or create a new one
    Choose,
    Create,
    Selected(EntityId),
    Rename(EntityId),
    Conversation(EntityId),
    Done,
}

/// Menu of every direction with its current on/off state
pub fn exit_menu(mode: ColorMode, enabled: &[Direction]) -> Menu {
    let mut menu = Menu::new("Edit Exits");

    for direction in Direction::ALL {
        let state = if enabled.contains(&direction) { "On" } else { "Off" };
        menu.add_action(
            direction.short(),
            format!("{}: {}", direction.name(), colorize(mode, Color::Blue, state)),
        );
    }

    menu
}

/// Menu of the NPCs in a room, plus "new"
pub fn npc_menu(npcs: &[(EntityId, String)]) -> Menu {
    let mut menu = Menu::new("NPCs");
    menu.add_action("n", "New");

    for (i, (id, name)) in npcs.iter().enumerate() {
        menu.add_action_data(i + 1, name.clone(), *id);
    }

    menu
}

pub fn specific_npc_menu(name: &str) -> Menu {
    let mut menu = Menu::new(name);
    menu.add_action("r", "Rename");
    menu.add_action("d", "Delete");
    menu.add_action("c", "Conversation");
    menu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_are_case_insensitive() {
        let mut menu = Menu::new("Test");
        menu.add_action("N", "New");

        assert!(menu.has_action("n"));
        assert!(menu.has_action("N"));
        assert!(!menu.has_action("x"));
        assert!(!menu.has_action(""));
    }

    #[test]
    fn test_numbered_actions_carry_data() {
        let (guard, cook) = (EntityId::new(), EntityId::new());
        let menu = npc_menu(&[(guard, "Guard".to_string()), (cook, "Cook".to_string())]);

        assert_eq!(menu.data("1"), Some(guard));
        assert_eq!(menu.data("2"), Some(cook));
        assert_eq!(menu.data("n"), None);
        assert!(menu.has_action("n"));
    }

    #[test]
    fn test_render_lists_every_action() {
        let menu = exit_menu(ColorMode::None, &[Direction::North]);
        let text = menu.render(ColorMode::None);

        assert!(text.contains("Edit Exits"));
        assert!(text.contains("[N] north: On"));
        assert!(text.contains("[SW] southwest: Off"));
        assert_eq!(menu.prompt(), "Edit Exits> ");
    }

    #[test]
    fn test_editor_sections() {
        assert_eq!(EditorState::from_section("1"), Some(EditorState::Title));
        assert_eq!(EditorState::from_section(""), Some(EditorState::Done));
        assert_eq!(EditorState::from_section("9"), None);
    }
}

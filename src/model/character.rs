/// Player characters and NPCs

use crate::core::entity::{Entity, EntityData, EntityId, EntityKind};
use crate::error::{MudError, Result};
use crate::text::format_name;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterData {
    pub name: String,
    /// Owning account; `None` marks an NPC
    #[serde(default)]
    pub user_id: Option<EntityId>,
    pub room_id: EntityId,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub cash: i64,
    #[serde(default)]
    pub conversation: String,
}

impl CharacterData {
    pub fn player(name: impl Into<String>, user_id: EntityId, room_id: EntityId) -> Self {
        Self {
            name: name.into(),
            user_id: Some(user_id),
            room_id,
            online: false,
            cash: 0,
            conversation: String::new(),
        }
    }

    pub fn npc(name: impl Into<String>, room_id: EntityId) -> Self {
        Self {
            name: name.into(),
            user_id: None,
            room_id,
            online: false,
            cash: 0,
            conversation: String::new(),
        }
    }
}

impl EntityData for CharacterData {
    const KIND: EntityKind = EntityKind::Character;
}

pub type Character = Entity<CharacterData>;

impl Entity<CharacterData> {
    pub fn name(&self) -> String {
        self.read(|c| c.name.clone())
    }

    /// Display form of the name
    pub fn pretty_name(&self) -> String {
        format_name(&self.name())
    }

    pub fn set_name(&self, name: impl Into<String>) -> Result<()> {
        self.update(name.into(), |c| &mut c.name)?;
        Ok(())
    }

    pub fn user_id(&self) -> Option<EntityId> {
        self.read(|c| c.user_id)
    }

    pub fn is_npc(&self) -> bool {
        self.user_id().is_none()
    }

    pub fn room_id(&self) -> EntityId {
        self.read(|c| c.room_id)
    }

    pub fn set_room_id(&self, room_id: EntityId) -> Result<()> {
        self.update(room_id, |c| &mut c.room_id)?;
        Ok(())
    }

    pub fn is_online(&self) -> bool {
        self.read(|c| c.online)
    }

    pub fn set_online(&self, online: bool) -> Result<()> {
        self.update(online, |c| &mut c.online)?;
        Ok(())
    }

    pub fn cash(&self) -> i64 {
        self.read(|c| c.cash)
    }

    /// Add (or with a negative amount, remove) cash; refused if the total would overflow
    pub fn add_cash(&self, amount: i64) -> Result<()> {
        let mut overflow = false;

        self.modify(|c| match c.cash.checked_add(amount) {
            Some(total) => {
                c.cash = total;
                amount != 0
            }
            None => {
                overflow = true;
                false
            }
        })?;

        if overflow {
            return Err(MudError::ValidationError {
                field: "cash".to_string(),
                reason: "amount is too large".to_string(),
            });
        }
        Ok(())
    }

    pub fn conversation(&self) -> String {
        self.read(|c| c.conversation.clone())
    }

    pub fn set_conversation(&self, text: impl Into<String>) -> Result<()> {
        self.update(text.into(), |c| &mut c.conversation)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_npc_has_no_user() {
        let store = Arc::new(MemoryStore::new());
        let npc = Character::create(CharacterData::npc("guard", EntityId::new()), store).unwrap();

        assert!(npc.is_npc());
        assert_eq!(npc.pretty_name(), "Guard");
    }

    #[test]
    fn test_add_zero_cash_does_not_commit() {
        let store = Arc::new(MemoryStore::new());
        let player = Character::create(
            CharacterData::player("alice", EntityId::new(), EntityId::new()),
            store.clone(),
        )
        .unwrap();

        player.add_cash(25).unwrap();
        player.add_cash(0).unwrap();

        assert_eq!(player.cash(), 25);
        assert_eq!(store.commit_count(), 2);
    }

    #[test]
    fn test_cash_overflow_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let player = Character::create(
            CharacterData::player("alice", EntityId::new(), EntityId::new()),
            store.clone(),
        )
        .unwrap();

        player.add_cash(i64::MAX).unwrap();
        let err = player.add_cash(1).unwrap_err();

        assert!(matches!(err, MudError::ValidationError { ref field, .. } if field == "cash"));
        assert!(!err.is_fatal());
        assert_eq!(player.cash(), i64::MAX);
        assert_eq!(store.commit_count(), 2);
    }
}

/// Objects lying in rooms

use crate::core::entity::{Entity, EntityData, EntityKind};
use crate::text::format_name;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub name: String,
}

impl EntityData for ItemData {
    const KIND: EntityKind = EntityKind::Item;
}

pub type Item = Entity<ItemData>;

impl Entity<ItemData> {
    pub fn name(&self) -> String {
        self.read(|i| i.name.clone())
    }

    pub fn pretty_name(&self) -> String {
        format_name(&self.name())
    }
}

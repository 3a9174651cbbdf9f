/// Named region inside a zone

use crate::core::entity::{Entity, EntityData, EntityId, EntityKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaData {
    pub name: String,
    pub zone_id: EntityId,
}

impl EntityData for AreaData {
    const KIND: EntityKind = EntityKind::Area;
}

pub type Area = Entity<AreaData>;

impl Entity<AreaData> {
    pub fn name(&self) -> String {
        self.read(|a| a.name.clone())
    }

    pub fn zone_id(&self) -> EntityId {
        self.read(|a| a.zone_id)
    }
}

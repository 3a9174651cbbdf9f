/// Named group of rooms

use crate::core::entity::{Entity, EntityData, EntityKind};
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneData {
    pub name: String,
}

impl EntityData for ZoneData {
    const KIND: EntityKind = EntityKind::Zone;
}

pub type Zone = Entity<ZoneData>;

impl Entity<ZoneData> {
    pub fn name(&self) -> String {
        self.read(|z| z.name.clone())
    }

    pub fn set_name(&self, name: impl Into<String>) -> Result<()> {
        self.update(name.into(), |z| &mut z.name)?;
        Ok(())
    }
}

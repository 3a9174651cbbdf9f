/// Login account holding per-connection preferences

use crate::core::entity::{Entity, EntityData, EntityKind};
use crate::error::Result;
use crate::network::ColorMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub name: String,
    #[serde(default)]
    pub color_mode: ColorMode,
}

impl EntityData for UserData {
    const KIND: EntityKind = EntityKind::User;
}

pub type User = Entity<UserData>;

impl Entity<UserData> {
    pub fn name(&self) -> String {
        self.read(|u| u.name.clone())
    }

    pub fn color_mode(&self) -> ColorMode {
        self.read(|u| u.color_mode)
    }

    pub fn set_color_mode(&self, mode: ColorMode) -> Result<()> {
        self.update(mode, |u| &mut u.color_mode)?;
        Ok(())
    }
}

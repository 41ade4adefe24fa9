use serde::{Deserialize, Serialize};

/// Soft-delete state of registry rows. A tombstoned row keeps its identity so
/// that re-registering the same entity revives it instead of inserting anew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    Tombstoned,
}

impl EntityStatus {
    pub fn is_active(self) -> bool {
        matches!(self, EntityStatus::Active)
    }
}

// ── Inventory and scheduling ──

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use carehub_api::Resource;

use super::entity_id::EntityId;

/// Consumable stock (medication, linen, hygiene supplies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub reorder_level: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InventoryItem {
    /// Stock at or below the reorder level.
    pub fn is_low(&self) -> bool {
        self.reorder_level.is_some_and(|level| self.quantity <= level)
    }
}

impl Resource for InventoryItem {
    const NAME: &'static str = "Inventory";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: EntityId,
    pub resident_id: EntityId,
    #[serde(default)]
    pub employee_id: Option<EntityId>,
    pub scheduled_at: NaiveDateTime,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Appointment {
    const NAME: &'static str = "Appointment";
}

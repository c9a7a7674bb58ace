// ── Asset domain types ──

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString};

use carehub_api::Resource;

use super::entity_id::EntityId;

/// Physical condition of an asset, as recorded at the last inspection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
#[non_exhaustive]
pub enum AssetCondition {
    New,
    Good,
    Fair,
    Poor,
    Damaged,
    OutOfService,
}

impl AssetCondition {
    pub fn needs_attention(self) -> bool {
        matches!(self, Self::Poor | Self::Damaged | Self::OutOfService)
    }
}

/// A tracked piece of facility equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub category_id: Option<EntityId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub condition: Option<AssetCondition>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Asset {
    const NAME: &'static str = "Asset";
}

/// Grouping used by the asset listing's category filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCategory {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for AssetCategory {
    const NAME: &'static str = "AssetCategory";
}

// ── Users and roles ──

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use carehub_api::Resource;

use super::entity_id::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub user_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role_id: Option<EntityId>,
    #[serde(default)]
    pub is_active: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for User {
    const NAME: &'static str = "User";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Role {
    const NAME: &'static str = "Role";
}

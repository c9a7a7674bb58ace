// ── People: residents, guardians, employees ──

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use carehub_api::Resource;

use super::entity_id::EntityId;

/// A person living at the facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resident {
    pub id: EntityId,
    pub full_name: String,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub admission_date: Option<NaiveDate>,
    #[serde(default)]
    pub guardian_id: Option<EntityId>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Resident {
    const NAME: &'static str = "Resident";
}

/// Legal guardian or next of kin of one or more residents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardian {
    pub id: EntityId,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Guardian {
    const NAME: &'static str = "Guardian";
}

/// Facility staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EntityId,
    pub full_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Employee {
    const NAME: &'static str = "Employee";
}

// ── Domain model ──
//
// Typed records for the facility's REST resources. Each implements
// `carehub_api::Resource`, which names its path. Fields the client does
// not model are kept in `extra` so a record round-trips unchanged.

pub mod access;
pub mod asset;
pub mod entity_id;
pub mod facility;
pub mod people;

pub use access::{Role, User};
pub use asset::{Asset, AssetCategory, AssetCondition};
pub use entity_id::EntityId;
pub use facility::{Appointment, InventoryItem};
pub use people::{Employee, Guardian, Resident};

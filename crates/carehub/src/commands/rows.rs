//! Table rows and detail views for every resource.

use carehub_api::Resource;
use carehub_core::{
    Appointment, Asset, AssetCategory, Employee, Guardian, InventoryItem, Resident, Role, User,
};
use serde::Serialize;
use tabled::Tabled;

/// How a resource is shown on the command line.
pub trait Render: Resource + Serialize {
    /// Singular label used in notifications ("Asset created successfully").
    const LABEL: &'static str;

    type Row: Tabled;

    fn row(&self) -> Self::Row;
    fn id(&self) -> String;
    fn detail(&self) -> String;
}

fn opt<T: ToString>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

fn dash<T: ToString>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".into(), ToString::to_string)
}

fn detail_lines(lines: &[(&str, String)]) -> String {
    let width = lines.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 1;
    lines
        .iter()
        .map(|(key, value)| format!("{:<width$} {value}", format!("{key}:")))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Residents & people ──────────────────────────────────────────────

#[derive(Tabled)]
pub struct ResidentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Admitted")]
    admitted: String,
}

impl Render for Resident {
    const LABEL: &'static str = "Resident";
    type Row = ResidentRow;

    fn row(&self) -> ResidentRow {
        ResidentRow {
            id: self.id.to_string(),
            name: self.full_name.clone(),
            room: self.room.clone().unwrap_or_default(),
            admitted: opt(self.admission_date.as_ref()),
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn detail(&self) -> String {
        detail_lines(&[
            ("ID", self.id.to_string()),
            ("Name", self.full_name.clone()),
            ("Room", dash(self.room.as_ref())),
            ("Born", dash(self.date_of_birth.as_ref())),
            ("Admitted", dash(self.admission_date.as_ref())),
            ("Guardian", dash(self.guardian_id.as_ref())),
        ])
    }
}

#[derive(Tabled)]
pub struct GuardianRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Relationship")]
    relationship: String,
    #[tabled(rename = "Phone")]
    phone: String,
}

impl Render for Guardian {
    const LABEL: &'static str = "Guardian";
    type Row = GuardianRow;

    fn row(&self) -> GuardianRow {
        GuardianRow {
            id: self.id.to_string(),
            name: self.full_name.clone(),
            relationship: self.relationship.clone().unwrap_or_default(),
            phone: self.phone.clone().unwrap_or_default(),
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn detail(&self) -> String {
        detail_lines(&[
            ("ID", self.id.to_string()),
            ("Name", self.full_name.clone()),
            ("Relationship", dash(self.relationship.as_ref())),
            ("Phone", dash(self.phone.as_ref())),
            ("Email", dash(self.email.as_ref())),
        ])
    }
}

#[derive(Tabled)]
pub struct EmployeeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Hired")]
    hired: String,
}

impl Render for Employee {
    const LABEL: &'static str = "Employee";
    type Row = EmployeeRow;

    fn row(&self) -> EmployeeRow {
        EmployeeRow {
            id: self.id.to_string(),
            name: self.full_name.clone(),
            position: self.position.clone().unwrap_or_default(),
            hired: opt(self.hire_date.as_ref()),
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn detail(&self) -> String {
        detail_lines(&[
            ("ID", self.id.to_string()),
            ("Name", self.full_name.clone()),
            ("Position", dash(self.position.as_ref())),
            ("Email", dash(self.email.as_ref())),
            ("Hired", dash(self.hire_date.as_ref())),
        ])
    }
}

// ── Assets ──────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct AssetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Condition")]
    condition: String,
    #[tabled(rename = "Location")]
    location: String,
}

impl Render for Asset {
    const LABEL: &'static str = "Asset";
    type Row = AssetRow;

    fn row(&self) -> AssetRow {
        let condition = match self.condition {
            Some(c) if c.needs_attention() => format!("{c} (!)"),
            Some(c) => c.to_string(),
            None => String::new(),
        };
        AssetRow {
            id: self.id.to_string(),
            name: self.name.clone(),
            category: self
                .category_name
                .clone()
                .unwrap_or_else(|| opt(self.category_id.as_ref())),
            condition,
            location: self.location.clone().unwrap_or_default(),
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn detail(&self) -> String {
        detail_lines(&[
            ("ID", self.id.to_string()),
            ("Name", self.name.clone()),
            ("Serial", dash(self.serial_number.as_ref())),
            (
                "Category",
                self.category_name
                    .clone()
                    .unwrap_or_else(|| dash(self.category_id.as_ref())),
            ),
            ("Condition", dash(self.condition.as_ref())),
            ("Location", dash(self.location.as_ref())),
            ("Purchased", dash(self.purchase_date.as_ref())),
        ])
    }
}

#[derive(Tabled)]
pub struct CategoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl Render for AssetCategory {
    const LABEL: &'static str = "Category";
    type Row = CategoryRow;

    fn row(&self) -> CategoryRow {
        CategoryRow {
            id: self.id.to_string(),
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn detail(&self) -> String {
        detail_lines(&[
            ("ID", self.id.to_string()),
            ("Name", self.name.clone()),
            ("Description", dash(self.description.as_ref())),
        ])
    }
}

// ── Facility ────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct InventoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Reorder At")]
    reorder: String,
}

impl Render for InventoryItem {
    const LABEL: &'static str = "Inventory item";
    type Row = InventoryRow;

    fn row(&self) -> InventoryRow {
        let unit = self.unit.as_deref().map(|u| format!(" {u}")).unwrap_or_default();
        let low = if self.is_low() { " (low)" } else { "" };
        InventoryRow {
            id: self.id.to_string(),
            name: self.name.clone(),
            quantity: format!("{}{unit}{low}", self.quantity),
            reorder: opt(self.reorder_level.as_ref()),
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn detail(&self) -> String {
        detail_lines(&[
            ("ID", self.id.to_string()),
            ("Name", self.name.clone()),
            ("Quantity", self.quantity.to_string()),
            ("Unit", dash(self.unit.as_ref())),
            ("Reorder at", dash(self.reorder_level.as_ref())),
            ("Low", self.is_low().to_string()),
        ])
    }
}

#[derive(Tabled)]
pub struct AppointmentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Resident")]
    resident: String,
    #[tabled(rename = "Purpose")]
    purpose: String,
}

impl Render for Appointment {
    const LABEL: &'static str = "Appointment";
    type Row = AppointmentRow;

    fn row(&self) -> AppointmentRow {
        AppointmentRow {
            id: self.id.to_string(),
            when: self.scheduled_at.format("%Y-%m-%d %H:%M").to_string(),
            resident: self.resident_id.to_string(),
            purpose: self.purpose.clone().unwrap_or_default(),
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn detail(&self) -> String {
        detail_lines(&[
            ("ID", self.id.to_string()),
            ("When", self.scheduled_at.format("%Y-%m-%d %H:%M").to_string()),
            ("Resident", self.resident_id.to_string()),
            ("Employee", dash(self.employee_id.as_ref())),
            ("Purpose", dash(self.purpose.as_ref())),
            ("Notes", dash(self.notes.as_ref())),
        ])
    }
}

// ── Access ──────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "User")]
    user_name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl Render for User {
    const LABEL: &'static str = "User";
    type Row = UserRow;

    fn row(&self) -> UserRow {
        UserRow {
            id: self.id.to_string(),
            user_name: self.user_name.clone(),
            email: self.email.clone().unwrap_or_default(),
            active: if self.is_active { "yes" } else { "no" }.into(),
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn detail(&self) -> String {
        detail_lines(&[
            ("ID", self.id.to_string()),
            ("User", self.user_name.clone()),
            ("Email", dash(self.email.as_ref())),
            ("Role", dash(self.role_id.as_ref())),
            ("Active", self.is_active.to_string()),
        ])
    }
}

#[derive(Tabled)]
pub struct RoleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Permissions")]
    permissions: usize,
}

impl Render for Role {
    const LABEL: &'static str = "Role";
    type Row = RoleRow;

    fn row(&self) -> RoleRow {
        RoleRow {
            id: self.id.to_string(),
            name: self.name.clone(),
            permissions: self.permissions.len(),
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn detail(&self) -> String {
        detail_lines(&[
            ("ID", self.id.to_string()),
            ("Name", self.name.clone()),
            ("Permissions", self.permissions.join(", ")),
        ])
    }
}

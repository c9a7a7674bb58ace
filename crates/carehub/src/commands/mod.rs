//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod resource;
pub mod rows;
pub mod util;

use carehub_core::{
    Appointment, Asset, AssetCategory, ClientContext, Employee, Guardian, InventoryItem, Resident, Role, User,
};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &ClientContext, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Residents(args) => resource::handle::<Resident>(ctx, args, global).await,
        Command::Guardians(args) => resource::handle::<Guardian>(ctx, args, global).await,
        Command::Employees(args) => resource::handle::<Employee>(ctx, args, global).await,
        Command::Assets(args) => resource::handle::<Asset>(ctx, args, global).await,
        Command::Categories(args) => resource::handle::<AssetCategory>(ctx, args, global).await,
        Command::Inventory(args) => resource::handle::<InventoryItem>(ctx, args, global).await,
        Command::Appointments(args) => resource::handle::<Appointment>(ctx, args, global).await,
        Command::Users(args) => resource::handle::<User>(ctx, args, global).await,
        Command::Roles(args) => resource::handle::<Role>(ctx, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

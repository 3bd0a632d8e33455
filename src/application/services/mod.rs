//! Application services

mod control;
mod inventory;
mod scheduler;

pub use control::ControlService;
pub use inventory::{parse_inventory, InventoryConfig, InventoryService};
pub use scheduler::Scheduler;

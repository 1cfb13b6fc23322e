//! Dealership tools module
//!
//! Reference handlers backed by in-memory stores: inventory search, photo
//! sending, credit quotes and appointment booking.

mod inventory;
mod media;
mod quote;
mod schedule;

use std::sync::Arc;
use std::time::Duration;

pub use inventory::{Inventory, Photo, SearchInventoryTool, Vehicle};
pub use media::{OutboundMedia, Outbox, SendImagesTool};
pub use quote::QuotePriceTool;
pub use schedule::{Appointment, AppointmentBook, ScheduleAppointmentTool};

use crate::core::Result;
use crate::tools::{ToolExecutor, ToolRegistry};

/// Annual flat interest rate used for quotes
pub const DEFAULT_FLAT_RATE: f64 = 0.065;

/// Shared stores behind the dealership tools
#[derive(Debug, Clone)]
pub struct Dealership {
    pub inventory: Arc<Inventory>,
    pub outbox: Arc<Outbox>,
    pub appointments: Arc<AppointmentBook>,
}

impl Dealership {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory: Arc::new(inventory),
            outbox: Arc::new(Outbox::new()),
            appointments: Arc::new(AppointmentBook::new()),
        }
    }

    /// Register the tool definitions and bind their handlers
    pub fn toolset(&self, tool_timeout: Duration) -> Result<ToolExecutor> {
        let mut registry = ToolRegistry::new();
        registry.register(SearchInventoryTool::definition())?;
        registry.register(SendImagesTool::definition())?;
        registry.register(QuotePriceTool::definition())?;
        registry.register(ScheduleAppointmentTool::definition())?;

        let mut executor = ToolExecutor::new(Arc::new(registry)).with_timeout(tool_timeout);
        executor.bind(
            SearchInventoryTool::NAME,
            Arc::new(SearchInventoryTool::new(self.inventory.clone())),
        )?;
        executor.bind(
            SendImagesTool::NAME,
            Arc::new(SendImagesTool::new(
                self.inventory.clone(),
                self.outbox.clone(),
            )),
        )?;
        executor.bind(
            QuotePriceTool::NAME,
            Arc::new(QuotePriceTool::new(
                self.inventory.clone(),
                DEFAULT_FLAT_RATE,
            )),
        )?;
        executor.bind(
            ScheduleAppointmentTool::NAME,
            Arc::new(ScheduleAppointmentTool::new(
                self.inventory.clone(),
                self.appointments.clone(),
            )),
        )?;

        Ok(executor)
    }
}

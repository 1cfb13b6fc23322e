//! Appointment scheduling tool

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::ExecutionContext;
use crate::tools::dealership::inventory::Inventory;
use crate::tools::handler::{HandlerError, HandlerResult, ToolHandler};
use crate::tools::registry::ToolDefinition;
use crate::tools::schema::{FieldSpec, ParameterSchema};

/// A booked showroom visit or test drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appointment {
    pub id: String,
    pub tenant_id: String,
    pub session_id: String,
    pub vehicle_id: String,
    pub kind: String,
    pub date: String,
    pub time: String,
    pub customer_name: String,
}

/// Appointments created during the process lifetime
#[derive(Debug, Default)]
pub struct AppointmentBook {
    appointments: Mutex<Vec<Appointment>>,
}

impl AppointmentBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all appointments
    pub fn all(&self) -> Vec<Appointment> {
        self.appointments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn book(&self, mut appointment: Appointment) -> std::result::Result<Appointment, HandlerError> {
        let mut appointments = self.appointments.lock().unwrap_or_else(|e| e.into_inner());

        let taken = appointments.iter().any(|a| {
            a.tenant_id == appointment.tenant_id
                && a.vehicle_id == appointment.vehicle_id
                && a.date == appointment.date
                && a.time == appointment.time
        });
        if taken {
            return Err(HandlerError::new(format!(
                "{} is already booked on {} at {}",
                appointment.vehicle_id, appointment.date, appointment.time
            )));
        }

        appointment.id = format!("APT-{:04}", appointments.len() + 1);
        appointments.push(appointment.clone());
        Ok(appointment)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleArgs {
    vehicle_id: String,
    kind: String,
    date: String,
    time: String,
    customer_name: String,
}

/// `schedule_appointment` handler
pub struct ScheduleAppointmentTool {
    inventory: Arc<Inventory>,
    book: Arc<AppointmentBook>,
}

impl ScheduleAppointmentTool {
    pub const NAME: &'static str = "schedule_appointment";

    pub fn new(inventory: Arc<Inventory>, book: Arc<AppointmentBook>) -> Self {
        Self { inventory, book }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Book a showroom visit or test drive for a vehicle in stock.",
            ParameterSchema::new()
                .field("vehicleId", FieldSpec::string("Stock id").required())
                .field(
                    "kind",
                    FieldSpec::enumeration("Appointment type", ["test_drive", "visit"]).required(),
                )
                .field("date", FieldSpec::string("Date as YYYY-MM-DD").required())
                .field("time", FieldSpec::string("Time as HH:MM, 24h").required())
                .field("customerName", FieldSpec::string("Customer's name").required()),
        )
    }
}

#[async_trait]
impl ToolHandler for ScheduleAppointmentTool {
    async fn call(&self, arguments: Value, context: &ExecutionContext) -> HandlerResult {
        let args: ScheduleArgs = serde_json::from_value(arguments)
            .map_err(|e| HandlerError::new(format!("invalid arguments: {}", e)))?;

        let date = NaiveDate::parse_from_str(&args.date, "%Y-%m-%d").map_err(|_| {
            HandlerError::new(format!("{} is not a calendar date like 2024-05-31", args.date))
        })?;
        let time = NaiveTime::parse_from_str(&args.time, "%H:%M")
            .map_err(|_| HandlerError::new(format!("{} is not a time like 14:30", args.time)))?;
        if self.inventory.find(&args.vehicle_id).is_none() {
            return Err(HandlerError::new(format!(
                "vehicle {} is not in stock",
                args.vehicle_id
            )));
        }

        let appointment = self.book.book(Appointment {
            id: String::new(),
            tenant_id: context.tenant_id.clone(),
            session_id: context.session_id.clone(),
            vehicle_id: args.vehicle_id.to_uppercase(),
            kind: args.kind,
            date: date.format("%Y-%m-%d").to_string(),
            time: time.format("%H:%M").to_string(),
            customer_name: args.customer_name,
        })?;

        Ok(json!({
            "appointmentId": appointment.id,
            "vehicleId": appointment.vehicle_id,
            "kind": appointment.kind,
            "date": appointment.date,
            "time": appointment.time,
        }))
    }
}

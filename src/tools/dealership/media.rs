//! Photo sending tool
//!
//! The messaging transport lives outside this crate; the tool queues media
//! into an [`Outbox`] that the transport drains after the reply is sent.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::ExecutionContext;
use crate::tools::dealership::inventory::Inventory;
use crate::tools::handler::{HandlerError, HandlerResult, ToolHandler};
use crate::tools::registry::ToolDefinition;
use crate::tools::schema::{FieldSpec, ParameterSchema};

const ANGLES: [&str; 4] = ["front", "rear", "side", "interior"];

/// A media item waiting for the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMedia {
    pub session_id: String,
    pub vehicle_id: String,
    pub url: String,
    pub caption: String,
}

/// Queue of media produced during a conversation turn
#[derive(Debug, Default)]
pub struct Outbox {
    items: Mutex<Vec<OutboundMedia>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, media: Vec<OutboundMedia>) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.extend(media);
    }

    /// Take every queued item for one session
    pub fn drain(&self, session_id: &str) -> Vec<OutboundMedia> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let (taken, kept): (Vec<_>, Vec<_>) = items
            .drain(..)
            .partition(|media| media.session_id == session_id);
        *items = kept;
        taken
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendImagesArgs {
    vehicle_id: String,
    #[serde(default)]
    angles: Vec<String>,
}

/// `send_images` handler
pub struct SendImagesTool {
    inventory: Arc<Inventory>,
    outbox: Arc<Outbox>,
}

impl SendImagesTool {
    pub const NAME: &'static str = "send_images";

    pub fn new(inventory: Arc<Inventory>, outbox: Arc<Outbox>) -> Self {
        Self { inventory, outbox }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Send photos of a vehicle in stock to the customer.",
            ParameterSchema::new()
                .field(
                    "vehicleId",
                    FieldSpec::string("Stock id returned by search_inventory").required(),
                )
                .field(
                    "angles",
                    FieldSpec::list("Which photos to send; all when omitted").of_values(ANGLES),
                ),
        )
    }
}

#[async_trait]
impl ToolHandler for SendImagesTool {
    async fn call(&self, arguments: Value, context: &ExecutionContext) -> HandlerResult {
        let args: SendImagesArgs = serde_json::from_value(arguments)
            .map_err(|e| HandlerError::new(format!("invalid arguments: {}", e)))?;

        let vehicle = self
            .inventory
            .find(&args.vehicle_id)
            .ok_or_else(|| HandlerError::new(format!("vehicle {} is not in stock", args.vehicle_id)))?;

        let media: Vec<OutboundMedia> = vehicle
            .photos
            .iter()
            .filter(|photo| args.angles.is_empty() || args.angles.contains(&photo.angle))
            .map(|photo| OutboundMedia {
                session_id: context.session_id.clone(),
                vehicle_id: vehicle.id.clone(),
                url: photo.url.clone(),
                caption: format!("{} {} ({})", vehicle.brand, vehicle.model, photo.angle),
            })
            .collect();

        if media.is_empty() {
            return Err(HandlerError::new(format!(
                "no photos available for {} with the requested angles",
                vehicle.id
            )));
        }

        let queued = media.len();
        self.outbox.push(media);

        Ok(json!({
            "vehicleId": vehicle.id,
            "queued": queued,
        }))
    }
}

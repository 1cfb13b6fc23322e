//! Credit price quote tool

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::ExecutionContext;
use crate::tools::dealership::inventory::Inventory;
use crate::tools::handler::{HandlerError, HandlerResult, ToolHandler};
use crate::tools::registry::ToolDefinition;
use crate::tools::schema::{FieldSpec, ParameterSchema};

const TENORS: [&str; 5] = ["12", "24", "36", "48", "60"];

/// Minimum down payment as a share of the price
const MIN_DOWN_PAYMENT_RATIO: f64 = 0.2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteArgs {
    vehicle_id: String,
    down_payment: f64,
    tenor_months: String,
}

/// `quote_price` handler using a flat annual rate
pub struct QuotePriceTool {
    inventory: Arc<Inventory>,
    annual_flat_rate: f64,
}

impl QuotePriceTool {
    pub const NAME: &'static str = "quote_price";

    pub fn new(inventory: Arc<Inventory>, annual_flat_rate: f64) -> Self {
        Self {
            inventory,
            annual_flat_rate,
        }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Calculate a monthly credit installment for a vehicle in stock.",
            ParameterSchema::new()
                .field("vehicleId", FieldSpec::string("Stock id").required())
                .field(
                    "downPayment",
                    FieldSpec::number("Down payment in rupiah").required(),
                )
                .field(
                    "tenorMonths",
                    FieldSpec::enumeration("Credit length in months", TENORS).required(),
                ),
        )
    }
}

#[async_trait]
impl ToolHandler for QuotePriceTool {
    async fn call(&self, arguments: Value, _context: &ExecutionContext) -> HandlerResult {
        let args: QuoteArgs = serde_json::from_value(arguments)
            .map_err(|e| HandlerError::new(format!("invalid arguments: {}", e)))?;

        let vehicle = self
            .inventory
            .find(&args.vehicle_id)
            .ok_or_else(|| HandlerError::new(format!("vehicle {} is not in stock", args.vehicle_id)))?;

        let tenor: u32 = args
            .tenor_months
            .parse()
            .map_err(|_| HandlerError::new("tenorMonths must be a whole number of months"))?;

        let price = vehicle.price as f64;
        let minimum = (price * MIN_DOWN_PAYMENT_RATIO).ceil();
        if args.down_payment < minimum {
            return Err(HandlerError::new(format!(
                "down payment must be at least {:.0} for {}",
                minimum, vehicle.id
            )));
        }
        if args.down_payment >= price {
            return Err(HandlerError::new(
                "down payment covers the full price; no credit needed",
            ));
        }

        let financed = price - args.down_payment;
        let years = f64::from(tenor) / 12.0;
        let total = financed * (1.0 + self.annual_flat_rate * years);
        let monthly = (total / f64::from(tenor)).round();

        Ok(json!({
            "vehicleId": vehicle.id,
            "price": vehicle.price,
            "downPayment": args.down_payment.round() as u64,
            "financed": financed.round() as u64,
            "tenorMonths": tenor,
            "annualFlatRate": self.annual_flat_rate,
            "monthlyInstallment": monthly as u64,
        }))
    }
}

//! In-memory stock list and search tool

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{ExecutionContext, Result, ShowroomError};
use crate::tools::handler::{HandlerError, HandlerResult, ToolHandler};
use crate::tools::registry::ToolDefinition;
use crate::tools::schema::{FieldSpec, ParameterSchema};

const MAX_RESULTS: usize = 5;

/// A vehicle in stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub year: u16,
    /// "Matic" or "Manual"
    pub transmission: String,
    pub price: u64,
    pub mileage_km: u32,
    /// Photo URLs keyed by angle (front, rear, side, interior)
    #[serde(default)]
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub angle: String,
    pub url: String,
}

/// Read-only stock list shared by the dealership tools
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    vehicles: Vec<Vehicle>,
}

impl Inventory {
    pub fn new(vehicles: Vec<Vehicle>) -> Self {
        Self { vehicles }
    }

    /// Load a JSON array of vehicles
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let vehicles: Vec<Vehicle> = serde_json::from_str(&content).map_err(|e| {
            ShowroomError::config(format!("Invalid inventory file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(vehicles))
    }

    /// Small built-in stock list for demos
    pub fn sample() -> Self {
        let vehicle = |id: &str, brand: &str, model: &str, year, transmission: &str, price, km| {
            Vehicle {
                id: id.to_string(),
                brand: brand.to_string(),
                model: model.to_string(),
                year,
                transmission: transmission.to_string(),
                price,
                mileage_km: km,
                photos: ["front", "rear", "side", "interior"]
                    .iter()
                    .map(|angle| Photo {
                        angle: angle.to_string(),
                        url: format!("https://cdn.example.com/stock/{}/{}.jpg", id, angle),
                    })
                    .collect(),
            }
        };

        Self::new(vec![
            vehicle("V001", "Toyota", "Avanza G", 2019, "Matic", 145_000_000, 62_000),
            vehicle("V002", "Honda", "Jazz RS", 2018, "Matic", 139_000_000, 71_500),
            vehicle("V003", "Suzuki", "Ertiga GX", 2020, "Manual", 148_000_000, 40_200),
            vehicle("V004", "Daihatsu", "Xenia R", 2021, "Matic", 149_500_000, 28_900),
            vehicle("V005", "Toyota", "Fortuner VRZ", 2019, "Matic", 410_000_000, 55_000),
            vehicle("V006", "Mitsubishi", "Xpander Ultimate", 2020, "Matic", 215_000_000, 33_100),
        ])
    }

    /// Find a vehicle by stock id (case-insensitive)
    pub fn find(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id.eq_ignore_ascii_case(id))
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    fn search(&self, filter: &SearchFilter) -> Vec<&Vehicle> {
        let mut matches: Vec<&Vehicle> = self
            .vehicles
            .iter()
            .filter(|v| filter.matches(v))
            .collect();
        matches.sort_by_key(|v| v.price);
        matches
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFilter {
    brand: Option<String>,
    transmission: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    min_year: Option<f64>,
}

impl SearchFilter {
    fn matches(&self, vehicle: &Vehicle) -> bool {
        let price = vehicle.price as f64;
        self.brand
            .as_ref()
            .is_none_or(|b| vehicle.brand.eq_ignore_ascii_case(b))
            && self
                .transmission
                .as_ref()
                .is_none_or(|t| vehicle.transmission.eq_ignore_ascii_case(t))
            && self.min_price.is_none_or(|min| price >= min)
            && self.max_price.is_none_or(|max| price <= max)
            && self.min_year.is_none_or(|year| f64::from(vehicle.year) >= year)
    }
}

/// `search_inventory` handler
pub struct SearchInventoryTool {
    inventory: Arc<Inventory>,
}

impl SearchInventoryTool {
    pub const NAME: &'static str = "search_inventory";

    pub fn new(inventory: Arc<Inventory>) -> Self {
        Self { inventory }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Search cars currently in stock. Use it before quoting prices or sending photos.",
            ParameterSchema::new()
                .field("brand", FieldSpec::string("Manufacturer, e.g. Toyota"))
                .field(
                    "transmission",
                    FieldSpec::enumeration("Gearbox type", ["Matic", "Manual"]),
                )
                .field("minPrice", FieldSpec::number("Lowest price in rupiah"))
                .field("maxPrice", FieldSpec::number("Highest price in rupiah"))
                .field("minYear", FieldSpec::number("Oldest acceptable model year")),
        )
    }
}

#[async_trait]
impl ToolHandler for SearchInventoryTool {
    async fn call(&self, arguments: Value, _context: &ExecutionContext) -> HandlerResult {
        let filter: SearchFilter = serde_json::from_value(arguments)
            .map_err(|e| HandlerError::new(format!("invalid arguments: {}", e)))?;
        let matches = self.inventory.search(&filter);
        let shown: Vec<Value> = matches
            .iter()
            .take(MAX_RESULTS)
            .map(|v| {
                json!({
                    "id": v.id,
                    "name": format!("{} {} {}", v.brand, v.model, v.year),
                    "transmission": v.transmission,
                    "price": v.price,
                    "mileageKm": v.mileage_km,
                })
            })
            .collect();

        Ok(json!({
            "count": matches.len(),
            "vehicles": shown,
        }))
    }
}

//! Tools module - tool registry, validation and execution
//!
//! Contains the parameter schema, the registry, the concurrent executor and
//! the dealership reference handlers.

pub mod dealership;
pub mod executor;
pub mod handler;
pub mod registry;
pub mod schema;

pub use executor::ToolExecutor;
pub use handler::{HandlerError, HandlerResult, ToolHandler};
pub use registry::{ToolDefinition, ToolRegistry, Validation, Violation};
pub use schema::{FieldSpec, FieldType, ParameterSchema};

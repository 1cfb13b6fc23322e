//! Tool registry - declares callable capabilities and validates arguments
//!
//! Arguments arrive from a probabilistic model and are treated as untrusted
//! input. `validate` never mutates the registry and never fails hard; it
//! returns the list of violations and leaves the reaction to the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::{Result, ShowroomError, ToolCallRequest};
use crate::tools::schema::{FieldSpec, FieldType, ParameterSchema};

/// Definition of a tool that can be called by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique, stable identifier
    pub name: String,
    /// Natural-language hint for the model
    pub description: String,
    /// Accepted fields
    pub parameters: ParameterSchema,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A single reason an argument payload was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("arguments must be a JSON object: {0}")]
    MalformedArguments(String),

    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{field} must be {}", .expected.expectation())]
    TypeMismatch { field: String, expected: FieldType },

    #[error("{field} must be one of [{}], got {value}", .allowed.join(", "))]
    NotInEnumeration {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("{field} is not a recognized parameter")]
    UnexpectedField { field: String },
}

impl Violation {
    /// Name of the offending field, when the violation concerns one
    pub fn field(&self) -> Option<&str> {
        match self {
            Violation::MissingField { field }
            | Violation::TypeMismatch { field, .. }
            | Violation::NotInEnumeration { field, .. }
            | Violation::UnexpectedField { field } => Some(field),
            Violation::UnknownTool(_) | Violation::MalformedArguments(_) => None,
        }
    }
}

/// Outcome of validating one argument payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    Rejected(Vec<Violation>),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Validation::Accepted => &[],
            Validation::Rejected(violations) => violations,
        }
    }
}

/// Join violations into one message for the model
pub fn describe_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Registry of available tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Tool definitions indexed by name
    definitions: HashMap<String, ToolDefinition>,
    /// Registration order, used for a stable catalog
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool definition, rejecting duplicate names
    pub fn register(&mut self, definition: ToolDefinition) -> Result<()> {
        if self.definitions.contains_key(&definition.name) {
            return Err(ShowroomError::DuplicateTool(definition.name));
        }

        self.order.push(definition.name.clone());
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Get a tool definition by name
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.get(name)
    }

    /// Check whether a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Tool names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions in registration order
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.definitions.get(name))
            .cloned()
            .collect()
    }

    /// Validate decoded arguments against a tool's schema
    pub fn validate(&self, tool_name: &str, arguments: &Value) -> Validation {
        let Some(definition) = self.definitions.get(tool_name) else {
            return Validation::Rejected(vec![Violation::UnknownTool(tool_name.to_string())]);
        };

        let Some(object) = arguments.as_object() else {
            return Validation::Rejected(vec![Violation::MalformedArguments(format!(
                "got {}",
                json_kind(arguments)
            ))]);
        };

        let violations = check_object(&definition.parameters, object);
        if violations.is_empty() {
            Validation::Accepted
        } else {
            Validation::Rejected(violations)
        }
    }

    /// Decode a request's raw arguments and validate them
    ///
    /// Empty argument text decodes to `{}`.
    pub fn decode_and_validate(
        &self,
        request: &ToolCallRequest,
    ) -> std::result::Result<Value, Vec<Violation>> {
        if !self.contains(&request.tool_name) {
            return Err(vec![Violation::UnknownTool(request.tool_name.clone())]);
        }

        let raw = request.raw_arguments.trim();
        let arguments = if raw.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str::<Value>(raw)
                .map_err(|e| vec![Violation::MalformedArguments(e.to_string())])?
        };

        match self.validate(&request.tool_name, &arguments) {
            Validation::Accepted => Ok(arguments),
            Validation::Rejected(violations) => Err(violations),
        }
    }
}

fn check_object(schema: &ParameterSchema, object: &Map<String, Value>) -> Vec<Violation> {
    let mut violations = Vec::new();

    for name in schema.required_fields() {
        match object.get(name) {
            None | Some(Value::Null) => violations.push(Violation::MissingField {
                field: name.to_string(),
            }),
            Some(_) => {}
        }
    }

    for (name, value) in object {
        match schema.get(name) {
            None => violations.push(Violation::UnexpectedField {
                field: name.clone(),
            }),
            // Optional fields may be sent as explicit nulls.
            Some(_) if value.is_null() => {}
            Some(spec) => {
                if let Some(violation) = check_field(name, spec, value) {
                    violations.push(violation);
                }
            }
        }
    }

    violations
}

fn check_field(name: &str, spec: &FieldSpec, value: &Value) -> Option<Violation> {
    let mismatch = || {
        Some(Violation::TypeMismatch {
            field: name.to_string(),
            expected: spec.field_type,
        })
    };

    match spec.field_type {
        FieldType::String if !value.is_string() => mismatch(),
        FieldType::Number if !value.is_number() => mismatch(),
        FieldType::Boolean if !value.is_boolean() => mismatch(),
        FieldType::Enumeration => check_allowed(name, spec, value),
        FieldType::List => match value.as_array() {
            None => mismatch(),
            Some(items) => items
                .iter()
                .find_map(|item| check_allowed(name, spec, item)),
        },
        _ => None,
    }
}

fn check_allowed(name: &str, spec: &FieldSpec, value: &Value) -> Option<Violation> {
    let allowed = spec.allowed_values.as_ref()?;
    let accepted = value
        .as_str()
        .is_some_and(|s| allowed.iter().any(|candidate| candidate == s));

    if accepted {
        None
    } else {
        Some(Violation::NotInEnumeration {
            field: name.to_string(),
            value: value.to_string(),
            allowed: allowed.clone(),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

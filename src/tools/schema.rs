//! Parameter schemas for tool definitions
//!
//! A schema is a flat map of named fields. It is rendered to JSON Schema for
//! the model and used by the registry to check the model's arguments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Accepted type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Enumeration,
    List,
}

impl FieldType {
    /// Human-readable expectation used in violation messages
    pub fn expectation(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Number => "numeric",
            FieldType::Boolean => "a boolean",
            FieldType::Enumeration => "one of the allowed values",
            FieldType::List => "a list",
        }
    }
}

/// Specification of one named field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default)]
    pub description: String,
}

impl FieldSpec {
    fn new(field_type: FieldType, description: impl Into<String>) -> Self {
        Self {
            field_type,
            required: false,
            allowed_values: None,
            description: description.into(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(FieldType::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(FieldType::Number, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(FieldType::Boolean, description)
    }

    /// String field restricted to `values`
    pub fn enumeration<I, S>(description: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self::new(FieldType::Enumeration, description);
        spec.allowed_values = Some(values.into_iter().map(Into::into).collect());
        spec
    }

    pub fn list(description: impl Into<String>) -> Self {
        Self::new(FieldType::List, description)
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restrict list elements to the given strings
    pub fn of_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut property = Map::new();

        match self.field_type {
            FieldType::String => {
                property.insert("type".into(), json!("string"));
            }
            FieldType::Number => {
                property.insert("type".into(), json!("number"));
            }
            FieldType::Boolean => {
                property.insert("type".into(), json!("boolean"));
            }
            FieldType::Enumeration => {
                property.insert("type".into(), json!("string"));
                if let Some(values) = &self.allowed_values {
                    property.insert("enum".into(), json!(values));
                }
            }
            FieldType::List => {
                property.insert("type".into(), json!("array"));
                let items = match &self.allowed_values {
                    Some(values) => json!({ "type": "string", "enum": values }),
                    None => json!({}),
                };
                property.insert("items".into(), items);
            }
        }

        if !self.description.is_empty() {
            property.insert("description".into(), json!(self.description));
        }

        Value::Object(property)
    }
}

/// Named fields accepted by a tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub fields: BTreeMap<String, FieldSpec>,
}

impl ParameterSchema {
    /// Create an empty schema (a tool without arguments)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field (builder style)
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Names of required fields, in name order
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }

    /// Render as a JSON Schema object for the wire catalog
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, spec)| (name.clone(), spec.to_json_schema()))
            .collect();
        let required: Vec<&str> = self.required_fields().collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

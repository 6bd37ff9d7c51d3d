//! Structured-output schema descriptor
//!
//! An [`OutputSchema`] is built once from a declarative field list and is
//! immutable afterwards. It renders to JSON Schema for the generation
//! request and checks the shape of the response.

use serde_json::{json, Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while building a schema or checking a response against it
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Schema has no fields")]
    Empty,

    #[error("Duplicate schema field: {0}")]
    DuplicateField(String),

    #[error("Invalid schema field name: {0:?}")]
    InvalidFieldName(String),

    #[error("Field {0} has an empty allowed-value list")]
    EmptyChoices(String),

    #[error("Response is not a JSON object")]
    NotAnObject,

    #[error("Response is missing field {0}")]
    MissingField(String),

    #[error("Field {field} should be {expected}")]
    WrongType { field: String, expected: &'static str },
}

/// Value type of one schema field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A free-form string
    Text,

    /// An array of strings drawn from a fixed set of values
    Choices(Vec<String>),
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Choices(_) => "an array of strings",
        }
    }
}

/// Declaration of one required field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
}

impl FieldSpec {
    /// Declares a free-form string field
    pub fn text(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Text,
            description: description.to_string(),
        }
    }

    /// Declares a string-array field restricted to `choices`
    pub fn choices<I, S>(name: &str, description: &str, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            kind: FieldKind::Choices(choices.into_iter().map(Into::into).collect()),
            description: description.to_string(),
        }
    }
}

/// Immutable description of the structured output a call must return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl OutputSchema {
    /// Builds and validates a schema from its field list
    ///
    /// Every field is required. Field names must be unique, non-empty
    /// identifiers made of ASCII letters, digits and underscores.
    pub fn from_fields(name: &str, fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::new();
        for field in &fields {
            let valid_name = !field.name.is_empty()
                && field
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid_name {
                return Err(SchemaError::InvalidFieldName(field.name.clone()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if matches!(&field.kind, FieldKind::Choices(choices) if choices.is_empty()) {
                return Err(SchemaError::EmptyChoices(field.name.clone()));
            }
        }

        Ok(Self {
            name: name.to_string(),
            fields,
        })
    }

    /// Returns the schema name sent with the request
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared fields, in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Renders the schema as a strict JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let property = match &field.kind {
                FieldKind::Text => json!({
                    "type": "string",
                    "description": field.description,
                }),
                FieldKind::Choices(choices) => json!({
                    "type": "array",
                    "description": field.description,
                    "items": { "type": "string", "enum": choices },
                }),
            };
            properties.insert(field.name.clone(), property);
        }

        let required: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Checks that a response has every field with the declared type
    ///
    /// Values of a choices field are not checked against the allowed set;
    /// callers drop unknown values themselves.
    pub fn check(&self, value: &Value) -> Result<(), SchemaError> {
        let object = value.as_object().ok_or(SchemaError::NotAnObject)?;

        for field in &self.fields {
            let entry = object
                .get(&field.name)
                .ok_or_else(|| SchemaError::MissingField(field.name.clone()))?;

            let well_typed = match &field.kind {
                FieldKind::Text => entry.is_string(),
                FieldKind::Choices(_) => entry
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string)),
            };
            if !well_typed {
                return Err(SchemaError::WrongType {
                    field: field.name.clone(),
                    expected: field.kind.expected(),
                });
            }
        }

        Ok(())
    }
}

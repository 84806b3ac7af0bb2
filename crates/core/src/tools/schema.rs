//! Declared tool input shapes and the generic validator that checks
//! invocation arguments against them.

use rmcp::model::JsonObject;
use serde_json::{Value, json};

/// The type of a single input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free-form string.
    Text,
    /// String restricted to a closed vocabulary.
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldType,
    pub required: bool,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Field '{field}' must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("Field '{field}' has invalid value '{value}', expected one of: {allowed}")]
    NotAllowed {
        field: &'static str,
        value: String,
        allowed: String,
    },
}

/// An ordered set of named fields accepted by a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputShape {
    fields: Vec<FieldSpec>,
}

impl InputShape {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// A shape that accepts no arguments.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Checks `args` against the shape and returns only the declared fields.
    ///
    /// Undeclared keys are dropped. An explicit `null` on an optional field
    /// is treated as if the key were absent.
    pub fn validate(&self, args: &JsonObject) -> Result<JsonObject, ValidationError> {
        let mut accepted = JsonObject::new();
        for field in &self.fields {
            let value = match args.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(ValidationError::MissingField(field.name));
                }
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            let Some(text) = value.as_str() else {
                return Err(ValidationError::WrongType {
                    field: field.name,
                    expected: "string",
                });
            };

            if let FieldType::Enum(allowed) = field.kind {
                if !allowed.contains(&text) {
                    return Err(ValidationError::NotAllowed {
                        field: field.name,
                        value: text.to_string(),
                        allowed: allowed.join(", "),
                    });
                }
            }

            accepted.insert(field.name.to_string(), value.clone());
        }
        Ok(accepted)
    }

    /// Renders the shape as a JSON Schema object for tool listings.
    pub fn to_json_schema(&self) -> JsonObject {
        let mut properties = JsonObject::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut property = json!({
                "type": "string",
                "description": field.description,
            });
            if let FieldType::Enum(allowed) = field.kind {
                property["enum"] = json!(allowed);
            }
            properties.insert(field.name.to_string(), property);
            if field.required {
                required.push(field.name);
            }
        }

        let mut schema = JsonObject::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        schema
    }
}

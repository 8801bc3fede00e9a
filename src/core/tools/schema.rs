//! Declarative tool parameter schemas.

use serde_json::{Map, Value, json};

use super::ToolError;

/// A required string argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    pub description: String,
}

impl Parameter {
    pub fn required(name: &'static str, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
        }
    }
}

/// Name, description and parameters of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// JSON schema advertised to the model.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({ "type": "string", "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self.parameters.iter().map(|p| p.name).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    #[must_use]
    pub fn definition(&self) -> agent_core::types::Tool {
        agent_core::types::Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
        }
    }

    /// Check `args` against the declared parameters.
    ///
    /// Unknown keys are ignored; `null` counts as absent.
    pub fn check_args(&self, args: &Value) -> Result<(), ToolError> {
        let invalid = |reason: String| ToolError::InvalidArguments {
            tool: self.name.clone(),
            reason,
        };
        let Some(object) = args.as_object() else {
            return Err(invalid("arguments must be a JSON object".to_string()));
        };
        for param in &self.parameters {
            match object.get(param.name).filter(|v| !v.is_null()) {
                None => {
                    return Err(invalid(format!("missing required parameter '{}'", param.name)));
                }
                Some(value) if !value.is_string() => {
                    return Err(invalid(format!("parameter '{}' must be a string", param.name)));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

//! Tool parameter schemas
//!
//! A [`ParameterSchema`] renders the `{type: "object", properties, required}`
//! descriptor published to the tool-calling harness, and performs the cheap
//! presence and enum checks that run before any parameter is decoded.

use serde_json::{json, Map, Value};

/// JSON-Schema-like description of a tool's parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    fn property(mut self, name: &str, property: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), property);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description }),
            required,
        )
    }

    /// String restricted to `values`
    pub fn string_enum(self, name: &str, description: &str, values: &[&str], required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description, "enum": values }),
            required,
        )
    }

    pub fn integer(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "integer", "description": description }),
            required,
        )
    }

    pub fn boolean(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "boolean", "description": description }),
            required,
        )
    }

    pub fn object(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "object", "description": description }),
            required,
        )
    }

    pub fn string_array(self, name: &str, description: &str, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "array", "items": { "type": "string" }, "description": description }),
            required,
        )
    }

    /// Property with no declared type (any JSON value)
    pub fn any(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, json!({ "description": description }), required)
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// The descriptor published to the harness
    pub fn to_json(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }

    /// Presence and enum checks on raw arguments
    ///
    /// A required parameter that is `null` counts as missing.
    pub fn check(&self, args: &Value) -> Result<(), String> {
        let Some(args) = args.as_object() else {
            return Err("Parameters must be a JSON object".to_string());
        };

        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|name| args.get(name.as_str()).map_or(true, Value::is_null))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(format!("Missing required parameters: {}", missing.join(", ")));
        }

        for (name, property) in &self.properties {
            let (Some(allowed), Some(value)) = (
                property.get("enum").and_then(Value::as_array),
                args.get(name).filter(|v| !v.is_null()),
            ) else {
                continue;
            };
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(format!(
                    "Invalid value {} for '{}', expected one of: {}",
                    value,
                    name,
                    options.join(", ")
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .string_enum("action", "What to do", &["commit", "push"], true)
            .string("message", "Commit message", false)
            .integer("depth", "How deep", false)
    }

    #[test]
    fn test_descriptor_shape() {
        let descriptor = schema().to_json();
        assert_eq!(descriptor["type"], "object");
        assert_eq!(descriptor["required"], json!(["action"]));
        assert_eq!(descriptor["properties"]["action"]["enum"], json!(["commit", "push"]));
        assert_eq!(descriptor["properties"]["depth"]["type"], "integer");
    }

    #[test]
    fn test_missing_required() {
        let err = schema().check(&json!({"message": "x"})).unwrap_err();
        assert!(err.contains("action"));

        let err = schema().check(&json!({"action": null})).unwrap_err();
        assert!(err.contains("action"));
    }

    #[test]
    fn test_enum_values() {
        assert!(schema().check(&json!({"action": "commit"})).is_ok());
        let err = schema().check(&json!({"action": "rebase"})).unwrap_err();
        assert!(err.contains("rebase"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(schema().check(&json!(["commit"])).is_err());
    }
}

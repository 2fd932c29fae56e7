use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One structured record returned by a collector.
pub type Record = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
}

impl ParamKind {
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        }
    }
}

/// What the model sees of a tool: name, guidance text and parameter schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str) -> Self {
        Self { name: name.to_string(), description: description.to_string(), parameters: Vec::new() }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|param| param.name == name)
    }

    /// JSON Schema object used by both function-calling wire formats.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({ "type": param.kind.json_type(), "description": param.description }),
            );
        }
        let required = self
            .parameters
            .iter()
            .filter(|param| param.required)
            .map(|param| Value::String(param.name.clone()))
            .collect::<Vec<_>>();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ParamKind, ParamSpec, ToolDefinition};

    #[test]
    fn schema_lists_required_parameters_only() {
        let definition = ToolDefinition::new("list-firewall-routes", "List routes")
            .with_param(ParamSpec::optional("virtual_router", ParamKind::String, "router"))
            .with_param(ParamSpec::required("vsys", ParamKind::String, "vsys"));

        let schema = definition.json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["virtual_router"]["type"], "string");
        assert_eq!(schema["required"], json!(["vsys"]));
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn parameterless_tool_has_empty_object_schema() {
        let schema = ToolDefinition::new("list-vpcs", "List VPCs").json_schema();
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["required"], json!([]));
    }

    #[test]
    fn integer_kind_rejects_floats_and_strings() {
        assert!(ParamKind::Integer.accepts(&json!(3)));
        assert!(!ParamKind::Integer.accepts(&json!(3.5)));
        assert!(!ParamKind::Integer.accepts(&json!("3")));
    }
}

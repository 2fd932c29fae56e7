use netscout_core::ToolDefinition;
use serde_json::{Map, Value};

/// Checks tool arguments against the definition's parameter list and returns them as an object.
pub fn validate_arguments<'a>(
    definition: &ToolDefinition,
    arguments: &'a Value,
) -> Result<&'a Map<String, Value>, String> {
    let Some(object) = arguments.as_object() else {
        return Err(format!(
            "arguments for `{}` must be a JSON object, got {}",
            definition.name,
            json_type(arguments)
        ));
    };

    for param in definition.parameters.iter().filter(|param| param.required) {
        match object.get(&param.name) {
            None | Some(Value::Null) => {
                return Err(format!("missing required parameter `{}`", param.name));
            }
            Some(_) => {}
        }
    }

    for (name, value) in object {
        let Some(param) = definition.param(name) else {
            return Err(format!("unknown parameter `{name}` for `{}`", definition.name));
        };
        if value.is_null() && !param.required {
            continue;
        }
        if !param.kind.accepts(value) {
            return Err(format!(
                "parameter `{name}` must be {}, got {}",
                param.kind.json_type(),
                json_type(value)
            ));
        }
    }

    Ok(object)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use netscout_core::{ParamKind, ParamSpec, ToolDefinition};
    use serde_json::json;

    use super::validate_arguments;

    fn target_health() -> ToolDefinition {
        ToolDefinition::new("get-target-group-health", "Target health")
            .with_param(ParamSpec::required("target_group_arn", ParamKind::String, "ARN"))
    }

    fn firewall_routes() -> ToolDefinition {
        ToolDefinition::new("list-firewall-routes", "Routes")
            .with_param(ParamSpec::optional("virtual_router", ParamKind::String, "router"))
    }

    #[test]
    fn accepts_required_and_optional_parameters() {
        assert!(validate_arguments(&target_health(), &json!({"target_group_arn": "arn:tg"})).is_ok());
        assert!(validate_arguments(&firewall_routes(), &json!({})).is_ok());
        assert!(validate_arguments(&firewall_routes(), &json!({"virtual_router": null})).is_ok());
    }

    #[test]
    fn rejects_non_object_arguments() {
        let error = validate_arguments(&firewall_routes(), &json!(["default"])).expect_err("array");
        assert!(error.contains("must be a JSON object, got array"));
    }

    #[test]
    fn rejects_missing_wrong_type_and_unknown() {
        let missing = validate_arguments(&target_health(), &json!({})).expect_err("missing");
        assert_eq!(missing, "missing required parameter `target_group_arn`");

        let wrong = validate_arguments(&target_health(), &json!({"target_group_arn": 42}))
            .expect_err("wrong type");
        assert_eq!(wrong, "parameter `target_group_arn` must be string, got integer");

        let unknown = validate_arguments(&firewall_routes(), &json!({"vr": "default"}))
            .expect_err("unknown");
        assert_eq!(unknown, "unknown parameter `vr` for `list-firewall-routes`");
    }
}

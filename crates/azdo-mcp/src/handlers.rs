//! Tool dispatcher.
//!
//! Routes a tool call to the owning domain, checks the arguments against the
//! tool's declared input schema, runs the handler, and wraps whatever comes
//! back into a [`ToolCallResult`]. Every call yields exactly one envelope:
//! errors and panics inside a handler become failure envelopes.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use azdo_core::{DevOpsClient, Error, Result};
use futures::FutureExt;
use serde_json::{Map, Value};

use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::registry::ToolRegistry;
use crate::tools;

/// Message used when a handler panics with a non-string payload.
const INTERNAL_ERROR_MESSAGE: &str = "Unexpected internal error";

/// Tool handler that executes tools against an Azure DevOps client.
pub struct ToolHandler {
    client: Arc<dyn DevOpsClient>,
    registry: Arc<ToolRegistry>,
}

impl ToolHandler {
    pub fn new(client: Arc<dyn DevOpsClient>, registry: Arc<ToolRegistry>) -> Self {
        Self { client, registry }
    }

    /// Get available tool definitions, in listing order.
    pub fn available_tools(&self) -> &[ToolDefinition] {
        self.registry.tools()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a tool by name with arguments.
    pub async fn execute(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        match self.dispatch(name, arguments).await {
            Ok(value) => ToolCallResult::success(&value),
            Err(message) => {
                tracing::warn!(tool = name, "Tool call failed: {}", message);
                ToolCallResult::failure(message)
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: Option<Value>) -> std::result::Result<Value, String> {
        let domain = self
            .registry
            .domain_of(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()).to_string())?;

        let args = self.checked_arguments(name, arguments).map_err(|e| e.to_string())?;

        tracing::debug!(tool = name, domain = %domain, "Dispatching tool call");

        let call = tools::handle(domain, self.client.as_ref(), name, args);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => {
                tracing::error!(tool = name, "Tool handler panicked");
                Err(panic_message(payload))
            }
        }
    }

    /// Normalize arguments to an object without null members and check them
    /// against the tool's input schema.
    fn checked_arguments(&self, name: &str, arguments: Option<Value>) -> Result<Value> {
        let args = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect(),
            Some(_) => {
                return Err(Error::Validation("arguments must be a JSON object".to_string()))
            }
        };

        if let Some(definition) = self.registry.definition(name) {
            check_arguments(&definition.input_schema, &args)?;
        }
        Ok(Value::Object(args))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        INTERNAL_ERROR_MESSAGE.to_string()
    }
}

// ===== Schema checks =====

/// Check arguments against the subset of JSON Schema used by tool definitions:
/// `required`, `type`, `enum`, `minimum`, `maximum`, `minLength`, and the
/// `type` of array items.
pub fn check_arguments(schema: &Value, args: &Map<String, Value>) -> Result<()> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(field) {
                return Err(Error::Validation(format!("field `{}` is required", field)));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (field, value) in args {
        if let Some(property) = properties.get(field) {
            check_property(field, property, value)?;
        }
    }
    Ok(())
}

fn check_property(field: &str, property: &Value, value: &Value) -> Result<()> {
    let invalid = |message: String| Err(Error::Validation(format!("field `{}` {}", field, message)));

    if let Some(expected) = property.get("type").and_then(Value::as_str) {
        if !has_type(value, expected) {
            return invalid(format!("must be {}", type_phrase(expected)));
        }
        if expected == "array" {
            let item_type = property
                .get("items")
                .and_then(|i| i.get("type"))
                .and_then(Value::as_str);
            if let (Some(item_type), Some(items)) = (item_type, value.as_array()) {
                if items.iter().any(|item| !has_type(item, item_type)) {
                    return invalid(format!("must contain only {} values", item_type));
                }
            }
        }
    }

    if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let names: Vec<String> = allowed
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect();
            return invalid(format!("must be one of: {}", names.join(", ")));
        }
    }

    if let Some(number) = value.as_f64() {
        if let Some(minimum) = property.get("minimum").and_then(Value::as_f64) {
            if number < minimum {
                return invalid(format!("must be >= {}", minimum));
            }
        }
        if let Some(maximum) = property.get("maximum").and_then(Value::as_f64) {
            if number > maximum {
                return invalid(format!("must be <= {}", maximum));
            }
        }
    }

    if let (Some(text), Some(min_length)) = (
        value.as_str(),
        property.get("minLength").and_then(Value::as_u64),
    ) {
        if (text.trim().chars().count() as u64) < min_length {
            return invalid(format!("must be at least {} characters", min_length));
        }
    }

    Ok(())
}

fn has_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn type_phrase(expected: &str) -> String {
    match expected {
        "integer" | "array" | "object" => format!("an {}", expected),
        other => format!("a {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockClient, Scripted};
    use serde_json::json;

    fn handler_with(client: Arc<MockClient>) -> ToolHandler {
        ToolHandler::new(client, Arc::new(ToolRegistry::new().unwrap()))
    }

    fn error_text(result: &ToolCallResult) -> String {
        assert!(result.is_error(), "expected failure, got {}", result.text());
        let body: Value = serde_json::from_str(result.text()).unwrap();
        body["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_unknown_tool_names_the_tool_for_any_payload() {
        let client = Arc::new(MockClient::new());
        let handler = handler_with(client.clone());

        for args in [
            None,
            Some(json!({})),
            Some(json!({"id": 1})),
            Some(json!("string")),
            Some(json!([1, 2])),
        ] {
            let result = handler.execute("make_coffee", args).await;
            assert_eq!(error_text(&result), "Unknown tool: make_coffee");
        }
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_envelope_carries_pretty_json() {
        let client = Arc::new(MockClient::new());
        let handler = handler_with(client);

        let result = handler
            .execute("get_work_item", Some(json!({"id": 42})))
            .await;

        assert!(!result.is_error());
        let body: Value = serde_json::from_str(result.text()).unwrap();
        assert_eq!(body["id"], 42);
        assert!(result.text().contains("\n  \"id\": 42"));
    }

    #[tokio::test]
    async fn test_missing_required_field_makes_no_calls() {
        let client = Arc::new(MockClient::new());
        let handler = handler_with(client.clone());

        let result = handler
            .execute("create_work_item", Some(json!({"title": "Only a title"})))
            .await;

        assert!(error_text(&result).contains("`work_item_type`"));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_schema_type_enum_and_range_checks() {
        let client = Arc::new(MockClient::new());
        let handler = handler_with(client.clone());

        let cases = [
            ("get_work_item", json!({"id": "42"}), "field `id` must be an integer"),
            (
                "link_work_items",
                json!({"source_id": 1, "target_id": 2, "link_type": "cousin"}),
                "field `link_type` must be one of",
            ),
            ("query_work_items", json!({"query": "SELECT", "top": 0}), "field `top` must be >= 1"),
            ("search_users", json!({"query": "jane", "top": 500}), "field `top` must be <= 100"),
            ("add_work_item_comment", json!({"id": 1, "text": "   "}), "at least 1 characters"),
            (
                "create_work_item",
                json!({"work_item_type": "Bug", "title": "t", "tags": [1]}),
                "must contain only string values",
            ),
        ];

        for (tool, args, expected) in cases {
            let result = handler.execute(tool, Some(args)).await;
            let message = error_text(&result);
            assert!(message.contains(expected), "{tool}: {message}");
        }
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let client = Arc::new(MockClient::new());
        let handler = handler_with(client.clone());

        let result = handler.execute("list_projects", Some(json!([1]))).await;
        assert!(error_text(&result).contains("arguments must be a JSON object"));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_null_optional_argument_is_treated_as_absent() {
        let client = Arc::new(MockClient::new());
        let handler = handler_with(client.clone());

        let result = handler
            .execute("list_projects", Some(json!({"top": null})))
            .await;
        assert!(!result.is_error(), "{}", result.text());
        assert_eq!(client.calls(), vec!["list_projects(100)"]);
    }

    #[tokio::test]
    async fn test_domain_error_becomes_failure_envelope() {
        let client = Arc::new(
            MockClient::new().script("get_work_item", Scripted::NotFound("Work item 7 does not exist")),
        );
        let handler = handler_with(client);

        let result = handler.execute("get_work_item", Some(json!({"id": 7}))).await;
        assert_eq!(error_text(&result), "Not found: Work item 7 does not exist");
    }

    #[tokio::test]
    async fn test_panics_become_failure_envelopes() {
        let cases = [
            (Scripted::Panic("boom"), "boom"),
            (Scripted::PanicOwned("owned boom".to_string()), "owned boom"),
            (Scripted::PanicOther, "Unexpected internal error"),
        ];

        for (script, expected) in cases {
            let client = Arc::new(MockClient::new().script("list_projects", script));
            let handler = handler_with(client);

            let result = handler.execute("list_projects", None).await;
            assert_eq!(error_text(&result), expected);
        }
    }

    #[test]
    fn test_check_arguments_accepts_valid_input() {
        let schema = json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "minimum": 1},
                "kind": {"type": "string", "enum": ["a", "b"]},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["id"]
        });
        let args = json!({"id": 3, "kind": "b", "tags": ["x"], "extra": true});
        assert!(check_arguments(&schema, args.as_object().unwrap()).is_ok());
    }
}

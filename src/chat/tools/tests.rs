use serde::Deserialize;
use serde_json::json;

use super::*;

#[derive(Debug, Deserialize, PartialEq)]
struct Lookup {
    word: String,
}

#[test]
fn definition_serializes_as_function_tool() {
    let tool = ToolDefinition::function(
        "lookup",
        "Look up a word",
        json!({ "type": "object", "properties": { "word": { "type": "string" } } }),
    );

    assert_eq!(tool.name(), "lookup");
    assert_eq!(
        serde_json::to_value(&tool).expect("tool should serialize"),
        json!({
            "type": "function",
            "function": {
                "name": "lookup",
                "description": "Look up a word",
                "parameters": {
                    "type": "object",
                    "properties": { "word": { "type": "string" } }
                }
            }
        })
    );
}

#[test]
fn arguments_decode_into_parameter_type() {
    let call = ToolCall {
        id: "call_1".to_string(),
        name: "lookup".to_string(),
        arguments: r#"{"word":"ferrous"}"#.to_string(),
    };

    let args: Lookup = call.parse_arguments().expect("arguments should parse");
    assert_eq!(args.word, "ferrous");
}

#[test]
fn malformed_arguments_are_invalid_response() {
    let call = ToolCall {
        id: "call_1".to_string(),
        name: "lookup".to_string(),
        arguments: "{not json".to_string(),
    };

    let result: Result<Lookup, _> = call.parse_arguments();
    assert!(matches!(result, Err(ProviderError::InvalidResponse(ref msg)) if msg.contains("lookup")));
}

// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat Completions API request/response types.

use serde::{Deserialize, Serialize};

// --- Request types ---

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ApiTool>>,

    /// `"auto"` whenever tools are offered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,

    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

/// A tool in OpenAI function format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ApiFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

// --- Response types ---

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiToolCall {
    pub id: String,
    pub function: ApiFunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiFunctionCall {
    pub name: String,
    /// Raw JSON text; may be malformed.
    #[serde(default)]
    pub arguments: String,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_tools_when_absent() {
        let req = CompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            tools: None,
            tool_choice: None,
            temperature: 0.7,
            max_tokens: 300,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("tools").is_none());
        assert!(v.get("tool_choice").is_none());
        assert_eq!(v["max_tokens"], 300);
    }

    #[test]
    fn tool_serializes_in_function_format() {
        let tool = ApiTool {
            tool_type: "function".into(),
            function: ApiFunction {
                name: "schedule_call".into(),
                description: "d".into(),
                parameters: json!({"type": "object"}),
            },
        };
        let v = serde_json::to_value(&tool).unwrap();
        assert_eq!(v["type"], "function");
        assert_eq!(v["function"]["name"], "schedule_call");
    }

    #[test]
    fn response_with_tool_calls_and_null_content() {
        let body = json!({
            "id": "chatcmpl-1",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "schedule_call", "arguments": "{\"requested_time_text\":\"tomorrow\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let resp: CompletionResponse = serde_json::from_value(body).unwrap();
        let msg = resp.choices[0].message.as_ref().unwrap();
        assert!(msg.content.is_none());
        assert_eq!(msg.tool_calls.as_ref().unwrap()[0].function.name, "schedule_call");
    }
}

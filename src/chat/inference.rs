use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::{ChatError, Result};
use crate::shared::config::InferenceSettings;

/// Client for an OpenAI-compatible chat-completions endpoint. One call per
/// turn; tool execution never loops back into the model.
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
    auth_header: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// A tool invocation requested by the model, normalized: `id` is the
/// provider's if present, synthetic otherwise; `arguments` is always a JSON
/// object, degraded to `{}` when the provider payload does not parse.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    tools: Vec<Value>,
    tool_choice: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize, Default)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<RawToolCall>>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    id: Option<String>,
    name: Option<String>,
    function: Option<RawFunction>,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: Option<String>,
    arguments: Option<Value>,
}

impl InferenceClient {
    pub fn new(settings: &InferenceSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ChatError::Model(format!("Failed to create inference client: {}", e)))?;

        let auth_header = settings
            .api_key
            .as_ref()
            .map(|key| format!("Bearer {}", key.trim()));

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            auth_header,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }

    /// Single round trip: messages + tool declarations in, normalized reply
    /// out. No retries; a failure here is terminal for the turn.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<Value>,
    ) -> Result<ModelReply> {
        let url = format!("{}/chat/completions", self.base_url);

        let req = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            tools,
            tool_choice: "auto".to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut request_builder = self.client.post(&url).json(&req);
        if let Some(header) = &self.auth_header {
            request_builder = request_builder.header("Authorization", header);
        }

        let resp = request_builder.send().await.map_err(ChatError::Request)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response>".to_string());
            return Err(ChatError::Model(format!(
                "Inference service error ({}): {}",
                status, text
            )));
        }

        let response_text = resp
            .text()
            .await
            .map_err(|e| ChatError::Model(format!("Failed to read response text: {}", e)))?;

        parse_reply(&response_text)
    }
}

/// Normalize a chat-completions body into a [`ModelReply`]. Absent content
/// becomes an empty string, an absent tool-call list becomes empty, and a
/// call whose argument payload does not decode keeps running with `{}`.
pub fn parse_reply(response_text: &str) -> Result<ModelReply> {
    let parsed: ChatCompletionResponse = serde_json::from_str(response_text)
        .map_err(|e| ChatError::Model(format!("Failed to parse response: {}", e)))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::Model("Inference response missing choices".into()))?;

    let content = choice.message.content.unwrap_or_default();

    let mut tool_calls = Vec::new();
    for raw in choice.message.tool_calls.unwrap_or_default() {
        let name = raw
            .function
            .as_ref()
            .and_then(|f| f.name.clone())
            .or(raw.name)
            .unwrap_or_default();

        let arguments = raw
            .function
            .and_then(|f| f.arguments)
            .map(decode_arguments)
            .unwrap_or_else(|| json!({}));

        let id = raw
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("call_{}_{}", name, tool_calls.len()));

        tool_calls.push(ToolCall {
            id,
            name,
            arguments,
        });
    }

    Ok(ModelReply {
        content,
        tool_calls,
    })
}

// Providers encode arguments as a JSON string; some hand back the object
// directly. Anything unparsable degrades to an empty object.
fn decode_arguments(raw: Value) -> Value {
    match raw {
        Value::String(text) => serde_json::from_str(&text).unwrap_or_else(|_| json!({})),
        Value::Object(map) => Value::Object(map),
        _ => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_only_reply() {
        let body = r#"{"choices":[{"message":{"content":"Sure, done."}}]}"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.content, "Sure, done.");
        assert!(reply.tool_calls.is_empty());
    }

    #[test]
    fn missing_content_defaults_to_empty() {
        let body = r#"{"choices":[{"message":{"tool_calls":[]}}]}"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.content, "");
        assert!(reply.tool_calls.is_empty());
    }

    #[test]
    fn missing_choices_is_an_error() {
        let body = r#"{"choices":[]}"#;
        assert!(parse_reply(body).is_err());
    }

    #[test]
    fn parses_tool_call_with_string_arguments() {
        let body = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"id":"call_abc","function":{"name":"add_task","arguments":"{\"title\":\"buy milk\"}"}}
        ]}}]}"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.tool_calls.len(), 1);
        let call = &reply.tool_calls[0];
        assert_eq!(call.id, "call_abc");
        assert_eq!(call.name, "add_task");
        assert_eq!(call.arguments["title"], "buy milk");
    }

    #[test]
    fn malformed_arguments_degrade_to_empty_object() {
        let body = r#"{"choices":[{"message":{"tool_calls":[
            {"id":"call_1","function":{"name":"list_tasks","arguments":"{not json"}}
        ]}}]}"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.tool_calls[0].arguments, serde_json::json!({}));
    }

    #[test]
    fn missing_id_gets_synthetic_ordinal_id() {
        let body = r#"{"choices":[{"message":{"tool_calls":[
            {"function":{"name":"list_tasks","arguments":"{}"}},
            {"function":{"name":"delete_task","arguments":"{\"task_id\":1}"}}
        ]}}]}"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.tool_calls[0].id, "call_list_tasks_0");
        assert_eq!(reply.tool_calls[1].id, "call_delete_task_1");
    }

    #[test]
    fn tool_name_falls_back_to_top_level_field() {
        let body = r#"{"choices":[{"message":{"tool_calls":[
            {"id":"c1","name":"get_task_details","function":{"arguments":"{\"task_id\":7}"}}
        ]}}]}"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.tool_calls[0].name, "get_task_details");
        assert_eq!(reply.tool_calls[0].arguments["task_id"], 7);
    }
}

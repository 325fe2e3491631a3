use serde_json::{Map, Value};

use crate::rchain::provider::ChatMessage;

/// Extra top-level request fields such as `temperature` or `max_tokens`.
pub type RequestParameters = Map<String, Value>;

/// Builds `{"model", "messages"}` and merges `params` over it.
pub fn build_chat_body(model: &str, history: &[ChatMessage], params: &RequestParameters) -> Value {
    let mut payload = Map::new();
    payload.insert("model".to_string(), Value::String(model.to_string()));
    payload.insert(
        "messages".to_string(),
        Value::Array(history.iter().map(message_to_json).collect()),
    );
    merge(payload, params)
}

/// Builds the legacy `{"model", "prompt"}` body used by `/completions`.
pub fn build_prompt_body(
    model: &str,
    history: &[ChatMessage],
    params: &RequestParameters,
) -> Value {
    let mut payload = Map::new();
    payload.insert("model".to_string(), Value::String(model.to_string()));
    payload.insert("prompt".to_string(), Value::String(flatten_history(history)));
    merge(payload, params)
}

/// Renders each message as `"<role>: <content>\n"`.
pub fn flatten_history(history: &[ChatMessage]) -> String {
    history.iter().fold(String::new(), |mut prompt, message| {
        prompt.push_str(message.role.as_str());
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push('\n');
        prompt
    })
}

fn message_to_json(message: &ChatMessage) -> Value {
    let mut map = Map::new();
    map.insert(
        "role".to_string(),
        Value::String(message.role.as_str().to_string()),
    );
    map.insert(
        "content".to_string(),
        Value::String(message.content.clone()),
    );
    Value::Object(map)
}

fn merge(mut payload: Map<String, Value>, params: &RequestParameters) -> Value {
    for (key, value) in params {
        payload.insert(key.clone(), value.clone());
    }
    Value::Object(payload)
}

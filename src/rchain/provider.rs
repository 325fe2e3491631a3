use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const AIONE_BASE_URL: &str = "https://api.platform.a15t.com/v1";
pub const ARCEE_BASE_URL: &str = "https://models.arcee.ai/v1";

/// Conversation role. Providers only accept this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Which completion endpoint a client talks to, and therefore the request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// `/chat/completions` with a `messages` array.
    Chat,
    /// Legacy `/completions` with a flattened `prompt` string.
    Completion,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Chat => "chat/completions",
            Self::Completion => "completions",
        }
    }
}

/// Known provider/model combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    ChatGpt,
    Gpt4,
    Aione,
    Arcee,
    Davinci,
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatGpt => "chat_gpt",
            Self::Gpt4 => "gpt4",
            Self::Aione => "aione",
            Self::Arcee => "arcee",
            Self::Davinci => "davinci",
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Self::ChatGpt | Self::Gpt4 | Self::Davinci => OPENAI_BASE_URL,
            Self::Aione => AIONE_BASE_URL,
            Self::Arcee => ARCEE_BASE_URL,
        }
    }

    pub fn endpoint(self) -> Endpoint {
        match self {
            Self::Davinci => Endpoint::Completion,
            _ => Endpoint::Chat,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::ChatGpt => "gpt-3.5-turbo",
            Self::Gpt4 => "gpt-4-0314",
            Self::Aione => "openai/gpt-4o-mini-2024-07-18",
            Self::Arcee => "caller",
            Self::Davinci => "davinci",
        }
    }

    pub fn timeout(self) -> Option<Duration> {
        match self {
            Self::Aione => Some(Duration::from_secs(20)),
            Self::Arcee => Some(Duration::from_secs(10)),
            _ => None,
        }
    }

    pub fn http2(self) -> bool {
        matches!(self, Self::Aione | Self::Arcee)
    }

    /// Sentinels returned instead of an error, as `(timeout, failure)`.
    /// `None` means the preset raises and retries instead.
    pub fn sentinels(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Aione => Some(("None", "None")),
            Self::Arcee => Some((" ", "")),
            _ => None,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, Endpoint, Preset, Role};
    use serde_json::json;

    #[test]
    fn chat_message_serializes_lowercase_role() {
        let value = serde_json::to_value(ChatMessage::assistant("ok")).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "ok"}));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let parsed: Result<ChatMessage, _> =
            serde_json::from_value(json!({"role": "tool", "content": "x"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn presets_follow_variant_matrix() {
        assert_eq!(Preset::ChatGpt.default_model(), "gpt-3.5-turbo");
        assert_eq!(Preset::Gpt4.base_url(), Preset::ChatGpt.base_url());
        assert_eq!(Preset::Davinci.endpoint(), Endpoint::Completion);
        assert_eq!(Preset::Aione.timeout().unwrap().as_secs(), 20);
        assert_eq!(Preset::Arcee.timeout().unwrap().as_secs(), 10);
        assert!(Preset::Arcee.http2());
        assert!(!Preset::Gpt4.http2());
        assert_eq!(Preset::Arcee.sentinels(), Some((" ", "")));
        assert_eq!(Preset::Gpt4.sentinels(), None);
        assert_eq!(Role::System.to_string(), "system");
    }
}

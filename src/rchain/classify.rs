//! Response classification.
//!
//! Providers signal transient failures through English error text rather than
//! structured codes, so each provider family supplies its own string contract
//! by implementing [`ResponseClassifier`].

use std::fmt;

use serde_json::Value;

/// Message OpenAI returns for a transient internal failure.
pub const OPENAI_RECOVERABLE_MESSAGE: &str =
    "The server had an error while processing your request. Sorry about that!";
pub const OPENAI_RATE_LIMIT_MARKER: &str = "Rate limit reached";
pub const OPENAI_BUSY_MARKER: &str = "overloaded with other requests";

/// Outcome of inspecting a parsed response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success,
    RateLimited(String),
    Recoverable(String),
    Busy(String),
    Official(String),
    /// Neither a completion nor an error; the caller keeps the raw body.
    Unknown,
}

pub trait ResponseClassifier: fmt::Debug + Send + Sync {
    fn classify(&self, body: &Value) -> Verdict;
}

/// Classifier for OpenAI-compatible `choices` / `error.message` bodies.
#[derive(Debug, Clone)]
pub struct OpenAiClassifier {
    pub rate_limit_marker: String,
    pub recoverable_message: String,
    pub busy_markers: Vec<String>,
}

impl Default for OpenAiClassifier {
    fn default() -> Self {
        Self {
            rate_limit_marker: OPENAI_RATE_LIMIT_MARKER.to_string(),
            recoverable_message: OPENAI_RECOVERABLE_MESSAGE.to_string(),
            busy_markers: vec![OPENAI_BUSY_MARKER.to_string()],
        }
    }
}

impl ResponseClassifier for OpenAiClassifier {
    fn classify(&self, body: &Value) -> Verdict {
        if body.get("choices").is_some() {
            return Verdict::Success;
        }
        let Some(error) = body.get("error") else {
            return Verdict::Unknown;
        };

        let message = error_message(error);
        if message.contains(&self.rate_limit_marker) {
            Verdict::RateLimited(message)
        } else if message == self.recoverable_message {
            Verdict::Recoverable(message)
        } else if self
            .busy_markers
            .iter()
            .any(|marker| message.contains(marker.as_str()))
        {
            Verdict::Busy(message)
        } else {
            Verdict::Official(message)
        }
    }
}

fn error_message(error: &Value) -> String {
    match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => match error {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{OPENAI_RECOVERABLE_MESSAGE, OpenAiClassifier, ResponseClassifier, Verdict};
    use serde_json::json;

    fn classify(body: serde_json::Value) -> Verdict {
        OpenAiClassifier::default().classify(&body)
    }

    #[test]
    fn choices_win_over_error() {
        let verdict = classify(json!({
            "choices": [{"message": {"role": "assistant", "content": "hi"}}],
            "error": {"message": "Rate limit reached for default"}
        }));
        assert_eq!(verdict, Verdict::Success);
    }

    #[test]
    fn rate_limit_is_substring_match() {
        let verdict = classify(json!({
            "error": {"message": "Rate limit reached for gpt-3.5-turbo in organization org-x"}
        }));
        assert!(matches!(verdict, Verdict::RateLimited(message) if message.starts_with("Rate limit")));
    }

    #[test]
    fn recoverable_requires_exact_message() {
        assert_eq!(
            classify(json!({"error": {"message": OPENAI_RECOVERABLE_MESSAGE}})),
            Verdict::Recoverable(OPENAI_RECOVERABLE_MESSAGE.to_string())
        );
        let padded = format!("{OPENAI_RECOVERABLE_MESSAGE} Retry later.");
        assert_eq!(
            classify(json!({"error": {"message": padded.clone()}})),
            Verdict::Official(padded)
        );
    }

    #[test]
    fn overloaded_model_is_busy() {
        let verdict = classify(json!({
            "error": {"message": "That model is currently overloaded with other requests."}
        }));
        assert!(matches!(verdict, Verdict::Busy(_)));
    }

    #[test]
    fn other_errors_are_official_and_verbatim() {
        assert_eq!(
            classify(json!({"error": {"message": "Incorrect API key provided: sk-***"}})),
            Verdict::Official("Incorrect API key provided: sk-***".to_string())
        );
    }

    #[test]
    fn error_without_message_uses_serialized_error() {
        assert_eq!(
            classify(json!({"error": {"code": 42}})),
            Verdict::Official("{\"code\":42}".to_string())
        );
        assert_eq!(
            classify(json!({"error": "bad gateway"})),
            Verdict::Official("bad gateway".to_string())
        );
    }

    #[test]
    fn bodies_without_either_field_are_unknown() {
        assert_eq!(classify(json!({"object": "list"})), Verdict::Unknown);
        assert_eq!(classify(json!([1, 2, 3])), Verdict::Unknown);
    }

    #[test]
    fn custom_markers_replace_defaults() {
        let classifier = OpenAiClassifier {
            rate_limit_marker: "slow down".to_string(),
            recoverable_message: "try again".to_string(),
            busy_markers: vec!["keys busy".to_string()],
        };
        assert!(matches!(
            classifier.classify(&json!({"error": {"message": "please slow down"}})),
            Verdict::RateLimited(_)
        ));
        assert!(matches!(
            classifier.classify(&json!({"error": {"message": "all keys busy"}})),
            Verdict::Busy(_)
        ));
        assert!(matches!(
            classifier.classify(&json!({"error": {"message": "Rate limit reached"}})),
            Verdict::Official(_)
        ));
    }
}

//! Thin blocking clients for OpenAI-compatible chat-completion APIs.

pub mod config;
pub mod rchain;

pub use rchain::chat_models::{ChatCompletionClient, ClientConfig, Completion, ErrorPolicy};
pub use rchain::classify::{OpenAiClassifier, ResponseClassifier, Verdict};
pub use rchain::error::{ClientError, FailureKind};
pub use rchain::provider::{ChatMessage, Endpoint, Preset, Role};
pub use rchain::request::RequestParameters;
pub use rchain::retry::{RetryLimit, RetryPolicy};

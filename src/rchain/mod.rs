//! Blocking wrappers around OpenAI-style completion endpoints.
//!
//! Each client builds a request body from a conversation history, POSTs it,
//! and either classifies the reply (retrying transient failures) or folds
//! every failure into a sentinel value, depending on its [`ErrorPolicy`].
//!
//! [`ErrorPolicy`]: chat_models::ErrorPolicy

/// Client, configuration and result types.
pub mod chat_models;
pub(crate) mod chat_runtime;
/// Pluggable response classification.
pub mod classify;
/// Failure taxonomy.
pub mod error;
/// Roles, messages and provider presets.
pub mod provider;
/// Request body construction.
pub mod request;
/// Backoff and attempt limits.
pub mod retry;

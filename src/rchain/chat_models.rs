use std::sync::Arc;
use std::time::Duration;

use reqwest::Proxy;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::rchain::chat_runtime::{Swallowed, run_with_retry, send_classified, send_swallowing};
use crate::rchain::classify::{OpenAiClassifier, ResponseClassifier};
use crate::rchain::error::ClientError;
use crate::rchain::provider::{ChatMessage, Endpoint, Preset};
use crate::rchain::request::{RequestParameters, build_chat_body, build_prompt_body};
use crate::rchain::retry::{RetryLimit, RetryPolicy};

/// How a client reports failures to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Classify every response, retry retryable failures, return the rest as errors.
    RaiseWithRetry(RetryPolicy),
    /// Never retry and never fail: log the problem and hand back a placeholder.
    SwallowAndSentinel {
        timeout_sentinel: String,
        failure_sentinel: String,
    },
}

/// Connection settings for one provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub endpoint: Endpoint,
    pub api_key: String,
    pub model: String,
    pub timeout: Option<Duration>,
    pub proxy: Option<String>,
    /// Allow HTTP/2 via ALPN. When false the client speaks HTTP/1.1 only.
    pub http2: bool,
    pub error_policy: ErrorPolicy,
}

impl ClientConfig {
    pub fn from_preset(preset: Preset, api_key: impl Into<String>) -> Self {
        let error_policy = match preset.sentinels() {
            Some((timeout_sentinel, failure_sentinel)) => ErrorPolicy::SwallowAndSentinel {
                timeout_sentinel: timeout_sentinel.to_string(),
                failure_sentinel: failure_sentinel.to_string(),
            },
            None => ErrorPolicy::RaiseWithRetry(RetryPolicy::default()),
        };

        Self {
            base_url: preset.base_url().to_string(),
            endpoint: preset.endpoint(),
            api_key: api_key.into(),
            model: preset.default_model().to_string(),
            timeout: preset.timeout(),
            proxy: None,
            http2: preset.http2(),
            error_policy,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Caps attempts of a retrying client. Has no effect on sentinel clients.
    pub fn with_retry_limit(mut self, limit: RetryLimit) -> Self {
        if let ErrorPolicy::RaiseWithRetry(policy) = &mut self.error_policy {
            policy.limit = limit;
        }
        self
    }

    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.path()
        )
    }

    fn build_http_client(&self) -> Result<Client, ClientError> {
        let mut builder = Client::builder().timeout(self.timeout);
        if !self.http2 {
            builder = builder.http1_only();
        }
        if let Some(proxy) = &self.proxy {
            let proxy = Proxy::all(proxy).map_err(|source| ClientError::Build { source })?;
            builder = builder.proxy(proxy);
        }
        builder.build().map_err(|source| ClientError::Build { source })
    }
}

/// What a successful call hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The provider's JSON body, unmodified.
    Response(Value),
    /// Placeholder returned by [`ErrorPolicy::SwallowAndSentinel`] clients.
    Sentinel(String),
}

impl Completion {
    pub fn response(&self) -> Option<&Value> {
        match self {
            Self::Response(body) => Some(body),
            Self::Sentinel(_) => None,
        }
    }

    pub fn into_response(self) -> Option<Value> {
        match self {
            Self::Response(body) => Some(body),
            Self::Sentinel(_) => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Sentinel(_))
    }

    /// Text of the first choice, for both chat and legacy completion bodies.
    pub fn first_text(&self) -> Option<&str> {
        let choice = self.response()?.get("choices")?.get(0)?;
        choice
            .get("message")
            .and_then(|message| message.get("content"))
            .or_else(|| choice.get("text"))
            .and_then(Value::as_str)
    }
}

/// Blocking client for one OpenAI-compatible completion endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    config: ClientConfig,
    url: String,
    http: Client,
    classifier: Arc<dyn ResponseClassifier>,
}

impl ChatCompletionClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = config.build_http_client()?;
        let url = config.url();
        Ok(Self {
            config,
            url,
            http,
            classifier: Arc::new(OpenAiClassifier::default()),
        })
    }

    pub fn from_preset(preset: Preset, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_preset(preset, api_key))
    }

    /// Replaces the default OpenAI error-text contract.
    pub fn with_classifier(mut self, classifier: Arc<dyn ResponseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn build_body(&self, messages: &[ChatMessage], params: &RequestParameters) -> Value {
        match self.config.endpoint {
            Endpoint::Chat => build_chat_body(&self.config.model, messages, params),
            Endpoint::Completion => build_prompt_body(&self.config.model, messages, params),
        }
    }

    pub fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ClientError> {
        self.call(messages, &RequestParameters::new())
    }

    /// Sends `messages` with `params` merged over the defaults.
    ///
    /// Blocks the calling thread for the request and for any backoff sleeps.
    /// Sentinel clients always return `Ok`.
    pub fn call(
        &self,
        messages: &[ChatMessage],
        params: &RequestParameters,
    ) -> Result<Completion, ClientError> {
        match &self.config.error_policy {
            ErrorPolicy::RaiseWithRetry(policy) => run_with_retry(policy, || {
                let payload = self.build_body(messages, params);
                send_classified(
                    &self.http,
                    &self.url,
                    &self.config.api_key,
                    &payload,
                    self.classifier.as_ref(),
                )
            })
            .map(Completion::Response),
            ErrorPolicy::SwallowAndSentinel {
                timeout_sentinel,
                failure_sentinel,
            } => {
                let payload = self.build_body(messages, params);
                let completion =
                    match send_swallowing(&self.http, &self.url, &self.config.api_key, &payload) {
                        Swallowed::Body(body) => Completion::Response(body),
                        Swallowed::TimedOut => Completion::Sentinel(timeout_sentinel.clone()),
                        Swallowed::Failed => Completion::Sentinel(failure_sentinel.clone()),
                    };
                if completion.is_sentinel() {
                    debug!(url = %self.url, "returning sentinel instead of an error");
                }
                Ok(completion)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatCompletionClient, ClientConfig, Completion, ErrorPolicy};
    use crate::rchain::provider::{ChatMessage, Preset};
    use crate::rchain::request::RequestParameters;
    use crate::rchain::retry::{RetryLimit, RetryPolicy};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn preset_urls_match_endpoint_family() {
        assert_eq!(
            ClientConfig::from_preset(Preset::ChatGpt, "k").url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            ClientConfig::from_preset(Preset::Davinci, "k").url(),
            "https://api.openai.com/v1/completions"
        );
        assert_eq!(
            ClientConfig::from_preset(Preset::Arcee, "k")
                .with_base_url("http://localhost:9000/v1/")
                .url(),
            "http://localhost:9000/v1/chat/completions"
        );
    }

    #[test]
    fn sentinel_presets_use_swallow_policy() {
        let aione = ClientConfig::from_preset(Preset::Aione, "k");
        assert_eq!(
            aione.error_policy,
            ErrorPolicy::SwallowAndSentinel {
                timeout_sentinel: "None".into(),
                failure_sentinel: "None".into(),
            }
        );
        assert_eq!(aione.timeout, Some(Duration::from_secs(20)));

        let gpt4 = ClientConfig::from_preset(Preset::Gpt4, "k");
        assert_eq!(gpt4.error_policy, ErrorPolicy::RaiseWithRetry(RetryPolicy::default()));
        assert_eq!(gpt4.model, "gpt-4-0314");
    }

    #[test]
    fn retry_limit_only_touches_retrying_clients() {
        let capped = ClientConfig::from_preset(Preset::ChatGpt, "k")
            .with_retry_limit(RetryLimit::MaxAttempts(4));
        assert_eq!(
            capped.error_policy,
            ErrorPolicy::RaiseWithRetry(
                RetryPolicy::default().with_limit(RetryLimit::MaxAttempts(4))
            )
        );

        let arcee = ClientConfig::from_preset(Preset::Arcee, "k");
        assert_eq!(
            arcee.clone().with_retry_limit(RetryLimit::MaxAttempts(4)),
            arcee
        );
    }

    #[test]
    fn davinci_builds_prompt_body() {
        let client = ChatCompletionClient::from_preset(Preset::Davinci, "k").unwrap();
        let body = client.build_body(
            &[ChatMessage::system("A"), ChatMessage::user("B")],
            &RequestParameters::new(),
        );
        assert_eq!(body, json!({"model": "davinci", "prompt": "system: A\nuser: B\n"}));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn client_can_be_shared_across_threads() {
        assert_send_sync::<ChatCompletionClient>();
        assert_send_sync::<ClientConfig>();
    }

    #[test]
    fn invalid_proxy_fails_construction() {
        let config = ClientConfig::from_preset(Preset::ChatGpt, "k").with_proxy("http://[::1");
        assert!(ChatCompletionClient::new(config).is_err());
    }

    #[test]
    fn first_text_reads_chat_and_legacy_shapes() {
        let chat = Completion::Response(json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}}]
        }));
        assert_eq!(chat.first_text(), Some("4"));

        let legacy = Completion::Response(json!({"choices": [{"text": " four"}]}));
        assert_eq!(legacy.first_text(), Some(" four"));

        let sentinel = Completion::Sentinel("None".into());
        assert_eq!(sentinel.first_text(), None);
        assert!(sentinel.is_sentinel());
    }
}

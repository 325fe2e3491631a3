use std::thread;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::rchain::classify::ResponseClassifier;
use crate::rchain::error::ClientError;
use crate::rchain::retry::RetryPolicy;

/// Result of a swallow-mode send.
#[derive(Debug)]
pub(crate) enum Swallowed {
    Body(Value),
    TimedOut,
    Failed,
}

/// Runs `attempt` until it succeeds, fails terminally, or the policy gives up.
pub(crate) fn run_with_retry<T>(
    policy: &RetryPolicy,
    mut attempt: impl FnMut() -> Result<T, ClientError>,
) -> Result<T, ClientError> {
    let mut failed_attempts: u32 = 0;

    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(err) => {
                failed_attempts = failed_attempts.saturating_add(1);
                if !err.is_retryable() || !policy.allows_retry(failed_attempts) {
                    return Err(err);
                }

                let delay = policy.delay(failed_attempts);
                warn!(
                    kind = %err.kind(),
                    attempt = failed_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "retrying chat request: {err}"
                );
                thread::sleep(delay);
            }
        }
    }
}

/// One POST whose JSON body is classified; the HTTP status is not consulted.
pub(crate) fn send_classified(
    client: &Client,
    url: &str,
    api_key: &str,
    payload: &Value,
    classifier: &dyn ResponseClassifier,
) -> Result<Value, ClientError> {
    debug!(url, model = ?payload.get("model"), "sending chat request");

    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .map_err(ClientError::from_request)?;
    let status = response.status();
    let raw = response.text().map_err(ClientError::from_request)?;

    let body: Value = match serde_json::from_str(&raw) {
        Ok(body) => body,
        Err(_) => {
            debug!(%status, "response body is not JSON");
            return Err(ClientError::Unknown { body: raw });
        }
    };

    match ClientError::from_verdict(classifier.classify(&body), &raw) {
        None => Ok(body),
        Some(err) => {
            if let ClientError::Official { message }
            | ClientError::Recoverable { message }
            | ClientError::ProviderBusy { message } = &err
            {
                warn!(%status, "provider returned error: {message}");
            }
            Err(err)
        }
    }
}

/// One POST where every failure is logged and folded into [`Swallowed`].
pub(crate) fn send_swallowing(
    client: &Client,
    url: &str,
    api_key: &str,
    payload: &Value,
) -> Swallowed {
    debug!(url, model = ?payload.get("model"), "sending chat request");

    let result = client
        .post(url)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json::<Value>());

    match result {
        Ok(body) => Swallowed::Body(body),
        Err(err) if err.is_timeout() => {
            warn!("request timed out, try again later: {err}");
            Swallowed::TimedOut
        }
        Err(err) => {
            warn!("unexpected error during chat request: {err}");
            Swallowed::Failed
        }
    }
}

use std::fmt;
use std::io;

use thiserror::Error;

use crate::rchain::classify::Verdict;

/// Coarse failure category used by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimitReached,
    Recoverable,
    ProviderBusy,
    Official,
    Unknown,
    TransportTimeout,
    NetworkConnection,
    Transport,
    Build,
}

impl FailureKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimitReached | Self::Recoverable | Self::ProviderBusy | Self::NetworkConnection
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimitReached => "rate_limit_reached",
            Self::Recoverable => "recoverable",
            Self::ProviderBusy => "provider_busy",
            Self::Official => "official",
            Self::Unknown => "unknown",
            Self::TransportTimeout => "transport_timeout",
            Self::NetworkConnection => "network_connection",
            Self::Transport => "transport",
            Self::Build => "build",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("rate limit reached: {message}")]
    RateLimitReached { message: String },

    #[error("recoverable server error: {message}")]
    Recoverable { message: String },

    #[error("provider busy: {message}")]
    ProviderBusy { message: String },

    #[error("provider error: {message}")]
    Official { message: String },

    #[error("unknown response: {body}")]
    Unknown { body: String },

    #[error("request timed out: {source}")]
    Timeout { source: reqwest::Error },

    #[error("connection failed: {source}")]
    Connection { source: reqwest::Error },

    #[error("request failed: {source}")]
    Transport { source: reqwest::Error },

    #[error("failed to build HTTP client: {source}")]
    Build { source: reqwest::Error },
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimitReached { .. } => FailureKind::RateLimitReached,
            Self::Recoverable { .. } => FailureKind::Recoverable,
            Self::ProviderBusy { .. } => FailureKind::ProviderBusy,
            Self::Official { .. } => FailureKind::Official,
            Self::Unknown { .. } => FailureKind::Unknown,
            Self::Timeout { .. } => FailureKind::TransportTimeout,
            Self::Connection { .. } => FailureKind::NetworkConnection,
            Self::Transport { .. } => FailureKind::Transport,
            Self::Build { .. } => FailureKind::Build,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Maps a send failure onto timeout, connection or generic transport.
    ///
    /// A peer that resets or closes the socket mid-exchange counts as a
    /// connection failure; builder, redirect and body errors stay terminal.
    pub(crate) fn from_request(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { source }
        } else if source.is_connect() || source.is_request() || is_disconnect(&source) {
            Self::Connection { source }
        } else {
            Self::Transport { source }
        }
    }

    /// Returns `None` for [`Verdict::Success`].
    pub(crate) fn from_verdict(verdict: Verdict, raw_body: &str) -> Option<Self> {
        match verdict {
            Verdict::Success => None,
            Verdict::RateLimited(message) => Some(Self::RateLimitReached { message }),
            Verdict::Recoverable(message) => Some(Self::Recoverable { message }),
            Verdict::Busy(message) => Some(Self::ProviderBusy { message }),
            Verdict::Official(message) => Some(Self::Official { message }),
            Verdict::Unknown => Some(Self::Unknown {
                body: raw_body.to_string(),
            }),
        }
    }
}

fn is_disconnect(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

use std::time::Duration;

/// Typed error hierarchy for receiver operations.
/// Classifies errors as transient (the polling cycle absorbs them and keeps
/// going) or terminal for the specific operation that raised them.
#[derive(Clone, Debug, thiserror::Error)]
pub enum AvrError {
    /// The session rejected a command send, or the connection closed/errored.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The device answered with a value no identifier table recognizes.
    /// Carries the raw payload text for diagnostics, never a silent default.
    #[error("unrecognized {property} value: {raw}")]
    Unrecognized { property: &'static str, raw: String },

    /// A framed span from the status stream was not valid JSON.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The status stream closed or errored before the first byte arrived.
    #[error("subscription setup failed: {0}")]
    SubscriptionSetup(String),

    /// A bounded correlation wait expired before the matching event arrived.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("not connected")]
    NotConnected,
}

impl AvrError {
    /// Transient errors are retried by the polling cycle with backoff;
    /// everything else is final for the operation that produced it.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::SubscriptionSetup(_) | Self::Timeout(_) | Self::NotConnected
        )
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Unrecognized { .. } => "unrecognized_value",
            Self::Decode(_) => "decode",
            Self::SubscriptionSetup(_) => "subscription_setup",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::NotConnected => "not_connected",
        }
    }
}

/// A completed `{...}` span carved out of the status stream that failed to
/// parse as JSON. The decoder reports it and moves on; it never terminates
/// the stream.
#[derive(Clone, Debug, thiserror::Error)]
#[error("invalid frame ({reason}): {span}")]
pub struct DecodeError {
    /// The malformed span, verbatim.
    pub span: String,
    pub reason: String,
}

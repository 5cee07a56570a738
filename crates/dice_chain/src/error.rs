use thiserror::Error;

/// Errors raised by the deployment flows and their network collaborators.
///
/// Collaborators keep the underlying network diagnostic in the message so the
/// operator sees exactly what the node or toolkit reported.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("signer `{0}` not found in key store")]
    KeyNotFound(String),

    #[error("funding failed: {0}")]
    Funding(String),

    #[error("deployment failed: {0}")]
    Deployment(String),

    #[error("invocation failed: {0}")]
    Invocation(String),

    #[error("account query failed: {0}")]
    Query(String),

    #[error("invalid address `{input}`: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("amount of {0} tokens overflows the nano-unit range")]
    AmountOverflow(u64),
}

impl DeployError {
    /// Short machine-friendly tag used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyNotFound(_) => "key_not_found",
            Self::Funding(_) => "funding",
            Self::Deployment(_) => "deployment",
            Self::Invocation(_) => "invocation",
            Self::Query(_) => "query",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::AmountOverflow(_) => "amount_overflow",
        }
    }

    pub(crate) fn invalid_address(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

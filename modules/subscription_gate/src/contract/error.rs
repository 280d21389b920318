use thiserror::Error;

/// Failure of a call to the messaging platform (membership lookup, send,
/// edit, callback answer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("bot api rejected the request: {description}")]
    Api { description: String },

    #[error("rate limited: {message}")]
    RateLimited { message: String },

    #[error("transport error: {message}")]
    Other { message: String },
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn api(description: impl Into<String>) -> Self {
        Self::Api {
            description: description.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Failure of the user ledger backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger credentials are unusable: {message}")]
    Credentials { message: String },

    #[error("ledger authentication failed: {message}")]
    Auth { message: String },

    #[error("ledger request failed: {message}")]
    Transport { message: String },

    #[error("ledger returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("unexpected ledger response: {message}")]
    MalformedResponse { message: String },

    #[error("invalid ledger configuration: {message}")]
    Config { message: String },
}

impl LedgerError {
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

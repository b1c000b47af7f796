use thiserror::Error;

use crate::types::ProviderId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{provider} API error: {status} - {body}")]
    Api {
        provider: ProviderId,
        status: u16,
        body: String,
    },

    #[error("{0} not set")]
    MissingCredentials(&'static str),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    SerdeYaml(#[from] serde_yaml::Error),
}

/// Coarse classification used to decide how far an error propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Provider or capability call failed; recoverable by treating the provider as absent
    Provider,
    /// Model output was not well-formed JSON after tolerant extraction
    Parse,
    /// Caller supplied a missing or empty field
    InvalidInput,
    Other,
}

impl Error {
    pub fn parse(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Api { .. }
            | Self::MissingCredentials(_)
            | Self::Timeout(_)
            | Self::Http(_)
            | Self::OpenAI(_) => ErrorKind::Provider,
            _ => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert_eq!(Error::Timeout(15_000).kind(), ErrorKind::Provider);
        assert_eq!(
            Error::parse("judge response", "expected value").kind(),
            ErrorKind::Parse
        );
        assert_eq!(
            Error::InvalidInput("Query is required".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(Error::Config("bad".into()).kind(), ErrorKind::Other);
    }

    #[test]
    fn api_error_message_names_provider() {
        let err = Error::Api {
            provider: ProviderId::Exa,
            status: 401,
            body: "unauthorized".into(),
        };
        assert_eq!(err.to_string(), "exa API error: 401 - unauthorized");
    }
}

use thiserror::Error;

/// Errors raised by domain rules, independent of storage and transport.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("no such {0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(&'static str),
    #[error("invariant broken: {0}")]
    Invariant(String),
}

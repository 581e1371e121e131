use ulid::Ulid;

use crate::model::Span;

#[derive(Debug)]
pub enum EngineError {
    InvalidArgument(&'static str),
    /// Span or slot start not on a `SLOT_MINUTES` boundary.
    Misaligned(Span),
    /// Overlaps the Active reservation with this id.
    Conflict(Ulid),
    NotFound(String),
    NotOwner {
        reservation: Ulid,
        owner: String,
    },
    /// Resource exists but cannot be booked (maintenance).
    Unavailable(String),
    AlreadyExists(Ulid),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EngineError::Misaligned(span) => {
                write!(f, "span {span} is not aligned to the booking slot size")
            }
            EngineError::Conflict(id) => write!(f, "conflict with reservation: {id}"),
            EngineError::NotFound(what) => write!(f, "not found: {what}"),
            EngineError::NotOwner { reservation, owner } => {
                write!(f, "reservation {reservation} is not owned by {owner}")
            }
            EngineError::Unavailable(code) => write!(f, "resource {code} is not available"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

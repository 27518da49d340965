use ulid::Ulid;

use crate::model::Span;

#[derive(Debug)]
pub enum EngineError {
    /// Malformed input: inverted interval, missing field, bad value.
    Validation(String),
    /// The car already has a reservation overlapping the requested span.
    Conflict { car_id: Ulid, span: Span },
    NotFound(Ulid),
    AlreadyExists(Ulid),
    DuplicateEmail(String),
    AccountNotFound(String),
    InvalidCredentials,
    LimitExceeded(&'static str),
    /// Availability could not be determined or a commit could not be made durable.
    StorageUnavailable(String),
}

impl EngineError {
    /// True for outcomes the caller caused and may correct by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EngineError::StorageUnavailable(_))
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "invalid request: {msg}"),
            EngineError::Conflict { car_id, span } => write!(
                f,
                "resource unavailable for requested interval: car {car_id} [{}, {})",
                span.start, span.end
            ),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::DuplicateEmail(email) => write!(f, "email already registered: {email}"),
            EngineError::AccountNotFound(email) => write!(f, "email not registered: {email}"),
            EngineError::InvalidCredentials => write!(f, "incorrect password"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::StorageUnavailable(e) => write!(f, "storage unavailable: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<super::store::StoreError> for EngineError {
    fn from(e: super::store::StoreError) -> Self {
        EngineError::StorageUnavailable(e.to_string())
    }
}

//! The module contains the errors the engine can throw.
//!
//! Domain outcomes are distinct variants so callers can branch on them:
//!
//! - [`DuplicateRequest`], [`ReverseRequestExists`], [`AlreadyFriends`] and
//!   [`PairBlocked`] reject a send.
//! - [`RequestNotFound`] and [`FriendshipNotFound`] are what the loser of an
//!   accept/remove race observes; callers treat them as "already resolved".
//! - [`StoreUnavailable`] is the only transient kind and the only one the
//!   engine retries.
//! - [`InvalidStatus`] and [`CorruptRecord`] mean the stored data is broken.
//!
//!  [`DuplicateRequest`]: EngineError::DuplicateRequest
//!  [`ReverseRequestExists`]: EngineError::ReverseRequestExists
//!  [`AlreadyFriends`]: EngineError::AlreadyFriends
//!  [`PairBlocked`]: EngineError::PairBlocked
//!  [`RequestNotFound`]: EngineError::RequestNotFound
//!  [`FriendshipNotFound`]: EngineError::FriendshipNotFound
//!  [`StoreUnavailable`]: EngineError::StoreUnavailable
//!  [`InvalidStatus`]: EngineError::InvalidStatus
//!  [`CorruptRecord`]: EngineError::CorruptRecord
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("user \"{0}\" not found")]
    UserNotFound(String),
    #[error("cannot send a friend request to yourself")]
    SelfRequest,
    #[error("users are already friends")]
    AlreadyFriends,
    #[error("friend request already pending")]
    DuplicateRequest,
    #[error("the other user already sent a friend request")]
    ReverseRequestExists,
    #[error("friend request not found")]
    RequestNotFound,
    #[error("friendship not found")]
    FriendshipNotFound,
    #[error("relationship between the users is blocked")]
    PairBlocked,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid username: {0}")]
    InvalidUsername(String),
    #[error("username \"{0}\" already taken")]
    UsernameTaken(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error(transparent)]
    Database(DbErr),
}

/// Copyable discriminant of [`EngineError`].
///
/// The `as_str` names are stable: they travel on the wire as the error `code`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UserNotFound,
    SelfRequest,
    AlreadyFriends,
    DuplicateRequest,
    ReverseRequestExists,
    RequestNotFound,
    FriendshipNotFound,
    PairBlocked,
    InvalidInput,
    InvalidUsername,
    UsernameTaken,
    InvalidStatus,
    CorruptRecord,
    StoreUnavailable,
    Database,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::SelfRequest => "self_request",
            Self::AlreadyFriends => "already_friends",
            Self::DuplicateRequest => "duplicate_request",
            Self::ReverseRequestExists => "reverse_request_exists",
            Self::RequestNotFound => "request_not_found",
            Self::FriendshipNotFound => "friendship_not_found",
            Self::PairBlocked => "pair_blocked",
            Self::InvalidInput => "invalid_input",
            Self::InvalidUsername => "invalid_username",
            Self::UsernameTaken => "username_taken",
            Self::InvalidStatus => "invalid_status",
            Self::CorruptRecord => "corrupt_record",
            Self::StoreUnavailable => "store_unavailable",
            Self::Database => "database",
        }
    }

    /// Only transient store failures may be retried.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }

    /// Stored data violates an invariant; fatal and worth an error log.
    pub fn is_corruption(self) -> bool {
        matches!(self, Self::InvalidStatus | Self::CorruptRecord)
    }
}

impl TryFrom<&str> for ErrorKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user_not_found" => Ok(Self::UserNotFound),
            "self_request" => Ok(Self::SelfRequest),
            "already_friends" => Ok(Self::AlreadyFriends),
            "duplicate_request" => Ok(Self::DuplicateRequest),
            "reverse_request_exists" => Ok(Self::ReverseRequestExists),
            "request_not_found" => Ok(Self::RequestNotFound),
            "friendship_not_found" => Ok(Self::FriendshipNotFound),
            "pair_blocked" => Ok(Self::PairBlocked),
            "invalid_input" => Ok(Self::InvalidInput),
            "invalid_username" => Ok(Self::InvalidUsername),
            "username_taken" => Ok(Self::UsernameTaken),
            "invalid_status" => Ok(Self::InvalidStatus),
            "corrupt_record" => Ok(Self::CorruptRecord),
            "store_unavailable" => Ok(Self::StoreUnavailable),
            "database" => Ok(Self::Database),
            other => Err(EngineError::InvalidInput(format!(
                "unknown error kind: {other}"
            ))),
        }
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) => ErrorKind::UserNotFound,
            Self::SelfRequest => ErrorKind::SelfRequest,
            Self::AlreadyFriends => ErrorKind::AlreadyFriends,
            Self::DuplicateRequest => ErrorKind::DuplicateRequest,
            Self::ReverseRequestExists => ErrorKind::ReverseRequestExists,
            Self::RequestNotFound => ErrorKind::RequestNotFound,
            Self::FriendshipNotFound => ErrorKind::FriendshipNotFound,
            Self::PairBlocked => ErrorKind::PairBlocked,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InvalidUsername(_) => ErrorKind::InvalidUsername,
            Self::UsernameTaken(_) => ErrorKind::UsernameTaken,
            Self::InvalidStatus(_) => ErrorKind::InvalidStatus,
            Self::CorruptRecord(_) => ErrorKind::CorruptRecord,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Self::Database(_) => ErrorKind::Database,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// SQLite reports lock contention between concurrent writers as "database is
/// locked" (`SQLITE_BUSY`) or "database table is locked" (`SQLITE_LOCKED`).
fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        other => {
            let message = other.to_string().to_lowercase();
            message.contains("database is locked")
                || message.contains("database table is locked")
                || message.contains("database is busy")
        }
    }
}

impl From<DbErr> for EngineError {
    fn from(value: DbErr) -> Self {
        if is_transient(&value) {
            Self::StoreUnavailable(value.to_string())
        } else {
            Self::Database(value)
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::UserNotFound(a), Self::UserNotFound(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidUsername(a), Self::InvalidUsername(b)) => a == b,
            (Self::UsernameTaken(a), Self::UsernameTaken(b)) => a == b,
            (Self::InvalidStatus(a), Self::InvalidStatus(b)) => a == b,
            (Self::CorruptRecord(a), Self::CorruptRecord(b)) => a == b,
            (Self::StoreUnavailable(a), Self::StoreUnavailable(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (a, b) => a.kind() == b.kind() && !has_payload(a),
        }
    }
}

fn has_payload(err: &EngineError) -> bool {
    !matches!(
        err,
        EngineError::SelfRequest
            | EngineError::AlreadyFriends
            | EngineError::DuplicateRequest
            | EngineError::ReverseRequestExists
            | EngineError::RequestNotFound
            | EngineError::FriendshipNotFound
            | EngineError::PairBlocked
    )
}

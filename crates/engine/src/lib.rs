//! Friend relationship engine.
//!
//! The [`Engine`] owns every write to friend requests and friendships. Each
//! mutation runs in one DB transaction that first reads every record it needs
//! and only then writes, so a failed attempt leaves nothing behind and a
//! transient failure can be retried as a whole.

pub use error::{EngineError, ErrorKind};
pub use friend_requests::{FriendRequest, RequestDirection, RequestStatus, request_key};
pub use friendships::{Friendship, FriendshipStatus, pair_key, sorted_pair};
pub use ops::{Engine, EngineBuilder, RetryPolicy};
pub use profiles::{UserProfile, fold};

mod error;
mod friend_requests;
mod friendships;
mod ops;
mod profiles;

type ResultEngine<T> = Result<T, EngineError>;

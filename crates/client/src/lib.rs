//! Client side of the friend system.
//!
//! [`FriendsStore`] keeps the current user's friends, pending requests and
//! search results in memory and publishes every change through a
//! `tokio::sync::watch` channel. It talks to the service through a
//! [`FriendsBackend`]: [`LocalBackend`] calls an in-process engine,
//! [`HttpBackend`] calls the HTTP server.

pub use backend::FriendsBackend;
pub use error::ClientError;
pub use http::HttpBackend;
pub use local::LocalBackend;
pub use store::{DEFAULT_CALL_TIMEOUT, FriendsState, FriendsStore};

pub use api_types::friends::{Direction, Profile};

mod backend;
mod error;
mod http;
mod local;
mod store;

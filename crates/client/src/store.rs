use std::{future::Future, time::Duration};

use api_types::friends::{Direction, Profile};
use engine::ErrorKind;
use tokio::sync::watch;

use crate::{ClientError, FriendsBackend};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot of everything the cache knows about the current user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FriendsState {
    pub friends: Vec<Profile>,
    pub incoming_requests: Vec<Profile>,
    pub outgoing_requests: Vec<Profile>,
    pub search_results: Vec<Profile>,
    pub is_loading: bool,
    /// User-facing message of the last failed action.
    pub error: Option<String>,
}

impl FriendsState {
    /// Whether `user_id` is a friend or on either side of a pending request.
    fn knows(&self, user_id: &str) -> bool {
        [
            &self.friends,
            &self.incoming_requests,
            &self.outgoing_requests,
        ]
        .into_iter()
        .any(|list| contains(list, user_id))
    }
}

fn contains(list: &[Profile], user_id: &str) -> bool {
    list.iter().any(|p| p.user_id == user_id)
}

/// Remove and return the profile of `user_id` from `list`.
fn take(list: &mut Vec<Profile>, user_id: &str) -> Option<Profile> {
    let index = list.iter().position(|p| p.user_id == user_id)?;
    Some(list.remove(index))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Initialize,
    Search,
    Send,
    Accept,
    Reject,
    Remove,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Search => "search",
            Self::Send => "send_request",
            Self::Accept => "accept_request",
            Self::Reject => "reject_request",
            Self::Remove => "remove_friend",
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            Self::Initialize => "Failed to initialize friends data",
            Self::Search => "Failed to search users",
            Self::Send => "Failed to send friend request",
            Self::Accept => "Failed to accept friend request",
            Self::Reject => "Failed to reject friend request",
            Self::Remove => "Failed to remove friend",
        }
    }

    /// Outcomes meaning someone else already resolved the relationship.
    fn is_benign(self, err: &ClientError) -> bool {
        match (self, err.kind()) {
            (Self::Accept | Self::Reject, Some(ErrorKind::RequestNotFound)) => true,
            (Self::Remove, Some(ErrorKind::FriendshipNotFound)) => true,
            _ => false,
        }
    }
}

/// Text shown to the user when `action` fails with `err`.
fn message_for_error(action: Action, err: &ClientError) -> String {
    let message = match err.kind() {
        Some(ErrorKind::SelfRequest) => "You can't send a friend request to yourself",
        Some(ErrorKind::UserNotFound) => "User not found",
        Some(ErrorKind::AlreadyFriends) => "You are already friends",
        Some(ErrorKind::DuplicateRequest) => "Friend request already sent",
        Some(ErrorKind::ReverseRequestExists) => {
            "This user already sent you a friend request, accept it instead"
        }
        Some(ErrorKind::PairBlocked) => "You can't send a friend request to this user",
        Some(ErrorKind::RequestNotFound) => "This friend request no longer exists",
        Some(ErrorKind::FriendshipNotFound) => "You are not friends with this user",
        Some(ErrorKind::StoreUnavailable) => "Service unavailable, please try again",
        _ => action.fallback_message(),
    };
    message.to_string()
}

/// Observable in-memory cache of the current user's relationships.
///
/// Every state change is published to the receivers returned by
/// [`FriendsStore::subscribe`].
#[derive(Debug)]
pub struct FriendsStore<B> {
    backend: B,
    state: watch::Sender<FriendsState>,
    call_timeout: Duration,
}

impl<B: FriendsBackend> FriendsStore<B> {
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(FriendsState::default());
        Self {
            backend,
            state,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound every backend call by `timeout`.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn subscribe(&self) -> watch::Receiver<FriendsState> {
        self.state.subscribe()
    }

    /// A copy of the current state.
    pub fn state(&self) -> FriendsState {
        self.state.borrow().clone()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Reload friends and both request lists of `user_id`.
    pub async fn initialize(&self, user_id: &str) -> Result<(), ClientError> {
        self.start();
        let result = self.load(user_id).await;
        self.finish(Action::Initialize, result)
    }

    /// Search users by username prefix.
    ///
    /// Results never contain `current_user_id` or anyone already known to the
    /// cache as a friend or a pending request. A blank query clears the
    /// results without calling the backend.
    pub async fn search_users(&self, query: &str, current_user_id: &str) -> Result<(), ClientError> {
        if query.trim().is_empty() {
            self.state.send_modify(|state| state.search_results.clear());
            return Ok(());
        }

        self.start();
        let result = self
            .call(self.backend.search_users(query, current_user_id))
            .await
            .map(|results| {
                self.state.send_modify(|state| {
                    let filtered = results
                        .into_iter()
                        .filter(|p| p.user_id != current_user_id && !state.knows(&p.user_id))
                        .collect();
                    state.search_results = filtered;
                });
            });
        self.finish(Action::Search, result)
    }

    pub async fn send_request(&self, from_user_id: &str, to_user_id: &str) -> Result<(), ClientError> {
        self.start();
        let result = match self
            .call(self.backend.send_request(from_user_id, to_user_id))
            .await
        {
            Ok(()) => {
                let patched = self.state.send_if_modified(|state| {
                    match take(&mut state.search_results, to_user_id) {
                        Some(profile) => {
                            state.outgoing_requests.push(profile);
                            true
                        }
                        None => false,
                    }
                });
                self.reload_unless(patched, from_user_id).await
            }
            Err(err) => Err(err),
        };
        self.finish(Action::Send, result)
    }

    pub async fn accept_request(&self, user_id: &str, friend_id: &str) -> Result<(), ClientError> {
        self.start();
        let result = self
            .mutate(
                Action::Accept,
                user_id,
                self.backend.accept_request(user_id, friend_id),
                |state| match take(&mut state.incoming_requests, friend_id) {
                    Some(profile) => {
                        state.friends.push(profile);
                        true
                    }
                    None => false,
                },
            )
            .await;
        self.finish(Action::Accept, result)
    }

    pub async fn reject_request(&self, user_id: &str, friend_id: &str) -> Result<(), ClientError> {
        self.start();
        let result = self
            .mutate(
                Action::Reject,
                user_id,
                self.backend.reject_request(user_id, friend_id),
                |state| take(&mut state.incoming_requests, friend_id).is_some(),
            )
            .await;
        self.finish(Action::Reject, result)
    }

    pub async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<(), ClientError> {
        self.start();
        let result = self
            .mutate(
                Action::Remove,
                user_id,
                self.backend.remove_friend(user_id, friend_id),
                |state| take(&mut state.friends, friend_id).is_some(),
            )
            .await;
        self.finish(Action::Remove, result)
    }

    /// Run `op`, then apply `patch` to the state. The patch returns whether
    /// it could apply; if not, the lists of `user_id` are reloaded.
    async fn mutate<F, P>(
        &self,
        action: Action,
        user_id: &str,
        op: F,
        patch: P,
    ) -> Result<(), ClientError>
    where
        F: Future<Output = Result<(), ClientError>>,
        P: FnOnce(&mut FriendsState) -> bool,
    {
        match self.call(op).await {
            Ok(()) => {
                let patched = self.state.send_if_modified(patch);
                self.reload_unless(patched, user_id).await
            }
            Err(err) if action.is_benign(&err) => {
                tracing::debug!(action = action.as_str(), "already resolved: {err}");
                self.load(user_id).await
            }
            Err(err) => Err(err),
        }
    }

    async fn reload_unless(&self, patched: bool, user_id: &str) -> Result<(), ClientError> {
        if patched {
            Ok(())
        } else {
            self.load(user_id).await
        }
    }

    /// Fetch the three lists in parallel and replace them. Last writer wins.
    async fn load(&self, user_id: &str) -> Result<(), ClientError> {
        let (friends, incoming, outgoing) = tokio::try_join!(
            self.call(self.backend.friends(user_id)),
            self.call(self.backend.requests(user_id, Direction::Incoming)),
            self.call(self.backend.requests(user_id, Direction::Outgoing)),
        )?;
        self.state.send_modify(|state| {
            state.friends = friends;
            state.incoming_requests = incoming;
            state.outgoing_requests = outgoing;
        });
        Ok(())
    }

    async fn call<T, F>(&self, future: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        tokio::time::timeout(self.call_timeout, future)
            .await
            .map_err(|_| ClientError::Timeout(self.call_timeout))?
    }

    fn start(&self) {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    /// Clear the loading flag and record the error of a failed action. Lists
    /// are left as they were before the failure.
    fn finish(&self, action: Action, result: Result<(), ClientError>) -> Result<(), ClientError> {
        match &result {
            Ok(()) => self.state.send_modify(|state| state.is_loading = false),
            Err(err) => {
                tracing::warn!(action = action.as_str(), "friends action failed: {err}");
                let message = message_for_error(action, err);
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.error = Some(message);
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(user_id: &str) -> Profile {
        Profile {
            user_id: user_id.to_string(),
            username: format!("user_{user_id}"),
            email: String::new(),
            image_url: String::new(),
            updated_at: 0,
            friends: Vec::new(),
            incoming_requests: Vec::new(),
            outgoing_requests: Vec::new(),
        }
    }

    #[test]
    fn knows_checks_every_list() {
        let state = FriendsState {
            friends: vec![profile("a")],
            incoming_requests: vec![profile("b")],
            outgoing_requests: vec![profile("c")],
            ..FriendsState::default()
        };
        assert!(state.knows("a") && state.knows("b") && state.knows("c"));
        assert!(!state.knows("d"));
    }

    #[test]
    fn take_removes_only_the_match() {
        let mut list = vec![profile("a"), profile("b")];
        assert_eq!(take(&mut list, "b").map(|p| p.user_id), Some("b".to_string()));
        assert_eq!(take(&mut list, "b"), None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn benign_outcomes_depend_on_the_action() {
        let gone = ClientError::Api {
            kind: ErrorKind::RequestNotFound,
            message: String::new(),
        };
        assert!(Action::Accept.is_benign(&gone));
        assert!(Action::Reject.is_benign(&gone));
        assert!(!Action::Remove.is_benign(&gone));
        assert!(!Action::Send.is_benign(&gone));
    }

    #[test]
    fn messages_prefer_the_error_kind() {
        let err = ClientError::Api {
            kind: ErrorKind::ReverseRequestExists,
            message: String::new(),
        };
        assert_eq!(
            message_for_error(Action::Send, &err),
            "This user already sent you a friend request, accept it instead"
        );
        let err = ClientError::Server("boom".to_string());
        assert_eq!(
            message_for_error(Action::Remove, &err),
            "Failed to remove friend"
        );
    }
}

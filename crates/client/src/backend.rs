use std::future::Future;

use api_types::friends::{Direction, Profile};

use crate::ClientError;

/// The service operations the client cache needs.
///
/// `user_id` arguments name the acting user; implementations that
/// authenticate per call use it as the caller identity.
pub trait FriendsBackend: Send + Sync {
    fn search_users(
        &self,
        term: &str,
        exclude_user_id: &str,
    ) -> impl Future<Output = Result<Vec<Profile>, ClientError>> + Send;

    fn send_request(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn accept_request(
        &self,
        user_id: &str,
        friend_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn reject_request(
        &self,
        user_id: &str,
        friend_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn remove_friend(
        &self,
        user_id: &str,
        friend_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn friends(&self, user_id: &str)
    -> impl Future<Output = Result<Vec<Profile>, ClientError>> + Send;

    fn requests(
        &self,
        user_id: &str,
        direction: Direction,
    ) -> impl Future<Output = Result<Vec<Profile>, ClientError>> + Send;
}

use std::sync::Arc;

use api_types::friends::{Direction, Profile};
use engine::{Engine, UserProfile};

use crate::{ClientError, FriendsBackend};

/// Backend calling an engine living in the same process.
#[derive(Clone, Debug)]
pub struct LocalBackend {
    engine: Arc<Engine>,
}

impl LocalBackend {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

fn profile_views(profiles: Vec<UserProfile>) -> Vec<Profile> {
    profiles.into_iter().map(Profile::from).collect()
}

impl FriendsBackend for LocalBackend {
    async fn search_users(
        &self,
        term: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<Profile>, ClientError> {
        let profiles = self.engine.search_users(term, exclude_user_id).await?;
        Ok(profile_views(profiles))
    }

    async fn send_request(&self, from_user_id: &str, to_user_id: &str) -> Result<(), ClientError> {
        Ok(self.engine.send_request(from_user_id, to_user_id).await?)
    }

    async fn accept_request(&self, user_id: &str, friend_id: &str) -> Result<(), ClientError> {
        Ok(self.engine.accept_request(user_id, friend_id).await?)
    }

    async fn reject_request(&self, user_id: &str, friend_id: &str) -> Result<(), ClientError> {
        Ok(self.engine.reject_request(user_id, friend_id).await?)
    }

    async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<(), ClientError> {
        Ok(self.engine.remove_friend(user_id, friend_id).await?)
    }

    async fn friends(&self, user_id: &str) -> Result<Vec<Profile>, ClientError> {
        Ok(profile_views(self.engine.friends(user_id).await?))
    }

    async fn requests(
        &self,
        user_id: &str,
        direction: Direction,
    ) -> Result<Vec<Profile>, ClientError> {
        Ok(profile_views(
            self.engine.requests(user_id, direction.into()).await?,
        ))
    }
}

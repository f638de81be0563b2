use chrono::Utc;
use sea_orm::{Condition, ConnectionTrait, QueryFilter, prelude::*};

use crate::{
    FriendRequest, Friendship, FriendshipStatus, RequestDirection, RequestStatus, ResultEngine,
    UserProfile, friend_requests, friendships, profiles,
};

use super::{
    Engine, normalize_user_id,
    pair::{self, PairSnapshot},
    with_tx,
};

impl Engine {
    /// Send a friend request from `from_user_id` to `to_user_id`.
    pub async fn send_request(&self, from_user_id: &str, to_user_id: &str) -> ResultEngine<()> {
        let from = normalize_user_id(from_user_id, "from_user_id")?;
        let to = normalize_user_id(to_user_id, "to_user_id")?;
        let (from, to) = (from.as_str(), to.as_str());
        self.retrying("send_request", move || self.try_send_request(from, to))
            .await?;
        tracing::info!(from, to, "friend request sent");
        Ok(())
    }

    async fn try_send_request(&self, from: &str, to: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let snapshot = PairSnapshot::read(&db_tx, from, to).await?;
            let writes = snapshot.plan_send(Utc::now())?;
            pair::apply(&db_tx, writes).await
        })
    }

    /// Accept the pending request `friend_id -> user_id`.
    ///
    /// Not idempotent: a second call fails with `RequestNotFound`, which
    /// callers should read as "already accepted".
    pub async fn accept_request(&self, user_id: &str, friend_id: &str) -> ResultEngine<()> {
        let user = normalize_user_id(user_id, "user_id")?;
        let friend = normalize_user_id(friend_id, "friend_id")?;
        let (user, friend) = (user.as_str(), friend.as_str());
        self.retrying("accept_request", move || {
            self.try_accept_request(user, friend)
        })
        .await?;
        tracing::info!(user, friend, "friend request accepted");
        Ok(())
    }

    async fn try_accept_request(&self, user: &str, friend: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let snapshot = PairSnapshot::read(&db_tx, friend, user).await?;
            let writes = snapshot.plan_accept(Utc::now())?;
            pair::apply(&db_tx, writes).await
        })
    }

    /// Decline the pending request `friend_id -> user_id`.
    pub async fn reject_request(&self, user_id: &str, friend_id: &str) -> ResultEngine<()> {
        let user = normalize_user_id(user_id, "user_id")?;
        let friend = normalize_user_id(friend_id, "friend_id")?;
        let (user, friend) = (user.as_str(), friend.as_str());
        self.retrying("reject_request", move || {
            self.try_reject_request(user, friend)
        })
        .await?;
        tracing::info!(user, friend, "friend request rejected");
        Ok(())
    }

    async fn try_reject_request(&self, user: &str, friend: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let snapshot = PairSnapshot::read(&db_tx, friend, user).await?;
            let writes = snapshot.plan_reject(Utc::now())?;
            pair::apply(&db_tx, writes).await
        })
    }

    /// End the friendship between `user_id` and `friend_id`.
    ///
    /// The friendship is kept as a `blocked` tombstone, which makes any later
    /// `send_request` between the two fail with `PairBlocked`.
    pub async fn remove_friend(&self, user_id: &str, friend_id: &str) -> ResultEngine<()> {
        let user = normalize_user_id(user_id, "user_id")?;
        let friend = normalize_user_id(friend_id, "friend_id")?;
        let (user, friend) = (user.as_str(), friend.as_str());
        self.retrying("remove_friend", move || self.try_remove_friend(user, friend))
            .await?;
        tracing::info!(user, friend, "friend removed");
        Ok(())
    }

    async fn try_remove_friend(&self, user: &str, friend: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let snapshot = PairSnapshot::read(&db_tx, user, friend).await?;
            let writes = snapshot.plan_remove(Utc::now())?;
            pair::apply(&db_tx, writes).await
        })
    }

    /// Profiles of the users with an active friendship with `user_id`.
    pub async fn friends(&self, user_id: &str) -> ResultEngine<Vec<UserProfile>> {
        let user = normalize_user_id(user_id, "user_id")?;
        let user = user.as_str();
        self.retrying("friends", move || self.try_friends(user)).await
    }

    async fn try_friends(&self, user: &str) -> ResultEngine<Vec<UserProfile>> {
        let rows = friendships::Entity::find()
            .filter(
                Condition::any()
                    .add(friendships::Column::UserLow.eq(user))
                    .add(friendships::Column::UserHigh.eq(user)),
            )
            .filter(friendships::Column::Status.eq(FriendshipStatus::Active.as_str()))
            .all(&self.database)
            .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let friendship = Friendship::try_from(row)?;
            ids.push(friendship.other(user).to_string());
        }
        profiles_by_id(&self.database, ids).await
    }

    /// Profiles on the other side of the pending requests of `user_id`.
    pub async fn requests(
        &self,
        user_id: &str,
        direction: RequestDirection,
    ) -> ResultEngine<Vec<UserProfile>> {
        let user = normalize_user_id(user_id, "user_id")?;
        let user = user.as_str();
        self.retrying("requests", move || self.try_requests(user, direction))
            .await
    }

    async fn try_requests(
        &self,
        user: &str,
        direction: RequestDirection,
    ) -> ResultEngine<Vec<UserProfile>> {
        let column = match direction {
            RequestDirection::Incoming => friend_requests::Column::ToUserId,
            RequestDirection::Outgoing => friend_requests::Column::FromUserId,
        };
        let rows = friend_requests::Entity::find()
            .filter(column.eq(user))
            .filter(friend_requests::Column::Status.eq(RequestStatus::Pending.as_str()))
            .all(&self.database)
            .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let request = FriendRequest::try_from(row)?;
            ids.push(match direction {
                RequestDirection::Incoming => request.from_user_id,
                RequestDirection::Outgoing => request.to_user_id,
            });
        }
        profiles_by_id(&self.database, ids).await
    }

    /// The request `from_user_id -> to_user_id`, whatever its status.
    pub async fn friend_request(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> ResultEngine<Option<FriendRequest>> {
        let from = normalize_user_id(from_user_id, "from_user_id")?;
        let to = normalize_user_id(to_user_id, "to_user_id")?;
        let (from, to) = (from.as_str(), to.as_str());
        self.retrying("friend_request", move || {
            pair::find_request(&self.database, from, to)
        })
        .await
    }

    /// The friendship record of the pair, tombstones included.
    pub async fn friendship(&self, a: &str, b: &str) -> ResultEngine<Option<Friendship>> {
        let a = normalize_user_id(a, "user_id")?;
        let b = normalize_user_id(b, "friend_id")?;
        let (a, b) = (a.as_str(), b.as_str());
        self.retrying("friendship", move || {
            pair::find_friendship(&self.database, a, b)
        })
        .await
    }
}

/// Load the profiles of `ids`, skipping missing ones, ordered by folded username.
async fn profiles_by_id<C: ConnectionTrait>(
    db: &C,
    ids: Vec<String>,
) -> ResultEngine<Vec<UserProfile>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = profiles::Entity::find()
        .filter(profiles::Column::UserId.is_in(ids))
        .all(db)
        .await?;

    let mut out = rows
        .into_iter()
        .map(UserProfile::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;
    out.sort_by_cached_key(UserProfile::username_folded);
    Ok(out)
}

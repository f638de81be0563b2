//! Read-then-write plumbing shared by every relationship mutation.
//!
//! A mutation on the pair `(from, to)` is three phases:
//!
//! 1. [`PairSnapshot::read`] loads both profiles, both request directions and
//!    the friendship, inside the DB transaction.
//! 2. A `plan_*` method validates the snapshot and returns the [`Write`]s to
//!    perform. Planning is pure, so the state machine is tested without a DB.
//! 3. [`apply`] performs the writes in the same transaction.
//!
//! Nothing is read after the first write.

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseTransaction, prelude::*};

use crate::{
    EngineError, FriendRequest, Friendship, FriendshipStatus, RequestStatus, ResultEngine,
    UserProfile, friend_requests, friendships, pair_key, profiles, request_key,
};

/// A record write decided by a planner.
#[derive(Clone, Debug, PartialEq)]
pub(super) enum Write {
    /// Insert the request, or overwrite it when `replace` is set.
    PutRequest {
        request: FriendRequest,
        replace: bool,
    },
    DeleteRequest(String),
    PutFriendship {
        friendship: Friendship,
        replace: bool,
    },
    /// Overwrite an existing profile.
    PutProfile(UserProfile),
}

/// Everything stored about the relationship between `from` and `to`.
#[derive(Clone, Debug)]
pub(super) struct PairSnapshot {
    pub from: String,
    pub to: String,
    pub from_profile: Option<UserProfile>,
    pub to_profile: Option<UserProfile>,
    /// The request `from -> to`.
    pub forward: Option<FriendRequest>,
    /// The request `to -> from`.
    pub reverse: Option<FriendRequest>,
    pub friendship: Option<Friendship>,
}

pub(super) async fn find_profile<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> ResultEngine<Option<UserProfile>> {
    profiles::Entity::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .map(UserProfile::try_from)
        .transpose()
}

pub(super) async fn find_request<C: ConnectionTrait>(
    db: &C,
    from_user_id: &str,
    to_user_id: &str,
) -> ResultEngine<Option<FriendRequest>> {
    friend_requests::Entity::find_by_id(request_key(from_user_id, to_user_id))
        .one(db)
        .await?
        .map(FriendRequest::try_from)
        .transpose()
}

pub(super) async fn find_friendship<C: ConnectionTrait>(
    db: &C,
    a: &str,
    b: &str,
) -> ResultEngine<Option<Friendship>> {
    friendships::Entity::find_by_id(pair_key(a, b))
        .one(db)
        .await?
        .map(Friendship::try_from)
        .transpose()
}

impl PairSnapshot {
    pub async fn read(db: &DatabaseTransaction, from: &str, to: &str) -> ResultEngine<Self> {
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            from_profile: find_profile(db, from).await?,
            to_profile: find_profile(db, to).await?,
            forward: find_request(db, from, to).await?,
            reverse: find_request(db, to, from).await?,
            friendship: find_friendship(db, from, to).await?,
        })
    }

    fn profiles(&self) -> ResultEngine<(UserProfile, UserProfile)> {
        let from = self
            .from_profile
            .clone()
            .ok_or_else(|| EngineError::UserNotFound(self.from.clone()))?;
        let to = self
            .to_profile
            .clone()
            .ok_or_else(|| EngineError::UserNotFound(self.to.clone()))?;
        Ok((from, to))
    }

    fn pending_forward(&self) -> Option<&FriendRequest> {
        self.forward.as_ref().filter(|request| request.is_pending())
    }

    fn pending_reverse(&self) -> Option<&FriendRequest> {
        self.reverse.as_ref().filter(|request| request.is_pending())
    }

    /// `from` asks `to` to become friends.
    pub fn plan_send(&self, now: DateTime<Utc>) -> ResultEngine<Vec<Write>> {
        if self.from == self.to {
            return Err(EngineError::SelfRequest);
        }
        let (mut from, mut to) = self.profiles()?;

        match self.friendship.as_ref().map(|f| f.status) {
            Some(FriendshipStatus::Active) => return Err(EngineError::AlreadyFriends),
            Some(FriendshipStatus::Blocked) => return Err(EngineError::PairBlocked),
            None => {}
        }
        if self.pending_forward().is_some() {
            return Err(EngineError::DuplicateRequest);
        }
        if self.pending_reverse().is_some() {
            return Err(EngineError::ReverseRequestExists);
        }

        let now_ms = now.timestamp_millis();
        from.outgoing_requests.insert(self.to.clone());
        from.touch(now_ms);
        to.incoming_requests.insert(self.from.clone());
        to.touch(now_ms);

        Ok(vec![
            Write::PutRequest {
                request: FriendRequest::pending(self.from.clone(), self.to.clone(), now),
                replace: self.forward.is_some(),
            },
            Write::PutProfile(from),
            Write::PutProfile(to),
        ])
    }

    /// `to` accepts the pending request `from -> to`.
    pub fn plan_accept(&self, now: DateTime<Utc>) -> ResultEngine<Vec<Write>> {
        let request = self.pending_forward().ok_or(EngineError::RequestNotFound)?;
        let (mut from, mut to) = self.profiles()?;

        let mut writes = vec![
            Write::PutFriendship {
                friendship: Friendship::active(&self.from, &self.to, now),
                replace: self.friendship.is_some(),
            },
            Write::DeleteRequest(request.key()),
        ];
        if let Some(stray) = &self.reverse {
            writes.push(Write::DeleteRequest(stray.key()));
        }

        let now_ms = now.timestamp_millis();
        from.forget(&self.to);
        from.friends.insert(self.to.clone());
        from.touch(now_ms);
        to.forget(&self.from);
        to.friends.insert(self.from.clone());
        to.touch(now_ms);
        writes.push(Write::PutProfile(to));
        writes.push(Write::PutProfile(from));

        Ok(writes)
    }

    /// `to` declines the pending request `from -> to`.
    pub fn plan_reject(&self, now: DateTime<Utc>) -> ResultEngine<Vec<Write>> {
        let request = self.pending_forward().ok_or(EngineError::RequestNotFound)?;
        let (mut from, mut to) = self.profiles()?;

        let mut rejected = request.clone();
        rejected.status = RequestStatus::Rejected;
        rejected.updated_at = now;

        let now_ms = now.timestamp_millis();
        from.outgoing_requests.remove(&self.to);
        from.touch(now_ms);
        to.incoming_requests.remove(&self.from);
        to.touch(now_ms);

        Ok(vec![
            Write::PutRequest {
                request: rejected,
                replace: true,
            },
            Write::PutProfile(to),
            Write::PutProfile(from),
        ])
    }

    /// Either side ends the friendship; the record stays as a tombstone.
    pub fn plan_remove(&self, now: DateTime<Utc>) -> ResultEngine<Vec<Write>> {
        let friendship = self
            .friendship
            .as_ref()
            .filter(|friendship| friendship.is_active())
            .ok_or(EngineError::FriendshipNotFound)?;
        let (mut from, mut to) = self.profiles()?;

        let mut blocked = friendship.clone();
        blocked.status = FriendshipStatus::Blocked;
        blocked.last_interaction_at = now;

        let mut writes = vec![Write::PutFriendship {
            friendship: blocked,
            replace: true,
        }];
        for stray in self.forward.iter().chain(self.reverse.iter()) {
            writes.push(Write::DeleteRequest(stray.key()));
        }

        let now_ms = now.timestamp_millis();
        from.forget(&self.to);
        from.touch(now_ms);
        to.forget(&self.from);
        to.touch(now_ms);
        writes.push(Write::PutProfile(from));
        writes.push(Write::PutProfile(to));

        Ok(writes)
    }
}

/// Perform planned writes, in order, inside `db`.
pub(super) async fn apply(db: &DatabaseTransaction, writes: Vec<Write>) -> ResultEngine<()> {
    for write in writes {
        match write {
            Write::PutRequest { request, replace } => {
                tracing::debug!(key = %request.key(), status = request.status.as_str(), "put friend request");
                let model = friend_requests::ActiveModel::from(&request);
                if replace {
                    model.update(db).await?;
                } else {
                    model.insert(db).await?;
                }
            }
            Write::DeleteRequest(key) => {
                tracing::debug!(%key, "delete friend request");
                friend_requests::Entity::delete_by_id(key).exec(db).await?;
            }
            Write::PutFriendship {
                friendship,
                replace,
            } => {
                tracing::debug!(key = %friendship.key(), status = friendship.status.as_str(), "put friendship");
                let model = friendships::ActiveModel::from(&friendship);
                if replace {
                    model.update(db).await?;
                } else {
                    model.insert(db).await?;
                }
            }
            Write::PutProfile(profile) => {
                profiles::ActiveModel::try_from(&profile)?.update(db).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(user_id: &str) -> UserProfile {
        UserProfile::new(
            user_id.to_string(),
            format!("{user_id}_name"),
            format!("{user_id}@example.com"),
            String::new(),
        )
    }

    fn snapshot(from: &str, to: &str) -> PairSnapshot {
        PairSnapshot {
            from: from.to_string(),
            to: to.to_string(),
            from_profile: Some(profile(from)),
            to_profile: Some(profile(to)),
            forward: None,
            reverse: None,
            friendship: None,
        }
    }

    fn put_profile<'a>(writes: &'a [Write], user_id: &str) -> &'a UserProfile {
        writes
            .iter()
            .find_map(|write| match write {
                Write::PutProfile(profile) if profile.user_id == user_id => Some(profile),
                _ => None,
            })
            .expect("profile write missing")
    }

    #[test]
    fn send_creates_pending_request_and_mirrors_sets() {
        let now = Utc::now();
        let writes = snapshot("u1", "u2").plan_send(now).unwrap();

        assert_eq!(
            writes[0],
            Write::PutRequest {
                request: FriendRequest::pending("u1".to_string(), "u2".to_string(), now),
                replace: false,
            }
        );
        assert!(put_profile(&writes, "u1").outgoing_requests.contains("u2"));
        assert!(put_profile(&writes, "u2").incoming_requests.contains("u1"));
    }

    #[test]
    fn send_checks_users_then_friendship_then_requests() {
        let now = Utc::now();

        let mut snap = snapshot("u1", "u2");
        snap.to_profile = None;
        snap.friendship = Some(Friendship::active("u1", "u2", now));
        assert_eq!(
            snap.plan_send(now),
            Err(EngineError::UserNotFound("u2".to_string()))
        );

        let mut snap = snapshot("u1", "u2");
        snap.friendship = Some(Friendship::active("u1", "u2", now));
        snap.forward = Some(FriendRequest::pending("u1".to_string(), "u2".to_string(), now));
        assert_eq!(snap.plan_send(now), Err(EngineError::AlreadyFriends));

        let mut snap = snapshot("u1", "u2");
        snap.forward = Some(FriendRequest::pending("u1".to_string(), "u2".to_string(), now));
        snap.reverse = Some(FriendRequest::pending("u2".to_string(), "u1".to_string(), now));
        assert_eq!(snap.plan_send(now), Err(EngineError::DuplicateRequest));

        let mut snap = snapshot("u1", "u2");
        snap.reverse = Some(FriendRequest::pending("u2".to_string(), "u1".to_string(), now));
        assert_eq!(snap.plan_send(now), Err(EngineError::ReverseRequestExists));
    }

    #[test]
    fn send_to_self_is_rejected() {
        let snap = snapshot("u1", "u1");
        assert_eq!(snap.plan_send(Utc::now()), Err(EngineError::SelfRequest));
    }

    #[test]
    fn send_to_blocked_pair_is_rejected() {
        let now = Utc::now();
        let mut friendship = Friendship::active("u1", "u2", now);
        friendship.status = FriendshipStatus::Blocked;
        let mut snap = snapshot("u1", "u2");
        snap.friendship = Some(friendship);
        assert_eq!(snap.plan_send(now), Err(EngineError::PairBlocked));
    }

    #[test]
    fn send_after_rejection_overwrites_the_request() {
        let now = Utc::now();
        let mut rejected = FriendRequest::pending("u1".to_string(), "u2".to_string(), now);
        rejected.status = RequestStatus::Rejected;
        let mut snap = snapshot("u1", "u2");
        snap.forward = Some(rejected);

        let writes = snap.plan_send(now).unwrap();
        assert!(matches!(
            &writes[0],
            Write::PutRequest { request, replace: true } if request.is_pending()
        ));
    }

    #[test]
    fn rejected_reverse_request_does_not_block_send() {
        let now = Utc::now();
        let mut rejected = FriendRequest::pending("u2".to_string(), "u1".to_string(), now);
        rejected.status = RequestStatus::Rejected;
        let mut snap = snapshot("u1", "u2");
        snap.reverse = Some(rejected);
        assert!(snap.plan_send(now).is_ok());
    }

    #[test]
    fn accept_promotes_request_into_friendship() {
        let now = Utc::now();
        let mut snap = snapshot("u1", "u2");
        snap.forward = Some(FriendRequest::pending("u1".to_string(), "u2".to_string(), now));
        snap.from_profile
            .as_mut()
            .unwrap()
            .outgoing_requests
            .insert("u2".to_string());
        snap.to_profile
            .as_mut()
            .unwrap()
            .incoming_requests
            .insert("u1".to_string());

        let writes = snap.plan_accept(now).unwrap();
        assert_eq!(
            writes[0],
            Write::PutFriendship {
                friendship: Friendship::active("u1", "u2", now),
                replace: false,
            }
        );
        assert_eq!(writes[1], Write::DeleteRequest("u1_u2".to_string()));

        let u1 = put_profile(&writes, "u1");
        let u2 = put_profile(&writes, "u2");
        assert!(u1.friends.contains("u2") && u2.friends.contains("u1"));
        assert!(u1.outgoing_requests.is_empty() && u2.incoming_requests.is_empty());
    }

    #[test]
    fn accept_without_pending_request_is_not_found() {
        let now = Utc::now();
        assert_eq!(
            snapshot("u1", "u2").plan_accept(now),
            Err(EngineError::RequestNotFound)
        );

        let mut rejected = FriendRequest::pending("u1".to_string(), "u2".to_string(), now);
        rejected.status = RequestStatus::Rejected;
        let mut snap = snapshot("u1", "u2");
        snap.forward = Some(rejected);
        assert_eq!(snap.plan_accept(now), Err(EngineError::RequestNotFound));
    }

    #[test]
    fn reject_marks_request_and_clears_sets() {
        let now = Utc::now();
        let mut snap = snapshot("u1", "u2");
        snap.forward = Some(FriendRequest::pending("u1".to_string(), "u2".to_string(), now));
        snap.to_profile
            .as_mut()
            .unwrap()
            .incoming_requests
            .insert("u1".to_string());

        let writes = snap.plan_reject(now).unwrap();
        assert!(matches!(
            &writes[0],
            Write::PutRequest { request, replace: true } if request.status == RequestStatus::Rejected
        ));
        assert!(put_profile(&writes, "u2").incoming_requests.is_empty());
    }

    #[test]
    fn remove_tombstones_friendship_and_cleans_strays() {
        let now = Utc::now();
        let mut snap = snapshot("u2", "u1");
        snap.friendship = Some(Friendship::active("u1", "u2", now));
        snap.reverse = Some(FriendRequest::pending("u1".to_string(), "u2".to_string(), now));
        for profile in [snap.from_profile.as_mut(), snap.to_profile.as_mut()]
            .into_iter()
            .flatten()
        {
            let other = if profile.user_id == "u1" { "u2" } else { "u1" };
            profile.friends.insert(other.to_string());
        }

        let writes = snap.plan_remove(now).unwrap();
        assert!(matches!(
            &writes[0],
            Write::PutFriendship { friendship, replace: true }
                if friendship.status == FriendshipStatus::Blocked && friendship.key() == "u1_u2"
        ));
        assert!(writes.contains(&Write::DeleteRequest("u1_u2".to_string())));
        assert!(put_profile(&writes, "u1").friends.is_empty());
        assert!(put_profile(&writes, "u2").friends.is_empty());
    }

    #[test]
    fn remove_requires_active_friendship() {
        let now = Utc::now();
        assert_eq!(
            snapshot("u1", "u2").plan_remove(now),
            Err(EngineError::FriendshipNotFound)
        );

        let mut friendship = Friendship::active("u1", "u2", now);
        friendship.status = FriendshipStatus::Blocked;
        let mut snap = snapshot("u1", "u2");
        snap.friendship = Some(friendship);
        assert_eq!(snap.plan_remove(now), Err(EngineError::FriendshipNotFound));
    }
}

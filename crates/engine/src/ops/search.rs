use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{ResultEngine, UserProfile, fold, profiles};

use super::{Engine, normalize_user_id};

/// Sorts after every character a username can contain, so
/// `[term, term + SENTINEL)` covers every username starting with `term`.
const PREFIX_SENTINEL: char = '\u{f8ff}';

impl Engine {
    /// Users whose folded username starts with the folded `term`.
    ///
    /// A blank term returns no results. `exclude_user_id` (usually the caller)
    /// is trimmed like every other id and filtered out by the query itself, so
    /// a full page is returned when enough users match.
    pub async fn search_users(
        &self,
        term: &str,
        exclude_user_id: &str,
    ) -> ResultEngine<Vec<UserProfile>> {
        let term = fold(term);
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let exclude = normalize_user_id(exclude_user_id, "exclude_user_id")?;
        let (term, exclude) = (term.as_str(), exclude.as_str());
        let profiles = self
            .retrying("search_users", move || {
                self.try_search_users(term, exclude)
            })
            .await?;
        tracing::debug!(term, found = profiles.len(), "user search");
        Ok(profiles)
    }

    async fn try_search_users(
        &self,
        term: &str,
        exclude_user_id: &str,
    ) -> ResultEngine<Vec<UserProfile>> {
        let upper = format!("{term}{PREFIX_SENTINEL}");
        profiles::Entity::find()
            .filter(profiles::Column::UsernameFolded.gte(term))
            .filter(profiles::Column::UsernameFolded.lt(upper))
            .filter(profiles::Column::UserId.ne(exclude_user_id))
            .order_by_asc(profiles::Column::UsernameFolded)
            .limit(self.search_page_size)
            .all(&self.database)
            .await?
            .into_iter()
            .map(UserProfile::try_from)
            .collect()
    }
}

use std::sync::Arc;

use crate::core::selector::pick_candidate;
use crate::error::MatchError;
use crate::models::{NewUser, ProfileUpdate, Rating, RatingOutcome, User, UserId};
use crate::services::RatingStore;

/// Matching core: candidate selection, rating capture and match derivation.
///
/// Every operation takes the acting user's id explicitly; the engine holds no
/// per-request state and is shared across handlers behind an `Arc`.
#[derive(Clone)]
pub struct MatchEngine {
    store: Arc<dyn RatingStore>,
}

impl MatchEngine {
    pub fn new(store: Arc<dyn RatingStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RatingStore> {
        &self.store
    }

    /// Pick the next user to show `viewer_id`, uniformly among those it has
    /// not rated yet. `Ok(None)` means the viewer has seen everyone.
    pub async fn select_candidate(&self, viewer_id: UserId) -> Result<Option<User>, MatchError> {
        self.require_user(viewer_id).await?;

        let candidates = self.store.unrated_users(viewer_id).await?;
        let pool = candidates.len();
        let picked = pick_candidate(candidates, &mut rand::thread_rng());

        tracing::debug!(
            "Selected candidate {:?} for viewer {} from {} unrated users",
            picked.as_ref().map(|u| u.id),
            viewer_id,
            pool
        );

        Ok(picked)
    }

    /// Record a like or dislike. The first rating of an ordered pair is final;
    /// later calls report `AlreadyRated` and leave the edge untouched.
    pub async fn record_rating(
        &self,
        from_user_id: UserId,
        to_user_id: UserId,
        liked: bool,
    ) -> Result<RatingOutcome, MatchError> {
        if from_user_id == to_user_id {
            return Err(MatchError::Validation(format!(
                "user {} cannot rate themselves",
                from_user_id
            )));
        }

        self.require_user(from_user_id).await?;
        self.require_user(to_user_id).await?;

        let inserted = self
            .store
            .insert_rating_if_absent(Rating::new(from_user_id, to_user_id, liked))
            .await?;

        if inserted {
            tracing::info!(
                "Recorded rating {} -> {} (liked: {})",
                from_user_id,
                to_user_id,
                liked
            );
            Ok(RatingOutcome::Recorded)
        } else {
            tracing::debug!(
                "Rating {} -> {} already exists, ignoring",
                from_user_id,
                to_user_id
            );
            Ok(RatingOutcome::AlreadyRated)
        }
    }

    /// Users that `user_id` liked and who liked `user_id` back, by ascending id
    pub async fn get_matches(&self, user_id: UserId) -> Result<Vec<User>, MatchError> {
        self.require_user(user_id).await?;
        let matches = self.store.mutual_likes(user_id).await?;
        tracing::debug!("User {} has {} matches", user_id, matches.len());
        Ok(matches)
    }

    pub async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, MatchError> {
        Ok(self.store.get_user(id).await?)
    }

    pub async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, MatchError> {
        Ok(self.store.find_user_by_name(name).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, MatchError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn create_user(&self, user: NewUser) -> Result<User, MatchError> {
        validate_profile(&user.name, user.age, &user.bio)?;
        if user.password_hash.is_empty() {
            return Err(MatchError::Validation("password hash is required".into()));
        }

        let created = self.store.insert_user(user).await?;
        tracing::info!("Created user {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn update_user(&self, id: UserId, update: ProfileUpdate) -> Result<User, MatchError> {
        validate_profile(&update.name, update.age, &update.bio)?;

        let updated = self
            .store
            .update_user(id, update)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("user {}", id)))?;

        tracing::info!("Updated profile of user {}", id);
        Ok(updated)
    }

    /// Delete the user together with every rating edge it appears in
    pub async fn delete_user(&self, id: UserId) -> Result<(), MatchError> {
        if !self.store.delete_user_cascade(id).await? {
            return Err(MatchError::NotFound(format!("user {}", id)));
        }
        tracing::info!("Deleted user {} and its ratings", id);
        Ok(())
    }

    async fn require_user(&self, id: UserId) -> Result<User, MatchError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("user {}", id)))
    }
}

fn validate_profile(name: &str, age: i32, bio: &str) -> Result<(), MatchError> {
    if name.trim().is_empty() {
        return Err(MatchError::Validation("name is required".into()));
    }
    if age <= 0 {
        return Err(MatchError::Validation("age must be positive".into()));
    }
    if bio.trim().is_empty() {
        return Err(MatchError::Validation("bio is required".into()));
    }
    Ok(())
}

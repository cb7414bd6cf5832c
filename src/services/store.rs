use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewUser, ProfileUpdate, Rating, User, UserId};

/// Errors raised by rating store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Referenced user does not exist: {0}")]
    MissingUser(UserId),
}

/// Persistence port for users and their rating edges.
///
/// Implementations must make `insert_rating_if_absent` single-winner under
/// concurrent calls for the same ordered pair, and `delete_user_cascade`
/// all-or-nothing.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Insert a user. Fails with `Conflict` when the name is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError>;

    /// All users ordered by id
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Apply a profile update. Returns `None` when the user does not exist.
    async fn update_user(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;

    /// Remove the user and every edge it takes part in, atomically.
    /// Returns `false` when the user does not exist.
    async fn delete_user_cascade(&self, id: UserId) -> Result<bool, StoreError>;

    /// Insert the edge unless one already exists for `(from, to)`.
    /// Returns `true` when this call created the edge. Fails with
    /// `MissingUser` when either endpoint is gone at insert time.
    async fn insert_rating_if_absent(&self, rating: Rating) -> Result<bool, StoreError>;

    async fn get_rating(
        &self,
        from_user_id: UserId,
        to_user_id: UserId,
    ) -> Result<Option<Rating>, StoreError>;

    /// Users other than the viewer with no edge from the viewer, ordered by id
    async fn unrated_users(&self, viewer_id: UserId) -> Result<Vec<User>, StoreError>;

    /// Users with a mutual like edge to `user_id`, ordered by id
    async fn mutual_likes(&self, user_id: UserId) -> Result<Vec<User>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::models::{NewUser, ProfileUpdate, Rating, User, UserId};
use crate::services::store::{RatingStore, StoreError};

const USER_COLUMNS: &str = "u.id, u.name, u.age, u.bio, u.image_url, u.password_hash";

/// PostgreSQL-backed rating store
///
/// Uniqueness of `(from_user_id, to_user_id)` is enforced by the `ratings`
/// primary key, so concurrent duplicate ratings resolve inside the database.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Connect using optional settings, falling back to pool defaults
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        age: row.try_get("age")?,
        bio: row.try_get("bio")?,
        image_url: row.try_get("image_url")?,
        password_hash: row.try_get("password_hash")?,
    })
}

fn users_from_rows(rows: &[PgRow]) -> Result<Vec<User>, StoreError> {
    rows.iter()
        .map(|row| user_from_row(row).map_err(StoreError::from))
        .collect()
}

/// Map unique violations on `users.name` to `Conflict`
fn name_conflict(err: sqlx::Error, name: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(format!("name '{}' is taken", name))
        }
        _ => StoreError::SqlxError(err),
    }
}

/// Map a foreign key violation on `ratings` to the endpoint that vanished.
/// The user may have been deleted after the caller checked it.
fn missing_endpoint(err: sqlx::Error, rating: &Rating) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            let missing = match db_err.constraint() {
                Some(c) if c.contains("from_user") => rating.from_user_id,
                _ => rating.to_user_id,
            };
            StoreError::MissingUser(missing)
        }
        _ => StoreError::SqlxError(err),
    }
}

#[async_trait]
impl RatingStore for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let query = r#"
            INSERT INTO users AS u (name, age, bio, image_url, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING u.id, u.name, u.age, u.bio, u.image_url, u.password_hash
        "#;

        let row = sqlx::query(query)
            .bind(&user.name)
            .bind(user.age)
            .bind(&user.bio)
            .bind(&user.image_url)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| name_conflict(e, &user.name))?;

        Ok(user_from_row(&row)?)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users u WHERE u.id = $1", USER_COLUMNS);

        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users u WHERE u.name = $1", USER_COLUMNS);

        let row = sqlx::query(&query).bind(name).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let query = format!("SELECT {} FROM users u ORDER BY u.id", USER_COLUMNS);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        users_from_rows(&rows)
    }

    async fn update_user(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let query = r#"
            UPDATE users AS u
            SET name = $2,
                age = $3,
                bio = $4,
                image_url = COALESCE($5, u.image_url)
            WHERE u.id = $1
            RETURNING u.id, u.name, u.age, u.bio, u.image_url, u.password_hash
        "#;

        let row = sqlx::query(query)
            .bind(id)
            .bind(&update.name)
            .bind(update.age)
            .bind(&update.bio)
            .bind(&update.image_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| name_conflict(e, &update.name))?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn delete_user_cascade(&self, id: UserId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let ratings = sqlx::query("DELETE FROM ratings WHERE from_user_id = $1 OR to_user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let users = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if users.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;

        tracing::debug!(
            "Deleted user {} with {} rating edges",
            id,
            ratings.rows_affected()
        );

        Ok(true)
    }

    async fn insert_rating_if_absent(&self, rating: Rating) -> Result<bool, StoreError> {
        if rating.from_user_id == rating.to_user_id {
            return Err(StoreError::InvalidInput("self-rating".into()));
        }

        let query = r#"
            INSERT INTO ratings (from_user_id, to_user_id, liked, rated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (from_user_id, to_user_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(rating.from_user_id)
            .bind(rating.to_user_id)
            .bind(rating.liked)
            .bind(rating.rated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| missing_endpoint(e, &rating))?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_rating(
        &self,
        from_user_id: UserId,
        to_user_id: UserId,
    ) -> Result<Option<Rating>, StoreError> {
        let query = r#"
            SELECT from_user_id, to_user_id, liked, rated_at
            FROM ratings
            WHERE from_user_id = $1 AND to_user_id = $2
        "#;

        let row = sqlx::query(query)
            .bind(from_user_id)
            .bind(to_user_id)
            .fetch_optional(&self.pool)
            .await?;

        let rating = row
            .map(|row| -> Result<Rating, sqlx::Error> {
                Ok(Rating {
                    from_user_id: row.try_get("from_user_id")?,
                    to_user_id: row.try_get("to_user_id")?,
                    liked: row.try_get("liked")?,
                    rated_at: row.try_get("rated_at")?,
                })
            })
            .transpose()?;

        Ok(rating)
    }

    async fn unrated_users(&self, viewer_id: UserId) -> Result<Vec<User>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM users u
            WHERE u.id <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM ratings r
                  WHERE r.from_user_id = $1 AND r.to_user_id = u.id
              )
            ORDER BY u.id
            "#,
            USER_COLUMNS
        );

        let rows = sqlx::query(&query).bind(viewer_id).fetch_all(&self.pool).await?;
        users_from_rows(&rows)
    }

    async fn mutual_likes(&self, user_id: UserId) -> Result<Vec<User>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM users u
            INNER JOIN ratings mine ON mine.to_user_id = u.id
            WHERE mine.from_user_id = $1
              AND mine.liked
              AND EXISTS (
                  SELECT 1 FROM ratings theirs
                  WHERE theirs.from_user_id = u.id
                    AND theirs.to_user_id = $1
                    AND theirs.liked
              )
            ORDER BY u.id
            "#,
            USER_COLUMNS
        );

        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;
        users_from_rows(&rows)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

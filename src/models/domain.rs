use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Store-assigned user identifier
pub type UserId = i64;

/// Stored user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub age: i32,
    pub bio: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "passwordHash", skip_serializing)]
    pub password_hash: String,
}

impl User {
    /// Projection safe to hand to clients
    pub fn public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// User as seen by clients and live channels (no credentials)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: UserId,
    pub name: String,
    pub age: i32,
    pub bio: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            age: user.age,
            bio: user.bio.clone(),
            image_url: user.image_url.clone(),
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            age: user.age,
            bio: user.bio,
            image_url: user.image_url,
        }
    }
}

/// Fields required to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub age: i32,
    pub bio: String,
    pub image_url: String,
    pub password_hash: String,
}

/// Profile edit. `image_url: None` keeps the stored image.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub age: i32,
    pub bio: String,
    pub image_url: Option<String>,
}

/// Directed like/dislike edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(rename = "fromUserId")]
    pub from_user_id: UserId,
    #[serde(rename = "toUserId")]
    pub to_user_id: UserId,
    pub liked: bool,
    #[serde(rename = "ratedAt")]
    pub rated_at: chrono::DateTime<chrono::Utc>,
}

impl Rating {
    pub fn new(from_user_id: UserId, to_user_id: UserId, liked: bool) -> Self {
        Self {
            from_user_id,
            to_user_id,
            liked,
            rated_at: chrono::Utc::now(),
        }
    }
}

/// Result of a rating attempt. The first rating of a pair is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RatingOutcome {
    Recorded,
    AlreadyRated,
}

impl RatingOutcome {
    pub fn is_recorded(self) -> bool {
        matches!(self, RatingOutcome::Recorded)
    }
}

/// State pushed over live channels.
///
/// Both shapes carry `"type": "users-update"`; they differ by payload key:
/// `users` for the full roster, `user` for a single edited profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveUpdate {
    Roster(Vec<PublicUser>),
    Profile(PublicUser),
}

impl LiveUpdate {
    pub const TYPE: &'static str = "users-update";
}

impl Serialize for LiveUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", Self::TYPE)?;
        match self {
            LiveUpdate::Roster(users) => map.serialize_entry("users", users)?,
            LiveUpdate::Profile(user) => map.serialize_entry("user", user)?,
        }
        map.end()
    }
}

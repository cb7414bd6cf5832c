use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::selector::filter_unrated;
use crate::models::{NewUser, ProfileUpdate, Rating, User, UserId};
use crate::services::store::{RatingStore, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: UserId,
    users: BTreeMap<UserId, User>,
    ratings: HashMap<(UserId, UserId), Rating>,
}

impl MemoryState {
    fn name_taken(&self, name: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.name == name && Some(u.id) != except)
    }

    fn liked(&self, from: UserId, to: UserId) -> bool {
        self.ratings.get(&(from, to)).is_some_and(|r| r.liked)
    }
}

/// In-process rating store.
///
/// All state sits behind one `RwLock`, so each operation is a single
/// transactional unit. Used by tests and when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rating edges
    pub async fn rating_count(&self) -> usize {
        self.state.read().await.ratings.len()
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.name_taken(&user.name, None) {
            return Err(StoreError::Conflict(format!("name '{}' is taken", user.name)));
        }

        state.next_id += 1;
        let created = User {
            id: state.next_id,
            name: user.name,
            age: user.age,
            bio: user.bio,
            image_url: user.image_url,
            password_hash: user.password_hash,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.name == name).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn update_user(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        if state.name_taken(&update.name, Some(id)) {
            return Err(StoreError::Conflict(format!("name '{}' is taken", update.name)));
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        user.name = update.name;
        user.age = update.age;
        user.bio = update.bio;
        if let Some(image_url) = update.image_url {
            user.image_url = image_url;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user_cascade(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state
            .ratings
            .retain(|&(from, to), _| from != id && to != id);
        Ok(true)
    }

    async fn insert_rating_if_absent(&self, rating: Rating) -> Result<bool, StoreError> {
        if rating.from_user_id == rating.to_user_id {
            return Err(StoreError::InvalidInput("self-rating".into()));
        }

        let mut state = self.state.write().await;
        for id in [rating.from_user_id, rating.to_user_id] {
            if !state.users.contains_key(&id) {
                return Err(StoreError::MissingUser(id));
            }
        }

        let key = (rating.from_user_id, rating.to_user_id);
        if state.ratings.contains_key(&key) {
            return Ok(false);
        }
        state.ratings.insert(key, rating);
        Ok(true)
    }

    async fn get_rating(
        &self,
        from_user_id: UserId,
        to_user_id: UserId,
    ) -> Result<Option<Rating>, StoreError> {
        let state = self.state.read().await;
        Ok(state.ratings.get(&(from_user_id, to_user_id)).cloned())
    }

    async fn unrated_users(&self, viewer_id: UserId) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        let rated: HashSet<UserId> = state
            .ratings
            .keys()
            .filter(|(from, _)| *from == viewer_id)
            .map(|&(_, to)| to)
            .collect();

        Ok(filter_unrated(viewer_id, state.users.values().cloned(), &rated))
    }

    async fn mutual_likes(&self, user_id: UserId) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|other| state.liked(user_id, other.id) && state.liked(other.id, user_id))
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

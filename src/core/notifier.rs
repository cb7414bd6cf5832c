use std::sync::Arc;

use crate::core::engine::MatchEngine;
use crate::models::{LiveUpdate, PublicUser, UserId};
use crate::services::{BroadcastReport, ConnectionRegistry};

/// Post-commit fan-out of state changes to every live connection.
///
/// Runs after the mutation it reports on has committed. Read or send
/// failures are logged and swallowed so they never fail the mutation.
#[derive(Clone)]
pub struct Notifier {
    engine: Arc<MatchEngine>,
    registry: Arc<ConnectionRegistry>,
}

impl Notifier {
    pub fn new(engine: Arc<MatchEngine>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { engine, registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Push the full roster after a rating or deletion
    pub async fn roster_changed(&self) -> BroadcastReport {
        let users = match self.engine.list_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!("Skipping roster broadcast, failed to list users: {}", e);
                return BroadcastReport::default();
            }
        };

        let roster: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();
        self.registry.broadcast(&LiveUpdate::Roster(roster)).await
    }

    /// Push a single profile after it was edited
    pub async fn profile_changed(&self, user_id: UserId) -> BroadcastReport {
        let user = match self.engine.get_user_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!("Skipping profile broadcast, user {} no longer exists", user_id);
                return BroadcastReport::default();
            }
            Err(e) => {
                tracing::warn!("Skipping profile broadcast for user {}: {}", user_id, e);
                return BroadcastReport::default();
            }
        };

        self.registry.broadcast(&LiveUpdate::Profile(user.public())).await
    }
}

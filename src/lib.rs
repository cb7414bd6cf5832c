//! Swipe Match - matchmaking service with live roster updates
//!
//! Users rate each other with likes and dislikes; mutual likes are matches.
//! Every state change is pushed to all connected clients over a websocket.
//!
//! The crate is split into:
//! - [`core`]: candidate selection, rating capture, match derivation and fan-out
//! - [`services`]: rating stores, the live connection registry, the upload client
//! - [`routes`]: the actix-web HTTP and websocket surface

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{MatchEngine, Notifier};
pub use error::MatchError;
pub use models::{User, UserId, PublicUser, NewUser, ProfileUpdate, Rating, RatingOutcome, LiveUpdate};
pub use services::{ConnectionRegistry, MemoryStore, PostgresStore, RatingStore};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_library_exports() {
        let engine = MatchEngine::new(Arc::new(MemoryStore::new()));
        assert!(engine.list_users().await.unwrap().is_empty());
    }
}

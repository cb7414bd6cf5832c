// Library-level tests for Swipe Match

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use swipe_match::core::{MatchEngine, Notifier};
use swipe_match::models::{NewUser, UserId};
use swipe_match::services::{ConnectionRegistry, ConnectionState, MemoryStore, RatingStore};

fn new_user(name: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        age: 24,
        bio: format!("{} bio", name),
        image_url: String::new(),
        password_hash: "hash".to_string(),
    }
}

async fn engine_with(count: usize) -> (MatchEngine, Vec<UserId>) {
    let engine = MatchEngine::new(Arc::new(MemoryStore::new()));
    let mut ids = Vec::new();
    for i in 0..count {
        ids.push(engine.create_user(new_user(&format!("user-{}", i))).await.unwrap().id);
    }
    (engine, ids)
}

#[tokio::test]
async fn test_select_candidate_not_biased_toward_insertion_order() {
    let (engine, ids) = engine_with(4).await;
    let viewer = ids[0];
    let trials = 6_000;
    let mut counts: HashMap<UserId, usize> = HashMap::new();

    for _ in 0..trials {
        let picked = engine.select_candidate(viewer).await.unwrap().unwrap();
        *counts.entry(picked.id).or_default() += 1;
    }

    assert_eq!(counts.len(), 3);
    let expected = trials / 3;
    for (id, count) in counts {
        let deviation = (count as f64 - expected as f64).abs() / expected as f64;
        assert!(deviation < 0.1, "user {} picked {} times, expected ~{}", id, count, expected);
    }
}

#[tokio::test]
async fn test_selector_never_returns_rated_or_self() {
    let (engine, ids) = engine_with(6).await;
    let viewer = ids[2];
    let rated: HashSet<UserId> = [ids[0], ids[4]].into_iter().collect();
    for &target in &rated {
        engine.record_rating(viewer, target, true).await.unwrap();
    }

    for _ in 0..200 {
        let picked = engine.select_candidate(viewer).await.unwrap().unwrap();
        assert_ne!(picked.id, viewer);
        assert!(!rated.contains(&picked.id));
    }
}

#[tokio::test]
async fn test_concurrent_opposite_ratings_keep_one_edge() {
    let store = Arc::new(MemoryStore::new());
    let engine = MatchEngine::new(store.clone());
    let a = engine.create_user(new_user("a")).await.unwrap().id;
    let b = engine.create_user(new_user("b")).await.unwrap().id;

    let like = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.record_rating(a, b, true).await })
    };
    let dislike = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.record_rating(a, b, false).await })
    };

    let outcomes = [like.await.unwrap().unwrap(), dislike.await.unwrap().unwrap()];
    assert_eq!(outcomes.iter().filter(|o| o.is_recorded()).count(), 1);
    assert_eq!(store.rating_count().await, 1);

    // Whatever won stays put.
    let winner = store.get_rating(a, b).await.unwrap().unwrap().liked;
    engine.record_rating(a, b, !winner).await.unwrap();
    assert_eq!(store.get_rating(a, b).await.unwrap().unwrap().liked, winner);
}

#[tokio::test]
async fn test_broadcast_with_membership_churn() {
    let registry = Arc::new(ConnectionRegistry::new(Duration::from_millis(100), 64));
    let mut stable = Vec::new();
    for _ in 0..8 {
        stable.push(registry.open().await);
    }

    let churn = {
        let registry = registry.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                let (id, _rx) = registry.open().await;
                registry.unregister(id).await;
            }
        })
    };

    for n in 0..20 {
        let report = registry.broadcast(&serde_json::json!({ "n": n })).await;
        assert!(report.delivered >= stable.len());
    }
    churn.await.unwrap();

    for (id, rx) in stable.iter_mut() {
        assert_eq!(registry.state(*id).await, ConnectionState::Open);
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 20);
    }
}

#[tokio::test]
async fn test_notifier_drops_dead_connections_and_keeps_going() {
    let engine = Arc::new(MatchEngine::new(Arc::new(MemoryStore::new())));
    let registry = Arc::new(ConnectionRegistry::new(Duration::from_millis(50), 8));
    let notifier = Notifier::new(engine.clone(), registry.clone());
    engine.create_user(new_user("a")).await.unwrap();

    let mut alive = Vec::new();
    for _ in 0..3 {
        alive.push(registry.open().await.1);
    }
    let (dead, dead_rx) = registry.open().await;
    drop(dead_rx);

    let report = notifier.roster_changed().await;

    assert_eq!(report.delivered, 3);
    assert_eq!(report.dropped, 1);
    assert_eq!(registry.state(dead).await, ConnectionState::Closed);
    for rx in alive.iter_mut() {
        let json: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(json["users"][0]["name"], "a");
    }
}

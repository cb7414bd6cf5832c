// Core matching exports
pub mod engine;
pub mod notifier;
pub mod selector;

pub use engine::MatchEngine;
pub use notifier::Notifier;
pub use selector::{filter_unrated, pick_candidate};

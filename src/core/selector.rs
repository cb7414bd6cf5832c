use std::collections::HashSet;

use rand::Rng;

use crate::models::{User, UserId};

/// Keep the users `viewer_id` may still be shown: everyone except the viewer
/// and the targets of the viewer's existing edges.
#[inline]
pub fn filter_unrated<I>(viewer_id: UserId, users: I, rated: &HashSet<UserId>) -> Vec<User>
where
    I: IntoIterator<Item = User>,
{
    users
        .into_iter()
        .filter(|user| user.id != viewer_id && !rated.contains(&user.id))
        .collect()
}

/// Pick one candidate uniformly at random, or `None` when the set is empty.
///
/// The whole candidate set is materialized by the caller; every element has
/// probability `1 / len` regardless of position.
#[inline]
pub fn pick_candidate<R>(mut candidates: Vec<User>, rng: &mut R) -> Option<User>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..candidates.len());
    Some(candidates.swap_remove(index))
}

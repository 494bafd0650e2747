//! Display orderings shared by every backend.

use std::cmp::Ordering;

use crate::models::{Message, Project, Thread};

/// Name ascending by bytes (case-sensitive), then id
pub fn project_order(a: &Project, b: &Project) -> Ordering {
    a.name
        .as_bytes()
        .cmp(b.name.as_bytes())
        .then_with(|| a.id.cmp(&b.id))
}

/// Most recent activity first. Threads without messages sort after every
/// thread that has one; ties fall back to newest `created_at`, then id.
pub fn thread_order(a: &Thread, b: &Thread) -> Ordering {
    let by_activity = match (a.last_message_at, b.last_message_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_activity
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Chronological replay order, id breaks equal timestamps
pub fn message_order(a: &Message, b: &Message) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

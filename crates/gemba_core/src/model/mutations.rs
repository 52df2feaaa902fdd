//! Pure mutation operations over [`DashboardDocument`].
//!
//! # Responsibility
//! - Produce a new document value for every add/delete/edit/reorder intent.
//! - Generate fresh opaque ids for created topics and updates.
//!
//! # Invariants
//! - Inputs are never mutated; callers compare old and new values.
//! - Targets that cannot be found leave the returned document equal to the input.
//! - Input validation (blank titles etc.) happens before these functions.

use crate::model::document::{CategoryId, DashboardDocument, Topic, TopicId, Update, UpdateId};
use uuid::Uuid;

/// Returns a new opaque id (32 lowercase hex chars).
pub fn fresh_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Appends a new empty topic to the end of `category`.
pub fn add_topic(
    doc: &DashboardDocument,
    category: CategoryId,
    title: &str,
) -> (DashboardDocument, TopicId) {
    let id = fresh_id();
    (add_topic_with_id(doc, category, id.clone(), title), id)
}

/// Same as [`add_topic`] with a caller-provided id.
pub fn add_topic_with_id(
    doc: &DashboardDocument,
    category: CategoryId,
    topic_id: impl Into<TopicId>,
    title: &str,
) -> DashboardDocument {
    let mut next = doc.clone();
    next.category_mut(category).topics.push(Topic::new(topic_id, title));
    next
}

/// Removes the topic with `topic_id` from `category`.
pub fn delete_topic(
    doc: &DashboardDocument,
    category: CategoryId,
    topic_id: &str,
) -> DashboardDocument {
    let mut next = doc.clone();
    next.category_mut(category)
        .topics
        .retain(|topic| topic.id != topic_id);
    next
}

/// Prepends a new update to the target topic.
///
/// Returns `None` for the id when the topic does not exist.
pub fn add_update(
    doc: &DashboardDocument,
    category: CategoryId,
    topic_id: &str,
    title: &str,
    text: &str,
) -> (DashboardDocument, Option<UpdateId>) {
    if doc.find_topic(category, topic_id).is_none() {
        return (doc.clone(), None);
    }
    let id = fresh_id();
    let next = add_update_with_id(doc, category, topic_id, id.clone(), title, text);
    (next, Some(id))
}

/// Same as [`add_update`] with a caller-provided id.
pub fn add_update_with_id(
    doc: &DashboardDocument,
    category: CategoryId,
    topic_id: &str,
    update_id: impl Into<UpdateId>,
    title: &str,
    text: &str,
) -> DashboardDocument {
    let update = Update {
        id: update_id.into(),
        title: title.to_string(),
        text: text.to_string(),
    };
    map_topic(doc, category, topic_id, move |topic| {
        topic.updates.insert(0, update);
    })
}

/// Replaces title and text of one update, keeping its id and position.
pub fn edit_update(
    doc: &DashboardDocument,
    category: CategoryId,
    topic_id: &str,
    update_id: &str,
    title: &str,
    text: &str,
) -> DashboardDocument {
    map_topic(doc, category, topic_id, |topic| {
        if let Some(update) = topic.updates.iter_mut().find(|u| u.id == update_id) {
            update.title = title.to_string();
            update.text = text.to_string();
        }
    })
}

/// Removes one update, keeping the relative order of the rest.
pub fn delete_update(
    doc: &DashboardDocument,
    category: CategoryId,
    topic_id: &str,
    update_id: &str,
) -> DashboardDocument {
    map_topic(doc, category, topic_id, |topic| {
        topic.updates.retain(|update| update.id != update_id);
    })
}

/// Replaces the topic's update sequence with `new_order` as given.
///
/// The sequence is trusted: no permutation check is made here.
pub fn reorder_updates(
    doc: &DashboardDocument,
    category: CategoryId,
    topic_id: &str,
    new_order: Vec<Update>,
) -> DashboardDocument {
    map_topic(doc, category, topic_id, move |topic| {
        topic.updates = new_order;
    })
}

/// Moves the update at `from` to index `to`, shifting the items in between.
///
/// Returns `None` when an index is out of range or `from == to`.
pub fn moved_order(updates: &[Update], from: usize, to: usize) -> Option<Vec<Update>> {
    if from == to || from >= updates.len() || to >= updates.len() {
        return None;
    }
    let mut order = updates.to_vec();
    let moved = order.remove(from);
    order.insert(to, moved);
    Some(order)
}

fn map_topic<F>(
    doc: &DashboardDocument,
    category: CategoryId,
    topic_id: &str,
    apply: F,
) -> DashboardDocument
where
    F: FnOnce(&mut Topic),
{
    let mut next = doc.clone();
    if let Some(topic) = next
        .category_mut(category)
        .topics
        .iter_mut()
        .find(|topic| topic.id == topic_id)
    {
        apply(topic);
    }
    next
}

//! Dashboard document aggregate.
//!
//! # Responsibility
//! - Define the category -> topic -> update tree persisted and synced as one unit.
//! - Validate structural invariants that the type system cannot express.
//!
//! # Invariants
//! - The document always carries exactly the `rtb` and `projects` categories.
//! - Sequence order is meaningful and never re-sorted implicitly.
//! - Topic ids are unique across the document, update ids within their topic.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque client-generated topic identifier.
pub type TopicId = String;

/// Opaque client-generated update identifier.
pub type UpdateId = String;

/// Fixed category identifiers. Not user-creatable or deletable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
    /// "Running the Business".
    Rtb,
    /// "Projects".
    Projects,
}

impl CategoryId {
    /// Both categories in display order.
    pub const ALL: [CategoryId; 2] = [CategoryId::Rtb, CategoryId::Projects];

    /// Wire identifier used as the document key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rtb => "rtb",
            Self::Projects => "projects",
        }
    }
}

impl Display for CategoryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text entry under a topic. Newest entries sit at index 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub id: UpdateId,
    pub title: String,
    pub text: String,
}

/// Named subject tracked within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    pub updates: Vec<Update>,
}

impl Topic {
    /// Creates a topic without updates.
    pub fn new(id: impl Into<TopicId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            updates: Vec::new(),
        }
    }

    pub fn find_update(&self, update_id: &str) -> Option<&Update> {
        self.updates.iter().find(|update| update.id == update_id)
    }
}

/// One of the two fixed top-level groupings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    pub topics: Vec<Topic>,
}

impl Category {
    pub fn find_topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.id == topic_id)
    }
}

/// Root aggregate. The whole value is the unit of persistence and sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardDocument {
    pub rtb: Category,
    pub projects: Category,
}

impl DashboardDocument {
    /// Returns the category stored under `id`.
    pub fn category(&self, id: CategoryId) -> &Category {
        match id {
            CategoryId::Rtb => &self.rtb,
            CategoryId::Projects => &self.projects,
        }
    }

    pub fn category_mut(&mut self, id: CategoryId) -> &mut Category {
        match id {
            CategoryId::Rtb => &mut self.rtb,
            CategoryId::Projects => &mut self.projects,
        }
    }

    pub fn find_topic(&self, category: CategoryId, topic_id: &str) -> Option<&Topic> {
        self.category(category).find_topic(topic_id)
    }

    /// Validates invariants that decoding alone does not enforce.
    ///
    /// # Errors
    /// - `CategoryMismatch` when a slot holds the other category's id.
    /// - `BlankId` when any topic or update id is empty after trim.
    /// - `DuplicateTopicId` / `DuplicateUpdateId` on id collisions.
    pub fn validate(&self) -> Result<(), DocumentValidationError> {
        let mut topic_ids = HashSet::new();
        for slot in CategoryId::ALL {
            let category = self.category(slot);
            if category.id != slot {
                return Err(DocumentValidationError::CategoryMismatch {
                    slot,
                    found: category.id,
                });
            }

            for topic in &category.topics {
                if topic.id.trim().is_empty() {
                    return Err(DocumentValidationError::BlankId);
                }
                if !topic_ids.insert(topic.id.as_str()) {
                    return Err(DocumentValidationError::DuplicateTopicId(topic.id.clone()));
                }

                let mut update_ids = HashSet::new();
                for update in &topic.updates {
                    if update.id.trim().is_empty() {
                        return Err(DocumentValidationError::BlankId);
                    }
                    if !update_ids.insert(update.id.as_str()) {
                        return Err(DocumentValidationError::DuplicateUpdateId {
                            topic_id: topic.id.clone(),
                            update_id: update.id.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Structural violations detected by [`DashboardDocument::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentValidationError {
    CategoryMismatch { slot: CategoryId, found: CategoryId },
    BlankId,
    DuplicateTopicId(TopicId),
    DuplicateUpdateId { topic_id: TopicId, update_id: UpdateId },
}

impl Display for DocumentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CategoryMismatch { slot, found } => {
                write!(f, "category slot `{slot}` holds category `{found}`")
            }
            Self::BlankId => write!(f, "topic and update ids must not be blank"),
            Self::DuplicateTopicId(id) => write!(f, "duplicate topic id: {id}"),
            Self::DuplicateUpdateId {
                topic_id,
                update_id,
            } => write!(f, "duplicate update id {update_id} in topic {topic_id}"),
        }
    }
}

impl Error for DocumentValidationError {}

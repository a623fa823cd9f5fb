//! Notification data models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Notification category enum
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    TaskUpdated,
    TaskAssigned,
    TaskCompleted,
}

impl Category {
    /// All known categories, in wire order.
    pub const ALL: [Category; 3] = [
        Category::TaskUpdated,
        Category::TaskAssigned,
        Category::TaskCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TaskUpdated => "TASK_UPDATED",
            Category::TaskAssigned => "TASK_ASSIGNED",
            Category::TaskCompleted => "TASK_COMPLETED",
        }
    }
}

/// Notification priority enum
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A user notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    pub read: bool,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds. Servers that never touched the entry omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Notification {
    /// Key for the canonical collection order: newest first by
    /// `created_at`, ties broken by `id` descending.
    pub fn sort_key(&self) -> (i64, u64) {
        (self.created_at, self.id)
    }
}

/// Per-category notification preferences.
///
/// A category absent from the map counts as disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub id: u64,
    pub categories: BTreeMap<Category, bool>,
}

impl Preferences {
    /// Preferences with every known category enabled.
    pub fn all_enabled(id: u64) -> Self {
        Self {
            id,
            categories: Category::ALL.iter().map(|c| (*c, true)).collect(),
        }
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.categories.get(&category).copied().unwrap_or(false)
    }

    pub fn enabled_count(&self) -> usize {
        self.categories.values().filter(|enabled| **enabled).count()
    }

    /// True when at least one category is still enabled.
    pub fn has_enabled_category(&self) -> bool {
        self.enabled_count() > 0
    }
}

/// Response body of the notification list endpoint.
///
/// The backend returns either a bare array or a paginated envelope;
/// both must decode.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NotificationList {
    Plain(Vec<Notification>),
    Paginated(NotificationPage),
}

/// Paginated list envelope. Only the first page is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPage {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Notification>,
}

impl NotificationList {
    pub fn into_results(self) -> Vec<Notification> {
        match self {
            NotificationList::Plain(items) => items,
            NotificationList::Paginated(page) => page.results,
        }
    }
}

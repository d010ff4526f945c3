//! Domain types for the to-do list.
//!
//! Ids are assigned by [`crate::store::TodoStore`] from a counter seeded with
//! the database maximum, so an optimistically added item already carries its
//! final id. `sort_order` is the sole persisted ordering key: dense, unique
//! within the list, re-derived after every reorder.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TodoId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubtaskId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Database text representation (matches the original schema's values).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Unknown text maps to `Medium`, same as the schema default.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Med",
            Self::High => "High",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub todo_id: TodoId,
    pub title: String,
    pub done: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub done: bool,
    pub priority: Priority,
    pub category_id: Option<CategoryId>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub subtasks: Vec<Subtask>,
}

impl Todo {
    /// Canonical-order sort key: `sort_order` ascending, newest first on
    /// ties, id as the final immutable tie-break.
    pub fn order_key(&self) -> (i64, i64, i64) {
        (self.sort_order, -self.created_at.timestamp_millis(), self.id.0)
    }

    pub fn subtasks_done(&self) -> usize {
        self.subtasks.iter().filter(|s| s.done).count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Hex color string, e.g. `#6366f1` (schema default).
    pub color: String,
}

/// The status filter tabs. Filtering changes which items are *rendered*, so
/// render position can diverge from storage position; reorder commits always
/// translate through ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Done,
}

impl StatusFilter {
    pub const ALL: [Self; 3] = [Self::All, Self::Active, Self::Done];

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Done => "Done",
        }
    }

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.done,
            Self::Done => todo.done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn todo(id: i64, sort_order: i64, secs: i64) -> Todo {
        Todo {
            id: TodoId(id),
            title: format!("todo {id}"),
            done: false,
            priority: Priority::default(),
            category_id: None,
            due_date: None,
            sort_order,
            created_at: Utc.timestamp_opt(secs, 0).single().unwrap(),
            subtasks: Vec::new(),
        }
    }

    #[test]
    fn order_key_sorts_by_sort_order_then_newest() {
        let mut todos = vec![todo(1, 2, 100), todo(2, 1, 50), todo(3, 1, 200)];
        todos.sort_by_key(Todo::order_key);
        let ids: Vec<i64> = todos.iter().map(|t| t.id.0).collect();
        // sort_order 1 first; within it, newer created_at wins.
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn priority_text_round_trip() {
        for p in Priority::ALL {
            assert_eq!(Priority::from_str_lossy(p.as_str()), p);
        }
        assert_eq!(Priority::from_str_lossy("urgent"), Priority::Medium);
    }
}

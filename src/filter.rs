// View projection: filter, search and sort over a task snapshot

use crate::models::Task;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Completion filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Active => write!(f, "active"),
            StatusFilter::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            _ => Err(format!("Unknown filter: {} (expected all, active or completed)", s)),
        }
    }
}

/// Sort order applied after filtering and search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Newest first
    #[default]
    Date,
    /// High, medium, low
    Priority,
    /// Case-insensitive by text
    Alphabetical,
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Date => write!(f, "date"),
            SortKey::Priority => write!(f, "priority"),
            SortKey::Alphabetical => write!(f, "alphabetical"),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "priority" => Ok(SortKey::Priority),
            "alphabetical" | "alpha" => Ok(SortKey::Alphabetical),
            _ => Err(format!("Unknown sort: {} (expected date, priority or alphabetical)", s)),
        }
    }
}

/// Parameters of a projection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    pub filter: StatusFilter,
    /// Case-insensitive substring matched against task text; empty matches all
    pub search: String,
    pub sort: SortKey,
}

impl View {
    pub fn new(filter: StatusFilter, sort: SortKey) -> Self {
        Self {
            filter,
            search: String::new(),
            sort,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }
}

/// Project a snapshot into display order
///
/// `tasks` must be in insertion order. Records are first put in baseline
/// order, then filtered and searched, then stably sorted by `view.sort`, so
/// equal sort keys keep their baseline order.
pub fn project<'a, I>(tasks: I, view: &View) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut rows: Vec<(usize, &Task)> = tasks.into_iter().enumerate().collect();
    rows.sort_by(|a, b| baseline_cmp(*a, *b));

    let needle = view.search.to_lowercase();
    rows.retain(|(_, task)| view.filter.matches(task) && (needle.is_empty() || task.text.to_lowercase().contains(&needle)));

    match view.sort {
        SortKey::Date => rows.sort_by(|(_, a), (_, b)| b.created_at.cmp(&a.created_at)),
        SortKey::Priority => rows.sort_by(|(_, a), (_, b)| b.priority.weight().cmp(&a.priority.weight())),
        SortKey::Alphabetical => rows.sort_by(|(_, a), (_, b)| collate(&a.text, &b.text)),
    }

    rows.into_iter().map(|(_, task)| task).collect()
}

/// 0 = important and open, 1 = open, 2 = completed
fn bucket(task: &Task) -> u8 {
    match (task.completed, task.important) {
        (false, true) => 0,
        (false, false) => 1,
        (true, _) => 2,
    }
}

/// Bucket, then newest first; insertion position breaks exact timestamp ties
fn baseline_cmp((a_pos, a): (usize, &Task), (b_pos, b): (usize, &Task)) -> Ordering {
    bucket(a)
        .cmp(&bucket(b))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b_pos.cmp(&a_pos))
}

/// Case-insensitive text ordering
///
/// Compares lowercased characters; strings differing only in case compare
/// equal so the stable sort keeps their baseline order.
fn collate(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{Duration, TimeZone, Utc};

    fn task(id: &str, text: &str, minute: i64) -> Task {
        Task {
            id: id.to_string(),
            text: text.to_string(),
            completed: false,
            important: false,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute),
            completed_at: None,
            due_date: None,
            priority: Priority::Medium,
            category: None,
            description: None,
        }
    }

    fn done(mut task: Task) -> Task {
        task.completed = true;
        task.completed_at = Some(task.created_at + Duration::hours(1));
        task
    }

    fn important(mut task: Task) -> Task {
        task.important = true;
        task
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_filter_parse_and_display() {
        assert_eq!("ACTIVE".parse::<StatusFilter>().unwrap(), StatusFilter::Active);
        assert_eq!(StatusFilter::Completed.to_string(), "completed");
        assert!("done".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_sort_parse_and_display() {
        assert_eq!("alpha".parse::<SortKey>().unwrap(), SortKey::Alphabetical);
        assert_eq!(SortKey::Priority.to_string(), "priority");
        assert!("size".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_baseline_order_buckets() {
        let tasks = vec![
            done(task("old-done", "a", 0)),
            task("open-old", "b", 1),
            important(task("imp", "c", 2)),
            task("open-new", "d", 3),
            done(important(task("imp-done", "e", 4))),
        ];

        let mut rows: Vec<(usize, &Task)> = tasks.iter().enumerate().collect();
        rows.sort_by(|a, b| baseline_cmp(*a, *b));
        let order: Vec<&str> = rows.iter().map(|(_, t)| t.id.as_str()).collect();

        assert_eq!(order, vec!["imp", "open-new", "open-old", "imp-done", "old-done"]);
    }

    #[test]
    fn test_filter_keeps_order() {
        let tasks = vec![task("a", "a", 0), done(task("b", "b", 1)), task("c", "c", 2)];

        let active = project(&tasks, &View::new(StatusFilter::Active, SortKey::Date));
        assert_eq!(ids(&active), vec!["c", "a"]);

        let completed = project(&tasks, &View::new(StatusFilter::Completed, SortKey::Date));
        assert_eq!(ids(&completed), vec!["b"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let tasks = vec![task("a", "Buy MILK", 0), task("b", "Pay rent", 1), task("c", "milkshake", 2)];

        let view = View::default().with_search("Milk");
        assert_eq!(ids(&project(&tasks, &view)), vec!["c", "a"]);

        let view = View::default().with_search("");
        assert_eq!(project(&tasks, &view).len(), 3);

        let view = View::default().with_search("taxes");
        assert!(project(&tasks, &view).is_empty());
    }

    #[test]
    fn test_sort_by_date_descending() {
        let tasks = vec![task("a", "a", 5), task("b", "b", 1), done(task("c", "c", 9))];

        let sorted = project(&tasks, &View::default());
        assert_eq!(ids(&sorted), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_sort_by_priority_is_stable() {
        let mut low = task("low", "low", 3);
        low.priority = Priority::Low;
        let mut high = task("high", "high", 0);
        high.priority = Priority::High;
        let tasks = vec![task("m-old", "m", 1), low, high, task("m-new", "m", 2)];

        let sorted = project(&tasks, &View::new(StatusFilter::All, SortKey::Priority));
        assert_eq!(ids(&sorted), vec!["high", "m-new", "m-old", "low"]);
    }

    #[test]
    fn test_sort_alphabetical_case_insensitive() {
        let tasks = vec![task("b", "banana", 0), task("a", "Apple", 1), task("c", "cherry", 2)];

        let sorted = project(&tasks, &View::new(StatusFilter::All, SortKey::Alphabetical));
        let texts: Vec<&str> = sorted.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn test_alphabetical_ties_keep_baseline() {
        let tasks = vec![task("old", "Same", 0), task("new", "same", 1)];

        let sorted = project(&tasks, &View::new(StatusFilter::All, SortKey::Alphabetical));
        assert_eq!(ids(&sorted), vec!["new", "old"]);
    }

    #[test]
    fn test_identical_timestamps_newest_insert_first() {
        let tasks = vec![task("first", "x", 0), task("second", "x", 0)];

        let sorted = project(&tasks, &View::default());
        assert_eq!(ids(&sorted), vec!["second", "first"]);
    }

    #[test]
    fn test_collate() {
        assert_eq!(collate("apple", "Banana"), Ordering::Less);
        assert_eq!(collate("ABC", "abc"), Ordering::Equal);
        assert_eq!(collate("abc", "ab"), Ordering::Greater);
    }
}

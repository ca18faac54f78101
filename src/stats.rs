// Aggregate counts over a task collection

use crate::models::{Category, Priority, Task};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Task counts by priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }

    fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    #[serde(serialize_with = "category_label")]
    pub category: Category,
    pub count: usize,
}

fn category_label<S: Serializer>(category: &Category, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(category.label())
}

/// Summary statistics for a collection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub important: usize,
    pub by_priority: PriorityCounts,
    /// Every known label (zero counts included) in canonical order, then
    /// free-form labels alphabetically
    pub by_category: Vec<CategoryCount>,
    /// Percentage of completed tasks, 0 for an empty collection
    pub completion_rate: f64,
}

impl Stats {
    /// Count for a category label
    pub fn category(&self, category: &Category) -> usize {
        self.by_category
            .iter()
            .find(|c| &c.category == category)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

/// Compute statistics over `tasks`
pub fn aggregate<'a, I>(tasks: I) -> Stats
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut total = 0;
    let mut completed = 0;
    let mut important = 0;
    let mut by_priority = PriorityCounts::default();
    let mut known = vec![0usize; Category::KNOWN.len()];
    let mut custom: BTreeMap<String, usize> = BTreeMap::new();

    for task in tasks {
        total += 1;
        if task.completed {
            completed += 1;
        }
        if task.important {
            important += 1;
        }
        by_priority.bump(task.priority);

        match task.category.clone().and_then(Category::normalized) {
            Some(Category::Custom(label)) => *custom.entry(label).or_default() += 1,
            Some(category) => {
                if let Some(slot) = Category::KNOWN.iter().position(|k| *k == category) {
                    known[slot] += 1;
                }
            }
            None => {}
        }
    }

    let by_category = Category::KNOWN
        .into_iter()
        .zip(known)
        .map(|(category, count)| CategoryCount { category, count })
        .chain(custom.into_iter().map(|(label, count)| CategoryCount {
            category: Category::Custom(label),
            count,
        }))
        .collect();

    let completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };

    Stats {
        total,
        completed,
        active: total - completed,
        important,
        by_priority,
        by_category,
        completion_rate,
    }
}

//! Derived, read-only views over the task list.

use std::sync::Arc;

use crate::task::Task;

/// Task counts and completion ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskStats {
    /// Number of tasks.
    pub total: usize,
    /// Number of incomplete tasks.
    pub active: usize,
    /// Number of completed tasks.
    pub completed: usize,
    /// `completed / total`, or `0.0` for an empty list.
    pub completion_rate: f64,
}

impl TaskStats {
    /// Count `tasks`.
    #[must_use]
    pub fn from_tasks(tasks: &[Arc<Task>]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.completed()).count();
        #[allow(clippy::cast_precision_loss)]
        let completion_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64
        };
        Self {
            total,
            active: total - completed,
            completed,
            completion_rate,
        }
    }

    /// Equality on counts only, ignoring the derived ratio.
    #[must_use]
    pub const fn same_counts(&self, other: &Self) -> bool {
        self.total == other.total && self.active == other.active && self.completed == other.completed
    }
}

/// Completion progress for UI feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Number of completed tasks.
    pub completed: usize,
    /// Number of tasks.
    pub total: usize,
    /// `round(completed / total * 100)`, `0` for an empty list.
    pub percentage: u8,
}

impl Progress {
    /// Build progress figures from counts.
    #[must_use]
    pub fn new(completed: usize, total: usize) -> Self {
        Self {
            completed,
            total,
            percentage: percentage(completed, total),
        }
    }
}

/// Rounded integer percentage of `part` over `whole`, clamped to `[0, 100]`.
#[must_use]
pub fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u128;
    let whole = whole as u128;
    // Round half up: floor(100 * part / whole + 0.5).
    let rounded = (200 * part + whole) / (2 * whole);
    u8::try_from(rounded).unwrap_or(100)
}

/// One page of a task list.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Tasks on this page.
    pub tasks: Vec<Arc<Task>>,
    /// Number of pages for the whole list.
    pub total_pages: usize,
    /// Zero-based page index.
    pub current_page: usize,
    /// Number of tasks in the whole list.
    pub total_tasks: usize,
    /// Whether a later page exists.
    pub has_next_page: bool,
    /// Whether an earlier page exists.
    pub has_prev_page: bool,
}

impl Page {
    /// Slice `tasks` into the zero-based `page` of `page_size` entries.
    ///
    /// A zero `page_size` yields an empty page with no page count.
    #[must_use]
    pub fn of(tasks: &[Arc<Task>], page: usize, page_size: usize) -> Self {
        let total_tasks = tasks.len();
        if page_size == 0 {
            return Self {
                current_page: page,
                total_tasks,
                has_prev_page: page > 0,
                ..Self::default()
            };
        }
        let start = page.saturating_mul(page_size).min(total_tasks);
        let end = start.saturating_add(page_size).min(total_tasks);
        Self {
            tasks: tasks[start..end].to_vec(),
            total_pages: total_tasks.div_ceil(page_size),
            current_page: page,
            total_tasks,
            has_next_page: page.saturating_mul(page_size).saturating_add(page_size) < total_tasks,
            has_prev_page: page > 0,
        }
    }
}

/// Case-insensitive substring matcher on task names.
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Normalize a query string into a matcher. Returns `None` for blank inputs.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// Whether the task name contains the query.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        task.name().as_str().to_lowercase().contains(&self.needle)
    }
}

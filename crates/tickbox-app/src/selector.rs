//! Memoized derived views over store state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use tickbox_core::{Page, Progress, Task, TaskId, TaskStats, TextMatcher, TodoState};

use crate::dispatch::guard;

type Compute<S, T> = Box<dyn Fn(&S) -> T + Send + Sync>;
type Equality<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Caches the result of a derivation for the last state it saw.
///
/// States are compared by pointer: handing the same `Arc<S>` twice returns the
/// cached result without recomputing. With an equality function, a recomputed
/// result that compares equal to the cached one is discarded so callers keep
/// seeing the old `Arc<T>`.
pub struct MemoSelector<S, T> {
    compute: Compute<S, T>,
    equal: Option<Equality<T>>,
    cache: Mutex<Option<(Arc<S>, Arc<T>)>>,
    recomputations: AtomicUsize,
}

impl<S, T> MemoSelector<S, T> {
    /// Selector without an equality check.
    pub fn new(compute: impl Fn(&S) -> T + Send + Sync + 'static) -> Self {
        Self {
            compute: Box::new(compute),
            equal: None,
            cache: Mutex::new(None),
            recomputations: AtomicUsize::new(0),
        }
    }

    /// Selector that keeps the cached result while `equal` holds.
    pub fn with_equality(
        compute: impl Fn(&S) -> T + Send + Sync + 'static,
        equal: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            equal: Some(Box::new(equal)),
            ..Self::new(compute)
        }
    }

    /// Derive from `state`, reusing the cached result when possible.
    pub fn select(&self, state: &Arc<S>) -> Arc<T> {
        let mut cache = guard(&self.cache);
        if let Some((last_state, last_result)) = cache.as_ref()
            && Arc::ptr_eq(last_state, state)
        {
            return Arc::clone(last_result);
        }

        self.recomputations.fetch_add(1, Ordering::Relaxed);
        let fresh = (self.compute)(state.as_ref());
        let result = match (cache.take(), &self.equal) {
            (Some((_, previous)), Some(equal)) if equal(previous.as_ref(), &fresh) => previous,
            _ => Arc::new(fresh),
        };
        *cache = Some((Arc::clone(state), Arc::clone(&result)));
        result
    }

    /// How often the derivation actually ran.
    #[must_use]
    pub fn recomputations(&self) -> usize {
        self.recomputations.load(Ordering::Relaxed)
    }
}

/// Same length and the same task allocations at every position.
#[must_use]
pub fn shallow_equal(a: &[Arc<Task>], b: &[Arc<Task>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(left, right)| Arc::ptr_eq(left, right))
}

fn same_page(a: &Page, b: &Page) -> bool {
    shallow_equal(&a.tasks, &b.tasks)
        && a.total_pages == b.total_pages
        && a.current_page == b.current_page
        && a.total_tasks == b.total_tasks
}

fn list_selector(
    compute: impl Fn(&TodoState) -> Vec<Arc<Task>> + Send + Sync + 'static,
) -> MemoSelector<TodoState, Vec<Arc<Task>>> {
    MemoSelector::with_equality(compute, |a: &Vec<Arc<Task>>, b: &Vec<Arc<Task>>| shallow_equal(a, b))
}

fn search(tasks: Vec<Arc<Task>>, matcher: Option<&TextMatcher>) -> Vec<Arc<Task>> {
    match matcher {
        Some(matcher) => tasks.into_iter().filter(|task| matcher.matches(task)).collect(),
        None => tasks,
    }
}

/// Tasks matching the active filter.
#[must_use]
pub fn filtered_tasks() -> MemoSelector<TodoState, Vec<Arc<Task>>> {
    list_selector(TodoState::filtered_tasks)
}

/// Incomplete tasks.
#[must_use]
pub fn active_tasks() -> MemoSelector<TodoState, Vec<Arc<Task>>> {
    list_selector(TodoState::active_tasks)
}

/// Completed tasks.
#[must_use]
pub fn completed_tasks() -> MemoSelector<TodoState, Vec<Arc<Task>>> {
    list_selector(TodoState::completed_tasks)
}

/// Task counts; recomputed stats with identical counts keep the cached value.
#[must_use]
pub fn task_stats() -> MemoSelector<TodoState, TaskStats> {
    MemoSelector::with_equality(TodoState::stats, TaskStats::same_counts)
}

/// Completed count, total and rounded percentage.
#[must_use]
pub fn progress() -> MemoSelector<TodoState, Progress> {
    MemoSelector::with_equality(TodoState::progress, |a: &Progress, b: &Progress| a == b)
}

/// Rounded completion percentage.
#[must_use]
pub fn completion_percentage() -> MemoSelector<TodoState, u8> {
    MemoSelector::new(|state: &TodoState| state.progress().percentage)
}

/// `true` when the list is non-empty and every task is done.
#[must_use]
pub fn all_tasks_completed() -> MemoSelector<TodoState, bool> {
    MemoSelector::new(|state: &TodoState| {
        !state.tasks().is_empty() && state.tasks().iter().all(|task| task.completed())
    })
}

/// `true` when at least one task is done.
#[must_use]
pub fn has_completed_tasks() -> MemoSelector<TodoState, bool> {
    MemoSelector::new(|state: &TodoState| state.tasks().iter().any(|task| task.completed()))
}

/// Whether the active filter shows anything.
#[must_use]
pub fn filter_has_results() -> MemoSelector<TodoState, bool> {
    MemoSelector::new(|state: &TodoState| state.tasks().iter().any(|task| state.filter().matches(task)))
}

/// The task with `id`, if present.
#[must_use]
pub fn task_by_id(id: TaskId) -> MemoSelector<TodoState, Option<Arc<Task>>> {
    MemoSelector::new(move |state: &TodoState| state.task(&id).cloned())
}

/// Tasks whose completion flag equals `completed`.
#[must_use]
pub fn tasks_by_status(completed: bool) -> MemoSelector<TodoState, Vec<Arc<Task>>> {
    list_selector(move |state| state.tasks_where(|task| task.completed() == completed))
}

/// Tasks whose name contains `query`, ignoring case; a blank query matches all.
#[must_use]
pub fn tasks_by_search(query: &str) -> MemoSelector<TodoState, Vec<Arc<Task>>> {
    let matcher = TextMatcher::new(query);
    list_selector(move |state| search(state.tasks().to_vec(), matcher.as_ref()))
}

/// [`tasks_by_search`] restricted to the active filter.
#[must_use]
pub fn filtered_tasks_with_search(query: &str) -> MemoSelector<TodoState, Vec<Arc<Task>>> {
    let matcher = TextMatcher::new(query);
    list_selector(move |state| search(state.filtered_tasks(), matcher.as_ref()))
}

/// Tasks created within `[start, end]`.
#[must_use]
pub fn tasks_created_between(start: OffsetDateTime, end: OffsetDateTime) -> MemoSelector<TodoState, Vec<Arc<Task>>> {
    list_selector(move |state| state.tasks_where(|task| (start..=end).contains(&task.created_at())))
}

/// One zero-based page of the filtered list.
#[must_use]
pub fn paginated_tasks(page: usize, page_size: usize) -> MemoSelector<TodoState, Page> {
    MemoSelector::with_equality(
        move |state: &TodoState| Page::of(&state.filtered_tasks(), page, page_size),
        same_page,
    )
}

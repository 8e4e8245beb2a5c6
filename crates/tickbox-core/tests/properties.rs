//! Property checks for store transitions.

use std::collections::HashSet;

use proptest::prelude::*;
use tickbox_core::{Filter, Task, TaskName, TodoEvent, TodoState, clock};

#[derive(Clone, Debug)]
enum Op {
    Add(String),
    Toggle(usize),
    Delete(usize),
    Move(usize, usize),
    ToggleAll(Option<bool>),
    ClearCompleted,
    Import(usize),
    SetFilter(Filter),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[ a-z]{0,8}".prop_map(Op::Add),
        (0usize..12).prop_map(Op::Toggle),
        (0usize..12).prop_map(Op::Delete),
        ((0usize..12), (0usize..12)).prop_map(|(from, to)| Op::Move(from, to)),
        prop::option::of(any::<bool>()).prop_map(Op::ToggleAll),
        Just(Op::ClearCompleted),
        (0usize..12).prop_map(Op::Import),
        prop_oneof![Just(Filter::All), Just(Filter::Active), Just(Filter::Completed)]
            .prop_map(Op::SetFilter),
    ]
}

fn to_event(state: &TodoState, op: &Op) -> Option<TodoEvent> {
    let at = clock::now();
    let id_at = |idx: usize| state.tasks().get(idx).map(|task| task.id().clone());
    Some(match op {
        Op::Add(raw) => TodoEvent::TaskAdded {
            task: Task::new(TaskName::new(raw)?, None, at),
        },
        Op::Toggle(idx) => TodoEvent::TaskToggled { id: id_at(*idx)?, at },
        Op::Delete(idx) => TodoEvent::TaskDeleted { id: id_at(*idx)? },
        Op::Move(from, to) => TodoEvent::TaskMoved { from: *from, to: *to, at },
        Op::ToggleAll(completed) => TodoEvent::AllToggled { completed: *completed, at },
        Op::ClearCompleted => TodoEvent::CompletedCleared,
        Op::Import(idx) => {
            // Re-import an existing task next to a brand-new one.
            let mut tasks: Vec<Task> = state.tasks().get(*idx).map(|task| (**task).clone()).into_iter().collect();
            tasks.push(Task::new(TaskName::new("imported")?, None, at));
            TodoEvent::TasksImported { tasks }
        }
        Op::SetFilter(filter) => TodoEvent::FilterSet { filter: *filter },
    })
}

proptest! {
    #[test]
    fn invariants_hold_after_any_sequence(ops in prop::collection::vec(op_strategy(), 1..48)) {
        let mut state = TodoState::default();
        for op in &ops {
            if let Some(event) = to_event(&state, op) {
                if let Some(next) = state.apply(&event) {
                    state = next;
                }
            }

            let ids: HashSet<_> = state.tasks().iter().map(|task| task.id().clone()).collect();
            prop_assert_eq!(ids.len(), state.tasks().len());
            for task in state.tasks() {
                prop_assert!(!task.name().as_str().trim().is_empty());
                prop_assert!(task.updated_at() >= task.created_at());
            }
            let progress = state.progress();
            prop_assert!(progress.percentage <= 100);
            let stats = state.stats();
            prop_assert_eq!(stats.active + stats.completed, stats.total);
        }
    }

    #[test]
    fn blank_names_never_become_tasks(raw in "[ \t\n]{0,6}") {
        prop_assert!(TaskName::new(&raw).is_none());
    }

    #[test]
    fn reorder_is_a_permutation(len in 1usize..10, from in 0usize..10, to in 0usize..10) {
        let now = clock::now();
        let tasks = (0..len).filter_map(|idx| TaskName::new(&format!("t{idx}")).map(|name| Task::new(name, None, now)));
        let state = TodoState::new(tasks, Filter::All);
        let event = TodoEvent::TaskMoved { from, to, at: now };
        match state.apply(&event) {
            None => prop_assert!(from == to || from >= len || to >= len),
            Some(next) => {
                let mut expected: Vec<_> = state.tasks().iter().map(|task| task.id().clone()).collect();
                let moved = expected.remove(from);
                expected.insert(to, moved);
                let actual: Vec<_> = next.tasks().iter().map(|task| task.id().clone()).collect();
                prop_assert_eq!(actual, expected);
            }
        }
    }
}

use std::fs;
use std::io::Write;

use anyhow::{Context, Result, bail};
use tickbox_app::{StoreConfig, TodoStore, create_store};
use tickbox_core::{Task, TaskEditData, TaskId};
use tickbox_storage::{PersistenceAdapter, StorageOptions};

use crate::Command;

pub fn run(command: Command, config: StoreConfig, out: &mut impl Write) -> Result<()> {
    let store = create_store(config.clone());
    let result = execute(command, &store, &config, out);
    store.flush();
    result
}

fn execute(command: Command, store: &TodoStore, config: &StoreConfig, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Add { name, description } => {
            let Some(id) = store.add_task(&name, description.as_deref()) else {
                bail!("task name must not be blank");
            };
            writeln!(out, "added task: {id}")?;
        }
        Command::Toggle { id } => {
            let id = existing_task(store, &id)?;
            store.toggle_task(&id);
            let done = store.state().task(&id).is_some_and(|task| task.completed());
            writeln!(out, "{id}: {}", if done { "done" } else { "open" })?;
        }
        Command::Rename { id, name } => {
            let id = existing_task(store, &id)?;
            if name.trim().is_empty() {
                bail!("task name must not be blank");
            }
            store.update_task(&id, &name);
            writeln!(out, "renamed task: {id}")?;
        }
        Command::Edit { id, name, description } => {
            let id = existing_task(store, &id)?;
            if name.trim().is_empty() {
                bail!("task name must not be blank");
            }
            store.edit_task(&id, &TaskEditData::new(name, description));
            writeln!(out, "edited task: {id}")?;
        }
        Command::Rm { id } => {
            let id = existing_task(store, &id)?;
            store.delete_task(&id);
            writeln!(out, "deleted task: {id}")?;
        }
        Command::ClearCompleted => {
            let removed = store.get_completed_tasks().len();
            store.clear_completed();
            writeln!(out, "removed {removed} completed task(s)")?;
        }
        Command::Clear => {
            let removed = store.state().tasks().len();
            store.clear_all_tasks();
            writeln!(out, "removed {removed} task(s)")?;
        }
        Command::Filter { filter } => {
            store.set_filter(filter);
            writeln!(out, "filter: {filter}")?;
        }
        Command::ToggleAll { done } => {
            store.toggle_all_tasks(done);
            let stats = store.get_task_stats();
            writeln!(out, "{} of {} task(s) done", stats.completed, stats.total)?;
        }
        Command::Move { from, to } => {
            let len = store.state().tasks().len();
            if from >= len || to >= len {
                bail!("positions must be below {len}");
            }
            store.reorder_tasks(from, to);
            writeln!(out, "moved task {from} -> {to}")?;
        }
        Command::Ls { all } => list(store, all, out)?,
        Command::Stats => {
            let stats = store.get_task_stats();
            let progress = store.get_progress();
            writeln!(
                out,
                "{} task(s): {} active, {} completed ({}%)",
                stats.total, stats.active, stats.completed, progress.percentage
            )?;
        }
        Command::Export => {
            let json = serde_json::to_string_pretty(&store.export_tasks()).context("failed to encode tasks")?;
            writeln!(out, "{json}")?;
        }
        Command::Import { file } => {
            let raw = fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let tasks: Vec<Task> =
                serde_json::from_str(&raw).with_context(|| format!("failed to parse tasks in {}", file.display()))?;
            let offered = tasks.len();
            let before = store.state().tasks().len();
            store.import_tasks(tasks);
            let added = store.state().tasks().len() - before;
            writeln!(out, "imported {added} of {offered} task(s)")?;
        }
        Command::Reset => reset(config, out)?,
    }
    Ok(())
}

fn list(store: &TodoStore, all: bool, out: &mut impl Write) -> Result<()> {
    let state = store.state();
    let filter = state.filter();
    let shown: Vec<_> = state
        .tasks()
        .iter()
        .enumerate()
        .filter(|(_, task)| all || filter.matches(task))
        .collect();
    if shown.is_empty() {
        writeln!(out, "no tasks ({})", filter.label())?;
        return Ok(());
    }
    for (position, task) in shown {
        let mark = if task.completed() { "x" } else { " " };
        writeln!(out, "{position:>3} [{mark}] {}  {}", task.id(), task.name())?;
        if let Some(description) = task.description() {
            writeln!(out, "          {description}")?;
        }
    }
    Ok(())
}

fn existing_task(store: &TodoStore, raw: &str) -> Result<TaskId> {
    let id: TaskId = raw.parse().with_context(|| format!("invalid task id '{raw}'"))?;
    if store.state().task(&id).is_none() {
        bail!("task {id} not found");
    }
    Ok(id)
}

fn reset(config: &StoreConfig, out: &mut impl Write) -> Result<()> {
    let adapter = PersistenceAdapter::open(&StorageOptions {
        medium: config.storage_medium,
        key: config.persist_key.clone(),
        dir: config.storage_dir.clone(),
    });
    adapter
        .remove()
        .with_context(|| format!("failed to remove persisted tasks under '{}'", adapter.key()))?;
    writeln!(out, "reset '{}' ({})", adapter.key(), adapter.medium())?;
    Ok(())
}

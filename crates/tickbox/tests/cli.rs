use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, ensure};
use assert_cmd::cargo::CommandCargoExt;
use tempfile::TempDir;

/// Scratch data directory plus a config file pointing the durable medium at it.
struct Workspace {
    temp: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("failed to create temp dir")?;
        let data = temp.path().join("data");
        let config = temp.path().join("config.toml");
        fs::write(
            &config,
            format!("[store]\nstorage_medium = \"durable\"\nstorage_dir = {:?}\n", data.display().to_string()),
        )
        .context("failed to write config")?;
        Ok(Self { temp, config })
    }

    fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.command(args)?.output().context("failed to run tickbox")?;
        ensure!(
            output.status.success(),
            "tickbox {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(String::from_utf8(output.stdout)?)
    }

    fn command(&self, args: &[&str]) -> Result<Command> {
        let mut cmd = Command::cargo_bin("tickbox")?;
        cmd.arg("--config").arg(&self.config).args(args);
        Ok(cmd)
    }
}

fn added_id(output: &str) -> Result<String> {
    output
        .trim()
        .strip_prefix("added task: ")
        .map(str::to_owned)
        .with_context(|| format!("unexpected add output: {output}"))
}

fn record(dir: &Path) -> Result<serde_json::Value> {
    let raw = fs::read_to_string(dir.join("tasks.json")).context("persisted record missing")?;
    Ok(serde_json::from_str(&raw)?)
}

#[test]
fn tasks_persist_across_processes() -> Result<()> {
    let ws = Workspace::new()?;
    let milk = added_id(&ws.run(&["add", "Buy milk"])?)?;
    ws.run(&["add", "Walk dog", "--description", "around the park"])?;
    ws.run(&["toggle", &milk])?;

    let listing = ws.run(&["ls"])?;
    assert!(listing.contains("[x]") && listing.contains("Walk dog"), "{listing}");
    assert_eq!(ws.run(&["stats"])?.trim(), "2 task(s): 1 active, 1 completed (50%)");

    let stored = record(&ws.data_dir())?;
    assert_eq!(stored["version"], 1);
    assert_eq!(stored["state"]["tasks"][0]["createdAt"]["__type"], "Date");
    Ok(())
}

#[test]
fn filter_and_reset() -> Result<()> {
    let ws = Workspace::new()?;
    let milk = added_id(&ws.run(&["add", "Buy milk"])?)?;
    ws.run(&["add", "Walk dog"])?;
    ws.run(&["toggle", &milk])?;
    ws.run(&["filter", "completed"])?;

    let listing = ws.run(&["ls"])?;
    assert!(listing.contains("Buy milk") && !listing.contains("Walk dog"), "{listing}");

    ws.run(&["reset"])?;
    assert!(ws.run(&["ls", "--all"])?.starts_with("no tasks"));
    Ok(())
}

#[test]
fn blank_names_fail_without_touching_storage() -> Result<()> {
    let ws = Workspace::new()?;
    let output = ws.command(&["add", "   "])?.output()?;
    assert!(!output.status.success());
    assert!(!ws.data_dir().join("tasks.json").exists());
    Ok(())
}

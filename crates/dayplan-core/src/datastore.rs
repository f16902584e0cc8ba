use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::master::MasterList;
use crate::model::{TaskMap, WorkHoursMap};

/// Everything that is persisted, in the on-disk key layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlannerState {
    #[serde(default)]
    pub task_master_list: MasterList,

    #[serde(default)]
    pub calendar_tasks: TaskMap,

    #[serde(default)]
    pub work_hours: WorkHoursMap,
}

/// Single JSON state file.
#[derive(Debug, Clone)]
pub struct ConfStore {
    pub path: PathBuf,
}

impl ConfStore {
    #[tracing::instrument(skip(path))]
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let path = path.to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        info!(path = %path.display(), exists = path.exists(), "opened state file");
        Ok(Self { path })
    }

    /// Reads the state file. A missing or unreadable file yields the default state.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> PlannerState {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no state file yet; using defaults");
            return PlannerState::default();
        }

        match self.try_load() {
            Ok(state) => state,
            Err(err) => {
                warn!(path = %self.path.display(), error = %format!("{err:#}"), "failed to load state file; using defaults");
                PlannerState::default()
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn try_load(&self) -> anyhow::Result<PlannerState> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        let state: PlannerState = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.path.display()))?;
        debug!(
            master = state.task_master_list.len(),
            dates = state.calendar_tasks.len(),
            hours = state.work_hours.len(),
            "loaded state"
        );
        Ok(state)
    }

    #[tracing::instrument(skip(self, state))]
    pub fn save(&self, state: &PlannerState) -> anyhow::Result<()> {
        save_json_atomic(&self.path, state)
            .with_context(|| format!("failed to save {}", self.path.display()))
    }
}

#[tracing::instrument(skip(path, state))]
fn save_json_atomic(path: &Path, state: &PlannerState) -> anyhow::Result<()> {
    debug!(file = %path.display(), "saving state atomically");

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, state)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

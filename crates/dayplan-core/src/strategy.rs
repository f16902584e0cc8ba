use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::task::TaskRecord;

/// Append policy used by [`crate::model::TaskModel::add_task`].
pub trait TaskAddStrategy: fmt::Debug {
    /// Returns `true` when `task` was appended to `list`.
    fn add_task(&self, list: &mut Vec<TaskRecord>, task: TaskRecord) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleAddStrategy;

impl TaskAddStrategy for SimpleAddStrategy {
    fn add_task(&self, list: &mut Vec<TaskRecord>, task: TaskRecord) -> bool {
        list.push(task);
        true
    }
}

/// Rejects a task whose text already exists in the target list.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueAddStrategy;

impl TaskAddStrategy for UniqueAddStrategy {
    fn add_task(&self, list: &mut Vec<TaskRecord>, task: TaskRecord) -> bool {
        if list.iter().any(|existing| existing.text == task.text) {
            return false;
        }
        list.push(task);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Simple,
    Unique,
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn TaskAddStrategy> {
        match self {
            Self::Simple => Box::new(SimpleAddStrategy),
            Self::Unique => Box::new(UniqueAddStrategy),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Unique => "unique",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "unique" => Ok(Self::Unique),
            other => Err(anyhow!("invalid add.strategy: {other} (expected simple or unique)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SimpleAddStrategy, StrategyKind, TaskAddStrategy, UniqueAddStrategy};
    use crate::task::TaskRecord;

    fn record(text: &str) -> TaskRecord {
        TaskRecord::new_planned(text.to_string(), None)
    }

    #[test]
    fn simple_strategy_allows_duplicates() {
        let mut list = vec![record("a")];
        assert!(SimpleAddStrategy.add_task(&mut list, record("a")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn unique_strategy_rejects_duplicate_text() {
        let mut list = vec![record("a"), record("b")];
        assert!(!UniqueAddStrategy.add_task(&mut list, record("b")));
        assert_eq!(list, vec![record("a"), record("b")]);
        assert!(UniqueAddStrategy.add_task(&mut list, record("c")));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn strategy_kind_parses_config_values() {
        assert_eq!("Unique".parse::<StrategyKind>().expect("parse"), StrategyKind::Unique);
        assert_eq!("simple".parse::<StrategyKind>().expect("parse"), StrategyKind::Simple);
        assert!("random".parse::<StrategyKind>().is_err());
    }
}

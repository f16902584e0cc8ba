use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, instrument};

use crate::strategy::{SimpleAddStrategy, TaskAddStrategy};
use crate::task::{TaskRecord, TaskState, parse_ratio};

/// Called after every successful mutation with the date key and that date's task list.
pub type TaskListener = Box<dyn FnMut(&str, &[TaskRecord])>;

pub type TaskMap = BTreeMap<String, Vec<TaskRecord>>;
pub type WorkHoursMap = BTreeMap<String, f64>;

/// In-memory store of per-date task lists and work hours.
///
/// Index-based operations ignore out-of-range indexes and report `false`;
/// listeners only hear about changes that actually happened.
pub struct TaskModel {
    tasks: TaskMap,
    work_hours: WorkHoursMap,
    strategy: Box<dyn TaskAddStrategy>,
    listeners: Vec<TaskListener>,
}

impl fmt::Debug for TaskModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskModel")
            .field("tasks", &self.tasks)
            .field("work_hours", &self.work_hours)
            .field("strategy", &self.strategy)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for TaskModel {
    fn default() -> Self {
        Self::new(Box::new(SimpleAddStrategy))
    }
}

impl TaskModel {
    pub fn new(strategy: Box<dyn TaskAddStrategy>) -> Self {
        Self::from_parts(TaskMap::new(), WorkHoursMap::new(), strategy)
    }

    pub fn from_parts(
        tasks: TaskMap,
        work_hours: WorkHoursMap,
        strategy: Box<dyn TaskAddStrategy>,
    ) -> Self {
        Self {
            tasks,
            work_hours,
            strategy,
            listeners: Vec::new(),
        }
    }

    pub fn set_strategy(&mut self, strategy: Box<dyn TaskAddStrategy>) {
        debug!(?strategy, "switching add strategy");
        self.strategy = strategy;
    }

    pub fn add_listener(&mut self, listener: TaskListener) {
        self.listeners.push(listener);
    }

    pub fn tasks(&self) -> &TaskMap {
        &self.tasks
    }

    pub fn work_hours(&self) -> &WorkHoursMap {
        &self.work_hours
    }

    pub fn get_tasks(&self, date: &str) -> &[TaskRecord] {
        self.tasks.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_work_hours(&self, date: &str) -> Option<f64> {
        self.work_hours.get(date).copied()
    }

    /// Appends a planned task through the current strategy. Unparsable ratio text
    /// yields a task without a ratio.
    #[instrument(skip(self, text))]
    pub fn add_task(&mut self, date: &str, text: impl Into<String>, ratio: Option<&str>) -> bool {
        let attr_ratio = ratio.and_then(parse_ratio);
        let task = TaskRecord::new_planned(text.into(), attr_ratio);
        let list = self.tasks.entry(date.to_string()).or_default();
        let added = self.strategy.add_task(list, task);
        debug!(added, count = list.len(), "add_task");
        if added {
            self.notify(date);
        }
        added
    }

    #[instrument(skip(self))]
    pub fn remove_task(&mut self, date: &str, index: usize) -> bool {
        let Some(list) = self.tasks.get_mut(date) else {
            return false;
        };
        if index >= list.len() {
            debug!(index, len = list.len(), "remove_task index out of range");
            return false;
        }
        list.remove(index);
        self.notify(date);
        true
    }

    #[instrument(skip(self))]
    pub fn set_task_state(&mut self, date: &str, index: usize, state: TaskState) -> bool {
        let Some(task) = self.task_mut(date, index) else {
            return false;
        };
        task.state = state;
        self.notify(date);
        true
    }

    #[instrument(skip(self))]
    pub fn cycle_task_state(&mut self, date: &str, index: usize) -> bool {
        let Some(task) = self.task_mut(date, index) else {
            return false;
        };
        task.state = task.state.next();
        self.notify(date);
        true
    }

    /// Replaces the ratio of one task. Unparsable text leaves the task untouched.
    #[instrument(skip(self))]
    pub fn set_task_attr_ratio(&mut self, date: &str, index: usize, ratio: &str) -> bool {
        let Some(value) = parse_ratio(ratio) else {
            debug!(ratio, "ignoring unparsable ratio");
            return false;
        };
        let Some(task) = self.task_mut(date, index) else {
            return false;
        };
        task.attr_ratio = Some(value);
        self.notify(date);
        true
    }

    #[instrument(skip(self))]
    pub fn set_work_hours(&mut self, date: &str, hours: f64) {
        self.work_hours.insert(date.to_string(), hours);
        self.notify(date);
    }

    #[instrument(skip(self))]
    pub fn remove_work_hours(&mut self, date: &str) -> bool {
        if self.work_hours.remove(date).is_none() {
            return false;
        }
        self.notify(date);
        true
    }

    fn task_mut(&mut self, date: &str, index: usize) -> Option<&mut TaskRecord> {
        let task = self.tasks.get_mut(date).and_then(|list| list.get_mut(index));
        if task.is_none() {
            debug!(index, "task index out of range");
        }
        task
    }

    fn notify(&mut self, date: &str) {
        let tasks = self.tasks.get(date).map(Vec::as_slice).unwrap_or(&[]);
        for listener in &mut self.listeners {
            listener(date, tasks);
        }
    }
}

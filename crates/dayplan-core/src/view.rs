use std::io;

use crate::master::MasterTask;
use crate::render::Renderer;
use crate::task::TaskRecord;

/// Presentation side of the controller. Implementations only display what they are given.
pub trait TaskView {
    fn show_tasks(&mut self, date: &str, tasks: &[TaskRecord]);

    fn show_work_hours(&mut self, date: &str, hours: Option<f64>);

    fn show_master_choices(&mut self, date: &str, choices: &[MasterTask]);
}

/// Keeps the latest pushed state and prints it on demand.
#[derive(Debug, Clone, Default)]
pub struct TerminalView {
    pub date: String,
    pub tasks: Vec<TaskRecord>,
    pub hours: Option<f64>,
    pub choices: Vec<MasterTask>,
}

impl TerminalView {
    pub fn print_day(&self, renderer: &Renderer) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        renderer.write_task_list(&mut out, &self.date, &self.tasks)?;
        renderer.write_work_hours(&mut out, self.hours)
    }

    pub fn print_choices(&self, renderer: &Renderer) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        renderer.write_choices(out, &self.date, &self.choices)
    }
}

impl TaskView for TerminalView {
    fn show_tasks(&mut self, date: &str, tasks: &[TaskRecord]) {
        date.clone_into(&mut self.date);
        self.tasks = tasks.to_vec();
    }

    fn show_work_hours(&mut self, date: &str, hours: Option<f64>) {
        date.clone_into(&mut self.date);
        self.hours = hours;
    }

    fn show_master_choices(&mut self, date: &str, choices: &[MasterTask]) {
        date.clone_into(&mut self.date);
        self.choices = choices.to_vec();
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::datastore::{ConfStore, PlannerState};
use crate::datetime::format_date_key;
use crate::master::{MasterAttr, MasterList, MasterTask};
use crate::model::TaskModel;
use crate::strategy::TaskAddStrategy;
use crate::task::{TaskRecord, TaskState};
use crate::view::TaskView;

/// Discrete input coming from the presentation layer. Indexes are 0-based.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    TaskSubmitted { text: String, ratio: Option<String> },
    MasterTaskPicked { text: String },
    DateChanged(NaiveDate),
    DeleteRequested(usize),
    StateChanged { index: usize, state: TaskState },
    StateCycled(usize),
    RatioChanged { index: usize, ratio: String },
    WorkHoursSubmitted(String),
    WorkHoursDeleted,
    MasterTaskAdded { text: String, attr: MasterAttr },
    MasterTaskDeleted(usize),
    IncludeAllToggled(bool),
}

/// Wires view events to the model and persists the full state after each mutation.
pub struct TaskController<V: TaskView + 'static> {
    model: TaskModel,
    master: MasterList,
    store: ConfStore,
    current_date: NaiveDate,
    include_all: bool,
    view: Rc<RefCell<V>>,
}

impl<V: TaskView + 'static> TaskController<V> {
    #[instrument(skip(store, strategy, view))]
    pub fn new(
        store: ConfStore,
        strategy: Box<dyn TaskAddStrategy>,
        view: Rc<RefCell<V>>,
        date: NaiveDate,
        include_all: bool,
    ) -> Self {
        let PlannerState {
            task_master_list,
            calendar_tasks,
            work_hours,
        } = store.load();

        let mut model = TaskModel::from_parts(calendar_tasks, work_hours, strategy);
        let listener_view = Rc::clone(&view);
        model.add_listener(Box::new(move |date: &str, tasks: &[TaskRecord]| {
            listener_view.borrow_mut().show_tasks(date, tasks);
        }));

        let controller = Self {
            model,
            master: task_master_list,
            store,
            current_date: date,
            include_all,
            view,
        };
        controller.refresh_choices();
        controller.refresh_tasks();
        controller.refresh_work_hours();
        controller
    }

    pub fn date_key(&self) -> String {
        format_date_key(self.current_date)
    }

    pub fn model(&self) -> &TaskModel {
        &self.model
    }

    pub fn master(&self) -> &MasterList {
        &self.master
    }

    pub fn include_all(&self) -> bool {
        self.include_all
    }

    /// Master tasks offered for the current date.
    pub fn choices(&self) -> Vec<MasterTask> {
        self.master
            .choices_for(self.current_date, self.include_all)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> PlannerState {
        PlannerState {
            task_master_list: self.master.clone(),
            calendar_tasks: self.model.tasks().clone(),
            work_hours: self.model.work_hours().clone(),
        }
    }

    #[instrument(skip(self))]
    pub fn handle(&mut self, event: UiEvent) {
        debug!(date = %self.date_key(), "handling ui event");
        match event {
            UiEvent::TaskSubmitted { text, ratio } => self.handle_add_task(&text, ratio.as_deref()),
            UiEvent::MasterTaskPicked { text } => self.handle_add_task_from_master(&text),
            UiEvent::DateChanged(date) => self.handle_date_changed(date),
            UiEvent::DeleteRequested(index) => self.handle_delete_task(index),
            UiEvent::StateChanged { index, state } => self.handle_change_task_state(index, state),
            UiEvent::StateCycled(index) => self.handle_cycle_task_state(index),
            UiEvent::RatioChanged { index, ratio } => self.handle_change_task_attr_ratio(index, &ratio),
            UiEvent::WorkHoursSubmitted(raw) => self.handle_save_work_hours(&raw),
            UiEvent::WorkHoursDeleted => self.handle_delete_work_hours(),
            UiEvent::MasterTaskAdded { text, attr } => self.handle_master_task_added(&text, attr),
            UiEvent::MasterTaskDeleted(index) => self.handle_master_task_deleted(index),
            UiEvent::IncludeAllToggled(include_all) => self.handle_include_all_toggled(include_all),
        }
        self.refresh_work_hours();
    }

    pub fn handle_add_task(&mut self, text: &str, ratio: Option<&str>) {
        let date = self.date_key();
        self.model.add_task(&date, text, ratio);
        self.save_conf();
    }

    pub fn handle_add_task_from_master(&mut self, text: &str) {
        let date = self.date_key();
        self.model.add_task(&date, text, None);
        self.save_conf();
    }

    pub fn handle_date_changed(&mut self, date: NaiveDate) {
        info!(from = %self.current_date, to = %date, "date changed");
        self.current_date = date;
        self.refresh_tasks();
        self.refresh_choices();
    }

    pub fn handle_delete_task(&mut self, index: usize) {
        let date = self.date_key();
        self.model.remove_task(&date, index);
        self.save_conf();
    }

    pub fn handle_change_task_state(&mut self, index: usize, state: TaskState) {
        let date = self.date_key();
        self.model.set_task_state(&date, index, state);
        self.save_conf();
    }

    pub fn handle_cycle_task_state(&mut self, index: usize) {
        let date = self.date_key();
        self.model.cycle_task_state(&date, index);
        self.save_conf();
    }

    pub fn handle_change_task_attr_ratio(&mut self, index: usize, ratio: &str) {
        let date = self.date_key();
        self.model.set_task_attr_ratio(&date, index, ratio);
        self.save_conf();
    }

    /// Unparsable hours are dropped without touching the model or the file.
    pub fn handle_save_work_hours(&mut self, raw: &str) {
        let Some(hours) = parse_work_hours(raw) else {
            debug!(raw, "ignoring invalid work hours");
            return;
        };
        let date = self.date_key();
        self.model.set_work_hours(&date, hours);
        self.save_conf();
    }

    pub fn handle_delete_work_hours(&mut self) {
        let date = self.date_key();
        self.model.remove_work_hours(&date);
        self.save_conf();
    }

    pub fn handle_master_task_added(&mut self, text: &str, attr: MasterAttr) {
        if !self.master.add(text, attr) {
            return;
        }
        self.refresh_choices();
        self.save_conf();
    }

    pub fn handle_master_task_deleted(&mut self, index: usize) {
        if self.master.remove(index).is_none() {
            return;
        }
        self.refresh_choices();
        self.save_conf();
    }

    pub fn handle_include_all_toggled(&mut self, include_all: bool) {
        self.include_all = include_all;
        self.refresh_choices();
    }

    /// Write failures are logged and otherwise ignored.
    fn save_conf(&self) {
        if let Err(err) = self.store.save(&self.snapshot()) {
            warn!(error = %format!("{err:#}"), "failed to save state; change kept in memory only");
        }
    }

    fn refresh_tasks(&self) {
        let date = self.date_key();
        self.view
            .borrow_mut()
            .show_tasks(&date, self.model.get_tasks(&date));
    }

    fn refresh_work_hours(&self) {
        let date = self.date_key();
        self.view
            .borrow_mut()
            .show_work_hours(&date, self.model.get_work_hours(&date));
    }

    fn refresh_choices(&self) {
        let date = self.date_key();
        let choices = self.choices();
        self.view.borrow_mut().show_master_choices(&date, &choices);
    }
}

/// Work hours accept any finite number; there is no range check.
pub fn parse_work_hours(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|hours| hours.is_finite())
}

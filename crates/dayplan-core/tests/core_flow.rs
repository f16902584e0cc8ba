use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use dayplan_core::controller::{TaskController, UiEvent};
use dayplan_core::datastore::{ConfStore, PlannerState};
use dayplan_core::datetime::{format_date_key, parse_date_expr};
use dayplan_core::master::MasterAttr;
use dayplan_core::render::Renderer;
use dayplan_core::strategy::StrategyKind;
use dayplan_core::task::TaskState;
use dayplan_core::view::TerminalView;
use tempfile::tempdir;

fn controller_at(
    path: &std::path::Path,
    strategy: StrategyKind,
    date: NaiveDate,
) -> (TaskController<TerminalView>, Rc<RefCell<TerminalView>>) {
    let store = ConfStore::open(path).expect("open store");
    let view = Rc::new(RefCell::new(TerminalView::default()));
    let controller = TaskController::new(store, strategy.build(), Rc::clone(&view), date, false);
    (controller, view)
}

#[test]
fn planning_a_day_persists_across_sessions() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("init.conf");
    let today = NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date");
    let date = parse_date_expr("tomorrow", today).expect("date expr");
    assert_eq!(format_date_key(date), "2024-03-05");

    let (mut controller, view) = controller_at(&path, StrategyKind::Simple, date);
    controller.handle(UiEvent::TaskSubmitted {
        text: "Write report".to_string(),
        ratio: Some("150".to_string()),
    });
    controller.handle(UiEvent::TaskSubmitted {
        text: "Review".to_string(),
        ratio: Some("-3".to_string()),
    });
    controller.handle(UiEvent::TaskSubmitted {
        text: "Lunch".to_string(),
        ratio: Some("n/a".to_string()),
    });
    controller.handle(UiEvent::StateCycled(0));
    controller.handle(UiEvent::StateCycled(0));
    controller.handle(UiEvent::DeleteRequested(5));
    controller.handle(UiEvent::WorkHoursSubmitted("7.5".to_string()));

    {
        let view = view.borrow();
        assert_eq!(view.date, "2024-03-05");
        assert_eq!(view.tasks.len(), 3);
        assert_eq!(view.tasks[0].label(), "Write report [Closed] (100.0%)");
        assert_eq!(view.tasks[1].attr_ratio, Some(0.0));
        assert_eq!(view.tasks[2].attr_ratio, None);
        assert_eq!(view.hours, Some(7.5));
    }

    let (reloaded, reloaded_view) = controller_at(&path, StrategyKind::Simple, date);
    assert_eq!(reloaded.snapshot(), controller.snapshot());
    assert_eq!(reloaded_view.borrow().tasks[0].state, TaskState::Closed);

    let raw = std::fs::read_to_string(&path).expect("read state");
    let on_disk: PlannerState = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(on_disk.work_hours.get("2024-03-05"), Some(&7.5));
    assert!(raw.contains("\"task_master_list\""));
    assert!(raw.contains("\"calendar_tasks\""));
}

#[test]
fn unique_strategy_and_master_picks() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("init.conf");
    let monday = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    let (mut controller, view) = controller_at(&path, StrategyKind::Unique, monday);

    controller.handle(UiEvent::MasterTaskAdded {
        text: "Standup".to_string(),
        attr: MasterAttr::Mon,
    });
    let offered: Vec<String> = controller.choices().into_iter().map(|c| c.text).collect();
    assert_eq!(offered, vec!["Sample Task 1", "Sample Task 2", "Standup"]);

    controller.handle(UiEvent::MasterTaskPicked {
        text: "Standup".to_string(),
    });
    controller.handle(UiEvent::MasterTaskPicked {
        text: "Standup".to_string(),
    });
    assert_eq!(view.borrow().tasks.len(), 1);

    controller.handle(UiEvent::DateChanged(monday.succ_opt().expect("next day")));
    let offered: Vec<String> = view.borrow().choices.iter().map(|c| c.text.clone()).collect();
    assert_eq!(offered, vec!["Sample Task 1"]);
    assert!(view.borrow().tasks.is_empty());
}

#[test]
fn terminal_rendering_of_a_day() {
    let mut buf = Vec::new();
    let renderer = Renderer::plain();
    let temp = tempdir().expect("tempdir");
    let day = NaiveDate::from_ymd_opt(2024, 1, 6).expect("valid date");
    let (mut controller, view) = controller_at(&temp.path().join("init.conf"), StrategyKind::Simple, day);
    controller.handle(UiEvent::TaskSubmitted {
        text: "Plan week".to_string(),
        ratio: Some("40".to_string()),
    });

    let view = view.borrow();
    renderer
        .write_task_list(&mut buf, &view.date, &view.tasks)
        .expect("render tasks");
    renderer.write_work_hours(&mut buf, view.hours).expect("render hours");
    let out = String::from_utf8(buf).expect("utf8");
    assert!(out.starts_with("2024-01-06\n"));
    assert!(out.contains("\n1. Plan week [Planned] (40.0%)\n"));
    assert!(out.ends_with("Work Hours: (not set)\n"));
}

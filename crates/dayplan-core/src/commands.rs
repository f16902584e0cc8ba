use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::controller::{TaskController, UiEvent, parse_work_hours};
use crate::master::MasterAttr;
use crate::render::Renderer;
use crate::task::TaskState;
use crate::view::TerminalView;

const RATIO_PREFIX: &str = "ratio:";

pub type TerminalController = TaskController<TerminalView>;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "list",
        "add",
        "pick",
        "delete",
        "state",
        "cycle",
        "ratio",
        "hours",
        "unhours",
        "choices",
        "master",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(controller, view, cfg, renderer, inv))]
pub fn dispatch(
    controller: &mut TerminalController,
    view: &Rc<RefCell<TerminalView>>,
    cfg: &Config,
    renderer: &Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();

    debug!(command, ?args, date = %controller.date_key(), "dispatching command");

    match command {
        "list" => print_day(view, renderer),
        "add" => cmd_add(controller, view, renderer, args),
        "pick" => cmd_pick(controller, view, renderer, args),
        "delete" => cmd_delete(controller, view, renderer, args),
        "state" => cmd_state(controller, view, renderer, args),
        "cycle" => cmd_cycle(controller, view, renderer, args),
        "ratio" => cmd_ratio(controller, view, renderer, args),
        "hours" => cmd_hours(controller, view, renderer, args),
        "unhours" => {
            controller.handle(UiEvent::WorkHoursDeleted);
            print_day(view, renderer)
        }
        "choices" => view.borrow().print_choices(renderer),
        "master" => cmd_master(controller, renderer, args),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn print_day(view: &Rc<RefCell<TerminalView>>, renderer: &Renderer) -> anyhow::Result<()> {
    view.borrow().print_day(renderer)
}

#[instrument(skip(controller, view, renderer, args))]
fn cmd_add(
    controller: &mut TerminalController,
    view: &Rc<RefCell<TerminalView>>,
    renderer: &Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let (text, ratio) = parse_text_and_ratio(args)?;
    info!(text = %text, ?ratio, "command add");
    controller.handle(UiEvent::TaskSubmitted { text, ratio });
    print_day(view, renderer)
}

#[instrument(skip(controller, view, renderer, args))]
fn cmd_pick(
    controller: &mut TerminalController,
    view: &Rc<RefCell<TerminalView>>,
    renderer: &Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    if args.is_empty() {
        return Err(anyhow!("pick requires a choice number or task text (see `choices`)"));
    }

    let choices = controller.choices();
    let picked_number = match args {
        [single] => single.parse::<usize>().ok(),
        _ => None,
    };
    let text = if let Some(number) = picked_number {
        let index = to_index(number)?;
        choices
            .get(index)
            .map(|choice| choice.text.clone())
            .ok_or_else(|| anyhow!("no choice #{number} for {}", controller.date_key()))?
    } else {
        let wanted = args.join(" ");
        choices
            .iter()
            .find(|choice| choice.text == wanted)
            .map(|choice| choice.text.clone())
            .ok_or_else(|| anyhow!("{wanted:?} is not offered for {}", controller.date_key()))?
    };

    info!(text = %text, "command pick");
    controller.handle(UiEvent::MasterTaskPicked { text });
    print_day(view, renderer)
}

fn cmd_delete(
    controller: &mut TerminalController,
    view: &Rc<RefCell<TerminalView>>,
    renderer: &Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let [raw] = args else {
        return Err(anyhow!("usage: delete <n>"));
    };
    let index = parse_task_index(controller, raw)?;
    controller.handle(UiEvent::DeleteRequested(index));
    print_day(view, renderer)
}

fn cmd_state(
    controller: &mut TerminalController,
    view: &Rc<RefCell<TerminalView>>,
    renderer: &Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let [raw_index, raw_state] = args else {
        return Err(anyhow!("usage: state <n> <planned|working|closed>"));
    };
    let index = parse_task_index(controller, raw_index)?;
    let state: TaskState = raw_state.parse()?;
    controller.handle(UiEvent::StateChanged { index, state });
    print_day(view, renderer)
}

fn cmd_cycle(
    controller: &mut TerminalController,
    view: &Rc<RefCell<TerminalView>>,
    renderer: &Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let [raw] = args else {
        return Err(anyhow!("usage: cycle <n>"));
    };
    let index = parse_task_index(controller, raw)?;
    controller.handle(UiEvent::StateCycled(index));
    print_day(view, renderer)
}

fn cmd_ratio(
    controller: &mut TerminalController,
    view: &Rc<RefCell<TerminalView>>,
    renderer: &Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let [raw_index, ratio] = args else {
        return Err(anyhow!("usage: ratio <n> <0-100>"));
    };
    let index = parse_task_index(controller, raw_index)?;
    controller.handle(UiEvent::RatioChanged {
        index,
        ratio: ratio.clone(),
    });
    print_day(view, renderer)
}

fn cmd_hours(
    controller: &mut TerminalController,
    view: &Rc<RefCell<TerminalView>>,
    renderer: &Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let [raw] = args else {
        return Err(anyhow!("usage: hours <value>"));
    };
    if parse_work_hours(raw).is_none() {
        warn!(value = %raw, "not a number; work hours unchanged");
    }
    controller.handle(UiEvent::WorkHoursSubmitted(raw.clone()));
    print_day(view, renderer)
}

#[instrument(skip(controller, renderer, args))]
fn cmd_master(
    controller: &mut TerminalController,
    renderer: &Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    match args.split_first() {
        None => {}
        Some((sub, rest)) if sub == "add" => {
            let [attr, words @ ..] = rest else {
                return Err(anyhow!("usage: master add <Free|Mon|Tue|Wed|Thu|Fri> <text...>"));
            };
            let attr: MasterAttr = attr.parse()?;
            let text = words.join(" ");
            if text.is_empty() {
                return Err(anyhow!("master add requires task text"));
            }
            let before = controller.master().len();
            controller.handle(UiEvent::MasterTaskAdded { text: text.clone(), attr });
            if controller.master().len() == before {
                warn!(text = %text, "master list already has this task");
            }
        }
        Some((sub, rest)) if sub == "delete" => {
            let [raw] = rest else {
                return Err(anyhow!("usage: master delete <n>"));
            };
            let number: usize = raw
                .parse()
                .with_context(|| format!("invalid master index: {raw}"))?;
            let index = to_index(number)?;
            if index >= controller.master().len() {
                return Err(anyhow!("no master task #{number}"));
            }
            controller.handle(UiEvent::MasterTaskDeleted(index));
        }
        Some((sub, _)) => return Err(anyhow!("unknown master subcommand: {sub} (expected add or delete)")),
    }

    let mut out = io::stdout().lock();
    renderer.write_master_table(&mut out, controller.master().entries())
}

fn cmd_commands() -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    for name in known_command_names() {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<_> = cfg.iter().collect();
    entries.sort();
    let mut out = io::stdout().lock();
    for (key, value) in entries {
        writeln!(out, "{key}={value}")?;
    }
    for file in &cfg.loaded_files {
        writeln!(out, "# loaded {}", file.display())?;
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "usage: dayplan [--date EXPR] [--all] [--conf PATH] [--rc KEY=VALUE] <command> [args]\n\
         \n\
         commands:\n  \
         list                          show tasks and work hours for the date\n  \
         add <text...> [ratio:<n>]     add a task, optionally with an effort ratio\n  \
         pick <n|text...>              add a task from the master choices\n  \
         delete <n>                    remove task n\n  \
         state <n> <state>             set task n to planned, working or closed\n  \
         cycle <n>                     advance task n to its next state\n  \
         ratio <n> <value>             set the effort ratio of task n (0-100)\n  \
         hours <value>                 record work hours for the date\n  \
         unhours                       clear work hours for the date\n  \
         choices                       master tasks offered for the date\n  \
         master [add <day> <text...> | delete <n>]\n  \
         _commands | _show | help | version"
    );
    Ok(())
}

/// Splits `add` arguments into task text and an optional `ratio:<n>` token.
fn parse_text_and_ratio(args: &[String]) -> anyhow::Result<(String, Option<String>)> {
    let mut words = Vec::with_capacity(args.len());
    let mut ratio = None;
    for arg in args {
        if let Some(value) = arg.strip_prefix(RATIO_PREFIX) {
            ratio = Some(value.to_string());
        } else {
            words.push(arg.as_str());
        }
    }

    let text = words.join(" ");
    if text.trim().is_empty() {
        return Err(anyhow!("add requires task text"));
    }
    Ok((text, ratio))
}

fn parse_task_index(controller: &TerminalController, raw: &str) -> anyhow::Result<usize> {
    let number: usize = raw
        .parse()
        .with_context(|| format!("invalid task number: {raw}"))?;
    let index = to_index(number)?;
    let date = controller.date_key();
    let len = controller.model().get_tasks(&date).len();
    if index >= len {
        warn!(number, len, date = %date, "no such task; nothing changes");
    }
    Ok(index)
}

fn to_index(number: usize) -> anyhow::Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("numbers start at 1"))
}

#[cfg(test)]
mod tests {
    use super::{expand_command_abbrev, known_command_names, parse_text_and_ratio, to_index};

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ratio_token_is_split_from_text() {
        let (text, ratio) =
            parse_text_and_ratio(&strings(&["Write", "ratio:150", "report"])).expect("parse");
        assert_eq!(text, "Write report");
        assert_eq!(ratio.as_deref(), Some("150"));

        let (text, ratio) = parse_text_and_ratio(&strings(&["Review"])).expect("parse");
        assert_eq!(text, "Review");
        assert_eq!(ratio, None);

        assert!(parse_text_and_ratio(&strings(&["ratio:5"])).is_err());
    }

    #[test]
    fn abbreviations_resolve_only_when_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("del", &known), Some("delete"));
        assert_eq!(expand_command_abbrev("ma", &known), Some("master"));
        assert_eq!(expand_command_abbrev("h", &known), None);
        assert_eq!(expand_command_abbrev("hours", &known), Some("hours"));
    }

    #[test]
    fn cli_numbers_are_one_based() {
        assert_eq!(to_index(1).expect("index"), 0);
        assert!(to_index(0).is_err());
    }
}

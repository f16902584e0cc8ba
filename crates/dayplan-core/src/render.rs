use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::master::MasterTask;
use crate::task::{TaskRecord, TaskState, format_decimal};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    /// One numbered line per task, `n. text [State] (r%)`, colored by state.
    #[tracing::instrument(skip(self, out, tasks))]
    pub fn write_task_list<W: Write>(
        &self,
        mut out: W,
        date: &str,
        tasks: &[TaskRecord],
    ) -> anyhow::Result<()> {
        writeln!(out, "{date}")?;
        if tasks.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }

        let width = tasks.len().to_string().len();
        for (idx, task) in tasks.iter().enumerate() {
            let number = format!("{:>width$}.", idx + 1);
            writeln!(
                out,
                "{} {}",
                self.paint(&number, "33"),
                self.paint_state(task.state, &task.label())
            )?;
        }
        Ok(())
    }

    pub fn write_work_hours<W: Write>(&self, mut out: W, hours: Option<f64>) -> anyhow::Result<()> {
        writeln!(out, "{}", work_hours_label(hours))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, entries))]
    pub fn write_master_table<W: Write>(
        &self,
        mut out: W,
        entries: &[MasterTask],
    ) -> anyhow::Result<()> {
        if entries.is_empty() {
            writeln!(out, "Master list is empty.")?;
            return Ok(());
        }

        let headers = vec!["#".to_string(), "Day".to_string(), "Task".to_string()];
        let rows = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                vec![
                    self.paint(&(idx + 1).to_string(), "33"),
                    entry.attr.to_string(),
                    entry.text.clone(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)
    }

    pub fn write_choices<W: Write>(
        &self,
        mut out: W,
        date: &str,
        choices: &[MasterTask],
    ) -> anyhow::Result<()> {
        writeln!(out, "Select Task ({date}):")?;
        if choices.is_empty() {
            writeln!(out, "  (none)")?;
        }
        let width = choices.len().to_string().len();
        for (idx, choice) in choices.iter().enumerate() {
            writeln!(out, "  {:>width$}. {}", idx + 1, choice.label())?;
        }
        Ok(())
    }

    fn paint_state(&self, state: TaskState, text: &str) -> String {
        match state {
            TaskState::Planned => text.to_string(),
            TaskState::Working => self.paint(text, "36"),
            TaskState::Closed => self.paint(text, "32"),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn work_hours_label(hours: Option<f64>) -> String {
    match hours {
        Some(hours) => format!("Work Hours: {}", format_decimal(hours)),
        None => "Work Hours: (not set)".to_string(),
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in widths.iter().copied() {
        write!(writer, "{:-<width$} ", "", width = width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{Renderer, strip_ansi, work_hours_label};
    use crate::master::{MasterAttr, MasterTask};
    use crate::task::{TaskRecord, TaskState};

    fn render_tasks(tasks: &[TaskRecord]) -> String {
        let mut buf = Vec::new();
        Renderer::plain()
            .write_task_list(&mut buf, "2024-01-01", tasks)
            .expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn task_lines_are_numbered_labels() {
        let mut closed = TaskRecord::new_planned("日報を書く".to_string(), Some(12.5));
        closed.state = TaskState::Closed;
        let mut tasks = vec![closed];
        tasks.extend((0..9).map(|n| TaskRecord::new_planned(format!("t{n}"), None)));
        let out = render_tasks(&tasks);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "2024-01-01");
        assert_eq!(lines[1], " 1. 日報を書く [Closed] (12.5%)");
        assert_eq!(lines[10], "10. t8 [Planned]");
    }

    #[test]
    fn colored_lines_keep_the_label_text() {
        let mut buf = Vec::new();
        let mut working = TaskRecord::new_planned("x".to_string(), None);
        working.state = TaskState::Working;
        Renderer { color: true }
            .write_task_list(&mut buf, "2024-01-01", &[working])
            .expect("render");
        let out = String::from_utf8(buf).expect("utf8");
        assert_eq!(strip_ansi(&out), "2024-01-01\n1. x [Working]\n");
    }

    #[test]
    fn empty_task_list_says_so() {
        assert_eq!(render_tasks(&[]), "2024-01-01\nNo tasks.\n");
    }

    #[test]
    fn choices_use_master_labels() {
        let mut buf = Vec::new();
        Renderer::plain()
            .write_choices(
                &mut buf,
                "2024-01-01",
                &[MasterTask::new("standup", MasterAttr::Free)],
            )
            .expect("render");
        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "Select Task (2024-01-01):\n  1. standup (Free)\n"
        );
    }

    #[test]
    fn work_hours_label_variants() {
        assert_eq!(work_hours_label(None), "Work Hours: (not set)");
        assert_eq!(work_hours_label(Some(8.0)), "Work Hours: 8.0");
        assert_eq!(work_hours_label(Some(7.25)), "Work Hours: 7.25");
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(strip_ansi("\x1b[33m12\x1b[0m"), "12");
    }
}

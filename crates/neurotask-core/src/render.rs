use std::io::{
  self,
  IsTerminal,
  Write
};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::heuristics::Recommendation;
use crate::stats::Stats;
use crate::task::DueState;
use crate::views::TaskView;

#[derive(Debug, Clone)]
pub struct Renderer {
  color: bool
}

impl Renderer {
  pub fn new(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let color_cfg = cfg
      .get("color")
      .unwrap_or_else(|| "on".to_string());
    let color = match color_cfg
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => true,
      | "off" | "no" | "false" | "0" => {
        false
      }
      | other => {
        return Err(anyhow!(
          "invalid color setting: {other}"
        ));
      }
    };

    Ok(Self {
      color
    })
  }

  /// One status line, the terminal
  /// stand-in for a notification toast.
  pub fn notify(
    &mut self,
    message: &str
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{message}")?;
    Ok(())
  }

  #[tracing::instrument(skip_all, fields(rows = views.len()))]
  pub fn print_task_table(
    &mut self,
    views: &[TaskView],
    empty_message: &str
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();

    if views.is_empty() {
      writeln!(out, "{empty_message}")?;
      return Ok(());
    }

    let headers = vec![
      "ID".to_string(),
      "Done".to_string(),
      "Due".to_string(),
      "Priority".to_string(),
      "Category".to_string(),
      "Title".to_string(),
    ];

    let mut rows =
      Vec::with_capacity(views.len());
    for view in views {
      let id =
        self.paint(&view.id.to_string(), "33");
      let done = if view.completed {
        "[x]".to_string()
      } else {
        "[ ]".to_string()
      };
      let due = match view.due_state {
        | DueState::Overdue => {
          self.paint(&view.due_label, "31")
        }
        | DueState::Today => {
          self.paint(&view.due_label, "1")
        }
        | DueState::Upcoming => {
          view.due_label.clone()
        }
      };
      let priority = self.paint(
        view.priority_label,
        priority_color(view.priority_label)
      );

      rows.push(vec![
        id,
        done,
        due,
        priority,
        view.category.clone(),
        view.title.clone(),
      ]);
    }

    write_table(&mut out, headers, rows)?;
    Ok(())
  }

  #[tracing::instrument(skip_all, fields(id = view.id))]
  pub fn print_task_info(
    &mut self,
    view: &TaskView
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();

    writeln!(out, "id          {}", view.id)?;
    writeln!(out, "title       {}", view.title)?;
    writeln!(
      out,
      "description {}",
      view.description
    )?;
    writeln!(
      out,
      "priority    {}",
      view.priority_label
    )?;
    writeln!(out, "due         {}", view.due_label)?;
    writeln!(out, "category    {}", view.category)?;
    writeln!(
      out,
      "completed   {}",
      if view.completed { "yes" } else { "no" }
    )?;
    Ok(())
  }

  pub fn print_stats(
    &mut self,
    stats: &Stats
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();

    writeln!(
      out,
      "Completed tasks    {}",
      stats.completed
    )?;
    writeln!(
      out,
      "Productivity score {}%",
      stats.completion_rate
    )?;
    writeln!(
      out,
      "Focus time         {}h",
      stats.focus_hours
    )?;
    writeln!(
      out,
      "{} {}%",
      progress_bar(stats.completion_rate),
      stats.completion_rate
    )?;
    writeln!(
      out,
      "You complete {}% of tasks on time",
      stats.completion_rate
    )?;
    writeln!(out)?;
    writeln!(out, "{}", stats.analysis)?;
    Ok(())
  }

  pub fn print_recommendations(
    &mut self,
    recommendations: &[Recommendation]
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();

    for (idx, rec) in
      recommendations.iter().enumerate()
    {
      if idx > 0 {
        writeln!(out)?;
      }
      writeln!(out, "{}", self.paint(&rec.title, "1"))?;
      writeln!(out, "  {}", rec.message)?;
    }
    Ok(())
  }

  fn paint(
    &self,
    text: &str,
    code: &str
  ) -> String {
    if !self.color
      || !io::stdout().is_terminal()
    {
      return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
  }
}

fn priority_color(
  label: &str
) -> &'static str {
  if label.starts_with("High") {
    "31"
  } else if label.starts_with("Medium") {
    "33"
  } else {
    "32"
  }
}

fn progress_bar(rate: u32) -> String {
  let filled = (rate.min(100) / 5) as usize;
  format!(
    "[{}{}]",
    "#".repeat(filled),
    "-".repeat(20 - filled)
  )
}

fn write_table<W: Write>(
  mut writer: W,
  headers: Vec<String>,
  rows: Vec<Vec<String>>
) -> anyhow::Result<()> {
  let column_count = headers.len();
  let mut widths = vec![0usize; column_count];

  for (idx, header) in
    headers.iter().enumerate()
  {
    widths[idx] = widths[idx].max(
      UnicodeWidthStr::width(header.as_str())
    );
  }

  for row in &rows {
    for (idx, cell) in row.iter().enumerate()
    {
      widths[idx] = widths[idx].max(
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        )
      );
    }
  }

  for idx in 0..column_count {
    write!(
      writer,
      "{:width$} ",
      headers[idx],
      width = widths[idx]
    )?;
  }
  writeln!(writer)?;

  for width in &widths {
    write!(
      writer,
      "{:-<width$} ",
      "",
      width = *width
    )?;
  }
  writeln!(writer)?;

  for row in rows {
    for (idx, cell) in row.iter().enumerate()
    {
      let visible_width =
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        );
      let padding = widths[idx]
        .saturating_sub(visible_width);
      write!(
        writer,
        "{}{} ",
        cell,
        " ".repeat(padding)
      )?;
    }
    writeln!(writer)?;
  }

  Ok(())
}

fn strip_ansi(s: &str) -> String {
  let mut out =
    String::with_capacity(s.len());
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

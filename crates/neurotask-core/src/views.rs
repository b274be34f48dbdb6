use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use tracing::trace;

use crate::datetime::format_date;
use crate::task::{
  DueState,
  Priority,
  Task
};

const DASHBOARD_LIMIT: usize = 5;

/// Narrowing applied to the full task
/// list.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum ViewFilter {
  #[default]
  All,
  Active,
  Completed,
  High,
  Today
}

impl ViewFilter {
  pub fn as_str(&self) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Active => "active",
      | Self::Completed => "completed",
      | Self::High => "high",
      | Self::Today => "today"
    }
  }

  pub fn matches(
    &self,
    task: &Task,
    today: NaiveDate
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Active => !task.completed,
      | Self::Completed => task.completed,
      | Self::High => {
        task.priority == Priority::High
      }
      | Self::Today => task.is_due_on(today)
    }
  }
}

/// Unknown names fall back to `All`.
impl FromStr for ViewFilter {
  type Err = std::convert::Infallible;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let filter = match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "active" => Self::Active,
      | "completed" => Self::Completed,
      | "high" => Self::High,
      | "today" => Self::Today,
      | "all" => Self::All,
      | other => {
        trace!(filter = other, "unknown filter; showing all");
        Self::All
      }
    };
    Ok(filter)
  }
}

impl fmt::Display for ViewFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Tasks due today or still open, in list
/// order, at most five.
pub fn dashboard_view(
  tasks: &[Task],
  today: NaiveDate
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|t| {
      t.is_due_on(today) || !t.completed
    })
    .take(DASHBOARD_LIMIT)
    .cloned()
    .collect()
}

pub fn filtered_view(
  tasks: &[Task],
  filter: ViewFilter,
  today: NaiveDate
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|t| filter.matches(t, today))
    .cloned()
    .collect()
}

/// Text-only display record for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
  pub id:             u64,
  pub title:          String,
  pub description:    String,
  pub priority_label: &'static str,
  pub due_label:      String,
  pub due_state:      DueState,
  pub category:       String,
  pub completed:      bool
}

impl TaskView {
  pub fn from_task(
    task: &Task,
    today: NaiveDate
  ) -> Self {
    let due_state = task.due_state(today);
    let due_label = match due_state {
      | DueState::Overdue => {
        format!(
          "Overdue: {}",
          format_date(task.due_date)
        )
      }
      | DueState::Today => {
        "Today".to_string()
      }
      | DueState::Upcoming => {
        format_date(task.due_date)
      }
    };

    Self {
      id: task.id,
      title: task.title.clone(),
      description: task
        .description
        .clone(),
      priority_label: task
        .priority
        .label(),
      due_label,
      due_state,
      category: task.category.to_string(),
      completed: task.completed
    }
  }
}

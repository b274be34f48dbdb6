use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};

use crate::error::TaskError;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  High,
  #[default]
  Medium,
  Low
}

impl Priority {
  pub fn as_str(&self) -> &'static str {
    match self {
      | Self::High => "high",
      | Self::Medium => "medium",
      | Self::Low => "low"
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      | Self::High => "High Priority",
      | Self::Medium => {
        "Medium Priority"
      }
      | Self::Low => "Low Priority"
    }
  }

  /// Sort rank, high first.
  pub fn rank(&self) -> u8 {
    match self {
      | Self::High => 0,
      | Self::Medium => 1,
      | Self::Low => 2
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Priority {
  type Err = TaskError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "high" | "h" => Ok(Self::High),
      | "medium" | "med" | "m" => {
        Ok(Self::Medium)
      }
      | "low" | "l" => Ok(Self::Low),
      | _ => {
        Err(TaskError::InvalidPriority(
          s.to_string()
        ))
      }
    }
  }
}

/// Task category. The four known kinds
/// drive the heuristics; anything else is
/// kept verbatim.
#[derive(
  Debug,
  Clone,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
)]
#[serde(from = "String", into = "String")]
pub enum Category {
  #[default]
  Work,
  Personal,
  Health,
  Learning,
  Other(String)
}

impl Category {
  pub fn as_str(&self) -> &str {
    match self {
      | Self::Work => "work",
      | Self::Personal => "personal",
      | Self::Health => "health",
      | Self::Learning => "learning",
      | Self::Other(raw) => raw.as_str()
    }
  }
}

impl From<String> for Category {
  fn from(raw: String) -> Self {
    match raw.as_str() {
      | "work" => Self::Work,
      | "personal" => Self::Personal,
      | "health" => Self::Health,
      | "learning" => Self::Learning,
      | "" => Self::Work,
      | _ => Self::Other(raw)
    }
  }
}

impl From<&str> for Category {
  fn from(raw: &str) -> Self {
    Self::from(raw.to_string())
  }
}

impl From<Category> for String {
  fn from(category: Category) -> Self {
    category.as_str().to_string()
  }
}

impl fmt::Display for Category {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id:          u64,
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub priority:    Priority,
  pub due_date:    NaiveDate,
  #[serde(default)]
  pub category:    Category,
  #[serde(default)]
  pub completed:   bool
}

/// Where a due date sits relative to
/// today.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DueState {
  Overdue,
  Today,
  Upcoming
}

impl Task {
  /// Builds an incomplete task. The id is
  /// a placeholder until the repository
  /// assigns one.
  pub fn new(
    title: impl Into<String>,
    description: impl Into<String>,
    priority: Priority,
    due_date: NaiveDate,
    category: Category
  ) -> Self {
    Self {
      id: 0,
      title: title.into(),
      description: description.into(),
      priority,
      due_date,
      category,
      completed: false
    }
  }

  pub fn is_overdue(
    &self,
    today: NaiveDate
  ) -> bool {
    !self.completed
      && self.due_date < today
  }

  pub fn is_due_on(
    &self,
    day: NaiveDate
  ) -> bool {
    self.due_date == day
  }

  pub fn due_state(
    &self,
    today: NaiveDate
  ) -> DueState {
    if self.is_overdue(today) {
      DueState::Overdue
    } else if self.is_due_on(today) {
      DueState::Today
    } else {
      DueState::Upcoming
    }
  }

  /// Whole days from `today` until the due
  /// date; negative once it has passed.
  pub fn days_until_due(
    &self,
    today: NaiveDate
  ) -> i64 {
    self
      .due_date
      .signed_duration_since(today)
      .num_days()
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    Category,
    DueState,
    Priority,
    Task
  };

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d)
      .expect("valid date")
  }

  #[test]
  fn json_shape_matches_stored_layout()
  {
    let mut task = Task::new(
      "Write report",
      "quarterly numbers",
      Priority::High,
      day(5),
      Category::Work
    );
    task.id = 7;

    let value =
      serde_json::to_value(&task)
        .expect("serialize task");
    assert_eq!(
      value,
      serde_json::json!({
        "id": 7,
        "title": "Write report",
        "description": "quarterly numbers",
        "priority": "high",
        "dueDate": "2026-03-05",
        "category": "work",
        "completed": false
      })
    );
  }

  #[test]
  fn unknown_category_survives_roundtrip()
  {
    let raw = r#"{"id":1,"title":"t","description":"","priority":"low","dueDate":"2026-03-01","category":"errands","completed":true}"#;
    let task: Task =
      serde_json::from_str(raw)
        .expect("parse task");
    assert_eq!(
      task.category,
      Category::Other(
        "errands".to_string()
      )
    );
    let back =
      serde_json::to_string(&task)
        .expect("serialize task");
    assert!(
      back.contains(
        r#""category":"errands""#
      )
    );
  }

  #[test]
  fn missing_priority_and_category_get_defaults()
   {
    let raw = r#"{"id":3,"title":"t","dueDate":"2026-03-01"}"#;
    let task: Task =
      serde_json::from_str(raw)
        .expect("parse task");
    assert_eq!(
      task.priority,
      Priority::Medium
    );
    assert_eq!(
      task.category,
      Category::Work
    );
    assert!(!task.completed);
  }

  #[test]
  fn completed_task_is_never_overdue() {
    let mut task = Task::new(
      "old",
      "",
      Priority::Low,
      day(1),
      Category::Work
    );
    assert_eq!(
      task.due_state(day(4)),
      DueState::Overdue
    );
    task.completed = true;
    assert_eq!(
      task.due_state(day(4)),
      DueState::Upcoming
    );
    assert_eq!(
      task.days_until_due(day(4)),
      -3
    );
  }

  #[test]
  fn priority_parses_short_forms() {
    assert_eq!(
      "H".parse::<Priority>(),
      Ok(Priority::High)
    );
    assert_eq!(
      "med".parse::<Priority>(),
      Ok(Priority::Medium)
    );
    assert!(
      "soon"
        .parse::<Priority>()
        .is_err()
    );
  }
}

//! Keyword and date rules behind the
//! "AI" suggestions.
//!
//! Every function here is pure: same input,
//! same output. Keyword checks are plain
//! case-sensitive substring tests unless a
//! function says otherwise.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::datetime::add_days;
use crate::error::TaskError;
use crate::stats::completion_rate;
use crate::task::{
  Category,
  Priority,
  Task
};

const TITLE_LIMIT: usize = 40;

const SUBTASKS_BLOCK: &str = "\n\nSubtasks:\n- Research\n- Draft outline\n- Write first section\n- Review and edit";

fn contains_any(
  text: &str,
  needles: &[&str]
) -> bool {
  needles
    .iter()
    .any(|needle| text.contains(needle))
}

pub fn infer_priority(
  text: &str
) -> Priority {
  if contains_any(
    text,
    &["urgent", "asap", "important"]
  ) {
    Priority::High
  } else if contains_any(
    text,
    &[
      "when you have time",
      "not important"
    ]
  ) {
    Priority::Low
  } else {
    Priority::Medium
  }
}

pub fn infer_category(
  text: &str
) -> Category {
  if contains_any(
    text,
    &["personal", "family", "home"]
  ) {
    Category::Personal
  } else if contains_any(
    text,
    &["exercise", "health", "doctor"]
  ) {
    Category::Health
  } else if contains_any(
    text,
    &["learn", "study", "read"]
  ) {
    Category::Learning
  } else {
    Category::Work
  }
}

/// First matching rule wins; a week out
/// when nothing matches.
pub fn infer_deadline(
  text: &str,
  today: NaiveDate
) -> NaiveDate {
  let days = if contains_any(
    text,
    &["today", "asap"]
  ) {
    0
  } else if text.contains("tomorrow") {
    1
  } else if text.contains("next week") {
    7
  } else if text.contains("month") {
    30
  } else {
    7
  };
  add_days(today, days)
}

pub fn suggest_labels(
  text: &str
) -> Vec<&'static str> {
  let groups: [(&[&str], &str); 4] = [
    (
      &["work", "office", "project"],
      "work"
    ),
    (
      &["home", "family", "personal"],
      "personal"
    ),
    (
      &["health", "exercise", "doctor"],
      "health"
    ),
    (
      &["learn", "study", "read"],
      "learning"
    )
  ];

  let labels: Vec<&'static str> = groups
    .iter()
    .filter(|(needles, _)| {
      contains_any(text, needles)
    })
    .map(|(_, label)| *label)
    .collect();

  if labels.is_empty() {
    vec!["work", "important"]
  } else {
    labels
  }
}

/// Appends the stock subtask outline
/// unless one is already present.
pub fn suggest_subtasks(
  text: &str
) -> String {
  if text.contains("Subtasks:") {
    text.to_string()
  } else {
    format!("{text}{SUBTASKS_BLOCK}")
  }
}

/// Builds a task from free text: the title
/// is the first 40 characters, the full
/// text becomes the description, and the
/// task is due tomorrow.
pub fn parse_task_text(
  text: &str,
  today: NaiveDate
) -> Result<Task, TaskError> {
  let text = text.trim();
  if text.is_empty() {
    return Err(TaskError::EmptyText);
  }

  let title =
    if text.chars().count() > TITLE_LIMIT
    {
      let head: String = text
        .chars()
        .take(TITLE_LIMIT)
        .collect();
      format!("{head}...")
    } else {
      text.to_string()
    };

  Ok(Task::new(
    title,
    text,
    infer_priority(text),
    add_days(today, 1),
    infer_category(text)
  ))
}

/// Escalates incomplete tasks that mention
/// "urgent" in the title (any case) or are
/// past due. Returns how many changed.
pub fn reprioritize_by_urgency_and_overdue(
  tasks: &mut [Task],
  today: NaiveDate
) -> usize {
  let mut changed = 0;
  for task in tasks
    .iter_mut()
    .filter(|t| !t.completed)
  {
    let urgent = task
      .title
      .to_lowercase()
      .contains("urgent");
    if (urgent || task.is_overdue(today))
      && task.priority != Priority::High
    {
      debug!(id = task.id, urgent, "escalating task");
      task.priority = Priority::High;
      changed += 1;
    }
  }
  changed
}

/// Recomputes every priority from the days
/// left until the due date, completed tasks
/// included.
pub fn reprioritize_by_due_window(
  tasks: &mut [Task],
  today: NaiveDate
) -> usize {
  let mut changed = 0;
  for task in tasks.iter_mut() {
    let next = priority_for_days_left(
      task.days_until_due(today)
    );
    if next != task.priority {
      task.priority = next;
      changed += 1;
    }
  }
  changed
}

pub fn priority_for_days_left(
  days: i64
) -> Priority {
  match days {
    | d if d < 0 => Priority::High,
    | 0..=2 => Priority::High,
    | 3..=7 => Priority::Medium,
    | _ => Priority::Low
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct Recommendation {
  pub title:   String,
  pub message: String
}

impl Recommendation {
  fn new(
    title: &str,
    message: impl Into<String>
  ) -> Self {
    Self {
      title:   title.to_string(),
      message: message.into()
    }
  }
}

fn plural(count: usize) -> &'static str {
  if count > 1 { "s" } else { "" }
}

pub fn build_recommendations(
  tasks: &[Task],
  today: NaiveDate
) -> Vec<Recommendation> {
  if tasks.is_empty() {
    return vec![Recommendation::new(
      "Add tasks to get personalized \
       recommendations",
      "I can help you prioritize and \
       schedule your tasks once you add \
       them."
    )];
  }

  let open_with = |priority: Priority| {
    tasks
      .iter()
      .filter(|t| {
        !t.completed
          && t.priority == priority
      })
      .count()
  };
  let high = open_with(Priority::High);
  let medium = open_with(Priority::Medium);
  let low = open_with(Priority::Low);
  let overdue = tasks
    .iter()
    .filter(|t| t.is_overdue(today))
    .count();

  let mut out = Vec::new();

  if overdue > 0 {
    out.push(Recommendation::new(
      "Address overdue tasks",
      format!(
        "You have {overdue} overdue \
         task{}. Consider completing \
         these first.",
        plural(overdue)
      )
    ));
  }

  if high > 0 {
    out.push(Recommendation::new(
      "Focus on high-priority tasks",
      format!(
        "You have {high} high-priority \
         task{}. Schedule time for these \
         important tasks.",
        plural(high)
      )
    ));
  }

  if medium > 3 {
    out.push(Recommendation::new(
      "Break down medium-priority tasks",
      "You have several medium-priority \
       tasks. Consider breaking them into \
       smaller subtasks."
    ));
  }

  if low > 5 {
    out.push(Recommendation::new(
      "Review low-priority tasks",
      "You have many low-priority tasks. \
       Consider delegating or removing \
       some if they're not essential."
    ));
  }

  if out.is_empty() {
    out.push(Recommendation::new(
      "Maintain your productivity",
      "Your task load looks manageable. \
       Keep up the good work and focus on \
       one task at a time."
    ));
  }

  if completion_rate(tasks) < 50 {
    out.push(Recommendation::new(
      "Improve your completion rate",
      "Try using the Pomodoro technique \
       (25 minutes focused work, 5 minutes \
       break) to boost productivity."
    ));
  }

  out
}

/// What to work on today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodaySuggestion {
  /// Incomplete tasks due today, by title.
  DueToday(Vec<String>),
  /// Nothing due today; the open task
  /// with the earliest due date.
  MostUrgent(String),
  NothingPending
}

pub fn suggest_today_work(
  tasks: &[Task],
  today: NaiveDate
) -> TodaySuggestion {
  let due_today: Vec<String> = tasks
    .iter()
    .filter(|t| {
      !t.completed && t.is_due_on(today)
    })
    .map(|t| t.title.clone())
    .collect();
  if !due_today.is_empty() {
    return TodaySuggestion::DueToday(
      due_today
    );
  }

  tasks
    .iter()
    .filter(|t| !t.completed)
    .min_by_key(|t| t.due_date)
    .map(|t| {
      TodaySuggestion::MostUrgent(
        t.title.clone()
      )
    })
    .unwrap_or(
      TodaySuggestion::NothingPending
    )
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    TodaySuggestion,
    build_recommendations,
    infer_category,
    infer_deadline,
    infer_priority,
    parse_task_text,
    reprioritize_by_due_window,
    reprioritize_by_urgency_and_overdue,
    suggest_labels,
    suggest_subtasks,
    suggest_today_work
  };
  use crate::datetime::add_days;
  use crate::error::TaskError;
  use crate::task::{
    Category,
    Priority,
    Task
  };

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 20)
      .expect("valid date")
  }

  fn days_ago(n: u64) -> NaiveDate {
    today()
      .checked_sub_days(chrono::Days::new(n))
      .expect("valid date")
  }

  fn task(
    id: u64,
    title: &str,
    priority: Priority,
    due: NaiveDate,
    completed: bool
  ) -> Task {
    let mut t = Task::new(
      title,
      "",
      priority,
      due,
      Category::Work
    );
    t.id = id;
    t.completed = completed;
    t
  }

  #[test]
  fn priority_keywords() {
    assert_eq!(
      infer_priority("this is urgent"),
      Priority::High
    );
    assert_eq!(
      infer_priority(
        "no rush, when you have time"
      ),
      Priority::Low
    );
    assert_eq!(
      infer_priority("buy milk"),
      Priority::Medium
    );
    // case-sensitive
    assert_eq!(
      infer_priority("URGENT"),
      Priority::Medium
    );
    // the high rule is checked first
    assert_eq!(
      infer_priority("not important"),
      Priority::High
    );
  }

  #[test]
  fn category_keywords_in_rule_order() {
    assert_eq!(
      infer_category("call family"),
      Category::Personal
    );
    assert_eq!(
      infer_category("see the doctor"),
      Category::Health
    );
    assert_eq!(
      infer_category("study rust"),
      Category::Learning
    );
    assert_eq!(
      infer_category("read at home"),
      Category::Personal
    );
    assert_eq!(
      infer_category("ship it"),
      Category::Work
    );
  }

  #[test]
  fn deadline_rules() {
    assert_eq!(
      infer_deadline("do it asap", today()),
      today()
    );
    assert_eq!(
      infer_deadline(
        "by tomorrow",
        today()
      ),
      add_days(today(), 1)
    );
    assert_eq!(
      infer_deadline(
        "sometime next week",
        today()
      ),
      add_days(today(), 7)
    );
    assert_eq!(
      infer_deadline(
        "within a month",
        today()
      ),
      add_days(today(), 30)
    );
    assert_eq!(
      infer_deadline(
        "today or next month",
        today()
      ),
      today()
    );
    assert_eq!(
      infer_deadline("whenever", today()),
      add_days(today(), 7)
    );
  }

  #[test]
  fn labels_collect_every_group_once() {
    assert_eq!(
      suggest_labels(
        "read the project docs at the office"
      ),
      vec!["work", "learning"]
    );
    assert_eq!(
      suggest_labels(
        "family dinner, then exercise"
      ),
      vec!["personal", "health"]
    );
    assert_eq!(
      suggest_labels("buy milk"),
      vec!["work", "important"]
    );
  }

  #[test]
  fn subtasks_are_appended_once() {
    let once = suggest_subtasks("Write blog post");
    assert!(once.starts_with("Write blog post\n\nSubtasks:\n- Research"));
    assert_eq!(suggest_subtasks(&once), once);
  }

  #[test]
  fn free_text_becomes_task() {
    let text = "urgent: call the family about the trip planning tonight";
    let task =
      parse_task_text(text, today())
        .expect("parse");
    assert_eq!(
      task.title,
      "urgent: call the family about the trip p..."
    );
    assert_eq!(task.description, text);
    assert_eq!(
      task.priority,
      Priority::High
    );
    assert_eq!(
      task.category,
      Category::Personal
    );
    assert_eq!(
      task.due_date,
      add_days(today(), 1)
    );
    assert!(!task.completed);

    assert_eq!(
      parse_task_text("   ", today()),
      Err(TaskError::EmptyText)
    );
  }

  #[test]
  fn short_text_keeps_full_title() {
    let task =
      parse_task_text("  buy milk ", today())
        .expect("parse");
    assert_eq!(task.title, "buy milk");
  }

  #[test]
  fn escalation_never_downgrades_or_touches_completed()
   {
    let mut tasks = vec![
      task(1, "URGENT fix", Priority::Low, add_days(today(), 9), false),
      task(2, "old", Priority::Medium, days_ago(1), false),
      task(3, "done urgent", Priority::Low, days_ago(3), true),
      task(4, "calm", Priority::High, add_days(today(), 20), false),
      task(5, "due today", Priority::Low, today(), false),
    ];
    let changed =
      reprioritize_by_urgency_and_overdue(
        &mut tasks,
        today()
      );
    assert_eq!(changed, 2);
    let priorities: Vec<Priority> =
      tasks.iter().map(|t| t.priority).collect();
    assert_eq!(
      priorities,
      vec![
        Priority::High,
        Priority::High,
        Priority::Low,
        Priority::High,
        Priority::Low,
      ]
    );
  }

  #[test]
  fn due_window_overwrites_priority() {
    let mut tasks = vec![
      task(1, "far", Priority::High, add_days(today(), 10), false),
      task(2, "week", Priority::Low, add_days(today(), 5), false),
      task(3, "soon", Priority::Low, add_days(today(), 2), false),
      task(4, "late", Priority::Low, days_ago(4), false),
      task(5, "edge", Priority::Low, add_days(today(), 7), false),
      task(6, "edge", Priority::High, add_days(today(), 8), false),
    ];
    reprioritize_by_due_window(
      &mut tasks,
      today()
    );
    let priorities: Vec<Priority> =
      tasks.iter().map(|t| t.priority).collect();
    assert_eq!(
      priorities,
      vec![
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::High,
        Priority::Medium,
        Priority::Low,
      ]
    );
  }

  #[test]
  fn due_window_includes_completed_tasks()
   {
    let mut tasks = vec![task(
      1,
      "done",
      Priority::Low,
      today(),
      true
    )];
    reprioritize_by_due_window(
      &mut tasks,
      today()
    );
    assert_eq!(
      tasks[0].priority,
      Priority::High
    );
  }

  #[test]
  fn all_done_on_time_yields_only_the_default()
   {
    let tasks = vec![
      task(1, "a", Priority::High, today(), true),
      task(2, "b", Priority::Low, days_ago(2), true),
    ];
    let recs =
      build_recommendations(&tasks, today());
    assert_eq!(recs.len(), 1);
    assert_eq!(
      recs[0].title,
      "Maintain your productivity"
    );
  }

  #[test]
  fn recommendations_follow_condition_order()
   {
    let mut tasks = vec![
      task(1, "late", Priority::Low, days_ago(1), false),
      task(2, "big", Priority::High, today(), false),
    ];
    for id in 3..7 {
      tasks.push(task(
        id,
        "mid",
        Priority::Medium,
        add_days(today(), 3),
        false
      ));
    }
    let recs =
      build_recommendations(&tasks, today());
    let titles: Vec<&str> = recs
      .iter()
      .map(|r| r.title.as_str())
      .collect();
    assert_eq!(
      titles,
      vec![
        "Address overdue tasks",
        "Focus on high-priority tasks",
        "Break down medium-priority tasks",
        "Improve your completion rate",
      ]
    );
    assert_eq!(
      recs[0].message,
      "You have 1 overdue task. Consider completing these first."
    );
  }

  #[test]
  fn many_low_tasks_suggest_a_review() {
    let tasks: Vec<Task> = (1..=6)
      .map(|id| {
        task(
          id,
          "chore",
          Priority::Low,
          add_days(today(), 10),
          false
        )
      })
      .collect();
    let recs =
      build_recommendations(&tasks, today());
    assert_eq!(
      recs[0].title,
      "Review low-priority tasks"
    );
    assert_eq!(recs.len(), 2);
  }

  #[test]
  fn empty_list_gets_a_prompt() {
    let recs =
      build_recommendations(&[], today());
    assert_eq!(recs.len(), 1);
    assert!(
      recs[0].title.starts_with("Add tasks")
    );
  }

  #[test]
  fn today_suggestion_prefers_tasks_due_today()
   {
    let tasks = vec![
      task(1, "later", Priority::Low, add_days(today(), 3), false),
      task(2, "now", Priority::Low, today(), false),
    ];
    assert_eq!(
      suggest_today_work(&tasks, today()),
      TodaySuggestion::DueToday(vec![
        "now".to_string()
      ])
    );

    let tasks = vec![
      task(1, "later", Priority::Low, add_days(today(), 3), false),
      task(2, "sooner", Priority::Low, add_days(today(), 1), false),
    ];
    assert_eq!(
      suggest_today_work(&tasks, today()),
      TodaySuggestion::MostUrgent(
        "sooner".to_string()
      )
    );

    let tasks = vec![task(
      1,
      "done",
      Priority::Low,
      today(),
      true
    )];
    assert_eq!(
      suggest_today_work(&tasks, today()),
      TodaySuggestion::NothingPending
    );
  }
}

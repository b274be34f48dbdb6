use serde::Serialize;

use crate::task::Task;

fn completed_count(tasks: &[Task]) -> usize {
  tasks.iter().filter(|t| t.completed).count()
}

/// Percentage of completed tasks, rounded
/// to the nearest integer. Always within
/// 0..=100.
pub fn completion_rate(
  tasks: &[Task]
) -> u32 {
  if tasks.is_empty() {
    return 0;
  }
  let ratio = completed_count(tasks) as f64
    / tasks.len() as f64;
  (ratio * 100.0).round() as u32
}

/// Half an hour per completed task, to one
/// decimal place.
pub fn focus_hours(tasks: &[Task]) -> f64 {
  let hours =
    completed_count(tasks) as f64 * 0.5;
  (hours * 10.0).round() / 10.0
}

pub fn analysis_message(
  tasks: &[Task]
) -> &'static str {
  let completed = completed_count(tasks);
  let rate = completion_rate(tasks);
  if tasks.is_empty() {
    "You have no tasks yet. Add some tasks \
     to get AI insights!"
  } else if completed == 0 {
    "You have tasks to complete. Try \
     focusing on one task at a time for \
     better productivity."
  } else if rate < 50 {
    "You've completed some tasks. Try \
     using time blocking to improve your \
     focus."
  } else if rate < 80 {
    "Good progress! You're more than \
     halfway through your tasks."
  } else {
    "Great job! You've been productive. \
     Keep up the good work!"
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
  pub total:           usize,
  pub completed:       usize,
  pub active:          usize,
  pub completion_rate: u32,
  pub focus_hours:     f64,
  pub analysis:        &'static str
}

impl Stats {
  pub fn compute(tasks: &[Task]) -> Self {
    let completed = completed_count(tasks);
    Self {
      total: tasks.len(),
      completed,
      active: tasks.len() - completed,
      completion_rate: completion_rate(
        tasks
      ),
      focus_hours: focus_hours(tasks),
      analysis: analysis_message(tasks)
    }
  }
}

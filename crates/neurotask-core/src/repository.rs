use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde_json::{
  Value,
  json
};
use tracing::{
  debug,
  info,
  warn
};

use crate::error::TaskError;
use crate::store::KeyValueStore;
use crate::task::{
  Category,
  Priority,
  Task
};

/// Slot holding the whole task list.
pub const TASKS_KEY: &str =
  "neurotask-tasks";
/// Slot holding the highest id ever
/// handed out.
pub const LAST_ID_KEY: &str =
  "neurotask-last-id";

/// What to do when the task slot has never
/// been written.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum SeedPolicy {
  Empty,
  Examples
}

/// Owner of the ordered task list. Every
/// mutation is written back to the store
/// before the call returns.
#[derive(Debug)]
pub struct TaskRepository<S> {
  store:   S,
  tasks:   Vec<Task>,
  last_id: u64
}

impl<S: KeyValueStore> TaskRepository<S> {
  /// Reads the task slot. Never fails:
  /// unreadable or corrupt data degrades
  /// to an empty list.
  #[tracing::instrument(skip(store))]
  pub fn load(
    store: S,
    seed: SeedPolicy,
    today: NaiveDate
  ) -> Self {
    let mut repo = Self {
      store,
      tasks: Vec::new(),
      last_id: 0
    };

    let mut first_run = false;
    repo.tasks = match repo
      .store
      .try_get(TASKS_KEY)
    {
      | Ok(Some(value)) => {
        decode_tasks(value)
      }
      | Ok(None) => {
        first_run = true;
        match seed {
          | SeedPolicy::Examples => {
            info!("first run; seeding example tasks");
            example_tasks(today)
          }
          | SeedPolicy::Empty => {
            Vec::new()
          }
        }
      }
      | Err(err) => {
        warn!(error = %format!("{err:#}"), "task store unavailable; starting empty");
        Vec::new()
      }
    };

    let stored_last_id = repo
      .store
      .get(LAST_ID_KEY)
      .and_then(|value| value.as_u64())
      .unwrap_or(0);
    repo.last_id = stored_last_id
      .max(max_id(&repo.tasks));
    repo.dedupe_ids();

    if first_run {
      repo.persist();
    }

    debug!(
      count = repo.tasks.len(),
      last_id = repo.last_id,
      "loaded tasks"
    );
    repo
  }

  pub fn all(&self) -> &[Task] {
    &self.tasks
  }

  pub fn get(
    &self,
    id: u64
  ) -> Option<&Task> {
    self.tasks.iter().find(|t| t.id == id)
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn next_id(&self) -> u64 {
    self
      .last_id
      .max(max_id(&self.tasks))
      + 1
  }

  /// Assigns the next id and appends the
  /// task.
  #[tracing::instrument(skip(self, task), fields(title = %task.title))]
  pub fn add(
    &mut self,
    mut task: Task
  ) -> Result<u64, TaskError> {
    let title = task.title.trim();
    if title.is_empty() {
      return Err(TaskError::EmptyTitle);
    }
    task.title = title.to_string();

    let id = self.next_id();
    task.id = id;
    self.last_id = id;
    self.tasks.push(task);
    self.persist();

    debug!(id, count = self.tasks.len(), "task added");
    Ok(id)
  }

  /// Applies `mutator` to the task with
  /// `id`. Unknown ids are ignored and
  /// report `false`. The id itself cannot
  /// be changed through the mutator.
  #[tracing::instrument(skip(
    self, mutator
  ))]
  pub fn update<F>(
    &mut self,
    id: u64,
    mutator: F
  ) -> bool
  where
    F: FnOnce(&mut Task)
  {
    let Some(task) = self
      .tasks
      .iter_mut()
      .find(|t| t.id == id)
    else {
      debug!(id, "update on unknown id ignored");
      return false;
    };

    mutator(task);
    task.id = id;
    self.persist();
    true
  }

  /// Flips completion; returns the new
  /// state.
  pub fn toggle(
    &mut self,
    id: u64
  ) -> Option<bool> {
    let mut state = None;
    self.update(id, |task| {
      task.completed = !task.completed;
      state = Some(task.completed);
    });
    state
  }

  /// Removes and returns the task, for the
  /// edit-and-resubmit flow.
  #[tracing::instrument(skip(self))]
  pub fn take(
    &mut self,
    id: u64
  ) -> Option<Task> {
    let Some(idx) = self
      .tasks
      .iter()
      .position(|t| t.id == id)
    else {
      debug!(id, "remove on unknown id ignored");
      return None;
    };

    let task = self.tasks.remove(idx);
    self.persist();
    Some(task)
  }

  pub fn remove(
    &mut self,
    id: u64
  ) -> bool {
    self.take(id).is_some()
  }

  /// Incomplete first, then priority high
  /// to low, then earliest due date. Ties
  /// keep their relative order.
  #[tracing::instrument(skip(self))]
  pub fn sort(&mut self) {
    self.tasks.sort_by(compare_for_sort);
    self.persist();
  }

  /// Runs a whole-list transformation (the
  /// reprioritize heuristics) and persists
  /// the result.
  pub fn apply<F, R>(
    &mut self,
    f: F
  ) -> R
  where
    F: FnOnce(&mut [Task]) -> R
  {
    let out = f(&mut self.tasks);
    self.persist();
    out
  }

  /// Wipes the stored slots and the
  /// in-memory list, then writes back an
  /// empty list. The id high-water mark
  /// survives, so numbering continues and
  /// the next load does not reseed.
  #[tracing::instrument(skip(self))]
  pub fn reset(&mut self) -> bool {
    self.tasks.clear();
    let cleared = self.store.clear();
    let saved = self.persist();
    info!(cleared, saved, last_id = self.last_id, "repository reset");
    cleared && saved
  }

  fn persist(&mut self) -> bool {
    let value =
      match serde_json::to_value(
        &self.tasks
      ) {
        | Ok(value) => value,
        | Err(err) => {
          warn!(error = %err, "failed to serialize tasks");
          return false;
        }
      };

    let saved =
      self.store.set(TASKS_KEY, &value);
    let marked = self
      .store
      .set(LAST_ID_KEY, &json!(self.last_id));
    if !saved {
      warn!("tasks kept in memory only");
    }
    saved && marked
  }

  fn dedupe_ids(&mut self) {
    let mut seen = BTreeSet::new();
    let mut changed = false;
    for task in &mut self.tasks {
      if !seen.insert(task.id) || task.id == 0 {
        self.last_id += 1;
        warn!(
          old = task.id,
          new = self.last_id,
          "reassigning duplicate task id"
        );
        task.id = self.last_id;
        seen.insert(task.id);
        changed = true;
      }
    }
    if changed {
      self.persist();
    }
  }
}

pub fn compare_for_sort(
  a: &Task,
  b: &Task
) -> Ordering {
  a.completed
    .cmp(&b.completed)
    .then_with(|| {
      a.priority.rank().cmp(&b.priority.rank())
    })
    .then_with(|| {
      a.due_date.cmp(&b.due_date)
    })
}

/// Three starter tasks, all due today.
pub fn example_tasks(
  today: NaiveDate
) -> Vec<Task> {
  let mut tasks = vec![
    Task::new(
      "Finish project proposal",
      "Draft the scope and timeline \
       for the new client project",
      Priority::High,
      today,
      Category::Work
    ),
    Task::new(
      "Schedule doctor appointment",
      "Annual check-up",
      Priority::Medium,
      today,
      Category::Health
    ),
    Task::new(
      "Read a chapter of a book",
      "",
      Priority::Low,
      today,
      Category::Learning
    ),
  ];
  tasks[2].completed = true;
  for (idx, task) in
    tasks.iter_mut().enumerate()
  {
    task.id = idx as u64 + 1;
  }
  tasks
}

fn decode_tasks(value: Value) -> Vec<Task> {
  match serde_json::from_value::<
    Vec<Task>
  >(value)
  {
    | Ok(tasks) => tasks,
    | Err(err) => {
      warn!(error = %err, "stored tasks are corrupt; starting empty");
      Vec::new()
    }
  }
}

fn max_id(tasks: &[Task]) -> u64 {
  tasks
    .iter()
    .map(|t| t.id)
    .max()
    .unwrap_or(0)
}

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::cli::{
  Command,
  PrioritizeMode,
  SuggestCommand
};
use crate::datetime::{
  format_date,
  parse_due_expr
};
use crate::delay::{
  ActionGate,
  ActionKind
};
use crate::heuristics::{
  TodaySuggestion,
  build_recommendations,
  infer_deadline,
  parse_task_text,
  reprioritize_by_due_window,
  reprioritize_by_urgency_and_overdue,
  suggest_labels,
  suggest_subtasks,
  suggest_today_work
};
use crate::render::Renderer;
use crate::repository::TaskRepository;
use crate::stats::Stats;
use crate::store::KeyValueStore;
use crate::task::{
  Category,
  Priority,
  Task
};
use crate::views::{
  TaskView,
  ViewFilter,
  dashboard_view,
  filtered_view
};

/// Field values supplied on the command
/// line; `None` keeps the existing value.
#[derive(Debug, Clone, Default)]
pub struct TaskEdits {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub due:         Option<String>,
  pub priority:    Option<String>,
  pub category:    Option<String>
}

#[derive(Debug, Clone)]
pub enum Action {
  Add(TaskEdits),
  Parse(String),
  Toggle(u64),
  Delete(u64),
  Edit { id: u64, edits: TaskEdits },
  Sort,
  List(ViewFilter),
  Dashboard,
  Info(u64),
  Stats { json: bool },
  Insights { json: bool },
  Prioritize(PrioritizeMode),
  SuggestDeadline(String),
  SuggestLabels(String),
  SuggestSubtasks(String),
  SuggestToday,
  Export,
  Reset
}

impl From<Command> for Action {
  fn from(cmd: Command) -> Self {
    match cmd {
      | Command::Add {
        title,
        description,
        due,
        priority,
        category
      } => Self::Add(TaskEdits {
        title: Some(title.join(" ")),
        description,
        due,
        priority,
        category
      }),
      | Command::Parse { text } => {
        Self::Parse(text.join(" "))
      }
      | Command::Toggle { id } => {
        Self::Toggle(id)
      }
      | Command::Delete { id } => {
        Self::Delete(id)
      }
      | Command::Edit {
        id,
        title,
        description,
        due,
        priority,
        category
      } => Self::Edit {
        id,
        edits: TaskEdits {
          title,
          description,
          due,
          priority,
          category
        }
      },
      | Command::Sort => Self::Sort,
      | Command::List { filter } => {
        let filter = filter
          .as_deref()
          .unwrap_or("all")
          .parse::<ViewFilter>()
          .unwrap_or_default();
        Self::List(filter)
      }
      | Command::Dashboard => Self::Dashboard,
      | Command::Info { id } => Self::Info(id),
      | Command::Stats { json } => {
        Self::Stats { json }
      }
      | Command::Insights { json } => {
        Self::Insights { json }
      }
      | Command::Prioritize { mode } => {
        Self::Prioritize(mode)
      }
      | Command::Suggest { what } => {
        match what {
          | SuggestCommand::Deadline {
            text
          } => Self::SuggestDeadline(
            text.join(" ")
          ),
          | SuggestCommand::Labels {
            text
          } => {
            Self::SuggestLabels(text.join(" "))
          }
          | SuggestCommand::Subtasks {
            text
          } => Self::SuggestSubtasks(
            text.join(" ")
          ),
          | SuggestCommand::Today => {
            Self::SuggestToday
          }
        }
      }
      | Command::Export => Self::Export,
      | Command::Reset => Self::Reset
    }
  }
}

impl Action {
  /// Resolves the `default.command`
  /// setting used when no subcommand is
  /// given.
  pub fn from_default_name(
    name: &str
  ) -> anyhow::Result<Self> {
    match name.trim() {
      | "dashboard" => Ok(Self::Dashboard),
      | "list" => {
        Ok(Self::List(ViewFilter::All))
      }
      | "stats" => {
        Ok(Self::Stats { json: false })
      }
      | "insights" => {
        Ok(Self::Insights { json: false })
      }
      | "export" => Ok(Self::Export),
      | other => Err(anyhow!(
        "unsupported default.command: \
         {other}"
      ))
    }
  }
}

#[instrument(skip(repo, gate, renderer))]
pub fn dispatch<S: KeyValueStore>(
  repo: &mut TaskRepository<S>,
  gate: &mut ActionGate,
  renderer: &mut Renderer,
  action: Action,
  today: NaiveDate
) -> anyhow::Result<()> {
  debug!(?action, %today, "dispatching action");

  match action {
    | Action::Add(edits) => {
      cmd_add(repo, renderer, edits, today)
    }
    | Action::Parse(text) => {
      cmd_parse(repo, gate, renderer, &text, today)
    }
    | Action::Toggle(id) => {
      cmd_toggle(repo, renderer, id)
    }
    | Action::Delete(id) => {
      cmd_delete(repo, renderer, id)
    }
    | Action::Edit { id, edits } => {
      cmd_edit(repo, renderer, id, edits, today)
    }
    | Action::Sort => {
      repo.sort();
      renderer.notify(
        "Tasks sorted by priority and due \
         date."
      )
    }
    | Action::List(filter) => {
      cmd_list(repo, renderer, filter, today)
    }
    | Action::Dashboard => {
      cmd_dashboard(repo, renderer, today)
    }
    | Action::Info(id) => {
      cmd_info(repo, renderer, id, today)
    }
    | Action::Stats { json } => {
      cmd_stats(repo, renderer, json)
    }
    | Action::Insights { json } => {
      cmd_insights(
        repo, gate, renderer, json, today
      )
    }
    | Action::Prioritize(mode) => {
      cmd_prioritize(
        repo, gate, renderer, mode, today
      )
    }
    | Action::SuggestDeadline(text) => {
      let due = infer_deadline(&text, today);
      renderer.notify(&format!(
        "AI suggests a deadline of {} for \
         this task based on your \
         description.",
        format_date(due)
      ))
    }
    | Action::SuggestLabels(text) => {
      let labels: Vec<String> =
        suggest_labels(&text)
          .into_iter()
          .map(capitalize)
          .collect();
      renderer.notify(&format!(
        "AI suggests adding labels: {}",
        labels.join(", ")
      ))
    }
    | Action::SuggestSubtasks(text) => {
      renderer.notify(&suggest_subtasks(&text))?;
      renderer.notify(
        "I've added some suggested \
         subtasks. Feel free to modify \
         them!"
      )
    }
    | Action::SuggestToday => {
      cmd_suggest_today(
        repo, gate, renderer, today
      )
    }
    | Action::Export => cmd_export(repo),
    | Action::Reset => {
      let cleared = repo.reset();
      if !cleared {
        warn!("store could not be cleared; in-memory list reset only");
      }
      renderer.notify("All tasks removed.")
    }
  }
}

fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    | Some(first) => {
      first.to_uppercase().chain(chars).collect()
    }
    | None => String::new()
  }
}

fn not_found(
  renderer: &mut Renderer,
  id: u64
) -> anyhow::Result<()> {
  warn!(id, "no task with that id");
  renderer.notify(&format!(
    "No task with id {id}."
  ))
}

/// Builds a task from explicit fields.
/// Every field is validated before
/// anything is stored.
fn build_task(
  edits: TaskEdits,
  base: Option<&Task>,
  today: NaiveDate
) -> anyhow::Result<Task> {
  let title = edits
    .title
    .or_else(|| base.map(|t| t.title.clone()))
    .unwrap_or_default();
  let description = edits
    .description
    .or_else(|| {
      base.map(|t| t.description.clone())
    })
    .unwrap_or_default();

  let due_date = match edits.due {
    | Some(expr) => {
      parse_due_expr(&expr, today)?
    }
    | None => {
      base.map(|t| t.due_date).unwrap_or(today)
    }
  };
  let priority = match edits.priority {
    | Some(raw) => raw.parse::<Priority>()?,
    | None => base
      .map(|t| t.priority)
      .unwrap_or_default()
  };
  let category = match edits.category {
    | Some(raw) => Category::from(raw),
    | None => base
      .map(|t| t.category.clone())
      .unwrap_or_default()
  };

  let task = Task::new(
    title,
    description,
    priority,
    due_date,
    category
  );
  if task.title.trim().is_empty() {
    return Err(
      crate::error::TaskError::EmptyTitle
        .into()
    );
  }
  Ok(task)
}

#[instrument(skip(repo, renderer, edits))]
fn cmd_add<S: KeyValueStore>(
  repo: &mut TaskRepository<S>,
  renderer: &mut Renderer,
  edits: TaskEdits,
  today: NaiveDate
) -> anyhow::Result<()> {
  info!("command add");

  let task = build_task(edits, None, today)?;
  let id = repo.add(task)?;
  info!(id, "task added");
  renderer.notify("Task added successfully!")
}

#[instrument(skip(repo, gate, renderer, text))]
fn cmd_parse<S: KeyValueStore>(
  repo: &mut TaskRepository<S>,
  gate: &mut ActionGate,
  renderer: &mut Renderer,
  text: &str,
  today: NaiveDate
) -> anyhow::Result<()> {
  info!("command parse");

  let task = parse_task_text(text, today)?;
  let Some(added) =
    gate.run(ActionKind::ParseText, || {
      repo.add(task)
    })
  else {
    return Ok(());
  };

  let id = added?;
  info!(id, "task parsed from text");
  renderer.notify(
    "Task added successfully! AI has \
     parsed your input and set \
     appropriate parameters."
  )
}

#[instrument(skip(repo, renderer))]
fn cmd_toggle<S: KeyValueStore>(
  repo: &mut TaskRepository<S>,
  renderer: &mut Renderer,
  id: u64
) -> anyhow::Result<()> {
  match repo.toggle(id) {
    | Some(true) => renderer.notify(
      &format!("Task {id} completed.")
    ),
    | Some(false) => renderer.notify(
      &format!("Task {id} reopened.")
    ),
    | None => not_found(renderer, id)
  }
}

#[instrument(skip(repo, renderer))]
fn cmd_delete<S: KeyValueStore>(
  repo: &mut TaskRepository<S>,
  renderer: &mut Renderer,
  id: u64
) -> anyhow::Result<()> {
  if repo.remove(id) {
    renderer
      .notify("Task deleted successfully")
  } else {
    not_found(renderer, id)
  }
}

/// Removes the task and adds it back with
/// the merged fields. The replacement gets
/// a fresh id and starts open.
#[instrument(skip(repo, renderer, edits))]
fn cmd_edit<S: KeyValueStore>(
  repo: &mut TaskRepository<S>,
  renderer: &mut Renderer,
  id: u64,
  edits: TaskEdits,
  today: NaiveDate
) -> anyhow::Result<()> {
  let Some(existing) = repo.get(id) else {
    return not_found(renderer, id);
  };
  let replacement =
    build_task(edits, Some(existing), today)
      .with_context(|| {
        format!("cannot edit task {id}")
      })?;

  repo.take(id);
  let new_id = repo.add(replacement)?;
  info!(old = id, new = new_id, "task edited");
  renderer.notify(&format!(
    "Task updated (now id {new_id})."
  ))
}

fn views_of(
  tasks: &[Task],
  today: NaiveDate
) -> Vec<TaskView> {
  tasks
    .iter()
    .map(|t| TaskView::from_task(t, today))
    .collect()
}

#[instrument(skip(repo, renderer))]
fn cmd_list<S: KeyValueStore>(
  repo: &TaskRepository<S>,
  renderer: &mut Renderer,
  filter: ViewFilter,
  today: NaiveDate
) -> anyhow::Result<()> {
  let rows =
    filtered_view(repo.all(), filter, today);
  renderer.print_task_table(
    &views_of(&rows, today),
    "No tasks found"
  )
}

#[instrument(skip(repo, renderer))]
fn cmd_dashboard<S: KeyValueStore>(
  repo: &TaskRepository<S>,
  renderer: &mut Renderer,
  today: NaiveDate
) -> anyhow::Result<()> {
  let rows = dashboard_view(repo.all(), today);
  renderer.print_task_table(
    &views_of(&rows, today),
    "No tasks for today. Add a new task to \
     get started!"
  )?;
  println!();
  renderer.print_stats(&Stats::compute(
    repo.all()
  ))
}

#[instrument(skip(repo, renderer))]
fn cmd_info<S: KeyValueStore>(
  repo: &TaskRepository<S>,
  renderer: &mut Renderer,
  id: u64,
  today: NaiveDate
) -> anyhow::Result<()> {
  match repo.get(id) {
    | Some(task) => renderer.print_task_info(
      &TaskView::from_task(task, today)
    ),
    | None => not_found(renderer, id)
  }
}

#[instrument(skip(repo, renderer))]
fn cmd_stats<S: KeyValueStore>(
  repo: &TaskRepository<S>,
  renderer: &mut Renderer,
  json: bool
) -> anyhow::Result<()> {
  let stats = Stats::compute(repo.all());
  if json {
    println!(
      "{}",
      serde_json::to_string_pretty(&stats)?
    );
    return Ok(());
  }
  renderer.print_stats(&stats)
}

#[instrument(skip(repo, gate, renderer))]
fn cmd_insights<S: KeyValueStore>(
  repo: &TaskRepository<S>,
  gate: &mut ActionGate,
  renderer: &mut Renderer,
  json: bool,
  today: NaiveDate
) -> anyhow::Result<()> {
  if !gate.delay().is_zero() && !json {
    renderer.notify(
      "AI is analyzing your tasks and will \
       provide recommendations..."
    )?;
  }
  let Some(recommendations) =
    gate.run(ActionKind::Analyze, || {
      build_recommendations(repo.all(), today)
    })
  else {
    return Ok(());
  };

  if json {
    println!(
      "{}",
      serde_json::to_string_pretty(
        &recommendations
      )?
    );
    return Ok(());
  }
  renderer.print_recommendations(&recommendations)
}

#[instrument(skip(repo, gate, renderer))]
fn cmd_prioritize<S: KeyValueStore>(
  repo: &mut TaskRepository<S>,
  gate: &mut ActionGate,
  renderer: &mut Renderer,
  mode: PrioritizeMode,
  today: NaiveDate
) -> anyhow::Result<()> {
  if repo.all().is_empty() {
    return renderer.notify(
      "Add some tasks first to prioritize"
    );
  }

  let Some(changed) =
    gate.run(ActionKind::Prioritize, || {
      repo.apply(|tasks| match mode {
        | PrioritizeMode::Urgent => {
          reprioritize_by_urgency_and_overdue(
            tasks, today
          )
        }
        | PrioritizeMode::Window => {
          reprioritize_by_due_window(
            tasks, today
          )
        }
      })
    })
  else {
    return Ok(());
  };

  info!(changed, ?mode, "tasks reprioritized");
  match mode {
    | PrioritizeMode::Urgent => renderer.notify(
      "Tasks have been reprioritized \
       successfully!"
    ),
    | PrioritizeMode::Window => renderer.notify(
      "All tasks have been reprioritized \
       successfully!"
    )
  }
}

#[instrument(skip(repo, gate, renderer))]
fn cmd_suggest_today<S: KeyValueStore>(
  repo: &TaskRepository<S>,
  gate: &mut ActionGate,
  renderer: &mut Renderer,
  today: NaiveDate
) -> anyhow::Result<()> {
  if repo.all().is_empty() {
    return renderer.notify(
      "Add some tasks first to get \
       suggestions"
    );
  }

  let Some(suggestion) =
    gate.run(ActionKind::Suggest, || {
      suggest_today_work(repo.all(), today)
    })
  else {
    return Ok(());
  };

  let message = match suggestion {
    | TodaySuggestion::DueToday(titles) => {
      format!(
        "Based on your schedule, you should \
         work on: {}",
        titles.join(", ")
      )
    }
    | TodaySuggestion::MostUrgent(title) => {
      format!(
        "Based on your schedule, you should \
         work on \"{title}\" first today."
      )
    }
    | TodaySuggestion::NothingPending => {
      "You have no pending tasks. Great job!"
        .to_string()
    }
  };
  renderer.notify(&message)
}

#[instrument(skip(repo))]
fn cmd_export<S: KeyValueStore>(
  repo: &TaskRepository<S>
) -> anyhow::Result<()> {
  let json =
    serde_json::to_string_pretty(repo.all())
      .context("failed to encode tasks")?;
  println!("{json}");
  Ok(())
}

use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{
  ArgAction,
  Parser,
  Subcommand,
  ValueEnum
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
  pub cleaned_args: Vec<OsString>,
  pub rc_overrides: Vec<(String, String)>
}

#[derive(Debug, Clone)]
pub struct KeyVal {
  pub key:   String,
  pub value: String
}

impl std::str::FromStr for KeyVal {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (k, v) =
      s.split_once('=').ok_or_else(|| {
        anyhow!(
          "expected KEY=VALUE, got: {s}"
        )
      })?;
    Ok(Self {
      key:   k.trim().to_string(),
      value: v.trim().to_string()
    })
  }
}

#[derive(Parser, Debug, Clone)]
#[command(
  name = "neurotask",
  version,
  about = "NeuroTask: a task tracker with \
           heuristic assistance",
  disable_help_subcommand = true
)]
pub struct GlobalCli {
  #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
  pub verbose: u8,

  #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
  pub quiet: u8,

  #[arg(
    long = "rc",
    value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
    action = ArgAction::Append
  )]
  pub rc_overrides: Vec<KeyVal>,

  #[arg(long = "config")]
  pub config: Option<PathBuf>,

  #[arg(long = "data")]
  pub data: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Option<Command>
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Add a task from explicit fields
  Add {
    #[arg(required = true, num_args = 1..)]
    title:       Vec<String>,
    #[arg(short = 'd', long)]
    description: Option<String>,
    /// today, tomorrow, friday, +3d,
    /// 2026-05-01 ...
    #[arg(long)]
    due:         Option<String>,
    #[arg(short = 'p', long)]
    priority:    Option<String>,
    #[arg(short = 'c', long)]
    category:    Option<String>
  },

  /// Create a task from a free-text
  /// description
  Parse {
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>
  },

  /// Flip a task between open and done
  Toggle { id: u64 },

  Delete { id: u64 },

  /// Change fields of a task; the task is
  /// re-added with a fresh id
  Edit {
    id:          u64,
    #[arg(short = 't', long)]
    title:       Option<String>,
    #[arg(short = 'd', long)]
    description: Option<String>,
    #[arg(long)]
    due:         Option<String>,
    #[arg(short = 'p', long)]
    priority:    Option<String>,
    #[arg(short = 'c', long)]
    category:    Option<String>
  },

  /// Order tasks: open first, then by
  /// priority, then by due date
  Sort,

  /// all, active, completed, high, today
  List { filter: Option<String> },

  Dashboard,

  Info { id: u64 },

  Stats {
    #[arg(long)]
    json: bool
  },

  /// Recommendations for the current task
  /// list
  Insights {
    #[arg(long)]
    json: bool
  },

  /// Reassign priorities
  Prioritize {
    #[arg(value_enum, default_value_t = PrioritizeMode::Urgent)]
    mode: PrioritizeMode
  },

  Suggest {
    #[command(subcommand)]
    what: SuggestCommand
  },

  /// Dump all tasks as JSON
  Export,

  /// Remove every task and stored slot
  Reset
}

#[derive(
  ValueEnum, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum PrioritizeMode {
  /// Escalate urgent or overdue open tasks
  Urgent,
  /// Derive priority from days until due
  Window
}

#[derive(Subcommand, Debug, Clone)]
pub enum SuggestCommand {
  /// Due date implied by the text
  Deadline {
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>
  },
  /// Category labels for the text
  Labels {
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>
  },
  /// Append a subtask outline to the text
  Subtasks {
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>
  },
  /// What to work on today
  Today
}

pub fn init_tracing(
  verbose: u8,
  quiet: u8
) -> anyhow::Result<()> {
  let default_level = if quiet >= 2 {
    "error"
  } else if quiet == 1 {
    "warn"
  } else if verbose >= 3 {
    "trace"
  } else if verbose == 2 {
    "debug"
  } else if verbose == 1 {
    "info"
  } else {
    "warn"
  };

  let env_filter =
    EnvFilter::try_from_default_env()
      .or_else(|_| {
        EnvFilter::try_new(default_level)
      })
      .map_err(|e| {
        anyhow!(
          "invalid RUST_LOG / log filter: \
           {e}"
        )
      })?;

  let init_result =
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_writer(std::io::stderr)
      .with_target(true)
      .with_level(true)
      .with_ansi(
        std::io::stderr().is_terminal()
      )
      .try_init();

  if let Err(err) = init_result {
    debug!(error = %err, "tracing subscriber already set, continuing");
  }

  Ok(())
}

/// Pulls `rc.key=value` and `rc.key:value`
/// words out of the argument list.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(
  raw: &[OsString]
) -> anyhow::Result<PreprocessedArgs> {
  let mut cleaned =
    Vec::with_capacity(raw.len());
  let mut overrides: Vec<(String, String)> =
    Vec::new();

  let mut iter = raw.iter().cloned();
  if let Some(bin) = iter.next() {
    cleaned.push(bin);
  }

  for arg in iter {
    let s = arg.to_string_lossy();
    if let Some(rest) = s.strip_prefix("rc.")
    {
      let parsed = if let Some((k, v)) =
        rest.split_once('=')
      {
        Some((format!("rc.{k}"), v.to_string()))
      } else if let Some((k, v)) =
        rest.split_once(':')
      {
        Some((format!("rc.{k}"), v.to_string()))
      } else {
        None
      };

      if let Some((k, v)) = parsed {
        debug!(key = %k, value = %v, "captured positional rc override");
        overrides.push((k, v));
        continue;
      }
    }

    cleaned.push(arg);
  }

  Ok(PreprocessedArgs {
    cleaned_args: cleaned,
    rc_overrides: overrides
  })
}

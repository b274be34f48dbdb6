pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod delay;
pub mod error;
pub mod heuristics;
pub mod render;
pub mod repository;
pub mod stats;
pub mod store;
pub mod task;
pub mod views;

use std::ffi::OsString;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::commands::Action;
use crate::repository::SeedPolicy;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting neurotask"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    store::FileStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open task store at \
           {}",
          data_dir.display()
        )
      })?;

  let today = datetime::today(Utc::now());
  let seed = if cfg
    .get_bool("seed.examples")
    .unwrap_or(false)
  {
    SeedPolicy::Examples
  } else {
    SeedPolicy::Empty
  };
  let mut repo =
    repository::TaskRepository::load(
      store, seed, today
    );

  let mut renderer =
    render::Renderer::new(&cfg)?;

  let delay_ms = cfg
    .get_u64("ai.delay_ms")?
    .unwrap_or(0);
  let mut gate = delay::ActionGate::new(
    Duration::from_millis(delay_ms)
  );

  let action = match cli.command {
    | Some(cmd) => Action::from(cmd),
    | None => {
      let name = cfg
        .get("default.command")
        .unwrap_or_else(|| {
          "dashboard".to_string()
        });
      debug!(command = %name, "no explicit command, using default");
      Action::from_default_name(&name)?
    }
  };

  commands::dispatch(
    &mut repo,
    &mut gate,
    &mut renderer,
    action,
    today
  )?;

  info!("done");
  Ok(())
}

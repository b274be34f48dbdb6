use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow,
  bail
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

const RC_ENV_VAR: &str = "NEUROTASKRC";
const RC_FILE_NAME: &str =
  ".neurotaskrc";
const MAX_INCLUDE_DEPTH: usize = 8;

const DEFAULTS: [(&str, &str); 5] = [
  ("data.location", "~/.neurotask"),
  ("default.command", "dashboard"),
  ("color", "on"),
  ("seed.examples", "off"),
  ("ai.delay_ms", "0")
];

/// Settings from the defaults, the rc file
/// chain and command-line overrides, last
/// writer wins.
#[derive(Debug, Clone)]
pub struct Config {
  values:      BTreeMap<String, String>,
  pub sources: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      values:  DEFAULTS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      sources: vec![]
    }
  }
}

/// One meaningful rc line.
#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Include(&'a str),
  Set { key: &'a str, value: &'a str }
}

/// Strips comments and classifies a line.
/// `Ok(None)` for blank and comment-only
/// lines.
fn parse_rc_line(
  raw: &str
) -> Result<Option<RcLine<'_>>, String> {
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();
  if line.is_empty() {
    return Ok(None);
  }

  if let Some(target) =
    line.strip_prefix("include ")
  {
    let target = target.trim();
    if target.is_empty() {
      return Err(
        "include needs a path".to_string()
      );
    }
    return Ok(Some(RcLine::Include(target)));
  }

  match line.split_once('=') {
    | Some((key, value))
      if !key.trim().is_empty() =>
    {
      Ok(Some(RcLine::Set {
        key:   key.trim(),
        value: value.trim()
      }))
    }
    | _ => Err(format!(
      "expected `key = value`, got {line:?}"
    ))
  }
}

impl Config {
  /// Defaults plus the rc file picked by
  /// `locate_rc`, if any.
  #[tracing::instrument]
  pub fn load(
    explicit_rc: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::default();
    match locate_rc(explicit_rc) {
      | Some(path) => {
        info!(rc = %path.display(), "loading neurotaskrc");
        cfg.read_rc(&path, 0)?;
      }
      | None => {
        debug!("no neurotaskrc; using defaults");
      }
    }
    Ok(cfg)
  }

  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      let key = key
        .strip_prefix("rc.")
        .map(str::to_string)
        .unwrap_or(key);
      debug!(%key, %value, "applying override");
      self.set(key, value);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.values.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self.values.get(key).map(|v| {
      matches!(
        v.to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
      )
    })
  }

  pub fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u64>> {
    let Some(raw) = self.values.get(key)
    else {
      return Ok(None);
    };
    raw.parse::<u64>().map(Some).with_context(
      || {
        format!(
          "config key {key} expects a \
           number, got {raw:?}"
        )
      }
    )
  }

  fn set(
    &mut self,
    key: String,
    value: String
  ) {
    if !DEFAULTS
      .iter()
      .any(|(known, _)| *known == key)
    {
      warn!(%key, "unknown config key; keeping it anyway");
    }
    self.values.insert(key, value);
  }

  fn read_rc(
    &mut self,
    path: &Path,
    depth: usize
  ) -> anyhow::Result<()> {
    if depth > MAX_INCLUDE_DEPTH {
      bail!(
        "includes nested deeper than \
         {MAX_INCLUDE_DEPTH} at {}",
        path.display()
      );
    }

    let path = expand_home(path);
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    self.sources.push(path.clone());

    for (idx, raw) in
      text.lines().enumerate()
    {
      let parsed = parse_rc_line(raw)
        .map_err(|msg| {
          anyhow!(
            "{}:{}: {msg}",
            path.display(),
            idx + 1
          )
        })?;

      match parsed {
        | None => {}
        | Some(RcLine::Set { key, value }) => {
          trace!(key, value, "rc setting");
          self.set(
            key.to_string(),
            value.to_string()
          );
        }
        | Some(RcLine::Include(target)) => {
          let target =
            expand_home(Path::new(target));
          let target = if target.is_absolute()
          {
            target
          } else {
            path
              .parent()
              .unwrap_or(Path::new("."))
              .join(target)
          };

          if target.exists() {
            self.read_rc(&target, depth + 1)?;
          } else {
            warn!(include = %target.display(), "include not found; skipping");
          }
        }
      }
    }

    Ok(())
  }
}

/// `--config`, then `NEUROTASKRC`
/// (`/dev/null` turns rc loading off),
/// then `~/.neurotaskrc` when it exists.
fn locate_rc(
  explicit: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }

  if let Ok(from_env) =
    std::env::var(RC_ENV_VAR)
  {
    return (from_env != "/dev/null")
      .then(|| PathBuf::from(from_env));
  }

  dirs::home_dir()
    .map(|home| home.join(RC_FILE_NAME))
    .filter(|candidate| candidate.exists())
}

/// `--data` wins over `data.location`.
#[tracing::instrument(skip(cfg))]
pub fn resolve_data_dir(
  cfg: &Config,
  data_flag: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(dir) = data_flag {
    return Ok(dir.to_path_buf());
  }

  let location = cfg
    .get("data.location")
    .unwrap_or_default();
  if location.trim().is_empty() {
    bail!("data.location is empty");
  }
  Ok(expand_home(Path::new(
    location.trim()
  )))
}

fn expand_home(path: &Path) -> PathBuf {
  let home = dirs::home_dir();
  match (path.strip_prefix("~"), home) {
    | (Ok(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => path.to_path_buf()
  }
}

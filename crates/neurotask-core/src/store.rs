use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{
  debug,
  info,
  warn
};

/// String-keyed JSON slots.
///
/// Backends implement the fallible
/// `try_*` methods. Callers normally use
/// the provided wrappers, which log
/// failures and degrade to `None` /
/// `false` instead of propagating them.
pub trait KeyValueStore {
  fn try_get(
    &self,
    key: &str
  ) -> anyhow::Result<Option<Value>>;

  fn try_set(
    &mut self,
    key: &str,
    value: &Value
  ) -> anyhow::Result<()>;

  fn try_remove(
    &mut self,
    key: &str
  ) -> anyhow::Result<()>;

  fn try_clear(
    &mut self
  ) -> anyhow::Result<()>;

  fn get(
    &self,
    key: &str
  ) -> Option<Value> {
    match self.try_get(key) {
      | Ok(value) => value,
      | Err(err) => {
        warn!(key, error = %format!("{err:#}"), "error getting data from store");
        None
      }
    }
  }

  fn set(
    &mut self,
    key: &str,
    value: &Value
  ) -> bool {
    match self.try_set(key, value) {
      | Ok(()) => true,
      | Err(err) => {
        warn!(key, error = %format!("{err:#}"), "error saving data to store");
        false
      }
    }
  }

  fn remove(
    &mut self,
    key: &str
  ) -> bool {
    match self.try_remove(key) {
      | Ok(()) => true,
      | Err(err) => {
        warn!(key, error = %format!("{err:#}"), "error removing data from store");
        false
      }
    }
  }

  fn clear(&mut self) -> bool {
    match self.try_clear() {
      | Ok(()) => true,
      | Err(err) => {
        warn!(error = %format!("{err:#}"), "error clearing store");
        false
      }
    }
  }
}

/// Name prefix shared by every slot this
/// application writes. `clear` only ever
/// touches files carrying it.
pub const SLOT_PREFIX: &str = "neurotask-";

/// One `<key>.json` file per slot inside
/// the data directory.
#[derive(Debug)]
pub struct FileStore {
  pub data_dir: PathBuf
}

impl FileStore {
  #[tracing::instrument(skip(
    data_dir
  ))]
  pub fn open(
    data_dir: &Path
  ) -> anyhow::Result<Self> {
    let data_dir =
      data_dir.to_path_buf();
    fs::create_dir_all(&data_dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          data_dir.display()
        )
      })?;

    info!(
      data_dir = %data_dir.display(),
      "opened file store"
    );

    Ok(Self {
      data_dir
    })
  }

  pub fn slot_path(
    &self,
    key: &str
  ) -> anyhow::Result<PathBuf> {
    validate_key(key)?;
    Ok(
      self
        .data_dir
        .join(format!("{key}.json"))
    )
  }
}

impl KeyValueStore for FileStore {
  #[tracing::instrument(skip(self))]
  fn try_get(
    &self,
    key: &str
  ) -> anyhow::Result<Option<Value>> {
    let path = self.slot_path(key)?;
    if !path.exists() {
      debug!(file = %path.display(), "slot not present");
      return Ok(None);
    }

    let raw = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed reading {}",
          path.display()
        )
      })?;
    if raw.trim().is_empty() {
      return Ok(None);
    }

    let value: Value =
      serde_json::from_str(&raw)
        .with_context(|| {
          format!(
            "failed parsing {}",
            path.display()
          )
        })?;
    Ok(Some(value))
  }

  #[tracing::instrument(skip(
    self, value
  ))]
  fn try_set(
    &mut self,
    key: &str,
    value: &Value
  ) -> anyhow::Result<()> {
    let path = self.slot_path(key)?;
    debug!(file = %path.display(), "saving slot atomically");

    let mut temp =
      NamedTempFile::new_in(
        &self.data_dir
      )?;
    let serialized =
      serde_json::to_string(value)?;
    writeln!(temp, "{serialized}")?;
    temp.flush()?;

    temp.persist(&path).map_err(
      |err| {
        anyhow!(
          "failed to persist {}: {}",
          path.display(),
          err
        )
      }
    )?;
    Ok(())
  }

  #[tracing::instrument(skip(self))]
  fn try_remove(
    &mut self,
    key: &str
  ) -> anyhow::Result<()> {
    let path = self.slot_path(key)?;
    if path.exists() {
      fs::remove_file(&path)
        .with_context(|| {
          format!(
            "failed removing {}",
            path.display()
          )
        })?;
    }
    Ok(())
  }

  /// Removes only this application's
  /// slots; other files in the data
  /// directory are left alone.
  #[tracing::instrument(skip(self))]
  fn try_clear(
    &mut self
  ) -> anyhow::Result<()> {
    let mut removed = 0_usize;
    for entry in
      fs::read_dir(&self.data_dir)
        .with_context(|| {
          format!(
            "failed to read {}",
            self.data_dir.display()
          )
        })?
    {
      let path = entry?.path();
      if path.is_file() && is_owned_slot(&path)
      {
        fs::remove_file(&path)
          .with_context(|| {
            format!(
              "failed removing {}",
              path.display()
            )
          })?;
        removed += 1;
      }
    }
    info!(removed, "cleared file store");
    Ok(())
  }
}

fn is_owned_slot(path: &Path) -> bool {
  let Some(name) = path
    .file_name()
    .and_then(|n| n.to_str())
  else {
    return false;
  };
  name
    .strip_suffix(".json")
    .and_then(|stem| {
      stem.strip_prefix(SLOT_PREFIX)
    })
    .is_some_and(|rest| !rest.is_empty())
}

/// Volatile store, used by tests and when
/// embedding the core without a data
/// directory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
  slots: BTreeMap<String, Value>
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn try_get(
    &self,
    key: &str
  ) -> anyhow::Result<Option<Value>> {
    Ok(self.slots.get(key).cloned())
  }

  fn try_set(
    &mut self,
    key: &str,
    value: &Value
  ) -> anyhow::Result<()> {
    self
      .slots
      .insert(key.to_string(), value.clone());
    Ok(())
  }

  fn try_remove(
    &mut self,
    key: &str
  ) -> anyhow::Result<()> {
    self.slots.remove(key);
    Ok(())
  }

  fn try_clear(
    &mut self
  ) -> anyhow::Result<()> {
    self.slots.clear();
    Ok(())
  }
}

fn validate_key(
  key: &str
) -> anyhow::Result<()> {
  let ok = !key.is_empty()
    && key.chars().all(|c| {
      c.is_ascii_alphanumeric()
        || matches!(c, '-' | '_' | '.')
    })
    && !key.starts_with('.');
  if ok {
    Ok(())
  } else {
    Err(anyhow!(
      "invalid store key: {key:?}"
    ))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use tempfile::tempdir;

  use super::{
    FileStore,
    KeyValueStore,
    MemoryStore
  };

  #[test]
  fn file_store_set_get_remove() {
    let temp =
      tempdir().expect("tempdir");
    let mut store =
      FileStore::open(temp.path())
        .expect("open store");

    assert_eq!(store.get("slot"), None);
    assert!(
      store.set("slot", &json!([1, 2]))
    );
    assert_eq!(
      store.get("slot"),
      Some(json!([1, 2]))
    );
    assert!(store.remove("slot"));
    assert_eq!(store.get("slot"), None);
    assert!(store.remove("slot"));
  }

  #[test]
  fn corrupt_slot_reads_as_error_and_degrades()
   {
    let temp =
      tempdir().expect("tempdir");
    let store =
      FileStore::open(temp.path())
        .expect("open store");
    std::fs::write(
      temp.path().join("slot.json"),
      "{not json"
    )
    .expect("write garbage");

    assert!(
      store.try_get("slot").is_err()
    );
    assert_eq!(store.get("slot"), None);
  }

  #[test]
  fn clear_only_drops_own_slots() {
    let temp =
      tempdir().expect("tempdir");
    let mut store =
      FileStore::open(temp.path())
        .expect("open store");
    store.set("neurotask-a", &json!(1));
    store.set("neurotask-b", &json!(2));
    store.set("settings", &json!(3));
    for foreign in
      ["notes.txt", "package.json", "neurotask-.json"]
    {
      std::fs::write(
        temp.path().join(foreign),
        "keep"
      )
      .expect("write foreign file");
    }

    assert!(store.clear());
    assert_eq!(store.get("neurotask-a"), None);
    assert_eq!(store.get("neurotask-b"), None);
    assert_eq!(
      store.get("settings"),
      Some(json!(3))
    );
    for foreign in
      ["notes.txt", "package.json", "neurotask-.json"]
    {
      assert!(
        temp.path().join(foreign).exists(),
        "{foreign} was removed"
      );
    }
  }

  #[test]
  fn rejects_path_like_keys() {
    let temp =
      tempdir().expect("tempdir");
    let mut store =
      FileStore::open(temp.path())
        .expect("open store");
    assert!(
      !store
        .set("../escape", &json!(true))
    );
    assert!(
      store.try_get("a/b").is_err()
    );
  }

  #[test]
  fn memory_store_clear() {
    let mut store = MemoryStore::new();
    store.set("x", &json!("y"));
    assert!(store.clear());
    assert_eq!(store.get("x"), None);
  }
}

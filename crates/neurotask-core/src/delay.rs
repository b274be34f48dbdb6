use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Actions that show a "thinking" pause
/// before their result is applied.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash,
)]
pub enum ActionKind {
  ParseText,
  Analyze,
  Prioritize,
  Suggest
}

/// Proof that an action was started. Only
/// the most recent ticket per kind may
/// complete.
#[derive(Debug, PartialEq, Eq)]
pub struct Ticket {
  kind:       ActionKind,
  generation: u64
}

/// Cosmetic delay with stale-result
/// suppression: starting an action again
/// invalidates the earlier start, so only
/// one completion per action is applied.
#[derive(Debug, Clone, Default)]
pub struct ActionGate {
  delay:       Duration,
  generations: HashMap<ActionKind, u64>
}

impl ActionGate {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      generations: HashMap::new()
    }
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  pub fn begin(
    &mut self,
    kind: ActionKind
  ) -> Ticket {
    let generation = self.bump(kind);
    debug!(?kind, generation, "action started");
    Ticket {
      kind,
      generation
    }
  }

  pub fn is_current(
    &self,
    ticket: &Ticket
  ) -> bool {
    self
      .generations
      .get(&ticket.kind)
      .is_some_and(|g| *g == ticket.generation)
  }

  /// Consumes the ticket. Returns whether
  /// its result should be applied; a
  /// superseded ticket is discarded.
  pub fn finish(
    &mut self,
    ticket: Ticket
  ) -> bool {
    if !self.is_current(&ticket) {
      debug!(kind = ?ticket.kind, generation = ticket.generation, "discarding stale action");
      return false;
    }
    self.bump(ticket.kind);
    true
  }

  /// Waits out the delay, then runs `f`
  /// if this start is still the current
  /// one.
  pub fn run<T>(
    &mut self,
    kind: ActionKind,
    f: impl FnOnce() -> T
  ) -> Option<T> {
    let ticket = self.begin(kind);
    if !self.delay.is_zero() {
      thread::sleep(self.delay);
    }
    if self.finish(ticket) {
      Some(f())
    } else {
      None
    }
  }

  fn bump(
    &mut self,
    kind: ActionKind
  ) -> u64 {
    let entry =
      self.generations.entry(kind).or_insert(0);
    *entry += 1;
    *entry
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::{
    ActionGate,
    ActionKind
  };

  #[test]
  fn restart_discards_the_earlier_start() {
    let mut gate = ActionGate::default();
    let first = gate.begin(ActionKind::ParseText);
    let second = gate.begin(ActionKind::ParseText);

    assert!(!gate.is_current(&first));
    assert!(!gate.finish(first));
    assert!(gate.finish(second));
  }

  #[test]
  fn tickets_complete_at_most_once() {
    let mut gate = ActionGate::default();
    let ticket = gate.begin(ActionKind::Analyze);
    assert!(gate.is_current(&ticket));
    assert!(gate.finish(ticket));

    let stale = gate.begin(ActionKind::Analyze);
    let current = gate.begin(ActionKind::Analyze);
    assert!(!gate.finish(stale));
    assert!(gate.finish(current));
  }

  #[test]
  fn kinds_are_independent() {
    let mut gate = ActionGate::default();
    let parse = gate.begin(ActionKind::ParseText);
    let suggest = gate.begin(ActionKind::Suggest);
    let _newer = gate.begin(ActionKind::Suggest);
    assert!(gate.finish(parse));
    assert!(!gate.finish(suggest));
  }

  #[test]
  fn run_applies_the_result_after_the_delay()
   {
    let mut gate =
      ActionGate::new(Duration::from_millis(1));
    assert_eq!(
      gate.run(ActionKind::Prioritize, || 7),
      Some(7)
    );
  }
}

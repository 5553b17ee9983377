//! Per-activity attempt state: the learner's answers plus the "results shown" latch.

use std::collections::BTreeMap;

/// Answers keyed by item index. Once results are shown the attempt is read-only
/// until `clear` returns it to the initial state.
#[derive(Clone, Debug, PartialEq)]
pub struct Attempt<A> {
  answers: BTreeMap<usize, A>,
  results_shown: bool,
}

impl<A> Default for Attempt<A> {
  fn default() -> Self {
    Self { answers: BTreeMap::new(), results_shown: false }
  }
}

impl<A> Attempt<A> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Overwrite the answer at `index`. Rejected once results are shown.
  pub fn record(&mut self, index: usize, value: A) -> bool {
    if self.results_shown {
      return false;
    }
    self.answers.insert(index, value);
    true
  }

  /// Drop the answer at `index`. Rejected once results are shown.
  pub fn remove(&mut self, index: usize) -> bool {
    if self.results_shown {
      return false;
    }
    self.answers.remove(&index).is_some()
  }

  pub fn get(&self, index: usize) -> Option<&A> {
    self.answers.get(&index)
  }

  pub fn answers(&self) -> impl Iterator<Item = (usize, &A)> {
    self.answers.iter().map(|(k, v)| (*k, v))
  }

  pub fn len(&self) -> usize {
    self.answers.len()
  }

  pub fn results_shown(&self) -> bool {
    self.results_shown
  }

  pub fn show_results(&mut self) {
    self.results_shown = true;
  }

  pub fn clear(&mut self) {
    self.answers.clear();
    self.results_shown = false;
  }
}

impl Attempt<String> {
  /// True when every index in `required` holds a non-blank answer.
  pub fn all_filled(&self, required: impl IntoIterator<Item = usize>) -> bool {
    required
      .into_iter()
      .all(|i| self.get(i).map(|a| !a.trim().is_empty()).unwrap_or(false))
  }

  /// Normalized text comparison of the answer at `index` against `expected`.
  pub fn matches(&self, index: usize, expected: &str) -> bool {
    self
      .get(index)
      .map(|a| crate::util::answers_match(a, expected))
      .unwrap_or(false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn answers_lock_after_results() {
    let mut a = Attempt::<String>::new();
    assert!(a.record(0, "x".into()));
    a.show_results();
    assert!(!a.record(0, "y".into()));
    assert!(!a.remove(0));
    assert_eq!(a.get(0).map(String::as_str), Some("x"));
    a.clear();
    assert_eq!(a, Attempt::new());
  }

  #[test]
  fn blank_answers_do_not_count_as_filled() {
    let mut a = Attempt::<String>::new();
    a.record(0, "went".into());
    a.record(1, "   ".into());
    assert!(!a.all_filled([0, 1]));
    a.record(1, "saw".into());
    assert!(a.all_filled([0, 1]));
  }
}

//! Word scramble: unscramble letters into a word, with an optional per-item hint.

use std::collections::BTreeSet;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{Attempt, Scorer};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScrambleWord {
  pub scrambled: String,
  pub answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScrambleItemView {
  pub scrambled: String,
  pub response: Option<String>,
  pub has_hint: bool,
  /// Only while toggled on.
  pub hint: Option<String>,
  pub correct: Option<bool>,
  pub expected: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Scramble {
  words: Vec<ScrambleWord>,
  attempt: Attempt<String>,
  hints_shown: BTreeSet<usize>,
}

impl Scramble {
  pub fn new(words: Vec<ScrambleWord>) -> Self {
    Self { words, attempt: Attempt::new(), hints_shown: BTreeSet::new() }
  }

  pub fn record_answer(&mut self, index: usize, value: String) -> bool {
    index < self.words.len() && self.attempt.record(index, value)
  }

  /// Show or hide the hint of one item. Hints never affect scoring.
  pub fn toggle_hint(&mut self, index: usize) -> bool {
    match self.words.get(index) {
      Some(w) if w.hint.is_some() => {
        if !self.hints_shown.remove(&index) {
          self.hints_shown.insert(index);
        }
        true
      }
      _ => false,
    }
  }

  pub fn visible_hint(&self, index: usize) -> Option<&str> {
    if !self.hints_shown.contains(&index) {
      return None;
    }
    self.words.get(index)?.hint.as_deref()
  }

  pub fn is_correct(&self, index: usize) -> Option<bool> {
    let w = self.words.get(index)?;
    self.attempt.results_shown().then(|| self.attempt.matches(index, &w.answer))
  }

  pub fn correct_answer(&self, index: usize) -> Option<&str> {
    let w = self.words.get(index)?;
    self.attempt.results_shown().then_some(w.answer.as_str())
  }

  pub fn view(&self) -> Vec<ScrambleItemView> {
    self
      .words
      .iter()
      .enumerate()
      .map(|(i, w)| ScrambleItemView {
        scrambled: w.scrambled.clone(),
        response: self.attempt.get(i).cloned(),
        has_hint: w.hint.is_some(),
        hint: self.visible_hint(i).map(str::to_string),
        correct: self.is_correct(i),
        expected: self.correct_answer(i).map(str::to_string),
      })
      .collect()
  }
}

impl Scorer for Scramble {
  fn can_check(&self) -> bool {
    !self.attempt.results_shown() && self.attempt.all_filled(0..self.words.len())
  }

  fn check_answers(&mut self) -> bool {
    if !self.can_check() {
      return false;
    }
    self.attempt.show_results();
    true
  }

  fn results_shown(&self) -> bool {
    self.attempt.results_shown()
  }

  fn score(&self) -> Option<usize> {
    Some(
      self
        .words
        .iter()
        .enumerate()
        .filter(|(i, w)| self.attempt.matches(*i, &w.answer))
        .count(),
    )
  }

  fn total(&self) -> usize {
    self.words.len()
  }

  fn reset(&mut self, _rng: &mut dyn RngCore) {
    self.attempt.clear();
    self.hints_shown.clear();
  }
}

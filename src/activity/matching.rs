//! Matching: pair each left item with a right item from a shuffled column.

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{Attempt, Scorer};
use crate::util::answers_match;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MatchPair {
  pub left: String,
  pub right: String,
}

/// Client-facing state. Right-hand items are referred to by display position; the
/// expected counterparts only appear once results are shown.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchingView {
  pub left: Vec<String>,
  pub right: Vec<String>,
  pub selected_left: Option<usize>,
  /// Left index -> display position of the paired right item.
  pub paired: Vec<Option<usize>>,
  pub correct: Vec<Option<bool>>,
  pub expected: Vec<Option<String>>,
}

#[derive(Clone, Debug)]
pub struct Matching {
  pairs: Vec<MatchPair>,
  /// Display position -> original pair index of the right-hand text shown there.
  right_order: Vec<usize>,
  selected_left: Option<usize>,
  /// Left index -> original pair index of the chosen right-hand text.
  attempt: Attempt<usize>,
}

impl Matching {
  pub fn new(pairs: Vec<MatchPair>, rng: &mut dyn RngCore) -> Self {
    let mut m = Self { right_order: (0..pairs.len()).collect(), pairs, selected_left: None, attempt: Attempt::new() };
    m.right_order.shuffle(rng);
    m
  }

  /// Right-hand texts in display order.
  pub fn right_column(&self) -> Vec<&str> {
    self.right_order.iter().map(|&i| self.pairs[i].right.as_str()).collect()
  }

  pub fn selected_left(&self) -> Option<usize> {
    self.selected_left
  }

  /// Which left item the right item at display position `pos` is paired with.
  pub fn paired_left_of(&self, pos: usize) -> Option<usize> {
    let orig = *self.right_order.get(pos)?;
    self.attempt.answers().find(|(_, r)| **r == orig).map(|(l, _)| l)
  }

  /// Display position of the right item paired with `left`.
  pub fn paired_right_of(&self, left: usize) -> Option<usize> {
    let orig = *self.attempt.get(left)?;
    self.right_order.iter().position(|&i| i == orig)
  }

  /// Arm a left item for pairing.
  pub fn select_left(&mut self, index: usize) -> bool {
    if self.attempt.results_shown() || index >= self.pairs.len() {
      return false;
    }
    self.selected_left = Some(index);
    true
  }

  /// Pair the armed left item with the right item at display position `pos`.
  /// A right item already paired with a different left item is not selectable.
  pub fn select_right(&mut self, pos: usize) -> bool {
    let Some(left) = self.selected_left else { return false };
    let Some(&orig) = self.right_order.get(pos) else { return false };
    if let Some(owner) = self.paired_left_of(pos) {
      if owner != left {
        return false;
      }
    }
    if !self.attempt.record(left, orig) {
      return false;
    }
    self.selected_left = None;
    true
  }

  pub fn unpair(&mut self, left: usize) -> bool {
    self.attempt.remove(left)
  }

  /// Per-item correctness, available once results are shown.
  pub fn is_correct(&self, left: usize) -> Option<bool> {
    if !self.attempt.results_shown() {
      return None;
    }
    Some(self.pair_is_correct(left))
  }

  /// The right-hand text `left` should have been paired with, once results are shown.
  pub fn correct_answer(&self, left: usize) -> Option<&str> {
    if !self.attempt.results_shown() {
      return None;
    }
    self.pairs.get(left).map(|p| p.right.as_str())
  }

  pub fn view(&self) -> MatchingView {
    let lefts = 0..self.pairs.len();
    MatchingView {
      left: self.pairs.iter().map(|p| p.left.clone()).collect(),
      right: self.right_column().into_iter().map(str::to_string).collect(),
      selected_left: self.selected_left(),
      paired: lefts.clone().map(|l| self.paired_right_of(l)).collect(),
      correct: lefts.clone().map(|l| self.is_correct(l)).collect(),
      expected: lefts.map(|l| self.correct_answer(l).map(str::to_string)).collect(),
    }
  }

  fn pair_is_correct(&self, left: usize) -> bool {
    match (self.pairs.get(left), self.attempt.get(left)) {
      (Some(pair), Some(&orig)) => answers_match(&self.pairs[orig].right, &pair.right),
      _ => false,
    }
  }
}

impl Scorer for Matching {
  fn can_check(&self) -> bool {
    !self.attempt.results_shown() && self.attempt.len() == self.pairs.len()
  }

  fn check_answers(&mut self) -> bool {
    if !self.can_check() {
      return false;
    }
    self.selected_left = None;
    self.attempt.show_results();
    true
  }

  fn results_shown(&self) -> bool {
    self.attempt.results_shown()
  }

  fn score(&self) -> Option<usize> {
    Some((0..self.pairs.len()).filter(|&l| self.pair_is_correct(l)).count())
  }

  fn total(&self) -> usize {
    self.pairs.len()
  }

  fn reset(&mut self, rng: &mut dyn RngCore) {
    self.attempt.clear();
    self.selected_left = None;
    self.right_order.shuffle(rng);
  }
}

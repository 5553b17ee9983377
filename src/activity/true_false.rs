//! True/false: one statement at a time, feedback on selection, no running score.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{Attempt, Scorer};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrueFalseItem {
  pub statement: String,
  pub answer: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Feedback {
  pub correct: bool,
  pub explanation: Option<String>,
}

/// The statement on screen and, once answered, its feedback.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrueFalseView {
  pub current: usize,
  pub statement: Option<String>,
  pub choice: Option<bool>,
  pub feedback: Option<Feedback>,
  pub can_advance: bool,
  pub finished: bool,
}

#[derive(Clone, Debug)]
pub struct TrueFalse {
  items: Vec<TrueFalseItem>,
  current: usize,
  attempt: Attempt<bool>,
  finished: bool,
}

impl TrueFalse {
  pub fn new(items: Vec<TrueFalseItem>) -> Self {
    Self { items, current: 0, attempt: Attempt::new(), finished: false }
  }

  pub fn current(&self) -> usize {
    self.current
  }

  pub fn finished(&self) -> bool {
    self.finished
  }

  /// Answer the current statement. The first choice sticks.
  pub fn choose(&mut self, value: bool) -> bool {
    if self.finished || self.current >= self.items.len() || self.attempt.get(self.current).is_some() {
      return false;
    }
    self.attempt.record(self.current, value)
  }

  pub fn feedback(&self, index: usize) -> Option<Feedback> {
    let item = self.items.get(index)?;
    let chosen = *self.attempt.get(index)?;
    Some(Feedback { correct: chosen == item.answer, explanation: item.explanation.clone() })
  }

  pub fn can_advance(&self) -> bool {
    !self.finished && self.attempt.get(self.current).is_some()
  }

  pub fn view(&self) -> TrueFalseView {
    let current = self.current();
    TrueFalseView {
      current,
      statement: self.items.get(current).map(|i| i.statement.clone()),
      choice: self.attempt.get(current).copied(),
      feedback: self.feedback(current),
      can_advance: self.can_advance(),
      finished: self.finished(),
    }
  }

  pub fn next_question(&mut self) -> bool {
    if !self.can_advance() {
      return false;
    }
    if self.current + 1 < self.items.len() {
      self.current += 1;
    } else {
      self.finished = true;
    }
    true
  }
}

/// Formative: feedback is immediate per statement, so there is no global check and no score.
impl Scorer for TrueFalse {
  fn can_check(&self) -> bool {
    false
  }

  fn check_answers(&mut self) -> bool {
    false
  }

  fn results_shown(&self) -> bool {
    self.attempt.get(self.current).is_some()
  }

  fn score(&self) -> Option<usize> {
    None
  }

  fn total(&self) -> usize {
    self.items.len()
  }

  fn reset(&mut self, _rng: &mut dyn RngCore) {
    self.attempt.clear();
    self.current = 0;
    self.finished = false;
  }
}

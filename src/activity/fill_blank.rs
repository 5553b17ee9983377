//! Fill-in-the-blank: type the missing word for every sentence, then check all at once.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{Attempt, Scorer};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlankItem {
  pub text: String,
  pub answer: String,
}

/// Client-facing state of one blank. The expected answer stays hidden until checking.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlankView {
  pub text: String,
  pub response: Option<String>,
  pub correct: Option<bool>,
  pub expected: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FillBlank {
  items: Vec<BlankItem>,
  attempt: Attempt<String>,
}

impl FillBlank {
  pub fn new(items: Vec<BlankItem>) -> Self {
    Self { items, attempt: Attempt::new() }
  }

  pub fn record_answer(&mut self, index: usize, value: String) -> bool {
    index < self.items.len() && self.attempt.record(index, value)
  }

  pub fn answer(&self, index: usize) -> Option<&str> {
    self.attempt.get(index).map(String::as_str)
  }

  /// Per-item correctness, available once results are shown.
  pub fn is_correct(&self, index: usize) -> Option<bool> {
    let item = self.items.get(index)?;
    self.attempt.results_shown().then(|| self.attempt.matches(index, &item.answer))
  }

  /// The expected answer, revealed next to wrong items after checking.
  pub fn correct_answer(&self, index: usize) -> Option<&str> {
    if !self.attempt.results_shown() {
      return None;
    }
    self.items.get(index).map(|i| i.answer.as_str())
  }

  pub fn view(&self) -> Vec<BlankView> {
    self
      .items
      .iter()
      .enumerate()
      .map(|(i, item)| BlankView {
        text: item.text.clone(),
        response: self.answer(i).map(str::to_string),
        correct: self.is_correct(i),
        expected: self.correct_answer(i).map(str::to_string),
      })
      .collect()
  }
}

impl Scorer for FillBlank {
  fn can_check(&self) -> bool {
    !self.attempt.results_shown() && self.attempt.all_filled(0..self.items.len())
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
        .items
        .iter()
        .enumerate()
        .filter(|(i, item)| self.attempt.matches(*i, &item.answer))
        .count(),
    )
  }

  fn total(&self) -> usize {
    self.items.len()
  }

  fn reset(&mut self, _rng: &mut dyn RngCore) {
    self.attempt.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn activity() -> FillBlank {
    FillBlank::new(vec![
      BlankItem { text: "The capital of France is ___.".into(), answer: "Paris".into() },
      BlankItem { text: "She ___ to school yesterday.".into(), answer: "went".into() },
    ])
  }

  #[test]
  fn normalized_answers_are_correct() {
    let mut f = activity();
    f.record_answer(0, " paris ".into());
    f.record_answer(1, "WENT".into());
    assert!(f.check_answers());
    assert_eq!(f.score(), Some(2));
    assert_eq!(f.is_correct(0), Some(true));
  }

  #[test]
  fn check_waits_for_every_blank() {
    let mut f = activity();
    assert!(!f.check_answers());
    f.record_answer(0, "Paris".into());
    assert!(!f.can_check());
    f.record_answer(1, "  ".into());
    assert!(!f.check_answers());
    assert!(!f.record_answer(2, "out of range".into()));
  }

  #[test]
  fn wrong_item_exposes_its_answer_after_check() {
    let mut f = activity();
    f.record_answer(0, "Paris".into());
    f.record_answer(1, "goed".into());
    assert_eq!(f.correct_answer(1), None);
    assert!(f.check_answers());
    assert_eq!(f.score(), Some(1));
    assert_eq!(f.is_correct(1), Some(false));
    assert_eq!(f.correct_answer(1), Some("went"));
    assert!(!f.record_answer(1, "went".into()));
  }

  #[test]
  fn view_hides_answers_until_checked() {
    let mut f = activity();
    f.record_answer(0, "Paris".into());
    f.record_answer(1, "goed".into());
    let before = f.view();
    assert_eq!(before[1].response.as_deref(), Some("goed"));
    assert!(before.iter().all(|b| b.expected.is_none() && b.correct.is_none()));

    f.check_answers();
    let after = f.view();
    assert_eq!(after[0].correct, Some(true));
    assert_eq!(after[1].correct, Some(false));
    assert_eq!(after[1].expected.as_deref(), Some("went"));
  }

  #[test]
  fn reset_clears_answers_and_results() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut f = activity();
    f.record_answer(0, "Paris".into());
    f.record_answer(1, "went".into());
    f.check_answers();
    f.reset(&mut rng);
    assert!(!f.results_shown());
    assert_eq!(f.answer(0), None);
    assert!(f.record_answer(0, "Rome".into()));
  }
}

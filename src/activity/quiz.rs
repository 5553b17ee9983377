//! Multiple-choice quiz with a single global check.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{Attempt, Scorer};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: usize,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionView {
  pub question: String,
  pub options: Vec<String>,
  pub selected: Option<usize>,
  pub correct: Option<bool>,
  /// Index of the right option, once results are shown.
  pub correct_answer: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct Quiz {
  questions: Vec<QuizQuestion>,
  attempt: Attempt<usize>,
}

impl Quiz {
  pub fn new(questions: Vec<QuizQuestion>) -> Self {
    Self { questions, attempt: Attempt::new() }
  }

  /// Select `option` for `question`, replacing any earlier selection.
  pub fn select(&mut self, question: usize, option: usize) -> bool {
    match self.questions.get(question) {
      Some(q) if option < q.options.len() => self.attempt.record(question, option),
      _ => false,
    }
  }

  pub fn selected(&self, question: usize) -> Option<usize> {
    self.attempt.get(question).copied()
  }

  pub fn is_correct(&self, question: usize) -> Option<bool> {
    let q = self.questions.get(question)?;
    if !self.attempt.results_shown() {
      return None;
    }
    Some(self.selected(question) == Some(q.correct_answer))
  }

  pub fn view(&self) -> Vec<QuizQuestionView> {
    let shown = self.attempt.results_shown();
    self
      .questions
      .iter()
      .enumerate()
      .map(|(i, q)| QuizQuestionView {
        question: q.question.clone(),
        options: q.options.clone(),
        selected: self.selected(i),
        correct: self.is_correct(i),
        correct_answer: shown.then_some(q.correct_answer),
      })
      .collect()
  }
}

impl Scorer for Quiz {
  fn can_check(&self) -> bool {
    !self.attempt.results_shown() && (0..self.questions.len()).all(|i| self.attempt.get(i).is_some())
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
        .questions
        .iter()
        .enumerate()
        .filter(|(i, q)| self.selected(*i) == Some(q.correct_answer))
        .count(),
    )
  }

  fn total(&self) -> usize {
    self.questions.len()
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

  fn q(question: &str, options: &[&str], correct_answer: usize) -> QuizQuestion {
    QuizQuestion {
      question: question.into(),
      options: options.iter().map(|o| o.to_string()).collect(),
      correct_answer,
    }
  }

  fn quiz() -> Quiz {
    Quiz::new(vec![
      q("Past of 'go'?", &["goed", "went", "gone"], 1),
      q("Plural of 'mouse'?", &["mice", "mouses"], 0),
      q("Opposite of 'hot'?", &["warm", "cold"], 1),
    ])
  }

  #[test]
  fn check_rejected_until_every_question_answered() {
    let mut z = quiz();
    z.select(0, 1);
    z.select(2, 1);
    assert!(!z.check_answers());
    assert!(!z.results_shown());
    z.select(1, 1);
    assert!(z.check_answers());
    assert_eq!(z.score(), Some(2));
    assert_eq!(z.is_correct(1), Some(false));
    assert_eq!(z.view()[1].correct_answer, Some(0));
  }

  #[test]
  fn view_keeps_the_key_hidden_before_check() {
    let mut z = quiz();
    z.select(0, 2);
    let v = z.view();
    assert_eq!(v[0].selected, Some(2));
    assert!(v.iter().all(|q| q.correct.is_none() && q.correct_answer.is_none()));
  }

  #[test]
  fn out_of_range_selection_is_ignored() {
    let mut z = quiz();
    assert!(!z.select(1, 2));
    assert!(!z.select(9, 0));
    assert_eq!(z.selected(1), None);
  }

  #[test]
  fn selections_lock_after_check_until_reset() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut z = quiz();
    for (i, o) in [(0, 1), (1, 0), (2, 1)] {
      z.select(i, o);
    }
    assert!(z.check_answers());
    assert_eq!(z.score(), Some(3));
    assert!(!z.select(0, 0));
    z.reset(&mut rng);
    assert_eq!(z.summary(), crate::activity::ActivitySummary { can_check: false, results_shown: false, score: Some(0), total: 3 });
  }
}

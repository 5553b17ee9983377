//! Dialogue completion: fill the blank lines of a scripted conversation.

use std::collections::BTreeSet;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{Attempt, Scorer};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DialogueLine {
  pub speaker: String,
  pub text: String,
  #[serde(default)]
  pub is_blank: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub answer: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
}

impl DialogueLine {
  /// Blank lines without an explicit answer are scored against their own text.
  fn expected(&self) -> &str {
    self.answer.as_deref().unwrap_or(&self.text)
  }
}

/// Client-facing line. Blank lines show the learner's response instead of the script text.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DialogueLineView {
  pub speaker: String,
  pub text: String,
  pub is_blank: bool,
  pub response: Option<String>,
  pub has_hint: bool,
  pub hint: Option<String>,
  pub correct: Option<bool>,
  pub expected: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Dialogue {
  lines: Vec<DialogueLine>,
  attempt: Attempt<String>,
  hints_shown: BTreeSet<usize>,
}

impl Dialogue {
  pub fn new(lines: Vec<DialogueLine>) -> Self {
    Self { lines, attempt: Attempt::new(), hints_shown: BTreeSet::new() }
  }

  pub fn blank_lines(&self) -> impl Iterator<Item = usize> + '_ {
    self.lines.iter().enumerate().filter(|(_, l)| l.is_blank).map(|(i, _)| i)
  }

  /// Only blank lines accept input.
  pub fn record_answer(&mut self, line: usize, value: String) -> bool {
    match self.lines.get(line) {
      Some(l) if l.is_blank => self.attempt.record(line, value),
      _ => false,
    }
  }

  pub fn toggle_hint(&mut self, line: usize) -> bool {
    match self.lines.get(line) {
      Some(l) if l.is_blank && l.hint.is_some() => {
        if !self.hints_shown.remove(&line) {
          self.hints_shown.insert(line);
        }
        true
      }
      _ => false,
    }
  }

  pub fn visible_hint(&self, line: usize) -> Option<&str> {
    if !self.hints_shown.contains(&line) {
      return None;
    }
    self.lines.get(line)?.hint.as_deref()
  }

  pub fn is_correct(&self, line: usize) -> Option<bool> {
    let l = self.lines.get(line).filter(|l| l.is_blank)?;
    self.attempt.results_shown().then(|| self.attempt.matches(line, l.expected()))
  }

  pub fn correct_answer(&self, line: usize) -> Option<&str> {
    let l = self.lines.get(line).filter(|l| l.is_blank)?;
    self.attempt.results_shown().then(|| l.expected())
  }

  pub fn view(&self) -> Vec<DialogueLineView> {
    self
      .lines
      .iter()
      .enumerate()
      .map(|(i, l)| DialogueLineView {
        speaker: l.speaker.clone(),
        // A blank line without an explicit answer carries its answer in `text`.
        text: if l.is_blank && l.answer.is_none() { String::new() } else { l.text.clone() },
        is_blank: l.is_blank,
        response: self.attempt.get(i).cloned(),
        has_hint: l.is_blank && l.hint.is_some(),
        hint: self.visible_hint(i).map(str::to_string),
        correct: self.is_correct(i),
        expected: self.correct_answer(i).map(str::to_string),
      })
      .collect()
  }
}

impl Scorer for Dialogue {
  fn can_check(&self) -> bool {
    !self.attempt.results_shown() && self.attempt.all_filled(self.blank_lines())
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
    Some(self.blank_lines().filter(|&i| self.attempt.matches(i, self.lines[i].expected())).count())
  }

  fn total(&self) -> usize {
    self.blank_lines().count()
  }

  fn reset(&mut self, _rng: &mut dyn RngCore) {
    self.attempt.clear();
    self.hints_shown.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(speaker: &str, text: &str, answer: Option<&str>) -> DialogueLine {
    DialogueLine {
      speaker: speaker.into(),
      text: text.into(),
      is_blank: answer.is_some(),
      answer: answer.map(str::to_string),
      hint: answer.map(|_| "Be polite".to_string()),
    }
  }

  fn activity() -> Dialogue {
    Dialogue::new(vec![
      line("Waiter", "Good evening. Are you ready to order?", None),
      line("Guest", "___, I'd like the soup.", Some("Yes")),
      line("Waiter", "Anything to drink?", None),
      line("Guest", "___ water, please.", Some("Some")),
    ])
  }

  #[test]
  fn only_blank_lines_take_answers() {
    let mut d = activity();
    assert!(!d.record_answer(0, "hello".into()));
    assert!(d.record_answer(1, "yes".into()));
    assert!(!d.can_check());
    assert!(d.record_answer(3, " SOME ".into()));
    assert!(d.check_answers());
    assert_eq!(d.score(), Some(2));
    assert_eq!(d.total(), 2);
  }

  #[test]
  fn incorrect_line_shows_expected_answer() {
    let mut d = activity();
    d.record_answer(1, "No".into());
    d.record_answer(3, "Some".into());
    d.check_answers();
    assert_eq!(d.is_correct(1), Some(false));
    assert_eq!(d.correct_answer(1), Some("Yes"));
    assert_eq!(d.is_correct(0), None);
    assert_eq!(d.score(), Some(1));
  }

  #[test]
  fn hints_only_exist_on_blanks() {
    let mut d = activity();
    assert!(!d.toggle_hint(0));
    assert!(d.toggle_hint(1));
    assert_eq!(d.visible_hint(1), Some("Be polite"));
  }

  #[test]
  fn view_reveals_expected_lines_only_after_check() {
    let mut d = activity();
    d.record_answer(1, "No".into());
    d.record_answer(3, "Some".into());
    let before = d.view();
    assert_eq!(before[1].response.as_deref(), Some("No"));
    assert!(before.iter().all(|l| l.expected.is_none()));

    d.check_answers();
    let after = d.view();
    assert_eq!(after[0].correct, None);
    assert_eq!(after[1].correct, Some(false));
    assert_eq!(after[1].expected.as_deref(), Some("Yes"));
    assert_eq!(after[3].correct, Some(true));
  }
}

//! Sentence ordering: build each sentence from a shuffled pool of word tiles.
//!
//! One sentence is active at a time. A wrong check only shows feedback; the learner keeps
//! rearranging and checks again. A correct check locks the sentence until `next_item`.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::Scorer;
use crate::util::normalize_sentence;

/// Re-deal attempts when a shuffle comes out in the original order.
const MAX_RESHUFFLES: usize = 4;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OrderingItem {
  pub sentence: String,
  #[serde(default)]
  pub words: Vec<String>,
}

impl OrderingItem {
  /// The tiles to deal. Falls back to the sentence's own words when none were given.
  fn tiles(&self) -> Vec<String> {
    if !self.words.is_empty() {
      return self.words.clone();
    }
    self.sentence.split_whitespace().map(str::to_string).collect()
  }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct WordTile {
  pub id: usize,
  pub text: String,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderingFeedback {
  Correct,
  Incorrect,
}

/// True when `words`, joined with spaces, equal `sentence` ignoring punctuation and case.
pub fn sentence_matches<S: AsRef<str>>(words: &[S], sentence: &str) -> bool {
  let joined = words.iter().map(|w| w.as_ref()).collect::<Vec<_>>().join(" ");
  normalize_sentence(&joined) == normalize_sentence(sentence)
}

/// Client-facing state of the active sentence. The target sentence is only included once
/// it has been built correctly.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderingView {
  pub current: usize,
  pub available: Vec<WordTile>,
  pub answer: Vec<WordTile>,
  pub feedback: Option<OrderingFeedback>,
  pub solved_sentence: Option<String>,
  pub finished: bool,
}

#[derive(Clone, Debug)]
pub struct Ordering {
  items: Vec<OrderingItem>,
  current: usize,
  available: Vec<WordTile>,
  answer: Vec<WordTile>,
  feedback: Option<OrderingFeedback>,
  completed: BTreeSet<usize>,
  finished: bool,
}

impl Ordering {
  pub fn new(items: Vec<OrderingItem>, rng: &mut dyn RngCore) -> Self {
    let mut o = Self {
      items,
      current: 0,
      available: vec![],
      answer: vec![],
      feedback: None,
      completed: BTreeSet::new(),
      finished: false,
    };
    o.deal(rng);
    o
  }

  fn deal(&mut self, rng: &mut dyn RngCore) {
    self.answer.clear();
    self.feedback = None;
    let Some(item) = self.items.get(self.current) else {
      self.available.clear();
      return;
    };
    let tiles: Vec<WordTile> = item
      .tiles()
      .into_iter()
      .enumerate()
      .map(|(id, text)| WordTile { id, text })
      .collect();
    let mut dealt = tiles.clone();
    for _ in 0..MAX_RESHUFFLES {
      dealt.shuffle(rng);
      if dealt.len() < 2 || dealt != tiles {
        break;
      }
    }
    self.available = dealt;
  }

  fn locked(&self) -> bool {
    self.finished || self.feedback == Some(OrderingFeedback::Correct)
  }

  fn touch(&mut self) {
    // Any edit after a wrong check clears the stale feedback.
    self.feedback = None;
  }

  pub fn current(&self) -> usize {
    self.current
  }

  pub fn current_item(&self) -> Option<&OrderingItem> {
    self.items.get(self.current)
  }

  pub fn available(&self) -> &[WordTile] {
    &self.available
  }

  pub fn answer(&self) -> &[WordTile] {
    &self.answer
  }

  pub fn feedback(&self) -> Option<OrderingFeedback> {
    self.feedback
  }

  pub fn finished(&self) -> bool {
    self.finished
  }

  pub fn view(&self) -> OrderingView {
    let solved = self.feedback() == Some(OrderingFeedback::Correct);
    OrderingView {
      current: self.current(),
      available: self.available().to_vec(),
      answer: self.answer().to_vec(),
      feedback: self.feedback(),
      solved_sentence: self.current_item().filter(|_| solved).map(|i| i.sentence.clone()),
      finished: self.finished(),
    }
  }

  /// Move the pool tile at `index` to the end of the answer.
  pub fn pick_word(&mut self, index: usize) -> bool {
    if self.locked() || index >= self.available.len() {
      return false;
    }
    let tile = self.available.remove(index);
    self.answer.push(tile);
    self.touch();
    true
  }

  /// Send the answer tile at `index` back to the pool.
  pub fn return_word(&mut self, index: usize) -> bool {
    if self.locked() || index >= self.answer.len() {
      return false;
    }
    let tile = self.answer.remove(index);
    self.available.push(tile);
    self.touch();
    true
  }

  /// Reorder within the answer sequence.
  pub fn move_word(&mut self, from: usize, to: usize) -> bool {
    if self.locked() || from >= self.answer.len() || to >= self.answer.len() {
      return false;
    }
    let tile = self.answer.remove(from);
    self.answer.insert(to, tile);
    self.touch();
    true
  }

  fn answer_is_correct(&self) -> bool {
    let Some(item) = self.current_item() else { return false };
    let words: Vec<&str> = self.answer.iter().map(|t| t.text.as_str()).collect();
    sentence_matches(&words, &item.sentence)
  }

  /// Advance to the next sentence. Only allowed after a correct check.
  pub fn next_item(&mut self, rng: &mut dyn RngCore) -> bool {
    if self.finished || self.feedback != Some(OrderingFeedback::Correct) {
      return false;
    }
    if self.current + 1 < self.items.len() {
      self.current += 1;
      self.deal(rng);
    } else {
      self.finished = true;
    }
    true
  }
}

impl Scorer for Ordering {
  fn can_check(&self) -> bool {
    !self.locked() && !self.answer.is_empty()
  }

  fn check_answers(&mut self) -> bool {
    if !self.can_check() {
      return false;
    }
    if self.answer_is_correct() {
      self.feedback = Some(OrderingFeedback::Correct);
      self.completed.insert(self.current);
    } else {
      self.feedback = Some(OrderingFeedback::Incorrect);
    }
    true
  }

  fn results_shown(&self) -> bool {
    self.feedback.is_some()
  }

  fn score(&self) -> Option<usize> {
    Some(self.completed.len())
  }

  fn total(&self) -> usize {
    self.items.len()
  }

  fn reset(&mut self, rng: &mut dyn RngCore) {
    self.current = 0;
    self.completed.clear();
    self.finished = false;
    self.deal(rng);
  }
}

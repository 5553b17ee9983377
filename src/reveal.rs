//! Progressive disclosure of a slide's content fragments.
//!
//! Fragments are revealed strictly in order, one per input, so the revealed set is always a
//! prefix `0..k` of the fragment list. The set only grows while a slide stays active and is
//! replaced wholesale when the slide changes.

use std::collections::BTreeSet;

use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevealEngine {
  fragment_count: usize,
  revealed: BTreeSet<usize>,
}

impl RevealEngine {
  pub fn new(fragment_count: usize) -> Self {
    Self { fragment_count, revealed: BTreeSet::new() }
  }

  /// Start over for a newly active slide.
  pub fn reset(&mut self, fragment_count: usize) {
    self.fragment_count = fragment_count;
    self.revealed.clear();
  }

  /// The same slide was edited and now has `fragment_count` fragments. Revealed fragments
  /// that still exist stay revealed.
  pub fn resize(&mut self, fragment_count: usize) {
    self.fragment_count = fragment_count;
    self.revealed.retain(|&i| i < fragment_count);
  }

  pub fn fragment_count(&self) -> usize {
    self.fragment_count
  }

  pub fn revealed(&self) -> &BTreeSet<usize> {
    &self.revealed
  }

  pub fn is_revealed(&self, index: usize) -> bool {
    self.revealed.contains(&index)
  }

  pub fn all_revealed(&self) -> bool {
    self.next_hidden().is_none()
  }

  fn next_hidden(&self) -> Option<usize> {
    (0..self.fragment_count).find(|i| !self.revealed.contains(i))
  }

  /// Reveal the smallest hidden fragment. Returns the revealed index, or `None` when
  /// everything is already visible (the caller then treats "advance" as "next slide").
  pub fn reveal_next(&mut self) -> Option<usize> {
    let i = self.next_hidden()?;
    self.revealed.insert(i);
    Some(i)
  }

  /// A click on fragment `index` reveals only the single next hidden fragment at or before
  /// it. Clicking far ahead therefore still progresses one fragment per click.
  pub fn reveal_up_to(&mut self, index: usize) -> Option<usize> {
    match self.next_hidden() {
      Some(i) if i <= index => {
        self.revealed.insert(i);
        Some(i)
      }
      _ => None,
    }
  }

  /// True iff every fragment before `index` is revealed and `index` itself is not.
  pub fn is_next(&self, index: usize) -> bool {
    index < self.fragment_count
      && !self.revealed.contains(&index)
      && (0..index).all(|i| self.revealed.contains(&i))
  }

  /// The single fragment for which `is_next` holds, if any.
  pub fn next_index(&self) -> Option<usize> {
    self.next_hidden()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn next_count(r: &RevealEngine) -> usize {
    (0..r.fragment_count() + 2).filter(|&i| r.is_next(i)).count()
  }

  #[test]
  fn reveals_in_order_then_stops() {
    let mut r = RevealEngine::new(3);
    assert_eq!(r.reveal_next(), Some(0));
    assert_eq!(r.reveal_next(), Some(1));
    assert_eq!(r.reveal_next(), Some(2));
    assert_eq!(r.reveal_next(), None);
    assert!(r.all_revealed());
  }

  #[test]
  fn click_ahead_reveals_one_fragment_at_a_time() {
    let mut r = RevealEngine::new(6);
    assert_eq!(r.reveal_up_to(5), Some(0));
    assert_eq!(r.reveal_up_to(5), Some(1));
    assert_eq!(r.revealed().len(), 2);
    // clicking an already visible fragment does nothing
    assert_eq!(r.reveal_up_to(0), None);
    assert_eq!(r.reveal_up_to(2), Some(2));
    assert!(r.is_revealed(2) && !r.is_revealed(3));
  }

  #[test]
  fn is_next_marks_at_most_one_fragment() {
    let mut r = RevealEngine::new(4);
    assert_eq!(next_count(&r), 1);
    assert!(r.is_next(0));
    while r.reveal_next().is_some() {
      assert!(next_count(&r) <= 1);
      let size = r.revealed().len();
      assert!(r.revealed().iter().all(|&i| i < 4));
      if let Some(n) = r.next_index() {
        assert!(r.is_next(n));
        assert_eq!(n, size);
      }
    }
    assert_eq!(next_count(&r), 0);
  }

  #[test]
  fn empty_slides_are_noops() {
    let mut r = RevealEngine::new(0);
    assert_eq!(r.reveal_next(), None);
    assert_eq!(r.reveal_up_to(3), None);
    assert!(!r.is_next(0));
    assert!(r.all_revealed());
  }

  #[test]
  fn reset_empties_the_set() {
    let mut r = RevealEngine::new(2);
    r.reveal_next();
    r.reset(5);
    assert!(r.revealed().is_empty());
    assert_eq!(r.fragment_count(), 5);
    assert!(r.is_next(0));
  }

  #[test]
  fn resize_keeps_the_surviving_prefix() {
    let mut r = RevealEngine::new(4);
    r.reveal_next();
    r.reveal_next();
    r.reveal_next();
    r.resize(2);
    assert!(r.all_revealed());
    r.resize(5);
    assert_eq!(r.revealed().len(), 2);
    assert_eq!(r.next_index(), Some(2));
  }
}

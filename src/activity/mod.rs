//! Embedded slide activities: payload decoding and the interactive scorers.
//!
//! A slide stores its activity as an opaque JSON blob. `decode` turns it into a typed
//! `ActivityPayload` exactly once; anything that does not decode becomes plain instructional
//! text. `ActivityState::start` mounts a fresh runner for a payload, and `ActivityAction`
//! is the input vocabulary the presentation transport feeds into it.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod attempt;
pub mod dialogue;
pub mod fill_blank;
pub mod matching;
pub mod ordering;
pub mod quiz;
pub mod role_play;
pub mod scramble;
pub mod true_false;

pub use attempt::Attempt;
pub use dialogue::{Dialogue, DialogueLine, DialogueLineView};
pub use fill_blank::{BlankItem, BlankView, FillBlank};
pub use matching::{MatchPair, Matching, MatchingView};
pub use ordering::{Ordering, OrderingItem, OrderingView};
pub use quiz::{Quiz, QuizQuestion, QuizQuestionView};
pub use role_play::{RolePlay, RolePlayView, Scenario};
pub use scramble::{Scramble, ScrambleItemView, ScrambleWord};
pub use true_false::{TrueFalse, TrueFalseItem, TrueFalseView};

/// The activity payload as produced by the generator. The `type` tag and field names are the
/// interchange format shared with externally generated lessons.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivityPayload {
  Matching { pairs: Vec<MatchPair> },
  FillBlank { items: Vec<BlankItem> },
  Scramble { words: Vec<ScrambleWord> },
  Ordering { items: Vec<OrderingItem> },
  TrueFalse { items: Vec<TrueFalseItem> },
  Dialogue { lines: Vec<DialogueLine> },
  RolePlay { scenarios: Vec<Scenario> },
  Quiz { questions: Vec<QuizQuestion> },
}

/// What a slide's activity blob turned out to be.
#[derive(Clone, Debug, PartialEq)]
pub enum SlideActivity {
  Interactive(ActivityPayload),
  /// The raw blob, rendered as instructions.
  PlainText(String),
}

/// Decode an activity blob. Never fails: malformed or unknown payloads degrade to text.
pub fn decode(raw: &str) -> SlideActivity {
  match serde_json::from_str::<ActivityPayload>(raw) {
    Ok(p) => SlideActivity::Interactive(p),
    Err(e) => {
      debug!(target: "lesson", error = %e, raw_len = raw.len(), "Activity payload did not decode; rendering as text");
      SlideActivity::PlainText(raw.to_string())
    }
  }
}

/// Aggregate view shared by all runners.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
  pub can_check: bool,
  pub results_shown: bool,
  /// `None` for formative activities that keep no score.
  pub score: Option<usize>,
  pub total: usize,
}

/// Common contract of every activity runner.
pub trait Scorer {
  /// The "all answered" precondition for a global check.
  fn can_check(&self) -> bool;
  /// Latch results. Returns false (and changes nothing) if the precondition fails.
  fn check_answers(&mut self) -> bool;
  fn results_shown(&self) -> bool;
  fn score(&self) -> Option<usize>;
  fn total(&self) -> usize;
  /// Back to the freshly mounted state, re-shuffling where the activity shuffles.
  fn reset(&mut self, rng: &mut dyn RngCore);

  fn summary(&self) -> ActivitySummary {
    ActivitySummary {
      can_check: self.can_check(),
      results_shown: self.results_shown(),
      score: self.score(),
      total: self.total(),
    }
  }
}

/// Learner input routed to the mounted activity. Inputs that do not apply to the mounted
/// variant are ignored.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActivityAction {
  // matching
  SelectLeft { index: usize },
  SelectRight { index: usize },
  Unpair { left: usize },
  // fillblank / scramble / dialogue
  Answer { index: usize, value: String },
  ToggleHint { index: usize },
  // ordering
  PickWord { index: usize },
  ReturnWord { index: usize },
  MoveWord { from: usize, to: usize },
  // truefalse
  Choose { value: bool },
  // roleplay
  Respond { text: String },
  ToggleTips,
  ToggleSamples,
  SelectScenario { index: usize },
  // quiz
  Select { question: usize, option: usize },
  // ordering: next sentence, truefalse: next question, roleplay: next turn
  Next,
  Check,
  Reset,
}

/// What the client sees of a mounted runner. Answer keys are withheld until the runner
/// shows results.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivityStateView {
  Matching(MatchingView),
  FillBlank { items: Vec<BlankView> },
  Scramble { words: Vec<ScrambleItemView> },
  Ordering(OrderingView),
  TrueFalse(TrueFalseView),
  Dialogue { lines: Vec<DialogueLineView> },
  RolePlay(RolePlayView),
  Quiz { questions: Vec<QuizQuestionView> },
}

/// A mounted activity runner.
#[derive(Clone, Debug)]
pub enum ActivityState {
  Matching(Matching),
  FillBlank(FillBlank),
  Scramble(Scramble),
  Ordering(Ordering),
  TrueFalse(TrueFalse),
  Dialogue(Dialogue),
  RolePlay(RolePlay),
  Quiz(Quiz),
}

impl ActivityState {
  /// Mount a fresh runner for `payload`.
  pub fn start(payload: ActivityPayload, rng: &mut dyn RngCore) -> Self {
    match payload {
      ActivityPayload::Matching { pairs } => Self::Matching(Matching::new(pairs, rng)),
      ActivityPayload::FillBlank { items } => Self::FillBlank(FillBlank::new(items)),
      ActivityPayload::Scramble { words } => Self::Scramble(Scramble::new(words)),
      ActivityPayload::Ordering { items } => Self::Ordering(Ordering::new(items, rng)),
      ActivityPayload::TrueFalse { items } => Self::TrueFalse(TrueFalse::new(items)),
      ActivityPayload::Dialogue { lines } => Self::Dialogue(Dialogue::new(lines)),
      ActivityPayload::RolePlay { scenarios } => Self::RolePlay(RolePlay::new(scenarios)),
      ActivityPayload::Quiz { questions } => Self::Quiz(Quiz::new(questions)),
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Self::Matching(_) => "matching",
      Self::FillBlank(_) => "fillblank",
      Self::Scramble(_) => "scramble",
      Self::Ordering(_) => "ordering",
      Self::TrueFalse(_) => "truefalse",
      Self::Dialogue(_) => "dialogue",
      Self::RolePlay(_) => "roleplay",
      Self::Quiz(_) => "quiz",
    }
  }

  pub fn scorer(&self) -> &dyn Scorer {
    match self {
      Self::Matching(a) => a,
      Self::FillBlank(a) => a,
      Self::Scramble(a) => a,
      Self::Ordering(a) => a,
      Self::TrueFalse(a) => a,
      Self::Dialogue(a) => a,
      Self::RolePlay(a) => a,
      Self::Quiz(a) => a,
    }
  }

  pub fn scorer_mut(&mut self) -> &mut dyn Scorer {
    match self {
      Self::Matching(a) => a,
      Self::FillBlank(a) => a,
      Self::Scramble(a) => a,
      Self::Ordering(a) => a,
      Self::TrueFalse(a) => a,
      Self::Dialogue(a) => a,
      Self::RolePlay(a) => a,
      Self::Quiz(a) => a,
    }
  }

  pub fn summary(&self) -> ActivitySummary {
    self.scorer().summary()
  }

  pub fn view(&self) -> ActivityStateView {
    match self {
      Self::Matching(a) => ActivityStateView::Matching(a.view()),
      Self::FillBlank(a) => ActivityStateView::FillBlank { items: a.view() },
      Self::Scramble(a) => ActivityStateView::Scramble { words: a.view() },
      Self::Ordering(a) => ActivityStateView::Ordering(a.view()),
      Self::TrueFalse(a) => ActivityStateView::TrueFalse(a.view()),
      Self::Dialogue(a) => ActivityStateView::Dialogue { lines: a.view() },
      Self::RolePlay(a) => ActivityStateView::RolePlay(a.view()),
      Self::Quiz(a) => ActivityStateView::Quiz { questions: a.view() },
    }
  }

  /// Apply one learner input. Returns whether anything changed.
  pub fn apply(&mut self, action: ActivityAction, rng: &mut dyn RngCore) -> bool {
    use ActivityAction as A;
    match (self, action) {
      (s, A::Check) => s.scorer_mut().check_answers(),
      (s, A::Reset) => {
        s.scorer_mut().reset(rng);
        true
      }

      (Self::Matching(m), A::SelectLeft { index }) => m.select_left(index),
      (Self::Matching(m), A::SelectRight { index }) => m.select_right(index),
      (Self::Matching(m), A::Unpair { left }) => m.unpair(left),

      (Self::FillBlank(f), A::Answer { index, value }) => f.record_answer(index, value),
      (Self::Scramble(s), A::Answer { index, value }) => s.record_answer(index, value),
      (Self::Scramble(s), A::ToggleHint { index }) => s.toggle_hint(index),
      (Self::Dialogue(d), A::Answer { index, value }) => d.record_answer(index, value),
      (Self::Dialogue(d), A::ToggleHint { index }) => d.toggle_hint(index),

      (Self::Ordering(o), A::PickWord { index }) => o.pick_word(index),
      (Self::Ordering(o), A::ReturnWord { index }) => o.return_word(index),
      (Self::Ordering(o), A::MoveWord { from, to }) => o.move_word(from, to),
      (Self::Ordering(o), A::Next) => o.next_item(rng),

      (Self::TrueFalse(t), A::Choose { value }) => t.choose(value),
      (Self::TrueFalse(t), A::Next) => t.next_question(),

      (Self::RolePlay(r), A::Respond { text }) => r.record_response(text),
      (Self::RolePlay(r), A::ToggleTips) => r.toggle_tips(),
      (Self::RolePlay(r), A::ToggleSamples) => r.toggle_samples(),
      (Self::RolePlay(r), A::SelectScenario { index }) => r.select_scenario(index),
      (Self::RolePlay(r), A::Next) => r.next_turn(),

      (Self::Quiz(q), A::Select { question, option }) => q.select(question, option),

      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  #[test]
  fn every_variant_tag_decodes() {
    let blobs = [
      r#"{"type":"matching","pairs":[{"left":"cat","right":"gato"}]}"#,
      r#"{"type":"fillblank","items":[{"text":"I ___ home.","answer":"went"}]}"#,
      r#"{"type":"scramble","words":[{"scrambled":"tac","answer":"cat","hint":"animal"}]}"#,
      r#"{"type":"ordering","items":[{"sentence":"The cat sat.","words":["sat","The","cat"]}]}"#,
      r#"{"type":"truefalse","items":[{"statement":"Sky is green","answer":false}]}"#,
      r#"{"type":"dialogue","lines":[{"speaker":"A","text":"Hi"},{"speaker":"B","text":"___","isBlank":true,"answer":"Hello"}]}"#,
      r#"{"type":"roleplay","scenarios":[{"title":"Cafe","situation":"Ordering","roles":["Waiter","Guest"],"objective":"Order","turns":[{"role":"Guest","prompt":"Order a drink","sampleResponses":["A tea, please."]}]}]}"#,
      r#"{"type":"quiz","questions":[{"question":"2+2?","options":["3","4"],"correctAnswer":1}]}"#,
    ];
    let mut rng = StdRng::seed_from_u64(1);
    let kinds: Vec<_> = blobs
      .iter()
      .map(|b| match decode(b) {
        SlideActivity::Interactive(p) => ActivityState::start(p, &mut rng).kind(),
        SlideActivity::PlainText(t) => panic!("did not decode: {t}"),
      })
      .collect();
    assert_eq!(
      kinds,
      ["matching", "fillblank", "scramble", "ordering", "truefalse", "dialogue", "roleplay", "quiz"]
    );
  }

  #[test]
  fn malformed_payloads_degrade_to_text() {
    for raw in [
      r#"{"type":"quiz","questions":[{"question":"2+2?""#,
      r#"{"type":"crossword","grid":[]}"#,
      "Work in pairs and describe your last holiday.",
      r#"{"type":"fillblank","items":"nope"}"#,
    ] {
      assert_eq!(decode(raw), SlideActivity::PlainText(raw.to_string()));
    }
  }

  #[test]
  fn mismatched_actions_are_ignored() {
    let mut rng = StdRng::seed_from_u64(2);
    let payload = ActivityPayload::Quiz {
      questions: vec![QuizQuestion { question: "q".into(), options: vec!["a".into(), "b".into()], correct_answer: 0 }],
    };
    let mut state = ActivityState::start(payload, &mut rng);
    assert!(!state.apply(ActivityAction::PickWord { index: 0 }, &mut rng));
    assert!(!state.apply(ActivityAction::Check, &mut rng));
    assert!(state.apply(ActivityAction::Select { question: 0, option: 0 }, &mut rng));
    assert!(state.apply(ActivityAction::Check, &mut rng));
    assert_eq!(state.summary().score, Some(1));
  }

  #[test]
  fn actions_deserialize_from_tagged_json() {
    let a: ActivityAction = serde_json::from_str(r#"{"action":"select","question":2,"option":1}"#).expect("action");
    assert_eq!(a, ActivityAction::Select { question: 2, option: 1 });
    let b: ActivityAction = serde_json::from_str(r#"{"action":"toggle_tips"}"#).expect("action");
    assert_eq!(b, ActivityAction::ToggleTips);
  }

  #[test]
  fn serialized_view_carries_no_answer_key_before_check() {
    let mut rng = StdRng::seed_from_u64(3);
    let raw = r#"{"type":"fillblank","items":[{"text":"I ___ home.","answer":"went"}]}"#;
    let SlideActivity::Interactive(payload) = decode(raw) else { panic!("did not decode") };
    let mut state = ActivityState::start(payload, &mut rng);
    state.apply(ActivityAction::Answer { index: 0, value: "goed".into() }, &mut rng);

    let json = serde_json::to_string(&state.view()).expect("view json");
    assert!(json.starts_with(r#"{"type":"fillblank""#));
    assert!(!json.contains("went"));

    state.apply(ActivityAction::Check, &mut rng);
    let json = serde_json::to_string(&state.view()).expect("view json");
    assert!(json.contains(r#""expected":"went""#));
  }
}

//! One presentation session: the lesson on screen plus navigator, reveal and activity state.
//!
//! The session is the single writer of its lesson. Every slide carries a session-local id
//! that survives inserts, deletes and moves. Asynchronous results (images, validations)
//! arrive as `SlideUpdate` events addressed by lesson identity and slide id; updates for a
//! replaced lesson, a deleted slide or a superseded visual description are dropped.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::activity::{ActivityAction, ActivityState, ActivityStateView, ActivitySummary, SlideActivity};
use crate::domain::{ImageValidation, Lesson, Slide, SlideEdit};
use crate::navigator::{Fullscreen, FullscreenDirective, NavCommand, NavOutcome, Navigator};

#[derive(Clone, Debug, PartialEq)]
pub enum SlideUpdateKind {
  Image(String),
  Validation(ImageValidation),
}

/// A late-arriving result for one slide of one specific lesson.
#[derive(Clone, Debug, PartialEq)]
pub struct SlideUpdate {
  pub lesson_id: Uuid,
  pub slide_id: Uuid,
  pub kind: SlideUpdateKind,
}

/// A slide the image pipeline should illustrate, with the id its results are addressed to.
#[derive(Clone, Debug)]
pub struct ImageJob {
  pub slide_id: Uuid,
  pub slide: Slide,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityView {
  Interactive { state: ActivityStateView, summary: ActivitySummary },
  PlainText { text: String },
}

/// Everything a client needs to draw the current slide.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationView {
  pub lesson_id: Uuid,
  pub index: usize,
  pub slide_count: usize,
  pub slide: Option<Slide>,
  pub fragments: Vec<String>,
  pub revealed: Vec<usize>,
  pub next_fragment: Option<usize>,
  pub entering: bool,
  pub presenting: bool,
  pub fullscreen: bool,
  pub activity: Option<ActivityView>,
}

/// Identity and activity blob of the slide on screen, captured before an edit.
struct OnScreen {
  slide_id: Option<Uuid>,
  activity: Option<String>,
}

pub struct PresentationSession {
  lesson_id: Uuid,
  lesson: Lesson,
  /// Parallel to `lesson.slides`.
  slide_ids: Vec<Uuid>,
  navigator: Navigator,
  activity: Option<ActivityState>,
  fullscreen: FullscreenDirective,
  presenting: bool,
  enter_animation: Duration,
  rng: StdRng,
}

impl PresentationSession {
  pub fn new(lesson: Lesson, enter_animation: Duration) -> Self {
    Self::with_rng(lesson, enter_animation, StdRng::from_entropy())
  }

  pub fn with_rng(mut lesson: Lesson, enter_animation: Duration, rng: StdRng) -> Self {
    lesson.normalize();
    let navigator = Navigator::new(fragment_counts(&lesson), enter_animation);
    let mut s = Self {
      lesson_id: Uuid::new_v4(),
      slide_ids: fresh_ids(&lesson),
      lesson,
      navigator,
      activity: None,
      fullscreen: FullscreenDirective::default(),
      presenting: false,
      enter_animation,
      rng,
    };
    s.mount_activity();
    s
  }

  pub fn lesson_id(&self) -> Uuid {
    self.lesson_id
  }

  pub fn lesson(&self) -> &Lesson {
    &self.lesson
  }

  pub fn index(&self) -> usize {
    self.navigator.index()
  }

  pub fn activity(&self) -> Option<&ActivityState> {
    self.activity.as_ref()
  }

  pub fn slide_id(&self, index: usize) -> Option<Uuid> {
    self.slide_ids.get(index).copied()
  }

  fn position_of(&self, slide_id: Uuid) -> Option<usize> {
    self.slide_ids.iter().position(|&id| id == slide_id)
  }

  /// Image work for the slide at `index`, if it still wants a picture.
  pub fn image_job(&self, index: usize) -> Option<ImageJob> {
    let slide = self.lesson.slides.get(index).filter(|s| s.wants_image())?;
    Some(ImageJob { slide_id: self.slide_ids[index], slide: slide.clone() })
  }

  /// Image work for every slide that wants a picture, in slide order.
  pub fn image_jobs(&self) -> Vec<ImageJob> {
    (0..self.lesson.slides.len()).filter_map(|i| self.image_job(i)).collect()
  }

  /// Swap in a different lesson. It gets a fresh identity, so in-flight updates computed
  /// for the previous lesson will be discarded.
  pub fn replace_lesson(&mut self, mut lesson: Lesson) -> Uuid {
    lesson.normalize();
    self.lesson_id = Uuid::new_v4();
    self.slide_ids = fresh_ids(&lesson);
    self.navigator = Navigator::new(fragment_counts(&lesson), self.enter_animation);
    self.lesson = lesson;
    self.presenting = false;
    self.mount_activity();
    self.lesson_id
  }

  fn mount_activity(&mut self) {
    let decoded = self.lesson.slides.get(self.navigator.index()).and_then(Slide::activity);
    self.activity = match decoded {
      Some(SlideActivity::Interactive(p)) => Some(ActivityState::start(p, &mut self.rng)),
      _ => None,
    };
    if let Some(a) = &self.activity {
      debug!(target: "lesson", slide = self.navigator.index(), kind = a.kind(), "Activity mounted");
    }
  }

  pub fn start(&mut self, now: Instant) {
    self.presenting = true;
    self.navigator.start(&mut self.fullscreen, now);
    self.mount_activity();
  }

  pub fn exit(&mut self) {
    self.navigator.exit(&mut self.fullscreen);
    self.presenting = false;
  }

  pub fn command(&mut self, cmd: NavCommand, now: Instant) -> NavOutcome {
    let outcome = self.navigator.handle(cmd, now);
    match outcome {
      NavOutcome::SlideChanged { .. } => self.mount_activity(),
      NavOutcome::Exit => self.exit(),
      _ => {}
    }
    outcome
  }

  /// Route a key press. Unbound keys are ignored.
  pub fn key(&mut self, key: &str, now: Instant) -> NavOutcome {
    match NavCommand::from_key(key) {
      Some(cmd) => self.command(cmd, now),
      None => NavOutcome::Ignored,
    }
  }

  pub fn click_fragment(&mut self, index: usize) -> NavOutcome {
    self.navigator.click_fragment(index)
  }

  pub fn activity_action(&mut self, action: ActivityAction) -> bool {
    match self.activity.as_mut() {
      Some(a) => a.apply(action, &mut self.rng),
      None => false,
    }
  }

  /// Apply an asynchronous result if its lesson and slide are still around. An image whose
  /// slide got a new visual description in the meantime is addressed to a retired id and
  /// is dropped too.
  pub fn apply_update(&mut self, update: SlideUpdate) -> bool {
    if update.lesson_id != self.lesson_id {
      debug!(target: "lesson", stale = %update.lesson_id, current = %self.lesson_id, "Dropping update for a replaced lesson");
      return false;
    }
    let Some(index) = self.position_of(update.slide_id) else {
      debug!(target: "lesson", slide_id = %update.slide_id, "Dropping update for a slide that is gone");
      return false;
    };
    let slide = &mut self.lesson.slides[index];
    match update.kind {
      SlideUpdateKind::Image(url) => slide.image_url = Some(url),
      SlideUpdateKind::Validation(v) => slide.image_validation = Some(v),
    }
    true
  }

  // -------- editing --------

  fn on_screen(&self) -> OnScreen {
    let index = self.navigator.index();
    OnScreen {
      slide_id: self.slide_id(index),
      activity: self.lesson.slides.get(index).and_then(|s| s.activity.clone()),
    }
  }

  /// Follow the slide that was on screen to its new position. Its reveal progress and
  /// activity attempt survive unless the slide was deleted or its activity was edited.
  fn after_mutation(&mut self, before: OnScreen, now: Instant) {
    let (index, same_slide) = match before.slide_id.and_then(|id| self.position_of(id)) {
      Some(i) => (i, true),
      None => (self.navigator.index(), false),
    };
    self.navigator.refresh(fragment_counts(&self.lesson), index, same_slide, now);
    let activity = self.lesson.slides.get(self.navigator.index()).and_then(|s| s.activity.clone());
    if !same_slide || activity != before.activity {
      self.mount_activity();
    }
  }

  pub fn edit_slide(&mut self, index: usize, edit: SlideEdit, now: Instant) -> bool {
    let before = self.on_screen();
    let description = self.lesson.slides.get(index).map(|s| s.visual_description.clone());
    if !self.lesson.edit_slide(index, edit) {
      return false;
    }
    self.after_mutation(before, now);
    if self.lesson.slides.get(index).map(|s| s.visual_description.clone()) != description {
      // Results still in flight illustrate the old description.
      self.slide_ids[index] = Uuid::new_v4();
    }
    true
  }

  pub fn add_slide(&mut self, after: Option<usize>, now: Instant) -> usize {
    let before = self.on_screen();
    let at = self.lesson.add_slide(after);
    self.slide_ids.insert(at, Uuid::new_v4());
    self.after_mutation(before, now);
    at
  }

  pub fn duplicate_slide(&mut self, index: usize, now: Instant) -> Option<usize> {
    let before = self.on_screen();
    let at = self.lesson.duplicate_slide(index)?;
    self.slide_ids.insert(at, Uuid::new_v4());
    self.after_mutation(before, now);
    Some(at)
  }

  pub fn delete_slide(&mut self, index: usize, now: Instant) -> bool {
    let before = self.on_screen();
    if !self.lesson.delete_slide(index) {
      return false;
    }
    self.slide_ids.remove(index);
    self.after_mutation(before, now);
    true
  }

  pub fn view(&self, now: Instant) -> PresentationView {
    let index = self.index();
    let mut slide = self.lesson.slides.get(index).cloned();
    let fragments = slide.as_ref().map(Slide::fragments).unwrap_or_default();
    let activity = match (self.activity(), slide.as_ref().and_then(Slide::activity)) {
      (Some(state), _) => Some(ActivityView::Interactive { state: state.view(), summary: state.summary() }),
      (None, Some(SlideActivity::PlainText(text))) => Some(ActivityView::PlainText { text }),
      _ => None,
    };
    // The raw blob holds the answer key; the presenter only gets `activity`.
    if let Some(s) = slide.as_mut() {
      s.activity = None;
    }
    let reveal = self.navigator.reveal();
    PresentationView {
      lesson_id: self.lesson_id,
      index,
      slide_count: self.navigator.slide_count(),
      slide,
      fragments,
      revealed: reveal.revealed().iter().copied().collect(),
      next_fragment: reveal.next_index(),
      entering: self.navigator.animating(now),
      presenting: self.presenting,
      fullscreen: self.fullscreen.is_active(),
      activity,
    }
  }
}

fn fresh_ids(lesson: &Lesson) -> Vec<Uuid> {
  lesson.slides.iter().map(|_| Uuid::new_v4()).collect()
}

fn fragment_counts(lesson: &Lesson) -> Vec<usize> {
  lesson.slides.iter().map(|s| s.fragments().len()).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::activity::Scorer;
  use crate::domain::CefrLevel;
  use crate::seeds::demo_lesson;

  const ANIM: Duration = Duration::from_millis(300);

  fn session() -> PresentationSession {
    PresentationSession::with_rng(demo_lesson("Holidays", CefrLevel::A2), ANIM, StdRng::seed_from_u64(17))
  }

  fn fill_blank_answers(s: &mut PresentationSession, answers: &[&str]) {
    for (i, a) in answers.iter().enumerate() {
      assert!(s.activity_action(ActivityAction::Answer { index: i, value: a.to_string() }));
    }
  }

  #[test]
  fn fill_blank_slide_scores_end_to_end() {
    let mut s = session();
    let t0 = Instant::now();
    s.start(t0);
    assert_eq!(s.lesson().slides.len(), 3);

    let t1 = t0 + ANIM * 2;
    assert_eq!(s.key("ArrowRight", t1), NavOutcome::SlideChanged { from: 0, to: 1 });
    assert_eq!(s.activity().map(ActivityState::kind), Some("fillblank"));

    fill_blank_answers(&mut s, &["went", "visited"]);
    assert!(s.activity_action(ActivityAction::Check));
    assert_eq!(s.activity().and_then(|a| a.scorer().score()), Some(2));

    assert!(s.activity_action(ActivityAction::Reset));
    fill_blank_answers(&mut s, &[" WENT ", "visit"]);
    assert!(s.activity_action(ActivityAction::Check));
    match s.activity() {
      Some(ActivityState::FillBlank(f)) => {
        assert_eq!(f.score(), Some(1));
        assert_eq!(f.is_correct(1), Some(false));
        assert_eq!(f.correct_answer(1), Some("visited"));
      }
      other => panic!("unexpected activity {other:?}"),
    }
  }

  #[test]
  fn activity_is_remounted_fresh_on_slide_change() {
    let mut s = session();
    let t0 = Instant::now();
    s.command(NavCommand::JumpTo(1), t0);
    fill_blank_answers(&mut s, &["went", "visited"]);
    s.command(NavCommand::JumpTo(0), t0);
    assert!(s.activity().is_none());
    s.command(NavCommand::JumpTo(1), t0);
    assert_eq!(s.activity().map(|a| a.summary().can_check), Some(false));
  }

  #[test]
  fn advance_walks_fragments_then_slides() {
    let mut s = session();
    let t0 = Instant::now();
    let fragments = s.lesson().slides[0].fragments().len();
    for i in 0..fragments {
      assert_eq!(s.key(" ", t0), NavOutcome::Revealed { fragment: i });
    }
    let view = s.view(t0);
    assert_eq!(view.revealed.len(), fragments);
    assert_eq!(view.next_fragment, None);
    assert_eq!(s.key(" ", t0 + ANIM * 2), NavOutcome::SlideChanged { from: 0, to: 1 });
    assert!(s.view(t0 + ANIM * 2).revealed.is_empty());
  }

  fn image(lesson_id: Uuid, slide_id: Uuid, url: &str) -> SlideUpdate {
    SlideUpdate { lesson_id, slide_id, kind: SlideUpdateKind::Image(url.into()) }
  }

  #[test]
  fn stale_updates_are_dropped() {
    let mut s = session();
    let old = s.lesson_id();
    let lead_in = s.slide_id(0).expect("slide id");
    assert!(s.apply_update(image(old, lead_in, "https://img/a.png")));
    assert_eq!(s.lesson().slides[0].image_url.as_deref(), Some("https://img/a.png"));

    let new = s.replace_lesson(demo_lesson("Food", CefrLevel::B1));
    assert_ne!(old, new);
    assert!(!s.apply_update(image(old, lead_in, "https://img/a.png")));
    assert_eq!(s.lesson().slides[0].image_url, None);
    let unknown = SlideUpdate { lesson_id: new, slide_id: Uuid::new_v4(), kind: SlideUpdateKind::Validation(ImageValidation::permissive()) };
    assert!(!s.apply_update(unknown));
  }

  #[test]
  fn updates_follow_their_slide_through_structural_edits() {
    let mut s = session();
    let t0 = Instant::now();
    let lesson_id = s.lesson_id();
    let edit = SlideEdit { visual_description: Some("Students raising their hands".into()), ..Default::default() };
    assert!(s.edit_slide(2, edit, t0));
    let lead_in = s.slide_id(0).expect("slide id");
    let review = s.slide_id(2).expect("slide id");
    let jobs: Vec<Uuid> = s.image_jobs().iter().map(|j| j.slide_id).collect();
    assert_eq!(jobs, vec![lead_in, review]);

    assert!(s.delete_slide(0, t0));
    assert_eq!(s.add_slide(Some(0), t0), 1);
    assert!(s.apply_update(image(lesson_id, review, "https://img/review.png")));
    assert!(!s.apply_update(image(lesson_id, lead_in, "https://img/leadin.png")));

    let slides = &s.lesson().slides;
    assert_eq!(slides[2].title, "Quick check");
    assert_eq!(slides[2].image_url.as_deref(), Some("https://img/review.png"));
    assert!(slides[..2].iter().all(|sl| sl.image_url.is_none()));
  }

  #[test]
  fn update_for_a_deleted_slide_does_not_land_on_its_neighbour() {
    let mut s = session();
    let t0 = Instant::now();
    let lead_in = s.slide_id(0).expect("slide id");
    assert!(s.delete_slide(0, t0));
    assert!(!s.apply_update(image(s.lesson_id(), lead_in, "https://img/leadin.png")));
    assert_eq!(s.lesson().slides[0].title, "Past simple practice");
    assert_eq!(s.lesson().slides[0].image_url, None);
  }

  #[test]
  fn new_visual_description_retires_in_flight_images() {
    let mut s = session();
    let t0 = Instant::now();
    let old_id = s.slide_id(0).expect("slide id");
    let edit = SlideEdit { visual_description: Some("A map of Europe".into()), ..Default::default() };
    assert!(s.edit_slide(0, edit, t0));
    assert_ne!(s.slide_id(0), Some(old_id));
    assert!(!s.apply_update(image(s.lesson_id(), old_id, "https://img/old.png")));

    let job = s.image_job(0).expect("slide still wants an image");
    assert_eq!(job.slide.visual_description.as_deref(), Some("A map of Europe"));
    assert!(s.apply_update(image(s.lesson_id(), job.slide_id, "https://img/map.png")));
    assert!(s.image_job(0).is_none());
  }

  #[test]
  fn editing_another_slide_keeps_answers_in_progress() {
    let mut s = session();
    let t0 = Instant::now();
    s.command(NavCommand::JumpTo(1), t0);
    fill_blank_answers(&mut s, &["went"]);

    let edit = SlideEdit { title: Some("Final check".into()), ..Default::default() };
    assert!(s.edit_slide(2, edit, t0));
    let title_edit = SlideEdit { title: Some("Past simple".into()), ..Default::default() };
    assert!(s.edit_slide(1, title_edit, t0));
    s.add_slide(Some(2), t0);

    match s.activity() {
      Some(ActivityState::FillBlank(f)) => assert_eq!(f.answer(0), Some("went")),
      other => panic!("unexpected activity {other:?}"),
    }
  }

  #[test]
  fn editing_the_current_activity_remounts_it() {
    let mut s = session();
    let t0 = Instant::now();
    s.command(NavCommand::JumpTo(1), t0);
    fill_blank_answers(&mut s, &["went"]);
    let blob = r#"{"type":"fillblank","items":[{"text":"I ___ tea.","answer":"drank"}]}"#;
    let edit = SlideEdit { activity: Some(blob.into()), ..Default::default() };
    assert!(s.edit_slide(1, edit, t0));
    assert_eq!(s.activity().map(|a| a.summary().total), Some(1));
    match s.activity() {
      Some(ActivityState::FillBlank(f)) => assert_eq!(f.answer(0), None),
      other => panic!("unexpected activity {other:?}"),
    }
  }

  #[test]
  fn inserting_before_the_current_slide_keeps_it_on_screen() {
    let mut s = session();
    let t0 = Instant::now();
    s.command(NavCommand::JumpTo(2), t0);
    assert!(s.activity_action(ActivityAction::Select { question: 0, option: 1 }));

    assert_eq!(s.duplicate_slide(0, t0), Some(1));
    assert_eq!(s.index(), 3);
    assert_eq!(s.view(t0).slide.map(|sl| sl.title), Some("Quick check".to_string()));

    assert!(s.delete_slide(0, t0));
    assert_eq!(s.index(), 2);
    assert_eq!(s.activity().map(|a| a.kind()), Some("quiz"));
    match s.activity() {
      Some(ActivityState::Quiz(q)) => assert_eq!(q.selected(0), Some(1)),
      other => panic!("unexpected activity {other:?}"),
    }
  }

  #[test]
  fn editing_the_current_slide_keeps_revealed_fragments() {
    let mut s = session();
    let t0 = Instant::now();
    s.key(" ", t0);
    s.key(" ", t0);
    let edit = SlideEdit { content: Some("Look at the picture.\nWhat do you see?\nWho is there?\nWhere are they?".into()), ..Default::default() };
    assert!(s.edit_slide(0, edit, t0));
    let v = s.view(t0);
    assert_eq!(v.revealed, vec![0, 1]);
    assert_eq!(v.next_fragment, Some(2));
  }

  #[test]
  fn advance_is_a_noop_at_the_end_of_the_deck() {
    let mut s = session();
    let t0 = Instant::now();
    s.command(NavCommand::JumpTo(2), t0);
    let t1 = t0 + ANIM * 2;
    let fragments = s.lesson().slides[2].fragments().len();
    for i in 0..fragments {
      assert_eq!(s.key(" ", t1), NavOutcome::Revealed { fragment: i });
    }
    assert_eq!(s.key(" ", t1), NavOutcome::Ignored);
    assert_eq!(s.index(), 2);
    assert_eq!(s.view(t1).next_fragment, None);
  }

  #[test]
  fn view_withholds_the_answer_key() {
    let mut s = session();
    let t0 = Instant::now();
    s.command(NavCommand::JumpTo(1), t0);
    let json = serde_json::to_string(&s.view(t0)).expect("view json");
    assert!(!json.contains("visited"));
    assert!(json.contains(r#""type":"fillblank""#));

    fill_blank_answers(&mut s, &["went", "visit"]);
    s.activity_action(ActivityAction::Check);
    match s.view(t0).activity {
      Some(ActivityView::Interactive { state: ActivityStateView::FillBlank { items }, summary }) => {
        assert_eq!(summary.score, Some(1));
        assert_eq!(items[1].expected.as_deref(), Some("visited"));
      }
      other => panic!("unexpected view {other:?}"),
    }
  }

  #[test]
  fn malformed_activity_renders_as_text() {
    let mut s = session();
    let t0 = Instant::now();
    let edit = SlideEdit { activity: Some(r#"{"type":"quiz","questions":[{"#.into()), ..Default::default() };
    assert!(s.edit_slide(0, edit, t0));
    assert!(s.activity().is_none());
    match s.view(t0).activity {
      Some(ActivityView::PlainText { text }) => assert!(text.starts_with("{\"type\":\"quiz\"")),
      other => panic!("expected plain text, got {other:?}"),
    }
  }

  #[test]
  fn deleting_the_current_slide_keeps_a_valid_position() {
    let mut s = session();
    let t0 = Instant::now();
    s.command(NavCommand::JumpTo(2), t0);
    assert!(s.delete_slide(2, t0));
    assert_eq!(s.index(), 1);
    assert!(s.lesson().is_well_numbered());
    assert_eq!(s.activity().map(ActivityState::kind), Some("fillblank"));
  }

  #[test]
  fn escape_exits_and_releases_fullscreen() {
    let mut s = session();
    let t0 = Instant::now();
    s.start(t0);
    assert!(s.view(t0).fullscreen);
    assert_eq!(s.key("Escape", t0), NavOutcome::Exit);
    let v = s.view(t0);
    assert!(!v.fullscreen);
    assert!(!v.presenting);
  }
}

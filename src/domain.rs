//! Domain models: lessons, slides and the enums that describe them.
//!
//! Lessons arrive from the generation step (or from local edits) as JSON. Deserialization is
//! lenient on the optional descriptive enums (unknown values fall back to defaults) so a single
//! odd field never rejects a whole generated lesson. `Lesson::normalize` then restores the
//! slide-numbering invariant.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::activity::{self, SlideActivity};

/// CEFR proficiency level used to calibrate a lesson.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CefrLevel {
  A1,
  A2,
  #[default]
  B1,
  B2,
  C1,
  C2,
}

impl CefrLevel {
  pub fn as_str(&self) -> &'static str {
    match self {
      CefrLevel::A1 => "A1",
      CefrLevel::A2 => "A2",
      CefrLevel::B1 => "B1",
      CefrLevel::B2 => "B2",
      CefrLevel::C1 => "C1",
      CefrLevel::C2 => "C2",
    }
  }
}

impl fmt::Display for CefrLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Pedagogical stage of a slide (PPP-style lesson shape).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Stage {
  #[serde(rename = "Lead-in", alias = "Lead-In", alias = "Warm-up")]
  LeadIn,
  Presentation,
  #[default]
  Practice,
  Production,
  Consolidation,
  #[serde(rename = "Review/Assessment", alias = "Review", alias = "Assessment")]
  ReviewAssessment,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum InteractionPattern {
  Individual,
  Pairs,
  #[serde(rename = "Small Groups")]
  SmallGroups,
  #[serde(rename = "Whole Class")]
  WholeClass,
}

/// Layout hint for the slide renderer. Absent or unrecognized values mean `Standard`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
  #[default]
  Standard,
  TextHeavy,
  ImageFocused,
  Split,
  ExampleGrid,
}

/// Advisory verdict on a generated slide image. Never blocks rendering.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageValidation {
  pub is_valid: bool,
  /// 0..=100
  pub confidence: u8,
  #[serde(default)]
  pub issues: Vec<String>,
  #[serde(default)]
  pub recommendation: String,
}

impl ImageValidation {
  /// Substitute used whenever the validator is unreachable or returns garbage.
  pub fn permissive() -> Self {
    Self { is_valid: true, confidence: 0, issues: vec![], recommendation: String::new() }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
  #[serde(default)]
  pub slide_number: u32,
  #[serde(default, deserialize_with = "lenient_or_default")]
  pub stage: Stage,
  #[serde(default)]
  pub title: String,
  /// Newline-delimited; every non-blank line is one revealable fragment.
  #[serde(default)]
  pub content: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub visual_description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub image_validation: Option<ImageValidation>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timing: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub interaction_pattern: Option<InteractionPattern>,
  #[serde(default, deserialize_with = "lenient_or_default")]
  pub layout: Layout,
  /// Opaque serialized activity payload. Decoded on demand via `Slide::activity`.
  #[serde(default, deserialize_with = "activity_blob", skip_serializing_if = "Option::is_none")]
  pub activity: Option<String>,
}

impl Slide {
  pub fn blank(stage: Stage) -> Self {
    Self {
      slide_number: 0,
      stage,
      title: "New slide".into(),
      content: String::new(),
      visual_description: None,
      image_url: None,
      image_validation: None,
      timing: None,
      interaction_pattern: None,
      layout: Layout::Standard,
      activity: None,
    }
  }

  /// The fragment list handed to the reveal engine: content lines with blank lines dropped.
  pub fn fragments(&self) -> Vec<String> {
    self
      .content
      .lines()
      .map(str::trim)
      .filter(|l| !l.is_empty())
      .map(str::to_string)
      .collect()
  }

  /// Decode the embedded activity, if any. Malformed payloads come back as plain text.
  pub fn activity(&self) -> Option<SlideActivity> {
    self.activity.as_deref().map(activity::decode)
  }

  /// Whether the slide still wants an image from the enrichment pipeline.
  pub fn wants_image(&self) -> bool {
    self.image_url.is_none()
      && self.visual_description.as_deref().map(|d| !d.trim().is_empty()).unwrap_or(false)
  }
}

/// Partial update applied by the slide editor. `None` leaves a field untouched; an empty
/// string clears the optional text fields.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideEdit {
  #[serde(default)] pub title: Option<String>,
  #[serde(default)] pub content: Option<String>,
  #[serde(default)] pub stage: Option<Stage>,
  #[serde(default)] pub timing: Option<String>,
  #[serde(default)] pub interaction_pattern: Option<InteractionPattern>,
  #[serde(default)] pub layout: Option<Layout>,
  #[serde(default)] pub visual_description: Option<String>,
  #[serde(default)] pub activity: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
  pub topic: String,
  #[serde(default)]
  pub cefr_level: CefrLevel,
  #[serde(default)]
  pub slides: Vec<Slide>,
  #[serde(default)]
  pub teacher_notes: String,
}

impl Lesson {
  /// Normalize a freshly received lesson. Returns how many slide numbers had to be fixed.
  pub fn normalize(&mut self) -> usize {
    let fixed = self.renumber();
    if fixed > 0 {
      warn!(target: "lesson", topic = %self.topic, fixed, "Slide numbers were not 1..N; renumbered");
    }
    fixed
  }

  /// Force slide numbers to the contiguous 1-based sequence of their positions.
  pub fn renumber(&mut self) -> usize {
    let mut fixed = 0;
    for (i, slide) in self.slides.iter_mut().enumerate() {
      let want = (i + 1) as u32;
      if slide.slide_number != want {
        slide.slide_number = want;
        fixed += 1;
      }
    }
    fixed
  }

  pub fn is_well_numbered(&self) -> bool {
    self.slides.iter().enumerate().all(|(i, s)| s.slide_number as usize == i + 1)
  }

  /// Display title for saved-lesson listings.
  pub fn title(&self) -> String {
    let topic = self.topic.trim();
    if topic.is_empty() {
      self.slides.first().map(|s| s.title.clone()).unwrap_or_else(|| "Untitled lesson".into())
    } else {
      format!("{} ({})", topic, self.cefr_level)
    }
  }

  pub fn edit_slide(&mut self, index: usize, edit: SlideEdit) -> bool {
    let Some(slide) = self.slides.get_mut(index) else { return false };
    if let Some(t) = edit.title { slide.title = t; }
    if let Some(c) = edit.content { slide.content = c; }
    if let Some(s) = edit.stage { slide.stage = s; }
    if let Some(l) = edit.layout { slide.layout = l; }
    if edit.interaction_pattern.is_some() { slide.interaction_pattern = edit.interaction_pattern; }
    if let Some(t) = edit.timing { slide.timing = non_blank(t); }
    if let Some(v) = edit.visual_description {
      let changed = slide.visual_description.as_deref() != Some(v.as_str());
      slide.visual_description = non_blank(v);
      if changed {
        // The old picture illustrated the old description.
        slide.image_url = None;
        slide.image_validation = None;
      }
    }
    if let Some(a) = edit.activity { slide.activity = non_blank(a); }
    self.renumber();
    true
  }

  /// Insert a blank slide after `after` (or at the end). Returns the new slide's index.
  pub fn add_slide(&mut self, after: Option<usize>) -> usize {
    let at = match after {
      Some(i) if i < self.slides.len() => i + 1,
      _ => self.slides.len(),
    };
    self.slides.insert(at, Slide::blank(Stage::Practice));
    self.renumber();
    at
  }

  pub fn duplicate_slide(&mut self, index: usize) -> Option<usize> {
    let copy = self.slides.get(index)?.clone();
    self.slides.insert(index + 1, copy);
    self.renumber();
    Some(index + 1)
  }

  /// Remove a slide. The last remaining slide cannot be deleted.
  pub fn delete_slide(&mut self, index: usize) -> bool {
    if index >= self.slides.len() || self.slides.len() <= 1 {
      return false;
    }
    self.slides.remove(index);
    self.renumber();
    true
  }
}

/// Reusable generation preferences (stored as templates, forwarded to the generator verbatim).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPreferences {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub slide_count: Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub age_group: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub context: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub focus_skills: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub activity_types: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

fn non_blank(s: String) -> Option<String> {
  if s.trim().is_empty() { None } else { Some(s) }
}

// -------- lenient deserializers --------

fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let v = Option::<serde_json::Value>::deserialize(d)?;
  Ok(v.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned + Default,
{
  Ok(lenient(d)?.unwrap_or_default())
}

/// Activities may arrive as an embedded JSON object or as an already-serialized string.
/// Either way they are stored as a string blob.
fn activity_blob<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let v = Option::<serde_json::Value>::deserialize(d)?;
  Ok(match v {
    None | Some(serde_json::Value::Null) => None,
    Some(serde_json::Value::String(s)) => non_blank(s),
    Some(other) => Some(other.to_string()),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn lesson_json() -> serde_json::Value {
    json!({
      "topic": "Travel",
      "cefrLevel": "A2",
      "slides": [
        { "slideNumber": 1, "stage": "Lead-in", "title": "Warm up", "content": "Where did you go?\n\n  Who with?  \n" },
        { "slideNumber": 5, "stage": "Practice", "title": "Gap fill", "content": "",
          "layout": "holographic", "interactionPattern": "Pairs",
          "activity": { "type": "fillblank", "items": [{ "text": "I ___ to Rome.", "answer": "went" }] } },
        { "slideNumber": 5, "stage": "Review/Assessment", "title": "Wrap up", "content": "Recap",
          "layout": "split", "interactionPattern": "Everyone" }
      ],
      "teacherNotes": "Keep it light."
    })
  }

  #[test]
  fn lenient_fields_fall_back_to_defaults() {
    let lesson: Lesson = serde_json::from_value(lesson_json()).expect("lesson");
    assert_eq!(lesson.cefr_level, CefrLevel::A2);
    assert_eq!(lesson.slides[1].layout, Layout::Standard);
    assert_eq!(lesson.slides[1].interaction_pattern, Some(InteractionPattern::Pairs));
    assert_eq!(lesson.slides[2].layout, Layout::Split);
    assert_eq!(lesson.slides[2].interaction_pattern, None);
    assert_eq!(lesson.slides[2].stage, Stage::ReviewAssessment);
  }

  #[test]
  fn activity_objects_are_stored_as_blobs() {
    let lesson: Lesson = serde_json::from_value(lesson_json()).expect("lesson");
    let blob = lesson.slides[1].activity.as_deref().expect("blob");
    assert!(blob.contains("\"fillblank\""));
    assert!(matches!(lesson.slides[1].activity(), Some(SlideActivity::Interactive(_))));
  }

  #[test]
  fn normalize_renumbers_instead_of_rejecting() {
    let mut lesson: Lesson = serde_json::from_value(lesson_json()).expect("lesson");
    assert!(!lesson.is_well_numbered());
    assert_eq!(lesson.normalize(), 2);
    assert!(lesson.is_well_numbered());
  }

  #[test]
  fn fragments_skip_blank_lines() {
    let lesson: Lesson = serde_json::from_value(lesson_json()).expect("lesson");
    assert_eq!(lesson.slides[0].fragments(), vec!["Where did you go?", "Who with?"]);
    assert!(lesson.slides[1].fragments().is_empty());
  }

  #[test]
  fn mutations_keep_numbering_contiguous() {
    let mut lesson: Lesson = serde_json::from_value(lesson_json()).expect("lesson");
    lesson.normalize();

    let added = lesson.add_slide(Some(0));
    assert_eq!(added, 1);
    assert_eq!(lesson.slides.len(), 4);
    assert!(lesson.is_well_numbered());

    let dup = lesson.duplicate_slide(3).expect("dup");
    assert_eq!(dup, 4);
    assert_eq!(lesson.slides[4].title, "Wrap up");
    assert!(lesson.is_well_numbered());

    assert!(lesson.delete_slide(0));
    assert!(lesson.is_well_numbered());
    assert_eq!(lesson.slides[0].title, "New slide");
  }

  #[test]
  fn last_slide_cannot_be_deleted() {
    let mut lesson = Lesson {
      topic: "x".into(),
      cefr_level: CefrLevel::B1,
      slides: vec![Slide::blank(Stage::Practice)],
      teacher_notes: String::new(),
    };
    assert!(!lesson.delete_slide(0));
    assert!(!lesson.delete_slide(7));
  }

  #[test]
  fn editing_visual_description_drops_stale_image() {
    let mut lesson: Lesson = serde_json::from_value(lesson_json()).expect("lesson");
    lesson.slides[0].visual_description = Some("a beach".into());
    lesson.slides[0].image_url = Some("https://img/1.png".into());
    let edit = SlideEdit { visual_description: Some("a mountain".into()), ..Default::default() };
    assert!(lesson.edit_slide(0, edit));
    assert_eq!(lesson.slides[0].image_url, None);
    assert!(lesson.slides[0].wants_image());

    let clear = SlideEdit { timing: Some("  ".into()), ..Default::default() };
    assert!(lesson.edit_slide(0, clear));
    assert_eq!(lesson.slides[0].timing, None);
  }
}

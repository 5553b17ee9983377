//! Seed data: a built-in demo lesson.
//!
//! Served when no AI backend is configured (or it fails), so the presenter is usable
//! out of the box.

use serde_json::json;

use crate::domain::{CefrLevel, InteractionPattern, Layout, Lesson, Slide, Stage};

/// Three-slide lesson built around `topic`: a lead-in, a fill-in-the-blank practice
/// slide and a short review quiz.
pub fn demo_lesson(topic: &str, cefr_level: CefrLevel) -> Lesson {
  let topic = match topic.trim() {
    "" => "Travel",
    t => t,
  };

  let lead_in = Slide {
    title: format!("{topic}: warm-up"),
    content: format!(
      "Look at the picture.\nWhat do you know about {}?\nTalk to a partner for one minute.",
      topic.to_lowercase()
    ),
    visual_description: Some(format!("A friendly classroom scene showing students chatting about {}", topic.to_lowercase())),
    timing: Some("5 min".into()),
    interaction_pattern: Some(InteractionPattern::Pairs),
    layout: Layout::ImageFocused,
    ..Slide::blank(Stage::LeadIn)
  };

  let practice = Slide {
    title: "Past simple practice".into(),
    content: "Complete the sentences with the past simple.".into(),
    timing: Some("10 min".into()),
    interaction_pattern: Some(InteractionPattern::Individual),
    activity: Some(
      json!({
        "type": "fillblank",
        "items": [
          { "text": "Last summer we ___ to the coast.", "answer": "went" },
          { "text": "They ___ three museums in one day.", "answer": "visited" }
        ]
      })
      .to_string(),
    ),
    ..Slide::blank(Stage::Practice)
  };

  let review = Slide {
    title: "Quick check".into(),
    content: "Choose the best answer.".into(),
    timing: Some("5 min".into()),
    interaction_pattern: Some(InteractionPattern::WholeClass),
    activity: Some(
      json!({
        "type": "quiz",
        "questions": [
          { "question": "Yesterday I ___ a new word.", "options": ["learn", "learned", "learning"], "correctAnswer": 1 },
          { "question": "Which word is a verb?", "options": ["travel", "happy", "slowly"], "correctAnswer": 0 }
        ]
      })
      .to_string(),
    ),
    ..Slide::blank(Stage::ReviewAssessment)
  };

  let mut lesson = Lesson {
    topic: topic.to_string(),
    cefr_level,
    slides: vec![lead_in, practice, review],
    teacher_notes: "Demo lesson generated offline. Configure OPENAI_API_KEY for tailored content.".into(),
  };
  lesson.renumber();
  lesson
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::activity::SlideActivity;

  #[test]
  fn demo_lesson_is_well_formed() {
    let l = demo_lesson("", CefrLevel::A1);
    assert_eq!(l.topic, "Travel");
    assert_eq!(l.cefr_level, CefrLevel::A1);
    assert!(l.is_well_numbered());
    assert!(l.slides[0].wants_image());
    for s in &l.slides[1..] {
      assert!(matches!(s.activity(), Some(SlideActivity::Interactive(_))), "slide {} activity", s.slide_number);
    }
  }
}

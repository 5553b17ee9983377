//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Generating (or remixing) a lesson, with the demo lesson as offline fallback
//!   - Slide image generation and validation passthroughs
//!   - Lesson-level quality review, with a local heuristic when AI is unavailable
//!   - Starting the image enrichment pipeline for a freshly opened lesson

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ImageValidation, Lesson};
use crate::error::AiError;
use crate::imaging::{enrich_slides, EnrichReport};
use crate::protocol::{ContentQuality, GenerateLessonIn, ImageRequest, ImageValidationIn, OverallQuality, QualityIn, QualityIssue};
use crate::seeds::demo_lesson;
use crate::session::{ImageJob, SlideUpdate};
use crate::state::AppState;

/// Where a served lesson came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LessonOrigin {
  Generated,
  Demo,
}

impl LessonOrigin {
  pub fn as_str(&self) -> &'static str {
    match self {
      LessonOrigin::Generated => "openai_generated",
      LessonOrigin::Demo => "demo_seed",
    }
  }
}

#[instrument(level = "info", skip(state, req), fields(topic = %req.topic, cefr_level = %req.cefr_level, remix = req.remix_instruction.is_some()))]
pub async fn generate_lesson(state: &AppState, req: &GenerateLessonIn) -> Result<(Lesson, LessonOrigin), AiError> {
  match &state.openai {
    Some(oa) => {
      let lesson = oa.generate_lesson(&state.prompts, req).await.map_err(|e| {
        error!(target: "lesson", error = %e, kind = e.notification_kind(), "Lesson generation failed");
        e
      })?;
      Ok((lesson, LessonOrigin::Generated))
    }
    None => {
      warn!(target: "lesson", topic = %req.topic, "OPENAI_API_KEY not set; serving demo lesson");
      Ok((demo_lesson(&req.topic, req.cefr_level), LessonOrigin::Demo))
    }
  }
}

#[instrument(level = "info", skip(state, req), fields(title = %req.slide_title, retry = req.retry_attempt.unwrap_or(0)))]
pub async fn generate_image(state: &AppState, req: &ImageRequest) -> Result<String, AiError> {
  let oa = state.openai.as_ref().ok_or(AiError::Disabled)?;
  oa.generate_image(&state.prompts, req).await
}

/// Validate one image. Any failure degrades to the permissive default; validation is advisory.
#[instrument(level = "info", skip(state, req), fields(title = %req.slide_title))]
pub async fn validate_image(state: &AppState, req: &ImageValidationIn) -> ImageValidation {
  let Some(oa) = &state.openai else {
    debug!(target: "imaging", "No AI backend; returning permissive validation");
    return ImageValidation::permissive();
  };
  match oa.validate_image(&state.prompts, req).await {
    Ok(v) => v,
    Err(e) => {
      warn!(target: "imaging", error = %e, "Image validation failed; returning permissive validation");
      ImageValidation::permissive()
    }
  }
}

#[instrument(level = "info", skip(state, req), fields(topic = %req.lesson.topic, slides = req.lesson.slides.len()))]
pub async fn validate_quality(state: &AppState, req: &QualityIn) -> ContentQuality {
  if let Some(oa) = &state.openai {
    match oa.validate_quality(&state.prompts, req).await {
      Ok(q) => return q,
      Err(e) => error!(target: "lesson", error = %e, "OpenAI quality review failed; using local heuristic."),
    }
  }
  quality_local(&req.lesson)
}

/// Kick off image enrichment for `jobs` in the background. Returns `None` when no AI
/// backend is configured or there is nothing to illustrate.
pub fn spawn_enrichment(
  state: &AppState,
  lesson_id: Uuid,
  jobs: Vec<ImageJob>,
  tx: mpsc::Sender<SlideUpdate>,
) -> Option<JoinHandle<EnrichReport>> {
  if jobs.is_empty() {
    return None;
  }
  let service = state.imaging()?;
  info!(target: "imaging", %lesson_id, jobs = jobs.len(), "Starting image enrichment");
  Some(tokio::spawn(async move { enrich_slides(&service, lesson_id, jobs, tx).await }))
}

// -------- Local fallbacks --------

/// Structural review used when no model is available. Looks only at shape, not language.
fn quality_local(lesson: &Lesson) -> ContentQuality {
  let mut score: i32 = 100;
  let mut issues = vec![];
  let mut strengths = vec![];
  let mut recommendations = vec![];

  let mut issue = |severity: &str, slide_number: Option<u32>, category: &str, message: String, cost: i32| {
    issues.push(QualityIssue { severity: severity.into(), slide_number, category: category.into(), message });
    cost
  };

  let n = lesson.slides.len();
  if n == 0 {
    score -= issue("high", None, "structure", "The lesson has no slides.".into(), 100);
  } else if n < 3 {
    score -= issue("medium", None, "structure", format!("Only {n} slide(s); consider at least a lead-in, practice and review."), 20);
  }

  for s in &lesson.slides {
    if s.title.trim().is_empty() {
      score -= issue("low", Some(s.slide_number), "content", "Slide has no title.".into(), 5);
    }
    if s.fragments().is_empty() && s.activity.is_none() && s.visual_description.is_none() {
      score -= issue("medium", Some(s.slide_number), "content", "Slide is empty.".into(), 10);
    }
  }

  let interactive = lesson.slides.iter().filter(|s| s.activity.is_some()).count();
  if interactive == 0 && n > 0 {
    score -= issue("medium", None, "engagement", "No interactive activities.".into(), 15);
    recommendations.push("Add at least one practice activity (e.g. fill-in-the-blank or matching).".to_string());
  } else if interactive > 0 {
    strengths.push(format!("{interactive} interactive activit{}.", if interactive == 1 { "y" } else { "ies" }));
  }
  if lesson.is_well_numbered() && n > 0 {
    strengths.push("Slides are consistently numbered.".into());
  }
  if lesson.teacher_notes.trim().is_empty() {
    recommendations.push("Add teacher notes with timing and instructions.".into());
  }

  let quality_score = score.clamp(0, 100) as u8;
  let overall_quality = match quality_score {
    85..=100 => OverallQuality::Excellent,
    70..=84 => OverallQuality::Good,
    40..=69 => OverallQuality::NeedsImprovement,
    _ => OverallQuality::Poor,
  };
  ContentQuality { overall_quality, quality_score, issues, strengths, recommendations }
}

//! Image enrichment pipeline: generate, validate and (once) regenerate slide illustrations.
//!
//! Runs detached from the presentation session. Every result is sent back as a
//! `SlideUpdate` so the session can apply it or drop it if the lesson changed meanwhile.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::Prompts;
use crate::domain::{ImageValidation, Slide};
use crate::error::AiError;
use crate::openai::OpenAI;
use crate::protocol::{ImageRequest, ImageValidationIn};
use crate::session::{ImageJob, SlideUpdate, SlideUpdateKind};

#[async_trait]
pub trait ImageService: Send + Sync {
  async fn generate(&self, req: &ImageRequest) -> Result<String, AiError>;
  async fn validate(&self, req: &ImageValidationIn) -> Result<ImageValidation, AiError>;
}

/// `ImageService` backed by the OpenAI client and the configured prompts.
#[derive(Clone)]
pub struct OpenAiImaging {
  openai: OpenAI,
  prompts: Prompts,
}

impl OpenAiImaging {
  pub fn new(openai: OpenAI, prompts: Prompts) -> Self {
    Self { openai, prompts }
  }
}

#[async_trait]
impl ImageService for OpenAiImaging {
  async fn generate(&self, req: &ImageRequest) -> Result<String, AiError> {
    self.openai.generate_image(&self.prompts, req).await
  }

  async fn validate(&self, req: &ImageValidationIn) -> Result<ImageValidation, AiError> {
    self.openai.validate_image(&self.prompts, req).await
  }
}

/// What one enrichment run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnrichReport {
  pub images: usize,
  pub retries: usize,
  pub failures: usize,
  /// Notification kind of the most recent rate/quota failure, if any.
  pub throttled: Option<&'static str>,
}

impl EnrichReport {
  fn record_failure(&mut self, e: &AiError) {
    self.failures += 1;
    if matches!(e, AiError::RateLimited | AiError::QuotaExceeded) {
      self.throttled = Some(e.notification_kind());
    }
  }
}

fn image_request(slide: &Slide, retry_attempt: Option<u32>) -> Option<ImageRequest> {
  let visual_description = slide.visual_description.clone().filter(|d| !d.trim().is_empty())?;
  Some(ImageRequest {
    visual_description,
    slide_title: slide.title.clone(),
    slide_content: Some(slide.content.clone()).filter(|c| !c.is_empty()),
    retry_attempt,
  })
}

fn validation_request(slide: &Slide, image_url: &str) -> ImageValidationIn {
  ImageValidationIn {
    image_url: image_url.to_string(),
    slide_content: slide.content.clone(),
    visual_description: slide.visual_description.clone().unwrap_or_default(),
    slide_title: slide.title.clone(),
  }
}

async fn validate_or_permissive(service: &dyn ImageService, slide: &Slide, image_url: &str) -> ImageValidation {
  match service.validate(&validation_request(slide, image_url)).await {
    Ok(v) => v,
    Err(e) => {
      warn!(target: "imaging", slide = slide.slide_number, error = %e, "Image validation failed; using permissive default");
      ImageValidation::permissive()
    }
  }
}

/// Enrich every job's slide, strictly in the given (slide) order. Failures are logged and
/// skipped. Stops early if the receiving session has gone away.
#[instrument(level = "info", skip(service, jobs, tx), fields(%lesson_id, jobs = jobs.len()))]
pub async fn enrich_slides(
  service: &dyn ImageService,
  lesson_id: Uuid,
  jobs: Vec<ImageJob>,
  tx: mpsc::Sender<SlideUpdate>,
) -> EnrichReport {
  let mut report = EnrichReport::default();
  let send = |slide_id: Uuid, kind: SlideUpdateKind| {
    let tx = tx.clone();
    async move { tx.send(SlideUpdate { lesson_id, slide_id, kind }).await.is_ok() }
  };

  for ImageJob { slide_id, slide } in &jobs {
    let slide_id = *slide_id;
    let Some(req) = image_request(slide, None) else { continue };
    let n = slide.slide_number;

    let url = match service.generate(&req).await {
      Ok(url) => url,
      Err(e) => {
        warn!(target: "imaging", slide = n, error = %e, "Image generation failed; slide keeps no image");
        report.record_failure(&e);
        continue;
      }
    };
    report.images += 1;
    if !send(slide_id, SlideUpdateKind::Image(url.clone())).await {
      debug!(target: "imaging", "Session closed; stopping enrichment");
      return report;
    }

    let mut validation = validate_or_permissive(service, slide, &url).await;
    if !validation.is_valid {
      info!(target: "imaging", slide = n, confidence = validation.confidence, "Image judged invalid; regenerating once");
      report.retries += 1;
      let retry = image_request(slide, Some(1)).unwrap_or(req);
      match service.generate(&retry).await {
        Ok(url) => {
          report.images += 1;
          if !send(slide_id, SlideUpdateKind::Image(url.clone())).await {
            return report;
          }
          validation = validate_or_permissive(service, slide, &url).await;
        }
        Err(e) => {
          warn!(target: "imaging", slide = n, error = %e, "Image regeneration failed; keeping first image");
          report.record_failure(&e);
        }
      }
    }
    if !send(slide_id, SlideUpdateKind::Validation(validation)).await {
      return report;
    }
  }

  info!(target: "imaging", images = report.images, retries = report.retries, failures = report.failures, "Enrichment finished");
  report
}

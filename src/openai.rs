//! Minimal OpenAI client for our use-cases.
//!
//! We call chat.completions (strict JSON objects, optionally with an image part for
//! validation) and images.generations. Calls are instrumented and log model names,
//! latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{ImageValidation, Lesson};
use crate::error::AiError;
use crate::protocol::{ContentQuality, GenerateLessonIn, ImageRequest, ImageValidationIn, QualityIn};
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub text_model: String,
  pub vision_model: String,
  pub image_model: String,
}

/// The generator may or may not wrap the lesson in `{"lesson": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum GenOut {
  Wrapped { lesson: Lesson },
  Bare(Lesson),
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let text_model =
      std::env::var("OPENAI_TEXT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let vision_model =
      std::env::var("OPENAI_VISION_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    let image_model =
      std::env::var("OPENAI_IMAGE_MODEL").unwrap_or_else(|_| "gpt-image-1".into());

    // Lesson generation and image rendering are slow; keep the budget generous.
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, text_model, vision_model, image_model })
  }

  async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, AiError> {
    let url = format!("{}/{}", self.base_url, path);
    let res = self.client.post(&url)
      .header(USER_AGENT, "esl-lesson-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(body).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let (code, msg) = extract_openai_error(&body).unwrap_or((None, trunc_for_log(&body, 200)));
      return Err(AiError::from_status(status, code.as_deref(), msg));
    }
    Ok(res)
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: serde_json::Value,
    temperature: f32,
  ) -> Result<T, AiError> {
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: json!(system) },
        ChatMessageReq { role: "user".into(), content: user },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };

    let res = self.post("chat/completions", &req).await?;
    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text).map_err(|e| AiError::Parse(e.to_string()))
  }

  // --- High-level helpers (domain-specialized) ---

  /// Generate (or remix) a lesson. The result is normalized before it is returned.
  #[instrument(
    level = "info",
    skip(self, prompts, req),
    fields(topic = %req.topic, cefr_level = %req.cefr_level, remix = req.remix_instruction.is_some(), model = %self.text_model)
  )]
  pub async fn generate_lesson(&self, prompts: &Prompts, req: &GenerateLessonIn) -> Result<Lesson, AiError> {
    let level = req.cefr_level.as_str();
    let preferences = req
      .template
      .as_ref()
      .and_then(|t| serde_json::to_string(t).ok())
      .unwrap_or_else(|| "{}".into());

    let user = match (&req.remix_instruction, &req.current_lesson) {
      (Some(instruction), Some(current)) => fill_template(
        &prompts.remix_user_template,
        &[
          ("current_lesson", current),
          ("instruction", instruction),
          ("topic", &req.topic),
          ("cefr_level", level),
          ("preferences", &preferences),
        ],
      ),
      _ => fill_template(
        &prompts.lesson_user_template,
        &[("topic", &req.topic), ("cefr_level", level), ("preferences", &preferences)],
      ),
    };

    let start = Instant::now();
    let result = self.chat_json::<GenOut>(&self.text_model, &prompts.lesson_system, json!(user), 0.7).await;
    let elapsed = start.elapsed();

    let mut lesson = match result {
      Ok(GenOut::Wrapped { lesson }) | Ok(GenOut::Bare(lesson)) => {
        info!(?elapsed, "Model response received successfully");
        lesson
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during lesson generation");
        return Err(e);
      }
    };

    if lesson.topic.trim().is_empty() {
      lesson.topic = req.topic.clone();
    }
    lesson.cefr_level = req.cefr_level;
    lesson.normalize();

    info!(
      topic = %lesson.topic,
      slides = lesson.slides.len(),
      with_activity = lesson.slides.iter().filter(|s| s.activity.is_some()).count(),
      "Lesson successfully generated"
    );
    Ok(lesson)
  }

  /// Render one slide illustration. Returns a URL (or a data URL for base64 payloads).
  #[instrument(level = "info", skip(self, prompts, req), fields(title = %req.slide_title, retry = req.retry_attempt.unwrap_or(0), model = %self.image_model))]
  pub async fn generate_image(&self, prompts: &Prompts, req: &ImageRequest) -> Result<String, AiError> {
    let mut prompt = fill_template(
      &prompts.image_prompt_template,
      &[("title", &req.slide_title), ("description", &req.visual_description)],
    );
    if req.retry_attempt.unwrap_or(0) > 0 {
      prompt.push_str(&prompts.image_retry_suffix);
    }

    let body = ImageGenerationRequest { model: self.image_model.clone(), prompt, n: 1, size: "1024x1024".into() };
    let res = self.post("images/generations", &body).await?;
    let out: ImageGenerationResponse = res.json().await?;
    let first = out.data.into_iter().next().ok_or_else(|| AiError::Parse("no image returned".into()))?;
    match (first.url, first.b64_json) {
      (Some(url), _) => Ok(url),
      (None, Some(b64)) => Ok(format!("data:image/png;base64,{}", b64)),
      (None, None) => Err(AiError::Parse("image entry had neither url nor b64_json".into())),
    }
  }

  /// Ask a vision model whether the image fits the slide.
  #[instrument(level = "info", skip(self, prompts, req), fields(title = %req.slide_title, model = %self.vision_model))]
  pub async fn validate_image(&self, prompts: &Prompts, req: &ImageValidationIn) -> Result<ImageValidation, AiError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Val {
      is_valid: bool,
      #[serde(default)] confidence: f32,
      #[serde(default)] issues: Vec<String>,
      #[serde(default)] recommendation: String,
    }

    let text = fill_template(
      &prompts.image_validation_user_template,
      &[
        ("title", &req.slide_title),
        ("content", &req.slide_content),
        ("description", &req.visual_description),
      ],
    );
    let user = json!([
      { "type": "text", "text": text },
      { "type": "image_url", "image_url": { "url": req.image_url } },
    ]);
    let v: Val = self.chat_json(&self.vision_model, &prompts.image_validation_system, user, 0.0).await?;
    Ok(ImageValidation {
      is_valid: v.is_valid,
      confidence: v.confidence.round().clamp(0.0, 100.0) as u8,
      issues: v.issues,
      recommendation: v.recommendation,
    })
  }

  /// Lesson-level content review.
  #[instrument(level = "info", skip(self, prompts, req), fields(topic = %req.lesson.topic, cefr_level = %req.cefr_level))]
  pub async fn validate_quality(&self, prompts: &Prompts, req: &QualityIn) -> Result<ContentQuality, AiError> {
    let lesson = serde_json::to_string(&req.lesson).map_err(|e| AiError::Parse(e.to_string()))?;
    let user = fill_template(
      &prompts.quality_user_template,
      &[
        ("lesson", &lesson),
        ("cefr_level", req.cefr_level.as_str()),
        ("age_group", req.age_group.as_deref().unwrap_or("adults")),
        ("context", req.context.as_deref().unwrap_or("general English")),
      ],
    );
    let mut q: ContentQuality = self.chat_json(&self.text_model, &prompts.quality_system, json!(user), 0.2).await?;
    q.quality_score = q.quality_score.min(100);
    Ok(q)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
/// `content` is either a plain string or an array of typed parts (text / image_url).
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: serde_json::Value }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

// --- Image DTOs ---

#[derive(Serialize)]
struct ImageGenerationRequest { model: String, prompt: String, n: u8, size: String }
#[derive(Deserialize)]
struct ImageGenerationResponse { data: Vec<ImageDatum> }
#[derive(Deserialize)]
struct ImageDatum {
  #[serde(default)] url: Option<String>,
  #[serde(default)] b64_json: Option<String>,
}

/// Try to extract `(code, message)` from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<(Option<String>, String)> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String, #[serde(default)] code: Option<String> }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some((w.error.code, w.error.message)),
    Err(_) => None,
  }
}

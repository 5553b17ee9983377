//! Loading service configuration (prompts, presentation timing, viewer defaults) from TOML.
//!
//! See `ServiceConfig` and `Prompts` for expected schema.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::navigator::DEFAULT_ENTER_ANIMATION;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ServiceConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub presentation: PresentationCfg,
  #[serde(default)]
  pub viewer: ViewerSettings,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PresentationCfg {
  #[serde(default = "default_enter_animation_ms")]
  pub enter_animation_ms: u64,
}

fn default_enter_animation_ms() -> u64 {
  DEFAULT_ENTER_ANIMATION.as_millis() as u64
}

impl Default for PresentationCfg {
  fn default() -> Self {
    Self { enter_animation_ms: default_enter_animation_ms() }
  }
}

impl PresentationCfg {
  pub fn enter_animation(&self) -> Duration {
    Duration::from_millis(self.enter_animation_ms)
  }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  #[default]
  Light,
  Dark,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
  Small,
  #[default]
  Medium,
  Large,
  Xlarge,
}

/// Per-user viewer preferences. Loaded when a session says hello, persisted on change.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ViewerSettings {
  #[serde(default)]
  pub font_size: FontSize,
  #[serde(default)]
  pub theme: Theme,
}

/// Prompts used by the AI client. Defaults produce ESL slide decks.
/// You can override them in TOML if you need to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Lesson generation
  pub lesson_system: String,
  pub lesson_user_template: String,
  pub remix_user_template: String,
  // Slide images
  pub image_prompt_template: String,
  pub image_retry_suffix: String,
  pub image_validation_system: String,
  pub image_validation_user_template: String,
  // Lesson-level quality review
  pub quality_system: String,
  pub quality_user_template: String,
}

const ACTIVITY_SCHEMA: &str = r#"Activities are JSON objects with a "type" field, one of:
matching {pairs:[{left,right}]}, fillblank {items:[{text,answer}]},
scramble {words:[{scrambled,answer,hint?}]}, ordering {items:[{sentence,words[]}]},
truefalse {items:[{statement,answer:boolean,explanation?}]},
dialogue {lines:[{speaker,text,isBlank?,answer?,hint?}]},
roleplay {scenarios:[{title,situation,roles[],objective,turns:[{role,prompt,tips?[],sampleResponses?[]}]}]},
quiz {questions:[{question,options[],correctAnswer:index}]}."#;

impl Default for Prompts {
  fn default() -> Self {
    Self {
      lesson_system: format!(
        "You are an experienced ESL teacher who designs communicative slide lessons. Respond ONLY with strict JSON.\n\
         Return {{\"lesson\": {{topic, cefrLevel, slides:[{{slideNumber, stage, title, content, visualDescription?, timing?, interactionPattern?, layout?, activity?}}], teacherNotes}}}}.\n\
         stage is one of Lead-in, Presentation, Practice, Production, Consolidation, Review/Assessment.\n\
         interactionPattern is one of Individual, Pairs, Small Groups, Whole Class.\n\
         layout is one of standard, text-heavy, image-focused, split, example-grid.\n\
         content is plain text, one idea per line.\n{}",
        ACTIVITY_SCHEMA
      ),
      lesson_user_template: "Create a lesson on '{topic}' for CEFR level {cefr_level}. Preferences (JSON): {preferences}".into(),
      remix_user_template: "Here is an existing lesson (JSON): {current_lesson}\nRevise it following this instruction: {instruction}\nKeep the topic '{topic}' and CEFR level {cefr_level}. Preferences (JSON): {preferences}".into(),
      image_prompt_template: "Simple, friendly classroom illustration for an ESL slide titled '{title}'. {description}. No text or letters in the image.".into(),
      image_retry_suffix: " Depict exactly what is described, with clear and unambiguous subjects.".into(),
      image_validation_system: "You review illustrations for ESL slides. Reply as compact JSON.".into(),
      image_validation_user_template: "Slide title: {title}\nSlide content: {content}\nIntended visual: {description}\nDoes the image match and suit learners? Return JSON {\"isValid\": boolean, \"confidence\": number 0-100, \"issues\": [string], \"recommendation\": string}.".into(),
      quality_system: "You are a senior ESL materials reviewer. Be concise. Output JSON only.".into(),
      quality_user_template: "Lesson (JSON): {lesson}\nTarget CEFR level: {cefr_level}\nLearner age group: {age_group}\nTeaching context: {context}\nReturn JSON {\"overallQuality\": \"excellent\"|\"good\"|\"needs_improvement\"|\"poor\", \"qualityScore\": 0-100, \"issues\": [{\"severity\": \"low\"|\"medium\"|\"high\", \"slideNumber\": number|null, \"category\": string, \"message\": string}], \"strengths\": [string], \"recommendations\": [string]}.".into(),
    }
  }
}

/// Attempt to load `ServiceConfig` from LESSON_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_service_config_from_env() -> Option<ServiceConfig> {
  let path = std::env::var("LESSON_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<ServiceConfig>(&s) {
      Ok(cfg) => {
        info!(target: "esl_backend", %path, "Loaded service config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "esl_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "esl_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

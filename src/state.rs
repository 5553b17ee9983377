//! Application state: the persistence store, prompts, presentation timing and the
//! optional OpenAI client.
//!
//! This module owns:
//!   - the in-process store (lessons, templates, ratings, viewer settings)
//!   - the prompts struct (from TOML or defaults)
//!   - the navigator's enter-animation window
//!   - optional OpenAI client
//!
//! If OpenAI is unavailable, lesson generation falls back to the built-in demo lesson
//! and the image pipeline is skipped.

use std::time::Duration;

use tracing::{info, instrument};

use crate::config::{load_service_config_from_env, Prompts, ServiceConfig};
use crate::imaging::OpenAiImaging;
use crate::openai::OpenAI;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub enter_animation: Duration,
}

impl AppState {
    /// Build state from env: load config, init store and OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_service_config_from_env().unwrap_or_default();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "esl_backend", base_url = %oa.base_url, text_model = %oa.text_model, vision_model = %oa.vision_model, image_model = %oa.image_model, "OpenAI enabled.");
        } else {
            info!(target: "esl_backend", "OpenAI disabled (no OPENAI_API_KEY). Serving demo lessons, no images.");
        }

        Self::from_parts(cfg, openai)
    }

    #[cfg(test)]
    pub fn offline(cfg: ServiceConfig) -> Self {
        Self::from_parts(cfg, None)
    }

    fn from_parts(cfg: ServiceConfig, openai: Option<OpenAI>) -> Self {
        info!(
            target: "esl_backend",
            enter_animation_ms = cfg.presentation.enter_animation_ms,
            font_size = ?cfg.viewer.font_size,
            theme = ?cfg.viewer.theme,
            "Presentation defaults"
        );
        Self {
            store: Store::new(cfg.viewer),
            openai,
            prompts: cfg.prompts,
            enter_animation: cfg.presentation.enter_animation(),
        }
    }

    /// Image service for the enrichment pipeline, when the AI backend is configured.
    pub fn imaging(&self) -> Option<OpenAiImaging> {
        self.openai
            .as_ref()
            .map(|oa| OpenAiImaging::new(oa.clone(), self.prompts.clone()))
    }
}

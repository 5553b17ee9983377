//! In-process persistence: saved lessons, generation templates, ratings and viewer settings.
//!
//! Everything is keyed by an opaque, client-generated session id. Saved lessons and
//! templates may only be changed by the session that created them.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::ViewerSettings;
use crate::domain::{CefrLevel, GenerationPreferences, Lesson};
use crate::error::StoreError;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLesson {
  pub id: Uuid,
  pub session_id: String,
  pub title: String,
  pub topic: String,
  pub cefr_level: CefrLevel,
  pub lesson: Lesson,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
  pub id: Uuid,
  pub session_id: String,
  pub name: String,
  pub preferences: GenerationPreferences,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRating {
  pub lesson_id: Uuid,
  pub session_id: String,
  pub rating: u8,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct Store {
  lessons: Arc<RwLock<HashMap<Uuid, SavedLesson>>>,
  templates: Arc<RwLock<HashMap<Uuid, Template>>>,
  ratings: Arc<RwLock<Vec<LessonRating>>>,
  settings: Arc<RwLock<HashMap<String, ViewerSettings>>>,
  default_settings: ViewerSettings,
}

fn require_session(session_id: &str) -> Result<(), StoreError> {
  if session_id.trim().is_empty() {
    return Err(StoreError::Invalid("missing session id".into()));
  }
  Ok(())
}

impl Store {
  pub fn new(default_settings: ViewerSettings) -> Self {
    Self { default_settings, ..Default::default() }
  }

  // -------- lessons --------

  #[instrument(level = "info", skip(self, lesson), fields(%session_id, topic = %lesson.topic))]
  pub async fn save_lesson(&self, session_id: &str, mut lesson: Lesson) -> Result<SavedLesson, StoreError> {
    require_session(session_id)?;
    lesson.normalize();
    let now = Utc::now();
    let saved = SavedLesson {
      id: Uuid::new_v4(),
      session_id: session_id.to_string(),
      title: lesson.title(),
      topic: lesson.topic.clone(),
      cefr_level: lesson.cefr_level,
      lesson,
      created_at: now,
      updated_at: now,
    };
    self.lessons.write().await.insert(saved.id, saved.clone());
    info!(target: "store", id = %saved.id, "Lesson saved");
    Ok(saved)
  }

  #[instrument(level = "info", skip(self, lesson), fields(%session_id, %id))]
  pub async fn update_lesson(&self, session_id: &str, id: Uuid, mut lesson: Lesson) -> Result<SavedLesson, StoreError> {
    let mut lessons = self.lessons.write().await;
    let saved = lessons.get_mut(&id).ok_or(StoreError::NotFound("lesson"))?;
    if saved.session_id != session_id {
      return Err(StoreError::Forbidden);
    }
    lesson.normalize();
    saved.title = lesson.title();
    saved.topic = lesson.topic.clone();
    saved.cefr_level = lesson.cefr_level;
    saved.lesson = lesson;
    saved.updated_at = Utc::now();
    info!(target: "store", %id, "Lesson updated");
    Ok(saved.clone())
  }

  pub async fn get_lesson(&self, session_id: &str, id: Uuid) -> Result<SavedLesson, StoreError> {
    let lessons = self.lessons.read().await;
    let saved = lessons.get(&id).ok_or(StoreError::NotFound("lesson"))?;
    if saved.session_id != session_id {
      return Err(StoreError::Forbidden);
    }
    Ok(saved.clone())
  }

  #[instrument(level = "info", skip(self), fields(%session_id, %id))]
  pub async fn delete_lesson(&self, session_id: &str, id: Uuid) -> Result<(), StoreError> {
    let mut lessons = self.lessons.write().await;
    match lessons.get(&id) {
      None => Err(StoreError::NotFound("lesson")),
      Some(l) if l.session_id != session_id => Err(StoreError::Forbidden),
      Some(_) => {
        lessons.remove(&id);
        info!(target: "store", %id, "Lesson deleted");
        Ok(())
      }
    }
  }

  /// Most recently updated first.
  pub async fn list_lessons(&self, session_id: &str) -> Vec<SavedLesson> {
    let mut out: Vec<SavedLesson> =
      self.lessons.read().await.values().filter(|l| l.session_id == session_id).cloned().collect();
    out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    out
  }

  // -------- templates --------

  #[instrument(level = "info", skip(self, preferences), fields(%session_id))]
  pub async fn create_template(
    &self,
    session_id: &str,
    name: &str,
    preferences: GenerationPreferences,
  ) -> Result<Template, StoreError> {
    require_session(session_id)?;
    let name = name.trim();
    if name.is_empty() {
      return Err(StoreError::Invalid("template name is empty".into()));
    }
    let t = Template {
      id: Uuid::new_v4(),
      session_id: session_id.to_string(),
      name: name.to_string(),
      preferences,
      created_at: Utc::now(),
    };
    self.templates.write().await.insert(t.id, t.clone());
    Ok(t)
  }

  pub async fn list_templates(&self, session_id: &str) -> Vec<Template> {
    let mut out: Vec<Template> =
      self.templates.read().await.values().filter(|t| t.session_id == session_id).cloned().collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
  }

  pub async fn delete_template(&self, session_id: &str, id: Uuid) -> Result<(), StoreError> {
    let mut templates = self.templates.write().await;
    match templates.get(&id) {
      None => Err(StoreError::NotFound("template")),
      Some(t) if t.session_id != session_id => Err(StoreError::Forbidden),
      Some(_) => {
        templates.remove(&id);
        Ok(())
      }
    }
  }

  // -------- ratings --------

  #[instrument(level = "info", skip(self, feedback), fields(%session_id, %lesson_id))]
  pub async fn rate_lesson(
    &self,
    session_id: &str,
    lesson_id: Uuid,
    rating: u8,
    feedback: Option<String>,
  ) -> Result<LessonRating, StoreError> {
    require_session(session_id)?;
    if !(1..=5).contains(&rating) {
      return Err(StoreError::Invalid(format!("rating must be 1..=5, got {rating}")));
    }
    let r = LessonRating {
      lesson_id,
      session_id: session_id.to_string(),
      rating,
      feedback: feedback.filter(|f| !f.trim().is_empty()),
      created_at: Utc::now(),
    };
    self.ratings.write().await.push(r.clone());
    Ok(r)
  }

  pub async fn ratings_for(&self, lesson_id: Uuid) -> Vec<LessonRating> {
    self.ratings.read().await.iter().filter(|r| r.lesson_id == lesson_id).cloned().collect()
  }

  // -------- viewer settings --------

  pub async fn settings(&self, session_id: &str) -> ViewerSettings {
    self.settings.read().await.get(session_id).copied().unwrap_or(self.default_settings)
  }

  pub async fn save_settings(&self, session_id: &str, settings: ViewerSettings) -> Result<(), StoreError> {
    require_session(session_id)?;
    self.settings.write().await.insert(session_id.to_string(), settings);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{FontSize, Theme};
  use crate::seeds::demo_lesson;

  #[tokio::test]
  async fn only_the_owner_may_change_a_lesson() {
    let store = Store::default();
    let saved = store.save_lesson("alice", demo_lesson("Food", CefrLevel::A2)).await.unwrap();
    assert_eq!(saved.topic, "Food");
    assert_eq!(saved.created_at, saved.updated_at);

    let mut edited = saved.lesson.clone();
    edited.topic = "Cooking".into();
    assert_eq!(store.update_lesson("bob", saved.id, edited.clone()).await.unwrap_err(), StoreError::Forbidden);
    assert_eq!(store.delete_lesson("bob", saved.id).await, Err(StoreError::Forbidden));
    assert_eq!(store.get_lesson("bob", saved.id).await.unwrap_err(), StoreError::Forbidden);

    let updated = store.update_lesson("alice", saved.id, edited).await.unwrap();
    assert_eq!(updated.topic, "Cooking");
    assert!(updated.updated_at >= saved.updated_at);

    assert!(store.list_lessons("bob").await.is_empty());
    assert_eq!(store.list_lessons("alice").await.len(), 1);
    assert_eq!(store.delete_lesson("alice", saved.id).await, Ok(()));
    assert_eq!(store.delete_lesson("alice", saved.id).await, Err(StoreError::NotFound("lesson")));
  }

  #[tokio::test]
  async fn ratings_are_range_checked() {
    let store = Store::default();
    let id = Uuid::new_v4();
    for bad in [0, 6] {
      assert!(matches!(store.rate_lesson("s", id, bad, None).await, Err(StoreError::Invalid(_))));
    }
    let r = store.rate_lesson("s", id, 5, Some("  ".into())).await.unwrap();
    assert_eq!(r.feedback, None);
    assert_eq!(store.ratings_for(id).await.len(), 1);
  }

  #[tokio::test]
  async fn templates_and_settings_are_per_session() {
    let defaults = ViewerSettings { font_size: FontSize::Large, theme: Theme::Light };
    let store = Store::new(defaults);
    assert!(store.create_template("s", "  ", GenerationPreferences::default()).await.is_err());
    let t = store.create_template("s", "Teens", GenerationPreferences::default()).await.unwrap();
    assert_eq!(store.list_templates("s").await.len(), 1);
    assert_eq!(store.delete_template("other", t.id).await, Err(StoreError::Forbidden));
    assert_eq!(store.delete_template("s", t.id).await, Ok(()));

    assert_eq!(store.settings("s").await, defaults);
    let dark = ViewerSettings { theme: Theme::Dark, ..defaults };
    store.save_settings("s", dark).await.unwrap();
    assert_eq!(store.settings("s").await, dark);
    assert_eq!(store.settings("t").await, defaults);
  }
}

//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::ActivityAction;
use crate::config::ViewerSettings;
use crate::domain::{CefrLevel, GenerationPreferences, ImageValidation, Lesson, SlideEdit};
use crate::session::PresentationView;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Hello {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Generate(GenerateLessonIn),
    OpenLesson {
        #[serde(rename = "lessonId")]
        lesson_id: Uuid,
    },
    LoadLesson {
        lesson: Lesson,
    },
    StartPresentation,
    Key {
        key: String,
    },
    ClickFragment {
        index: usize,
    },
    JumpTo {
        index: usize,
    },
    Activity(ActivityAction),
    EditSlide {
        index: usize,
        edit: SlideEdit,
    },
    AddSlide {
        #[serde(default)]
        after: Option<usize>,
    },
    DuplicateSlide {
        index: usize,
    },
    DeleteSlide {
        index: usize,
    },
    SaveLesson,
    SaveSettings {
        settings: ViewerSettings,
    },
    Exit,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Hello {
        #[serde(rename = "sessionId")]
        session_id: String,
        settings: ViewerSettings,
    },
    Lesson {
        #[serde(rename = "lessonId")]
        lesson_id: Uuid,
        lesson: Lesson,
    },
    View(PresentationView),
    Notification {
        kind: String,
        message: String,
    },
    Settings {
        settings: ViewerSettings,
    },
    Saved {
        #[serde(rename = "lessonId")]
        lesson_id: Uuid,
    },
    Exit,
    Error {
        message: String,
    },
}

impl ServerWsMessage {
    pub fn notify(kind: &str, message: impl Into<String>) -> Self {
        ServerWsMessage::Notification { kind: kind.to_string(), message: message.into() }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLessonIn {
    pub topic: String,
    pub cefr_level: CefrLevel,
    #[serde(default)]
    pub remix_instruction: Option<String>,
    /// Serialized `Lesson`, only meaningful together with `remix_instruction`.
    #[serde(default)]
    pub current_lesson: Option<String>,
    #[serde(default)]
    pub template: Option<GenerationPreferences>,
}

#[derive(Serialize)]
pub struct LessonOut {
    pub lesson: Lesson,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub visual_description: String,
    pub slide_title: String,
    #[serde(default)]
    pub slide_content: Option<String>,
    #[serde(default)]
    pub retry_attempt: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOut {
    pub image_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageValidationIn {
    pub image_url: String,
    pub slide_content: String,
    pub visual_description: String,
    pub slide_title: String,
}

#[derive(Serialize)]
pub struct ImageValidationOut {
    pub validation: ImageValidation,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityIn {
    pub lesson: Lesson,
    pub cefr_level: CefrLevel,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverallQuality {
    Excellent,
    Good,
    NeedsImprovement,
    Poor,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityIssue {
    pub severity: String,
    #[serde(default)]
    pub slide_number: Option<u32>,
    #[serde(default)]
    pub category: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuality {
    pub overall_quality: OverallQuality,
    pub quality_score: u8,
    #[serde(default)]
    pub issues: Vec<QualityIssue>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Serialize)]
pub struct QualityOut {
    pub validation: ContentQuality,
}

#[derive(Deserialize)]
pub struct SaveLessonIn {
    pub lesson: Lesson,
}

#[derive(Deserialize)]
pub struct TemplateIn {
    pub name: String,
    #[serde(default)]
    pub preferences: GenerationPreferences,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingIn {
    pub lesson_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub ai: bool,
}

//! WebSocket upgrade + presentation session loop.
//!
//! One connection owns one `PresentationSession`. Client messages are parsed as JSON and
//! applied in order; image-pipeline results arrive on a channel and are applied between
//! client messages. Every state change is answered with a fresh `view`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::Lesson;
use crate::logic::{generate_lesson, spawn_enrichment};
use crate::navigator::{NavCommand, NavOutcome};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::{ImageJob, PresentationSession, SlideUpdate};
use crate::state::AppState;

const CHANNEL_DEPTH: usize = 64;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "esl_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Per-connection state.
struct Connection {
  session_id: Option<String>,
  presentation: Option<PresentationSession>,
  /// Store id of the lesson on screen, once it has been saved or opened from the store.
  saved_id: Option<Uuid>,
  updates: mpsc::Sender<SlideUpdate>,
  notices: mpsc::Sender<ServerWsMessage>,
}

impl Connection {
  fn session_id(&self) -> Result<&str, ServerWsMessage> {
    self
      .session_id
      .as_deref()
      .ok_or_else(|| ServerWsMessage::Error { message: "Say hello with a sessionId first.".into() })
  }

  /// Put `lesson` on screen and start enriching its images.
  fn open(&mut self, state: &AppState, lesson: Lesson, saved_id: Option<Uuid>) -> Vec<ServerWsMessage> {
    if let Some(p) = self.presentation.as_mut() {
      p.replace_lesson(lesson);
    } else {
      self.presentation = Some(PresentationSession::new(lesson, state.enter_animation));
    }
    self.saved_id = saved_id;
    let Some(presentation) = self.presentation.as_ref() else {
      return no_lesson();
    };
    let lesson_id = presentation.lesson_id();
    info!(target: "lesson", %lesson_id, slides = presentation.lesson().slides.len(), "Lesson opened");
    self.enrich(state, lesson_id, presentation.image_jobs());

    vec![
      ServerWsMessage::Lesson { lesson_id, lesson: presentation.lesson().clone() },
      ServerWsMessage::View(presentation.view(Instant::now())),
    ]
  }

  /// Start the image pipeline for `jobs`. A throttled run is reported as a notification.
  fn enrich(&self, state: &AppState, lesson_id: Uuid, jobs: Vec<ImageJob>) {
    let Some(handle) = spawn_enrichment(state, lesson_id, jobs, self.updates.clone()) else {
      return;
    };
    let notices = self.notices.clone();
    tokio::spawn(async move {
      match handle.await {
        Ok(report) => {
          if let Some(kind) = report.throttled {
            let msg = ServerWsMessage::notify(kind, "Some slide images could not be generated right now.");
            if let Err(e) = notices.send(msg).await {
              debug!(target: "imaging", error = %e, "Connection gone before throttle notice");
            }
          }
        }
        Err(e) => error!(target: "imaging", error = %e, "Enrichment task panicked"),
      }
    });
  }

  /// Illustrate the slide at `index` if an edit left it wanting a fresh image.
  fn enrich_slide(&self, state: &AppState, index: usize) {
    let Some(p) = self.presentation.as_ref() else { return };
    if let Some(job) = p.image_job(index) {
      self.enrich(state, p.lesson_id(), vec![job]);
    }
  }

  fn lesson_and_view(&self) -> Vec<ServerWsMessage> {
    match &self.presentation {
      Some(p) => vec![
        ServerWsMessage::Lesson { lesson_id: p.lesson_id(), lesson: p.lesson().clone() },
        ServerWsMessage::View(p.view(Instant::now())),
      ],
      None => vec![],
    }
  }
}

fn no_lesson() -> Vec<ServerWsMessage> {
  vec![ServerWsMessage::Error { message: "No lesson loaded.".into() }]
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "esl_backend", "WebSocket connected");
  let (updates_tx, mut updates_rx) = mpsc::channel::<SlideUpdate>(CHANNEL_DEPTH);
  let (notices_tx, mut notices_rx) = mpsc::channel::<ServerWsMessage>(CHANNEL_DEPTH);
  let mut conn = Connection {
    session_id: None,
    presentation: None,
    saved_id: None,
    updates: updates_tx,
    notices: notices_tx,
  };

  loop {
    let replies = tokio::select! {
      msg = socket.recv() => match msg {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "esl_backend", len = txt.len(), "WS message received");
            handle_client_ws(incoming, &state, &mut conn).await
          }
          Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
        },
        Some(Ok(Message::Ping(payload))) => {
          if let Err(e) = socket.send(Message::Pong(payload)).await {
            debug!(target: "esl_backend", error = %e, "WS pong failed");
          }
          continue;
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Err(e)) => {
          debug!(target: "esl_backend", error = %e, "WS receive error");
          break;
        }
        Some(Ok(_)) => continue,
      },
      Some(update) = updates_rx.recv() => match conn.presentation.as_mut() {
        Some(p) => {
          if !p.apply_update(update) {
            continue;
          }
          vec![ServerWsMessage::View(p.view(Instant::now()))]
        }
        None => continue,
      },
      Some(notice) = notices_rx.recv() => vec![notice],
    };

    for reply in replies {
      let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
      });
      if let Err(e) = socket.send(Message::Text(out)).await {
        error!(target: "esl_backend", error = %e, "WS send error");
        info!(target: "esl_backend", "WebSocket disconnected");
        return;
      }
    }
  }
  info!(target: "esl_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip_all)]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, conn: &mut Connection) -> Vec<ServerWsMessage> {
  let now = Instant::now();
  match msg {
    ClientWsMessage::Ping => vec![ServerWsMessage::Pong],

    ClientWsMessage::Hello { session_id } => {
      let settings = state.store.settings(&session_id).await;
      conn.session_id = Some(session_id.clone());
      vec![ServerWsMessage::Hello { session_id, settings }]
    }

    ClientWsMessage::Generate(req) => {
      if req.topic.trim().is_empty() && req.remix_instruction.is_none() {
        return vec![ServerWsMessage::Error { message: "topic is required".into() }];
      }
      match generate_lesson(state, &req).await {
        Ok((lesson, origin)) => {
          info!(target: "lesson", topic = %lesson.topic, origin = origin.as_str(), "WS lesson generated");
          conn.open(state, lesson, None)
        }
        Err(e) => {
          warn!(target: "lesson", error = %e, "WS generation failed");
          vec![ServerWsMessage::notify(e.notification_kind(), e.to_string())]
        }
      }
    }

    ClientWsMessage::OpenLesson { lesson_id } => {
      let session_id = match conn.session_id() {
        Ok(s) => s.to_string(),
        Err(reply) => return vec![reply],
      };
      match state.store.get_lesson(&session_id, lesson_id).await {
        Ok(saved) => conn.open(state, saved.lesson, Some(saved.id)),
        Err(e) => vec![ServerWsMessage::Error { message: e.to_string() }],
      }
    }

    ClientWsMessage::LoadLesson { lesson } => conn.open(state, lesson, None),

    ClientWsMessage::StartPresentation => match conn.presentation.as_mut() {
      Some(p) => {
        p.start(now);
        vec![ServerWsMessage::View(p.view(now))]
      }
      None => no_lesson(),
    },

    ClientWsMessage::Key { key } => match conn.presentation.as_mut() {
      Some(p) => match p.key(&key, now) {
        NavOutcome::Ignored => vec![],
        NavOutcome::Exit => vec![ServerWsMessage::Exit, ServerWsMessage::View(p.view(now))],
        _ => vec![ServerWsMessage::View(p.view(now))],
      },
      None => no_lesson(),
    },

    ClientWsMessage::ClickFragment { index } => match conn.presentation.as_mut() {
      Some(p) => {
        p.click_fragment(index);
        vec![ServerWsMessage::View(p.view(now))]
      }
      None => no_lesson(),
    },

    ClientWsMessage::JumpTo { index } => match conn.presentation.as_mut() {
      Some(p) => {
        p.command(NavCommand::JumpTo(index), now);
        vec![ServerWsMessage::View(p.view(now))]
      }
      None => no_lesson(),
    },

    ClientWsMessage::Activity(action) => match conn.presentation.as_mut() {
      Some(p) => {
        if !p.activity_action(action) {
          debug!(target: "lesson", "Activity action ignored");
        }
        vec![ServerWsMessage::View(p.view(now))]
      }
      None => no_lesson(),
    },

    ClientWsMessage::EditSlide { index, edit } => {
      let Some(p) = conn.presentation.as_mut() else { return no_lesson() };
      let slide_id = p.slide_id(index);
      if !p.edit_slide(index, edit, now) {
        return vec![ServerWsMessage::Error { message: format!("No slide at index {index}.") }];
      }
      if p.slide_id(index) != slide_id {
        conn.enrich_slide(state, index);
      }
      conn.lesson_and_view()
    }

    ClientWsMessage::AddSlide { after } => {
      let Some(p) = conn.presentation.as_mut() else { return no_lesson() };
      p.add_slide(after, now);
      conn.lesson_and_view()
    }

    ClientWsMessage::DuplicateSlide { index } => {
      let Some(p) = conn.presentation.as_mut() else { return no_lesson() };
      let Some(copy) = p.duplicate_slide(index, now) else {
        return vec![ServerWsMessage::Error { message: format!("No slide at index {index}.") }];
      };
      conn.enrich_slide(state, copy);
      conn.lesson_and_view()
    }

    ClientWsMessage::DeleteSlide { index } => {
      let Some(p) = conn.presentation.as_mut() else { return no_lesson() };
      if !p.delete_slide(index, now) {
        return vec![ServerWsMessage::notify("invalid_edit", "A lesson needs at least one slide.")];
      }
      conn.lesson_and_view()
    }

    ClientWsMessage::SaveLesson => {
      let session_id = match conn.session_id() {
        Ok(s) => s.to_string(),
        Err(reply) => return vec![reply],
      };
      let Some(p) = conn.presentation.as_ref() else {
        return no_lesson();
      };
      let lesson = p.lesson().clone();
      let result = match conn.saved_id {
        Some(id) => state.store.update_lesson(&session_id, id, lesson).await,
        None => state.store.save_lesson(&session_id, lesson).await,
      };
      match result {
        Ok(saved) => {
          conn.saved_id = Some(saved.id);
          vec![ServerWsMessage::Saved { lesson_id: saved.id }]
        }
        Err(e) => vec![ServerWsMessage::Error { message: e.to_string() }],
      }
    }

    ClientWsMessage::SaveSettings { settings } => {
      let session_id = match conn.session_id() {
        Ok(s) => s.to_string(),
        Err(reply) => return vec![reply],
      };
      match state.store.save_settings(&session_id, settings).await {
        Ok(()) => vec![ServerWsMessage::Settings { settings }],
        Err(e) => vec![ServerWsMessage::Error { message: e.to_string() }],
      }
    }

    ClientWsMessage::Exit => match conn.presentation.as_mut() {
      Some(p) => {
        p.exit();
        vec![ServerWsMessage::Exit, ServerWsMessage::View(p.view(now))]
      }
      None => vec![ServerWsMessage::Exit],
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ServiceConfig;

  fn connection() -> (Connection, mpsc::Receiver<SlideUpdate>) {
    let (updates, rx) = mpsc::channel(CHANNEL_DEPTH);
    let (notices, _) = mpsc::channel(CHANNEL_DEPTH);
    (Connection { session_id: None, presentation: None, saved_id: None, updates, notices }, rx)
  }

  fn parse(json: &str) -> ClientWsMessage {
    serde_json::from_str(json).expect("client message")
  }

  #[tokio::test]
  async fn generate_then_navigate_and_save() {
    let state = AppState::offline(ServiceConfig::default());
    let (mut conn, _rx) = connection();

    let replies = handle_client_ws(parse(r#"{"type":"key","key":"ArrowRight"}"#), &state, &mut conn).await;
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Error { .. }]));

    let replies = handle_client_ws(parse(r#"{"type":"generate","topic":"Music","cefrLevel":"A2"}"#), &state, &mut conn).await;
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Lesson { .. }, ServerWsMessage::View(_)]));

    let replies = handle_client_ws(parse(r#"{"type":"jump_to","index":1}"#), &state, &mut conn).await;
    match replies.as_slice() {
      [ServerWsMessage::View(v)] => assert_eq!(v.index, 1),
      other => panic!("unexpected {other:?}"),
    }

    let replies = handle_client_ws(parse(r#"{"type":"save_lesson"}"#), &state, &mut conn).await;
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Error { .. }]));

    handle_client_ws(parse(r#"{"type":"hello","sessionId":"s1"}"#), &state, &mut conn).await;
    let replies = handle_client_ws(parse(r#"{"type":"save_lesson"}"#), &state, &mut conn).await;
    let first = match replies.as_slice() {
      [ServerWsMessage::Saved { lesson_id }] => *lesson_id,
      other => panic!("unexpected {other:?}"),
    };
    let replies = handle_client_ws(parse(r#"{"type":"save_lesson"}"#), &state, &mut conn).await;
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Saved { lesson_id }] if *lesson_id == first));
    assert_eq!(state.store.list_lessons("s1").await.len(), 1);
  }

  #[tokio::test]
  async fn the_last_slide_cannot_be_deleted() {
    let state = AppState::offline(ServiceConfig::default());
    let (mut conn, _rx) = connection();
    handle_client_ws(parse(r#"{"type":"generate","topic":"Art","cefrLevel":"B1"}"#), &state, &mut conn).await;
    for _ in 0..2 {
      let replies = handle_client_ws(parse(r#"{"type":"delete_slide","index":0}"#), &state, &mut conn).await;
      assert!(matches!(replies.as_slice(), [ServerWsMessage::Lesson { .. }, ServerWsMessage::View(_)]));
    }
    let replies = handle_client_ws(parse(r#"{"type":"delete_slide","index":0}"#), &state, &mut conn).await;
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Notification { .. }]));
  }
}

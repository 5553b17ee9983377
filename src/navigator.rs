//! Presentation navigator: current slide, key routing, entering animation and fullscreen.
//!
//! All transitions are synchronous and driven by discrete input events. A slide change
//! starts a short "entering" animation; while it runs, `Next`/`Previous` (including the
//! slide-change branch of `Advance`) are ignored so key repeat cannot skip slides.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::reveal::RevealEngine;

pub const DEFAULT_ENTER_ANIMATION: Duration = Duration::from_millis(300);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavCommand {
  Next,
  Previous,
  JumpTo(usize),
  /// Reveal the next fragment, or go to the next slide once everything is visible.
  Advance,
  Exit,
}

impl NavCommand {
  /// Keyboard binding. Unknown keys map to `None`.
  pub fn from_key(key: &str) -> Option<Self> {
    match key {
      " " | "Space" | "Spacebar" => Some(Self::Advance),
      "ArrowRight" | "PageDown" => Some(Self::Next),
      "ArrowLeft" | "PageUp" => Some(Self::Previous),
      "Home" => Some(Self::JumpTo(0)),
      "End" => Some(Self::JumpTo(usize::MAX)),
      "Escape" | "Esc" => Some(Self::Exit),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavOutcome {
  Revealed { fragment: usize },
  SlideChanged { from: usize, to: usize },
  Exit,
  Ignored,
}

/// Best-effort fullscreen control supplied by the embedding view.
pub trait Fullscreen {
  fn request(&mut self) -> Result<(), String>;
  fn release(&mut self);
  fn is_active(&self) -> bool;
}

/// Fullscreen modelled as a flag forwarded to a remote client, which honours it if it can.
#[derive(Clone, Debug, Default)]
pub struct FullscreenDirective {
  active: bool,
}

impl Fullscreen for FullscreenDirective {
  fn request(&mut self) -> Result<(), String> {
    self.active = true;
    Ok(())
  }

  fn release(&mut self) {
    self.active = false;
  }

  fn is_active(&self) -> bool {
    self.active
  }
}

#[derive(Clone, Debug)]
pub struct Navigator {
  /// Fragment count of every slide, in order.
  fragment_counts: Vec<usize>,
  index: usize,
  reveal: RevealEngine,
  entered_at: Option<Instant>,
  enter_animation: Duration,
}

impl Navigator {
  pub fn new(fragment_counts: Vec<usize>, enter_animation: Duration) -> Self {
    let first = fragment_counts.first().copied().unwrap_or(0);
    Self { fragment_counts, index: 0, reveal: RevealEngine::new(first), entered_at: None, enter_animation }
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn slide_count(&self) -> usize {
    self.fragment_counts.len()
  }

  pub fn reveal(&self) -> &RevealEngine {
    &self.reveal
  }

  pub fn animating(&self, now: Instant) -> bool {
    self
      .entered_at
      .map(|t| now.saturating_duration_since(t) < self.enter_animation)
      .unwrap_or(false)
  }

  /// Begin presenting: land on slide 0 and ask for fullscreen. A refused request is fine.
  pub fn start(&mut self, fullscreen: &mut dyn Fullscreen, now: Instant) {
    self.index = 0;
    self.enter(now);
    if let Err(e) = fullscreen.request() {
      debug!(target: "esl_backend", error = %e, "Fullscreen request refused; presenting windowed");
    }
  }

  /// Leave the presentation, releasing fullscreen if it is still held.
  pub fn exit(&mut self, fullscreen: &mut dyn Fullscreen) {
    if fullscreen.is_active() {
      fullscreen.release();
    }
    self.entered_at = None;
  }

  fn enter(&mut self, now: Instant) {
    let count = self.fragment_counts.get(self.index).copied().unwrap_or(0);
    self.reveal.reset(count);
    self.entered_at = Some(now);
  }

  fn go(&mut self, to: usize, now: Instant) -> NavOutcome {
    let from = self.index;
    if to == from || to >= self.slide_count() {
      return NavOutcome::Ignored;
    }
    self.index = to;
    self.enter(now);
    NavOutcome::SlideChanged { from, to }
  }

  pub fn handle(&mut self, cmd: NavCommand, now: Instant) -> NavOutcome {
    match cmd {
      NavCommand::Next => {
        if self.animating(now) {
          return NavOutcome::Ignored;
        }
        self.go(self.index + 1, now)
      }
      NavCommand::Previous => {
        if self.animating(now) || self.index == 0 {
          return NavOutcome::Ignored;
        }
        self.go(self.index - 1, now)
      }
      NavCommand::JumpTo(i) => {
        if self.slide_count() == 0 {
          return NavOutcome::Ignored;
        }
        self.go(i.min(self.slide_count() - 1), now)
      }
      NavCommand::Advance => match self.reveal.reveal_next() {
        Some(fragment) => NavOutcome::Revealed { fragment },
        None => self.handle(NavCommand::Next, now),
      },
      NavCommand::Exit => NavOutcome::Exit,
    }
  }

  /// Pointer click on a fragment of the current slide.
  pub fn click_fragment(&mut self, fragment: usize) -> NavOutcome {
    match self.reveal.reveal_up_to(fragment) {
      Some(fragment) => NavOutcome::Revealed { fragment },
      None => NavOutcome::Ignored,
    }
  }

  /// The slide list changed shape (edit, add, duplicate, delete). `index` is where the slide
  /// that was on screen ended up; `same_slide` is false when that slide is gone and `index`
  /// now holds a different one. A surviving slide keeps its reveal state; a replaced one is
  /// entered fresh.
  pub fn refresh(&mut self, fragment_counts: Vec<usize>, index: usize, same_slide: bool, now: Instant) {
    self.fragment_counts = fragment_counts;
    self.index = index.min(self.slide_count().saturating_sub(1));
    let count = self.fragment_counts.get(self.index).copied().unwrap_or(0);
    if same_slide {
      self.reveal.resize(count);
    } else {
      self.enter(now);
    }
  }
}

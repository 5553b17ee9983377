//! Typed errors for the external boundaries (AI backend, persistence store).
//!
//! The presentation core never sees these: handlers convert them into notifications,
//! HTTP statuses or permissive defaults at the call site.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
  #[error("rate limited by the AI backend")]
  RateLimited,
  #[error("AI backend quota exhausted or payment required")]
  QuotaExceeded,
  #[error("AI backend HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("response parse error: {0}")]
  Parse(String),
  #[error("AI backend not configured")]
  Disabled,
}

impl AiError {
  /// Classify a non-success response. OpenAI reports exhausted credit as 429 with
  /// code `insufficient_quota`, so the body is consulted too.
  pub fn from_status(status: u16, code: Option<&str>, message: String) -> Self {
    match (status, code) {
      (402, _) | (429, Some("insufficient_quota")) => AiError::QuotaExceeded,
      (429, _) => AiError::RateLimited,
      _ => AiError::Http { status, message },
    }
  }

  /// Notification kind shown to the user.
  pub fn notification_kind(&self) -> &'static str {
    match self {
      AiError::RateLimited => "rate_limited",
      AiError::QuotaExceeded => "quota_exceeded",
      _ => "generation_failed",
    }
  }

  /// HTTP status used when relaying this error to our own clients.
  pub fn status_code(&self) -> u16 {
    match self {
      AiError::RateLimited => 429,
      AiError::QuotaExceeded => 402,
      AiError::Disabled => 503,
      _ => 502,
    }
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
  #[error("{0} not found")]
  NotFound(&'static str),
  #[error("record belongs to another session")]
  Forbidden,
  #[error("invalid input: {0}")]
  Invalid(String),
}

impl StoreError {
  pub fn status_code(&self) -> u16 {
    match self {
      StoreError::NotFound(_) => 404,
      StoreError::Forbidden => 403,
      StoreError::Invalid(_) => 400,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_classification() {
    assert!(matches!(AiError::from_status(429, None, String::new()), AiError::RateLimited));
    assert!(matches!(AiError::from_status(429, Some("insufficient_quota"), String::new()), AiError::QuotaExceeded));
    assert!(matches!(AiError::from_status(402, None, String::new()), AiError::QuotaExceeded));
    let other = AiError::from_status(500, None, "boom".into());
    assert_eq!(other.status_code(), 502);
    assert_eq!(other.notification_kind(), "generation_failed");
  }
}

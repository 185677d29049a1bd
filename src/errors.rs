use actix_web::dev::HttpResponseBuilder;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use std::fmt::Display;
use strum::{AsRefStr, Display as StrumDisplay};

use crate::components::layout;

#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("Profile {0} not found")]
  NotFound(String),

  #[error("Page {0} not found")]
  PageNotFound(String),

  #[error("Profile {0} already exists")]
  Conflict(String),

  #[error("Profile store request failed: {0}")]
  Persistence(String),

  #[error("Identity provider request failed: {0}")]
  AuthUnavailable(String),

  #[error("Not signed in")]
  Unauthenticated,

  #[error("Request timed out")]
  Timeout,

  #[error("Request was cancelled")]
  Cancelled,

  #[error("{0}")]
  Config(#[from] config::ConfigError),

  #[error("Failed to parse URL: {0}")]
  ParseURL(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  Conflict,
  Persistence,
  AuthUnavailable,
  Unauthenticated,
  Timeout,
  Cancelled,
  Config,
}

impl Error {
  pub fn persistence<E: Display>(err: E) -> Self {
    Error::Persistence(err.to_string())
  }

  pub fn auth_unavailable<E: Display>(err: E) -> Self {
    Error::AuthUnavailable(err.to_string())
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::NotFound(_) | Error::PageNotFound(_) => ErrorKind::NotFound,
      Error::Conflict(_) => ErrorKind::Conflict,
      Error::Persistence(_) => ErrorKind::Persistence,
      Error::AuthUnavailable(_) => ErrorKind::AuthUnavailable,
      Error::Unauthenticated => ErrorKind::Unauthenticated,
      Error::Timeout => ErrorKind::Timeout,
      Error::Cancelled => ErrorKind::Cancelled,
      Error::Config(_) | Error::ParseURL(_) => ErrorKind::Config,
    }
  }
}

/// A displayable copy of an error, kept in UI state after the error itself
/// has been consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
  pub kind: ErrorKind,
  pub message: String,
}

impl From<&Error> for Notice {
  fn from(err: &Error) -> Self {
    Self {
      kind: err.kind(),
      message: err.to_string(),
    }
  }
}

impl From<Error> for Notice {
  fn from(err: Error) -> Self {
    Notice::from(&err)
  }
}

impl actix_web::error::ResponseError for Error {
  fn status_code(&self) -> StatusCode {
    match self.kind() {
      // 4XX
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Conflict | ErrorKind::Cancelled => StatusCode::CONFLICT,
      ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,

      // 5XX
      ErrorKind::Persistence => StatusCode::BAD_GATEWAY,
      ErrorKind::AuthUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
      ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let message = self.to_string();
    let status_code = self.status_code();

    if status_code.is_server_error() {
      error!("Internal server error {}", &message);
    }

    let page = layout::error_page(status_code, &Notice::from(self));
    HttpResponseBuilder::new(status_code)
      .content_type("text/html; charset=utf-8")
      .body(page.into_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::error::ResponseError;

  #[test]
  fn kinds_render_in_snake_case() {
    assert_eq!(ErrorKind::AuthUnavailable.to_string(), "auth_unavailable");
    assert_eq!(ErrorKind::NotFound.as_ref(), "not_found");
  }

  #[test]
  fn unauthenticated_and_unavailable_are_distinct() {
    let unauthenticated = Error::Unauthenticated;
    let unavailable = Error::auth_unavailable("connection refused");

    assert_ne!(unauthenticated.kind(), unavailable.kind());
    assert_eq!(unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
  }

  #[test]
  fn notice_keeps_kind_and_message() {
    let notice = Notice::from(Error::persistence("connection reset"));

    assert_eq!(notice.kind, ErrorKind::Persistence);
    assert!(notice.message.contains("connection reset"));
  }
}

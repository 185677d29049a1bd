use actix_web::http::header::IntoHeaderValue;
use actix_web::{http, HttpResponse};
use rand::Rng;
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

use crate::errors::Error;

type Response = actix_web::Result<HttpResponse>;

pub fn redirect_to<T: IntoHeaderValue>(url: T) -> Response {
  Ok(
    HttpResponse::Found()
      .header(http::header::LOCATION, url)
      .finish()
      .into_body(),
  )
}

pub fn create_random_string(size: usize) -> String {
  rand::thread_rng()
    .sample_iter(&rand::distributions::Alphanumeric)
    .take(size)
    .map(char::from)
    .collect()
}

// A panic while holding one of the in-process locks leaves plain data behind,
// so the guard is recovered instead of propagating the poison.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// Everything before the first '@'. An address without one is returned as is.
pub fn email_local_part(email: &str) -> &str {
  email.split('@').next().unwrap_or(email)
}

// Treats blank strings the same as missing values.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|value| !value.is_empty())
}

pub fn parse_url(url: &str) -> Result<Url, Error> {
  let mut url = url.to_owned();

  while url.ends_with('/') {
    // Removes the URL trailing slashes
    url.pop();
  }

  let url = Url::parse(url.as_str())?;
  Ok(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_local_part_takes_text_before_at() {
    assert_eq!(email_local_part("a@b.com"), "a");
    assert_eq!(email_local_part("first.last@example.org"), "first.last");
    assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
    assert_eq!(email_local_part("@b.com"), "");
  }

  #[test]
  fn non_empty_ignores_blank_values() {
    assert_eq!(non_empty(Some("  ")), None);
    assert_eq!(non_empty(None), None);
    assert_eq!(non_empty(Some(" Al ")), Some("Al"));
  }

  #[test]
  fn random_strings_have_requested_size() {
    let value = create_random_string(32);
    assert_eq!(value.len(), 32);
    assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
  }

  #[test]
  fn parse_url_strips_trailing_slashes() {
    let url = parse_url("https://abc.supabase.co//").unwrap();
    assert_eq!(url.as_str(), "https://abc.supabase.co/");
  }
}

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::components::navigation;
use crate::errors::Notice;

const STYLES: &str = "
  body { font-family: Arial, Helvetica, sans-serif; margin: 0; background: #f4f5f7; }
  .navbar { display: flex; align-items: center; gap: 1rem; padding: .75rem 1.5rem; background: #e9ecef; }
  .navbar .brand { font-weight: bold; color: inherit; text-decoration: none; }
  .navbar .account { margin-left: auto; display: flex; gap: .5rem; align-items: center; }
  .container { max-width: 40rem; margin: 2rem auto; padding: 1.5rem; background: #fff; border-radius: .5rem; }
  .avatar { width: 100px; height: 100px; object-fit: cover; border-radius: 50%; }
  .field { margin-bottom: .75rem; }
  .field label { display: block; font-weight: bold; }
  .notice { padding: .75rem; margin-bottom: 1rem; border-radius: .25rem; background: #f8d7da; color: #842029; }
  .muted { color: #6c757d; }
";

pub fn page(title: &str, email: Option<&str>, refresh: bool, body: Markup) -> Markup {
  html! {
    (DOCTYPE)
    html lang="en" {
      head {
        meta charset="utf-8";
        meta name="viewport" content="width=device-width, initial-scale=1";
        @if refresh {
          meta http-equiv="refresh" content="1";
        }
        title { (title) " | The Gift List" }
        style { (PreEscaped(STYLES)) }
      }
      body {
        (navigation::view::navbar(email))
        main class="container" { (body) }
      }
    }
  }
}

pub fn notice(notice: &Notice) -> Markup {
  html! {
    div class="notice" role="alert" data-kind=(notice.kind) {
      (notice.message)
    }
  }
}

pub fn error_page(status: StatusCode, error: &Notice) -> Markup {
  let title = status.canonical_reason().unwrap_or("Error");
  let body = html! {
    h2 { (status.as_u16()) " " (title) }
    (notice(error))
    p { a href="/" { "Back to the start page" } }
  };

  page(title, None, false, body)
}

pub fn render(status: StatusCode, markup: Markup) -> HttpResponse {
  HttpResponse::build(status)
    .content_type("text/html; charset=utf-8")
    .body(markup.into_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::Error;

  #[test]
  fn error_page_shows_status_and_message() {
    let markup = error_page(StatusCode::BAD_GATEWAY, &Notice::from(Error::persistence("boom")));
    let html = markup.into_string();

    assert!(html.contains("502 Bad Gateway"));
    assert!(html.contains("boom"));
    assert!(html.contains(r#"data-kind="persistence""#));
  }

  #[test]
  fn refresh_is_only_added_on_request() {
    let quiet = page("Profile", None, false, html! {}).into_string();
    let refreshing = page("Profile", None, true, html! {}).into_string();

    assert!(!quiet.contains("http-equiv"));
    assert!(refreshing.contains(r#"http-equiv="refresh""#));
  }
}

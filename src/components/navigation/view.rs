use maud::{html, Markup};

pub fn navbar(email: Option<&str>) -> Markup {
  html! {
    nav class="navbar" {
      a class="brand" href="/" { "The Gift List" }
      @if let Some(email) = email {
        a href="#" { "Dashboard" }
        a href="#" { "Lists" }
        div class="account" {
          span { "Logged in as " (email) }
          form method="post" action="/sign-out" {
            button type="submit" { "Sign out" }
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signed_in_navbar_shows_email_and_sign_out() {
    let html = navbar(Some("a@b.com")).into_string();

    assert!(html.contains("Logged in as a@b.com"));
    assert!(html.contains(r#"action="/sign-out""#));
  }

  #[test]
  fn signed_out_navbar_only_shows_brand() {
    let html = navbar(None).into_string();

    assert!(html.contains("The Gift List"));
    assert!(!html.contains("Sign out"));
  }
}

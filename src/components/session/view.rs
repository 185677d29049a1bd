use maud::{html, Markup};

use crate::components::layout;
use crate::errors::Notice;

pub fn sign_in_page(email: &str, error: Option<&Notice>) -> Markup {
  let body = html! {
    h2 { "Sign in" }
    @if let Some(error) = error {
      (layout::notice(error))
    }
    form method="post" action="/sign-in" {
      div class="field" {
        label for="email" { "Email address" }
        input type="email" id="email" name="email" value=(email) required;
      }
      div class="field" {
        label for="password" { "Password" }
        input type="password" id="password" name="password" required;
      }
      button type="submit" { "Sign in" }
    }
  };

  layout::page("Sign in", None, false, body)
}

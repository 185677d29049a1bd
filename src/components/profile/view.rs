use maud::{html, Markup};

use crate::components::layout;
use crate::components::profile::editor::{Draft, EditorState};
use crate::components::profile::page::Operation;
use crate::errors::Notice;
use crate::models::profile::Profile;

pub fn profile_page(email: &str, state: &EditorState, busy: Option<Operation>) -> Markup {
  let body = match state {
    EditorState::Loading => loading(),
    EditorState::Failed { error } => failed(error, busy.is_some()),
    EditorState::Viewing { profile } => viewing(email, profile),
    EditorState::Editing {
      profile,
      draft,
      error,
    } => editing(email, profile, draft, error.as_ref(), busy == Some(Operation::Save)),
  };

  // The page polls while the bootstrap runs in another request.
  let refresh = *state == EditorState::Loading;
  layout::page("Profile", Some(email), refresh, body)
}

fn loading() -> Markup {
  html! {
    p class="muted" { "Loading user..." }
  }
}

fn failed(error: &Notice, busy: bool) -> Markup {
  html! {
    h2 { "Profile" }
    (layout::notice(error))
    form method="post" action="/profile/retry" {
      button type="submit" disabled[busy] { "Try again" }
    }
  }
}

fn avatar(url: &str) -> Markup {
  html! {
    @if url.is_empty() {
      p class="muted" { "No avatar available." }
    } @else {
      img class="avatar" src=(url) alt="User Avatar";
    }
  }
}

fn viewing(email: &str, profile: &Profile) -> Markup {
  html! {
    h2 { "Profile" }
    (avatar(&profile.avatar_url))
    div class="field" { label { "Name:" } (profile.full_name) }
    div class="field" { label { "Email:" } (email) }
    div class="field" { label { "Phone:" } (phone(profile)) }
    form method="post" action="/profile/edit" {
      button type="submit" { "Edit Profile" }
    }
  }
}

// Inputs show what the user typed, with the stored value as the hint.
fn editing(
  email: &str,
  profile: &Profile,
  draft: &Draft,
  error: Option<&Notice>,
  saving: bool,
) -> Markup {
  html! {
    h2 { "Edit Profile" }
    @if let Some(error) = error {
      (layout::notice(error))
    }
    (avatar(&profile.avatar_url))
    form method="post" action="/profile/save" {
      div class="field" {
        label for="full_name" { "Full Name:" }
        input type="text" id="full_name" name="full_name"
          value=(draft.full_name) placeholder=(profile.full_name);
      }
      div class="field" {
        label { "Email Address:" }
        (email)
      }
      div class="field" {
        label for="avatar_url" { "Avatar URL:" }
        input type="url" id="avatar_url" name="avatar_url"
          value=(draft.avatar_url) placeholder=(profile.avatar_url);
      }
      div class="field" {
        label for="phone" { "Phone:" }
        input type="tel" id="phone" name="phone"
          value=(draft.phone) placeholder=(phone(profile));
      }
      button type="submit" disabled[saving] {
        @if saving { "Saving..." } @else { "Save Changes" }
      }
      " "
      button type="submit" formaction="/profile/cancel" formnovalidate disabled[saving] {
        "Cancel"
      }
    }
  }
}

fn phone(profile: &Profile) -> &str {
  profile.phone.as_deref().unwrap_or("")
}

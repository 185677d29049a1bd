//! Profile editor state machine.
//!
//! Every transition consumes the current state and returns the next one.
//! A transition that does not apply to the current state returns it
//! unchanged, so the UI can forward user actions without checking first.

use crate::errors::Notice;
use crate::models::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  FullName,
  AvatarUrl,
  Phone,
}

/// What the user typed while editing. Fields start empty; an empty field
/// means "keep the persisted value".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
  pub full_name: String,
  pub avatar_url: String,
  pub phone: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
  Loading,
  Viewing {
    profile: Profile,
  },
  Editing {
    profile: Profile,
    draft: Draft,
    error: Option<Notice>,
  },
  Failed {
    error: Notice,
  },
}

impl Draft {
  #[cfg(test)]
  pub fn get(&self, field: Field) -> &str {
    match field {
      Field::FullName => &self.full_name,
      Field::AvatarUrl => &self.avatar_url,
      Field::Phone => &self.phone,
    }
  }

  pub fn set(&mut self, field: Field, value: String) {
    match field {
      Field::FullName => self.full_name = value,
      Field::AvatarUrl => self.avatar_url = value,
      Field::Phone => self.phone = value,
    }
  }

  /// The profile this draft would produce if saved now.
  pub fn apply_to(&self, profile: &Profile) -> Profile {
    Profile {
      id: profile.id.clone(),
      full_name: fallback(&self.full_name, &profile.full_name),
      avatar_url: fallback(&self.avatar_url, &profile.avatar_url),
      phone: if self.phone.is_empty() {
        profile.phone.clone()
      } else {
        Some(self.phone.clone())
      },
    }
  }
}

fn fallback(draft: &str, persisted: &str) -> String {
  if draft.is_empty() {
    persisted.to_owned()
  } else {
    draft.to_owned()
  }
}

impl Default for EditorState {
  fn default() -> Self {
    EditorState::Loading
  }
}

impl EditorState {
  pub fn loaded(self, profile: Profile) -> Self {
    match self {
      EditorState::Loading => EditorState::Viewing { profile },
      state => state,
    }
  }

  pub fn load_failed(self, error: Notice) -> Self {
    match self {
      EditorState::Loading => EditorState::Failed { error },
      state => state,
    }
  }

  pub fn retry(self) -> Self {
    match self {
      EditorState::Failed { .. } => EditorState::Loading,
      state => state,
    }
  }

  pub fn edit(self) -> Self {
    match self {
      EditorState::Viewing { profile } => EditorState::Editing {
        profile,
        draft: Draft::default(),
        error: None,
      },
      state => state,
    }
  }

  pub fn input(self, field: Field, value: String) -> Self {
    match self {
      EditorState::Editing {
        profile,
        mut draft,
        error,
      } => {
        draft.set(field, value);
        EditorState::Editing {
          profile,
          draft,
          error,
        }
      }
      state => state,
    }
  }

  pub fn cancel(self) -> Self {
    match self {
      EditorState::Editing { profile, .. } => EditorState::Viewing { profile },
      state => state,
    }
  }

  /// The record a save would persist, if the editor is editing.
  pub fn pending_save(&self) -> Option<Profile> {
    match self {
      EditorState::Editing { profile, draft, .. } => Some(draft.apply_to(profile)),
      _ => None,
    }
  }

  pub fn saved(self, profile: Profile) -> Self {
    match self {
      EditorState::Editing { .. } => EditorState::Viewing { profile },
      state => state,
    }
  }

  /// Keeps the draft so nothing the user typed is lost.
  pub fn save_failed(self, notice: Notice) -> Self {
    match self {
      EditorState::Editing { profile, draft, .. } => EditorState::Editing {
        profile,
        draft,
        error: Some(notice),
      },
      state => state,
    }
  }

  /// The values currently on screen.
  #[cfg(test)]
  pub fn displayed(&self) -> Option<&Profile> {
    match self {
      EditorState::Viewing { profile } | EditorState::Editing { profile, .. } => Some(profile),
      _ => None,
    }
  }

  #[cfg(test)]
  pub fn error(&self) -> Option<&Notice> {
    match self {
      EditorState::Editing { error, .. } => error.as_ref(),
      EditorState::Failed { error } => Some(error),
      _ => None,
    }
  }

  pub fn is_editing(&self) -> bool {
    matches!(self, EditorState::Editing { .. })
  }
}

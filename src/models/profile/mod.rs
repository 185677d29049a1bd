pub mod memory;
pub mod model;

use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::Identity;
use crate::lib::util::{email_local_part, non_empty};
use crate::settings::Settings;

pub const TABLE: &str = "profiles";
pub const COLUMNS: &str = "id,full_name,avatar_url,phone";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub id: String,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub full_name: String,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub avatar_url: String,
  #[serde(default)]
  pub phone: Option<String>,
}

/// The editable columns, written as a whole on every save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileChanges {
  pub full_name: String,
  pub avatar_url: String,
  pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfileDefaults {
  pub avatar_placeholder: String,
  pub phone_placeholder: String,
}

impl Profile {
  /// The record created for an identity seen for the first time. Provider
  /// metadata wins; otherwise the name comes from the email address and the
  /// avatar and phone from the configured placeholders.
  pub fn default_for(identity: &Identity, defaults: &ProfileDefaults) -> Self {
    let metadata = &identity.metadata;

    let full_name = non_empty(metadata.full_name.as_deref())
      .unwrap_or_else(|| email_local_part(&identity.email));
    let avatar_url = non_empty(metadata.avatar_url.as_deref())
      .unwrap_or_else(|| defaults.avatar_placeholder.as_str());
    let phone = non_empty(metadata.phone.as_deref())
      .unwrap_or_else(|| defaults.phone_placeholder.as_str());

    Self {
      id: identity.id.clone(),
      full_name: full_name.to_owned(),
      avatar_url: avatar_url.to_owned(),
      phone: Some(phone.to_owned()),
    }
  }

  pub fn changes(&self) -> ProfileChanges {
    ProfileChanges {
      full_name: self.full_name.clone(),
      avatar_url: self.avatar_url.clone(),
      phone: self.phone.clone(),
    }
  }

  pub fn apply(&self, changes: &ProfileChanges) -> Self {
    Self {
      id: self.id.clone(),
      full_name: changes.full_name.clone(),
      avatar_url: changes.avatar_url.clone(),
      phone: changes.phone.clone(),
    }
  }
}

impl ProfileDefaults {
  pub fn new(settings: &Settings) -> Self {
    Self {
      avatar_placeholder: settings.profile.avatar_placeholder.clone(),
      phone_placeholder: settings.profile.phone_placeholder.clone(),
    }
  }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

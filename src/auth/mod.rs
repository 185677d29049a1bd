pub mod gotrue;
pub mod memory;
pub mod resolver;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

pub use resolver::{SessionEvent, SessionResolver, Subscription};

// Access tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN_SECS: i64 = 10;

/// Profile hints the identity provider keeps for a user. Social providers
/// fill these in on first sign-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
  pub full_name: Option<String>,
  pub avatar_url: Option<String>,
  pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
  pub id: String,
  pub email: String,
  pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct Session {
  pub access_token: String,
  pub refresh_token: Option<String>,
  pub expires_at: DateTime<Utc>,
  pub identity: Identity,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
  }
}

/// The hosted identity service. Implementations report rejected
/// credentials or tokens as `Error::Unauthenticated` and every other
/// failure as `Error::AuthUnavailable`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
  async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, Error>;

  async fn get_user(&self, access_token: &str) -> Result<Identity, Error>;

  async fn refresh(&self, refresh_token: &str) -> Result<Session, Error>;

  async fn sign_out(&self, access_token: &str) -> Result<(), Error>;
}

#[cfg(test)]
pub fn identity(id: &str, email: &str) -> Identity {
  Identity {
    id: id.to_owned(),
    email: email.to_owned(),
    metadata: Metadata::default(),
  }
}

#[cfg(test)]
pub fn session_for(identity: Identity) -> Session {
  Session {
    access_token: format!("token-{}", identity.id),
    refresh_token: None,
    expires_at: Utc::now() + chrono::Duration::hours(1),
    identity,
  }
}

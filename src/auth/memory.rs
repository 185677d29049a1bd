use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::auth::{Identity, IdentityProvider, Session};
use crate::errors::Error;
use crate::lib::token::{self, Claims};
use crate::lib::util::{self, lock};

const DEFAULT_TTL_MINUTES: i64 = 60;

struct Account {
  password: String,
  identity: Identity,
}

#[derive(Default)]
struct State {
  // Keyed by email.
  accounts: HashMap<String, Account>,
  // Refresh token to user id.
  refresh_tokens: HashMap<String, String>,
  revoked_sessions: HashSet<String>,
  offline: bool,
}

/// Identity provider that keeps its accounts in process. Used by the
/// `memory` backend for local development and by the tests. Access tokens
/// are real JWTs signed with a local secret.
pub struct MemoryIdentityProvider {
  secret: String,
  ttl: Mutex<chrono::Duration>,
  state: Mutex<State>,
}

impl MemoryIdentityProvider {
  pub fn new(secret: &str) -> Self {
    Self {
      secret: secret.to_owned(),
      ttl: Mutex::new(chrono::Duration::minutes(DEFAULT_TTL_MINUTES)),
      state: Mutex::new(State::default()),
    }
  }

  pub fn with_account(self, identity: Identity, password: &str) -> Self {
    self.add_account(identity, password);
    self
  }

  pub fn add_account(&self, identity: Identity, password: &str) {
    let account = Account {
      password: password.to_owned(),
      identity,
    };
    lock(&self.state)
      .accounts
      .insert(account.identity.email.clone(), account);
  }

  /// Lifetime of access tokens issued from now on.
  #[cfg(test)]
  pub fn set_ttl(&self, ttl: chrono::Duration) {
    *lock(&self.ttl) = ttl;
  }

  /// Simulates an outage of the identity service.
  #[cfg(test)]
  pub fn set_offline(&self, offline: bool) {
    lock(&self.state).offline = offline;
  }

  fn ensure_online(&self) -> Result<(), Error> {
    if lock(&self.state).offline {
      return Err(Error::auth_unavailable("memory identity provider is offline"));
    }
    Ok(())
  }

  fn issue_session(&self, identity: Identity) -> Result<Session, Error> {
    let ttl = *lock(&self.ttl);
    let mut claims = Claims::new(&identity.id, &identity.email, ttl);
    claims.session_id = Some(util::create_random_string(16));

    let access_token = token::create_token(&claims, &self.secret).map_err(Error::auth_unavailable)?;
    let refresh_token = util::create_random_string(32);

    lock(&self.state)
      .refresh_tokens
      .insert(refresh_token.clone(), identity.id.clone());

    Ok(Session {
      access_token,
      refresh_token: Some(refresh_token),
      expires_at: claims.expires_at(),
      identity,
    })
  }

  fn find_by_id(&self, id: &str) -> Option<Identity> {
    lock(&self.state)
      .accounts
      .values()
      .find(|account| account.identity.id == id)
      .map(|account| account.identity.clone())
  }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
  async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, Error> {
    self.ensure_online()?;

    let identity = {
      let state = lock(&self.state);
      match state.accounts.get(email) {
        Some(account) if account.password == password => account.identity.clone(),
        _ => return Err(Error::Unauthenticated),
      }
    };

    self.issue_session(identity)
  }

  async fn get_user(&self, access_token: &str) -> Result<Identity, Error> {
    self.ensure_online()?;

    let claims = token::decode_token(access_token, &self.secret)
      .map_err(|_| Error::Unauthenticated)?
      .claims;

    let revoked = match claims.session_id {
      Some(ref session_id) => lock(&self.state).revoked_sessions.contains(session_id),
      None => false,
    };
    if revoked {
      return Err(Error::Unauthenticated);
    }

    self.find_by_id(&claims.sub).ok_or(Error::Unauthenticated)
  }

  async fn refresh(&self, refresh_token: &str) -> Result<Session, Error> {
    self.ensure_online()?;

    // Refresh tokens are single use.
    let user_id = lock(&self.state).refresh_tokens.remove(refresh_token);
    let identity = user_id
      .and_then(|id| self.find_by_id(&id))
      .ok_or(Error::Unauthenticated)?;

    self.issue_session(identity)
  }

  async fn sign_out(&self, access_token: &str) -> Result<(), Error> {
    self.ensure_online()?;

    if let Ok(payload) = token::get_token_payload(access_token) {
      let mut state = lock(&self.state);
      if let Some(session_id) = payload.claims.session_id {
        state.revoked_sessions.insert(session_id);
      }
      let user_id = payload.claims.sub;
      state.refresh_tokens.retain(|_, owner| *owner != user_id);
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::identity;
  use crate::errors::ErrorKind;

  fn provider() -> MemoryIdentityProvider {
    MemoryIdentityProvider::new("secret").with_account(identity("u1", "a@b.com"), "pw")
  }

  #[actix_rt::test]
  async fn signs_in_with_the_right_password_only() {
    let provider = provider();

    let session = provider.sign_in_with_password("a@b.com", "pw").await.unwrap();
    assert_eq!(session.identity.id, "u1");

    let err = provider.sign_in_with_password("a@b.com", "nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    let err = provider.sign_in_with_password("x@b.com", "pw").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
  }

  #[actix_rt::test]
  async fn issued_tokens_resolve_to_the_user() {
    let provider = provider();
    let session = provider.sign_in_with_password("a@b.com", "pw").await.unwrap();

    let user = provider.get_user(&session.access_token).await.unwrap();
    assert_eq!(user.email, "a@b.com");
  }

  #[actix_rt::test]
  async fn signed_out_tokens_are_rejected() {
    let provider = provider();
    let session = provider.sign_in_with_password("a@b.com", "pw").await.unwrap();

    provider.sign_out(&session.access_token).await.unwrap();

    let err = provider.get_user(&session.access_token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    let refresh_token = session.refresh_token.unwrap();
    let err = provider.refresh(&refresh_token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
  }

  #[actix_rt::test]
  async fn expired_tokens_are_rejected_but_refreshable() {
    let provider = provider();
    provider.set_ttl(chrono::Duration::minutes(-5));
    let session = provider.sign_in_with_password("a@b.com", "pw").await.unwrap();

    let err = provider.get_user(&session.access_token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    provider.set_ttl(chrono::Duration::minutes(5));
    let refreshed = provider
      .refresh(session.refresh_token.as_deref().unwrap())
      .await
      .unwrap();
    assert!(provider.get_user(&refreshed.access_token).await.is_ok());
  }

  #[actix_rt::test]
  async fn offline_provider_is_unavailable() {
    let provider = provider();
    provider.set_offline(true);

    let err = provider.sign_in_with_password("a@b.com", "pw").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthUnavailable);
  }
}

use chrono::Utc;
use futures::channel::mpsc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::auth::{Identity, IdentityProvider, Session};
use crate::errors::Error;
use crate::lib::util::lock;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
  SignedIn(Identity),
  SignedOut,
}

type Listeners = Arc<Mutex<HashMap<u64, mpsc::UnboundedSender<SessionEvent>>>>;

/// Holds the session of one presentation surface and tells subscribers
/// when it starts or ends.
pub struct SessionResolver {
  provider: Arc<dyn IdentityProvider>,
  session: Mutex<Option<Session>>,
  listeners: Listeners,
  next_listener: AtomicU64,
}

/// Receives session events until dropped. Dropping it unregisters the
/// listener.
pub struct Subscription {
  id: u64,
  listeners: Listeners,
  receiver: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Subscription {
  /// Next queued event, without waiting.
  pub fn try_next(&mut self) -> Option<SessionEvent> {
    self.receiver.try_next().ok().flatten()
  }

  pub fn drain(&mut self) -> Vec<SessionEvent> {
    std::iter::from_fn(|| self.try_next()).collect()
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    lock(&self.listeners).remove(&self.id);
  }
}

impl SessionResolver {
  pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
    Self {
      provider,
      session: Mutex::new(None),
      listeners: Arc::new(Mutex::new(HashMap::new())),
      next_listener: AtomicU64::new(0),
    }
  }

  pub fn subscribe(&self) -> Subscription {
    let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
    let (sender, receiver) = mpsc::unbounded();
    lock(&self.listeners).insert(id, sender);

    Subscription {
      id,
      listeners: self.listeners.clone(),
      receiver,
    }
  }

  #[cfg(test)]
  pub fn listener_count(&self) -> usize {
    lock(&self.listeners).len()
  }

  pub fn session(&self) -> Option<Session> {
    lock(&self.session).clone()
  }

  /// Resolves the signed-in identity, refreshing an expired access token
  /// first. `Ok(None)` means there is no session, including when the
  /// provider rejects the stored one. Provider outages are errors.
  pub async fn current(&self) -> Result<Option<Identity>, Error> {
    let mut session = match self.session() {
      Some(session) => session,
      None => return Ok(None),
    };

    if session.is_expired(Utc::now()) {
      session = match self.refresh(session).await? {
        Some(session) => session,
        None => return Ok(None),
      };
    }

    match self.provider.get_user(&session.access_token).await {
      Ok(identity) => {
        let mut stored = lock(&self.session);
        if let Some(ref mut stored) = *stored {
          if stored.access_token == session.access_token {
            stored.identity = identity.clone();
          }
        }
        Ok(Some(identity))
      }
      Err(Error::Unauthenticated) => {
        info!("Stored session for {} was rejected", session.identity.email);
        self.end_session(&session.access_token);
        Ok(None)
      }
      Err(err) => Err(err),
    }
  }

  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, Error> {
    let session = self.provider.sign_in_with_password(email, password).await?;
    let identity = session.identity.clone();

    *lock(&self.session) = Some(session);
    info!("Signed in {}", identity.email);
    self.emit(SessionEvent::SignedIn(identity.clone()));

    Ok(identity)
  }

  /// Ends the session locally even when the provider cannot be reached.
  pub async fn sign_out(&self) {
    let session = lock(&self.session).take();

    if let Some(session) = session {
      if let Err(err) = self.provider.sign_out(&session.access_token).await {
        warn!("Failed to revoke session for {}: {}", session.identity.email, err);
      }
      info!("Signed out {}", session.identity.email);
    }

    self.emit(SessionEvent::SignedOut);
  }

  async fn refresh(&self, session: Session) -> Result<Option<Session>, Error> {
    let refresh_token = match session.refresh_token {
      Some(ref token) => token.clone(),
      None => {
        self.end_session(&session.access_token);
        return Ok(None);
      }
    };

    match self.provider.refresh(&refresh_token).await {
      Ok(refreshed) => {
        let mut stored = lock(&self.session);
        match *stored {
          // A sign-out or a new sign-in happened meanwhile.
          Some(ref current) if current.access_token != session.access_token => {
            return Ok(current.clone().into())
          }
          None => return Ok(None),
          _ => {}
        }
        debug!("Refreshed session for {}", refreshed.identity.email);
        *stored = Some(refreshed.clone());
        Ok(Some(refreshed))
      }
      Err(Error::Unauthenticated) => {
        self.end_session(&session.access_token);
        Ok(None)
      }
      Err(err) => Err(err),
    }
  }

  // Only ends the session if it is still the one that was checked.
  fn end_session(&self, access_token: &str) {
    let ended = {
      let mut stored = lock(&self.session);
      match *stored {
        Some(ref current) if current.access_token == access_token => {
          *stored = None;
          true
        }
        _ => false,
      }
    };

    if ended {
      self.emit(SessionEvent::SignedOut);
    }
  }

  fn emit(&self, event: SessionEvent) {
    let mut listeners = lock(&self.listeners);
    listeners.retain(|_, sender| sender.unbounded_send(event.clone()).is_ok());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::identity;
  use crate::auth::memory::MemoryIdentityProvider;
  use crate::errors::ErrorKind;

  fn provider() -> Arc<MemoryIdentityProvider> {
    Arc::new(MemoryIdentityProvider::new("secret").with_account(identity("u1", "a@b.com"), "pw"))
  }

  #[actix_rt::test]
  async fn no_session_resolves_to_none() {
    let resolver = SessionResolver::new(provider());
    assert_eq!(resolver.current().await.unwrap(), None);
  }

  #[actix_rt::test]
  async fn sign_in_notifies_subscribers_and_resolves() {
    let resolver = SessionResolver::new(provider());
    let mut subscription = resolver.subscribe();

    let identity = resolver.sign_in("a@b.com", "pw").await.unwrap();

    assert_eq!(subscription.try_next(), Some(SessionEvent::SignedIn(identity.clone())));
    assert_eq!(resolver.current().await.unwrap(), Some(identity));
  }

  #[actix_rt::test]
  async fn sign_out_notifies_and_clears_session() {
    let resolver = SessionResolver::new(provider());
    let mut subscription = resolver.subscribe();
    resolver.sign_in("a@b.com", "pw").await.unwrap();

    resolver.sign_out().await;

    let events = subscription.drain();
    assert_eq!(events.last(), Some(&SessionEvent::SignedOut));
    assert!(resolver.session().is_none());
    assert_eq!(resolver.current().await.unwrap(), None);
  }

  #[actix_rt::test]
  async fn dropping_subscription_unregisters_it() {
    let resolver = SessionResolver::new(provider());
    let first = resolver.subscribe();
    let second = resolver.subscribe();
    assert_eq!(resolver.listener_count(), 2);

    drop(first);
    assert_eq!(resolver.listener_count(), 1);

    drop(second);
    assert_eq!(resolver.listener_count(), 0);
    resolver.sign_in("a@b.com", "pw").await.unwrap();
  }

  #[actix_rt::test]
  async fn outage_is_an_error_not_a_missing_session() {
    let provider = provider();
    let resolver = SessionResolver::new(provider.clone());
    resolver.sign_in("a@b.com", "pw").await.unwrap();

    provider.set_offline(true);
    let err = resolver.current().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthUnavailable);

    // The session survives the outage.
    provider.set_offline(false);
    assert!(resolver.current().await.unwrap().is_some());
  }

  #[actix_rt::test]
  async fn bad_credentials_are_unauthenticated() {
    let resolver = SessionResolver::new(provider());
    let mut subscription = resolver.subscribe();

    let err = resolver.sign_in("a@b.com", "wrong").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert_eq!(subscription.try_next(), None);
  }

  #[actix_rt::test]
  async fn expired_session_is_refreshed_before_use() {
    let provider = provider();
    let resolver = SessionResolver::new(provider.clone());
    provider.set_ttl(chrono::Duration::minutes(-1));
    resolver.sign_in("a@b.com", "pw").await.unwrap();
    let expired = resolver.session().unwrap();

    provider.set_ttl(chrono::Duration::minutes(30));
    let identity = resolver.current().await.unwrap();

    assert_eq!(identity.map(|identity| identity.id), Some("u1".to_owned()));
    let refreshed = resolver.session().unwrap();
    assert_ne!(refreshed.access_token, expired.access_token);
    assert!(!refreshed.is_expired(Utc::now()));
  }

  #[actix_rt::test]
  async fn rejected_session_signs_out() {
    let provider = provider();
    let resolver = SessionResolver::new(provider.clone());
    resolver.sign_in("a@b.com", "pw").await.unwrap();
    let mut subscription = resolver.subscribe();

    // Revoked behind the resolver's back.
    let session = resolver.session().unwrap();
    provider.sign_out(&session.access_token).await.unwrap();

    assert_eq!(resolver.current().await.unwrap(), None);
    assert_eq!(subscription.try_next(), Some(SessionEvent::SignedOut));
    assert!(resolver.session().is_none());
  }
}

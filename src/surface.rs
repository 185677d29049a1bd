//! Presentation surfaces.
//!
//! A surface is the server-side half of one browser: it owns the session
//! resolver, a subscription to its session events, and the profile page
//! shown while signed in. The surface never changes its signed-in state by
//! itself; it applies the resolver's notifications instead.

use chrono::{DateTime, Utc};
use futures::future::{AbortRegistration, Abortable};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::auth::{IdentityProvider, Session, SessionEvent, SessionResolver, Subscription};
use crate::components::profile::bootstrap::read_or_create;
use crate::components::profile::editor::{Draft, EditorState};
use crate::components::profile::page::{Operation, ProfilePage};
use crate::errors::Error;
use crate::lib::util::{self, lock};
use crate::models::profile::{Profile, ProfileDefaults};
use crate::models::ProfileStore;
use crate::settings::Settings;

const SURFACE_ID_LENGTH: usize = 32;

pub enum Shell {
  SignedOut,
  SignedIn(ProfilePage),
}

/// A snapshot of a surface for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellView {
  SignedOut,
  SignedIn {
    email: String,
    state: EditorState,
    busy: Option<Operation>,
  },
}

struct Inner {
  shell: Shell,
  subscription: Subscription,
}

// Settles a ticket whose caller was dropped before the result came back.
struct Settle<'a> {
  surface: &'a Surface,
  ticket: u64,
  done: bool,
}

impl<'a> Settle<'a> {
  fn new(surface: &'a Surface, ticket: u64) -> Self {
    Self {
      surface,
      ticket,
      done: false,
    }
  }
}

impl Drop for Settle<'_> {
  fn drop(&mut self) {
    if !self.done {
      debug!("Surface {} dropped ticket {} mid-flight", self.surface.id, self.ticket);
      let ticket = self.ticket;
      self.surface.with_page(|page| page.abandon(ticket));
    }
  }
}

pub struct Surface {
  pub id: String,
  resolver: SessionResolver,
  profiles: Arc<dyn ProfileStore>,
  defaults: ProfileDefaults,
  timeout: Duration,
  tickets: AtomicU64,
  last_seen: Mutex<DateTime<Utc>>,
  inner: Mutex<Inner>,
}

impl Surface {
  pub fn new(
    id: String,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    defaults: ProfileDefaults,
    timeout: Duration,
  ) -> Self {
    let resolver = SessionResolver::new(identity);
    let subscription = resolver.subscribe();

    Self {
      id,
      resolver,
      profiles,
      defaults,
      timeout,
      tickets: AtomicU64::new(1),
      last_seen: Mutex::new(Utc::now()),
      inner: Mutex::new(Inner {
        shell: Shell::SignedOut,
        subscription,
      }),
    }
  }

  pub fn view(&self) -> ShellView {
    let inner = self.synced();
    match inner.shell {
      Shell::SignedOut => ShellView::SignedOut,
      Shell::SignedIn(ref page) => ShellView::SignedIn {
        email: page.identity().email.clone(),
        state: page.state().clone(),
        busy: page.busy(),
      },
    }
  }

  pub fn is_signed_in(&self) -> bool {
    matches!(self.synced().shell, Shell::SignedIn(_))
  }

  pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), Error> {
    let result = self.resolver.sign_in(email, password).await;
    drop(self.synced());
    result.map(|_| ())
  }

  pub async fn sign_out(&self) {
    self.resolver.sign_out().await;
    drop(self.synced());
  }

  /// Runs the profile bootstrap if the page is waiting for it. Failures end
  /// up in the editor state.
  pub async fn load_profile(&self) {
    let ticket = self.next_ticket();
    let registration = match self.with_page(|page| page.begin_load(ticket)) {
      Some(Some(registration)) => registration,
      _ => return,
    };

    let mut settle = Settle::new(self, ticket);
    let result = self.guarded(registration, self.bootstrap()).await;
    settle.done = true;
    self.with_page(|page| page.finish_load(ticket, result));
  }

  pub async fn save(&self, draft: Draft) {
    let ticket = self.next_ticket();
    let (pending, registration) = match self.with_page(|page| page.begin_save(ticket, draft)) {
      Some(Some(started)) => started,
      _ => return,
    };

    let mut settle = Settle::new(self, ticket);
    let result = self.guarded(registration, self.persist(pending)).await;
    settle.done = true;
    self.with_page(|page| page.finish_save(ticket, result));
  }

  pub fn edit(&self) {
    self.with_page(ProfilePage::edit);
  }

  pub fn cancel(&self) {
    self.with_page(ProfilePage::cancel);
  }

  pub fn retry(&self) {
    self.with_page(ProfilePage::retry);
  }

  pub fn touch(&self, now: DateTime<Utc>) {
    *lock(&self.last_seen) = now;
  }

  pub fn last_seen(&self) -> DateTime<Utc> {
    *lock(&self.last_seen)
  }

  async fn bootstrap(&self) -> Result<Profile, Error> {
    if self.resolver.current().await?.is_none() {
      return Err(Error::Unauthenticated);
    }
    let session = self.resolver.session().ok_or(Error::Unauthenticated)?;

    read_or_create(self.profiles.as_ref(), &session, &self.defaults).await
  }

  async fn persist(&self, profile: Profile) -> Result<Profile, Error> {
    let session = self.active_session().await?;
    self
      .profiles
      .update(&session, &profile.id, &profile.changes())
      .await
  }

  // Refreshes the session only when its access token has expired.
  async fn active_session(&self) -> Result<Session, Error> {
    let session = self.resolver.session().ok_or(Error::Unauthenticated)?;
    if !session.is_expired(Utc::now()) {
      return Ok(session);
    }

    self.resolver.current().await?.ok_or(Error::Unauthenticated)?;
    self.resolver.session().ok_or(Error::Unauthenticated)
  }

  async fn guarded<T, F>(&self, registration: AbortRegistration, work: F) -> Result<T, Error>
  where
    F: Future<Output = Result<T, Error>>,
  {
    let work = actix_rt::time::timeout(self.timeout, work);
    match Abortable::new(work, registration).await {
      Ok(Ok(result)) => result,
      Ok(Err(_)) => Err(Error::Timeout),
      Err(_) => Err(Error::Cancelled),
    }
  }

  fn with_page<T, F: FnOnce(&mut ProfilePage) -> T>(&self, f: F) -> Option<T> {
    let mut inner = self.synced();
    match inner.shell {
      Shell::SignedIn(ref mut page) => Some(f(page)),
      Shell::SignedOut => None,
    }
  }

  fn next_ticket(&self) -> u64 {
    self.tickets.fetch_add(1, Ordering::SeqCst)
  }

  // Locks the surface after applying pending session events. Replacing the
  // shell drops the previous page, which aborts its in-flight work.
  fn synced(&self) -> MutexGuard<'_, Inner> {
    let mut inner = lock(&self.inner);
    for event in inner.subscription.drain() {
      inner.shell = match event {
        SessionEvent::SignedIn(identity) => {
          debug!("Surface {} signed in as {}", self.id, identity.email);
          Shell::SignedIn(ProfilePage::new(identity))
        }
        SessionEvent::SignedOut => {
          debug!("Surface {} signed out", self.id);
          Shell::SignedOut
        }
      };
    }
    inner
  }
}

/// All open surfaces, keyed by the id stored in the browser cookie.
pub struct Surfaces {
  surfaces: Mutex<HashMap<String, Arc<Surface>>>,
  identity: Arc<dyn IdentityProvider>,
  profiles: Arc<dyn ProfileStore>,
  defaults: ProfileDefaults,
  timeout: Duration,
  idle_ttl: chrono::Duration,
}

impl Surfaces {
  pub fn new(
    settings: &Settings,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
  ) -> Self {
    Self {
      surfaces: Mutex::new(HashMap::new()),
      identity,
      profiles,
      defaults: ProfileDefaults::new(settings),
      timeout: settings.session.request_timeout(),
      idle_ttl: settings.session.idle_ttl(),
    }
  }

  pub fn find(&self, id: &str) -> Option<Arc<Surface>> {
    let surface = lock(&self.surfaces).get(id).cloned()?;
    surface.touch(Utc::now());
    Some(surface)
  }

  /// A new signed-out surface. It is not reachable through `find` until
  /// it is registered.
  pub fn create(&self) -> Arc<Surface> {
    Arc::new(Surface::new(
      util::create_random_string(SURFACE_ID_LENGTH),
      self.identity.clone(),
      self.profiles.clone(),
      self.defaults.clone(),
      self.timeout,
    ))
  }

  pub fn register(&self, surface: Arc<Surface>) {
    self.evict_idle(Utc::now());

    debug!("Registered surface {}", surface.id);
    lock(&self.surfaces).insert(surface.id.clone(), surface);
  }

  /// Tears down surfaces not seen within the idle TTL.
  pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
    let cutoff = now - self.idle_ttl;
    let mut surfaces = lock(&self.surfaces);
    let before = surfaces.len();
    surfaces.retain(|_, surface| surface.last_seen() >= cutoff);

    let evicted = before - surfaces.len();
    if evicted > 0 {
      debug!("Evicted {} idle surfaces", evicted);
    }
    evicted
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    lock(&self.surfaces).len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::memory::MemoryIdentityProvider;
  use crate::auth::identity;
  use crate::components::profile::bootstrap::tests::RacingStore;
  use crate::errors::ErrorKind;
  use crate::models::profile::memory::MemoryStore;
  use crate::models::profile::ProfileChanges;
  use async_trait::async_trait;
  use futures::future::{self, join, select, Either};

  struct StalledStore;

  #[async_trait]
  impl ProfileStore for StalledStore {
    async fn find_by_id(&self, _session: &Session, _id: &str) -> Result<Profile, Error> {
      future::pending().await
    }

    async fn create(&self, _session: &Session, _profile: &Profile) -> Result<Profile, Error> {
      future::pending().await
    }

    async fn update(
      &self,
      _session: &Session,
      _id: &str,
      _changes: &ProfileChanges,
    ) -> Result<Profile, Error> {
      future::pending().await
    }
  }

  // Reads work, updates never finish.
  struct StalledSaves(MemoryStore);

  #[async_trait]
  impl ProfileStore for StalledSaves {
    async fn find_by_id(&self, session: &Session, id: &str) -> Result<Profile, Error> {
      self.0.find_by_id(session, id).await
    }

    async fn create(&self, session: &Session, profile: &Profile) -> Result<Profile, Error> {
      self.0.create(session, profile).await
    }

    async fn update(
      &self,
      _session: &Session,
      _id: &str,
      _changes: &ProfileChanges,
    ) -> Result<Profile, Error> {
      future::pending().await
    }
  }

  fn provider() -> Arc<MemoryIdentityProvider> {
    let provider = MemoryIdentityProvider::new("secret")
      .with_account(identity("u1", "a@b.com"), "pw")
      .with_account(identity("u2", "c@d.com"), "pw");
    Arc::new(provider)
  }

  fn surface_with(store: Arc<dyn ProfileStore>, timeout: Duration) -> Surface {
    Surface::new(
      "s1".to_owned(),
      provider(),
      store,
      ProfileDefaults::new(&Settings::for_tests()),
      timeout,
    )
  }

  fn surface(store: Arc<MemoryStore>) -> Surface {
    surface_with(store, Duration::from_secs(2))
  }

  fn al() -> Profile {
    Profile {
      id: "u1".to_owned(),
      full_name: "Al".to_owned(),
      avatar_url: "https://x/al.png".to_owned(),
      phone: Some("555 0100".to_owned()),
    }
  }

  fn editor_state(surface: &Surface) -> EditorState {
    match surface.view() {
      ShellView::SignedIn { state, .. } => state,
      ShellView::SignedOut => panic!("surface is signed out"),
    }
  }

  #[actix_rt::test]
  async fn sign_in_shows_loading_until_bootstrap() {
    let store = Arc::new(MemoryStore::new());
    let surface = surface(store.clone());
    assert_eq!(surface.view(), ShellView::SignedOut);

    surface.sign_in("a@b.com", "pw").await.unwrap();
    assert_eq!(editor_state(&surface), EditorState::Loading);

    surface.load_profile().await;
    match editor_state(&surface) {
      EditorState::Viewing { profile } => assert_eq!(profile.full_name, "a"),
      state => panic!("unexpected state {:?}", state),
    }
    assert_eq!(store.len(), 1);
  }

  #[actix_rt::test]
  async fn existing_profile_is_shown_without_writes() {
    let store = Arc::new(MemoryStore::new().with_row(al()));
    let surface = surface(store.clone());
    surface.sign_in("a@b.com", "pw").await.unwrap();

    surface.load_profile().await;

    assert_eq!(editor_state(&surface), EditorState::Viewing { profile: al() });
    assert_eq!(store.writes(), 0);
  }

  #[actix_rt::test]
  async fn failed_sign_in_stays_signed_out() {
    let surface = surface(Arc::new(MemoryStore::new()));

    let err = surface.sign_in("a@b.com", "wrong").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert!(!surface.is_signed_in());
  }

  #[actix_rt::test]
  async fn saving_without_changes_is_a_no_op_on_values() {
    let store = Arc::new(MemoryStore::new().with_row(al()));
    let surface = surface(store.clone());
    surface.sign_in("a@b.com", "pw").await.unwrap();
    surface.load_profile().await;

    surface.edit();
    surface.save(Draft::default()).await;

    assert_eq!(editor_state(&surface), EditorState::Viewing { profile: al() });
    assert_eq!(store.row("u1"), Some(al()));
  }

  #[actix_rt::test]
  async fn cancel_leaves_stored_and_displayed_values() {
    let store = Arc::new(MemoryStore::new().with_row(al()));
    let surface = surface(store.clone());
    surface.sign_in("a@b.com", "pw").await.unwrap();
    surface.load_profile().await;

    surface.edit();
    surface.cancel();

    assert_eq!(editor_state(&surface), EditorState::Viewing { profile: al() });
    assert_eq!(store.writes(), 0);
  }

  #[actix_rt::test]
  async fn failed_save_keeps_draft_and_stored_record() {
    let store = Arc::new(MemoryStore::new().with_row(al()));
    let surface = surface(store.clone());
    surface.sign_in("a@b.com", "pw").await.unwrap();
    surface.load_profile().await;

    surface.edit();
    store.set_offline(true);
    let draft = Draft {
      full_name: "Bo".to_owned(),
      ..Draft::default()
    };
    surface.save(draft).await;
    store.set_offline(false);

    match editor_state(&surface) {
      EditorState::Editing { draft, error, profile } => {
        assert_eq!(draft.full_name, "Bo");
        assert_eq!(profile, al());
        assert_eq!(error.map(|error| error.kind), Some(ErrorKind::Persistence));
      }
      state => panic!("unexpected state {:?}", state),
    }
    assert_eq!(store.row("u1"), Some(al()));
  }

  #[actix_rt::test]
  async fn save_before_load_is_ignored() {
    let store = Arc::new(MemoryStore::new().with_row(al()));
    let surface = surface(store.clone());
    surface.sign_in("a@b.com", "pw").await.unwrap();

    surface.edit();
    surface.save(Draft::default()).await;

    assert_eq!(editor_state(&surface), EditorState::Loading);
    assert_eq!(store.writes(), 0);
  }

  #[actix_rt::test]
  async fn sign_out_is_driven_by_the_notification() {
    let surface = surface(Arc::new(MemoryStore::new()));
    surface.sign_in("a@b.com", "pw").await.unwrap();
    surface.load_profile().await;

    surface.sign_out().await;

    assert_eq!(surface.view(), ShellView::SignedOut);
  }

  #[actix_rt::test]
  async fn new_sign_in_discards_in_flight_bootstrap() {
    let store = Arc::new(RacingStore(MemoryStore::new()));
    let surface = surface_with(store.clone(), Duration::from_secs(2));
    surface.sign_in("a@b.com", "pw").await.unwrap();

    let supersede = async {
      surface.sign_in("c@d.com", "pw").await.unwrap();
    };
    join(surface.load_profile(), supersede).await;

    match surface.view() {
      ShellView::SignedIn { email, state, busy } => {
        assert_eq!(email, "c@d.com");
        assert_eq!(state, EditorState::Loading);
        assert_eq!(busy, None);
      }
      view => panic!("unexpected view {:?}", view),
    }
    // The aborted bootstrap never reached its insert.
    assert_eq!(store.0.row("u1"), None);

    surface.load_profile().await;
    match editor_state(&surface) {
      EditorState::Viewing { profile } => assert_eq!(profile.id, "u2"),
      state => panic!("unexpected state {:?}", state),
    }
  }

  #[actix_rt::test]
  async fn dropped_load_does_not_block_the_next_one() {
    let store = Arc::new(RacingStore(MemoryStore::new()));
    let surface = surface_with(store.clone(), Duration::from_secs(2));
    surface.sign_in("a@b.com", "pw").await.unwrap();

    // The load suspends inside the store and is dropped there.
    match select(Box::pin(surface.load_profile()), future::ready(())).await {
      Either::Left(_) => panic!("load finished before it was dropped"),
      Either::Right(_) => {}
    }

    match surface.view() {
      ShellView::SignedIn { state, busy, .. } => {
        assert_eq!(state, EditorState::Loading);
        assert_eq!(busy, None);
      }
      view => panic!("unexpected view {:?}", view),
    }

    surface.load_profile().await;
    match editor_state(&surface) {
      EditorState::Viewing { profile } => assert_eq!(profile.id, "u1"),
      state => panic!("unexpected state {:?}", state),
    }
  }

  #[actix_rt::test]
  async fn dropped_save_keeps_editing() {
    let store = Arc::new(StalledSaves(MemoryStore::new().with_row(al())));
    let surface = surface_with(store.clone(), Duration::from_secs(2));
    surface.sign_in("a@b.com", "pw").await.unwrap();
    surface.load_profile().await;
    surface.edit();

    let draft = Draft {
      full_name: "Bo".to_owned(),
      ..Draft::default()
    };
    match select(Box::pin(surface.save(draft)), future::ready(())).await {
      Either::Left(_) => panic!("save finished before it was dropped"),
      Either::Right(_) => {}
    }

    match surface.view() {
      ShellView::SignedIn { state, busy, .. } => {
        assert_eq!(state.error().map(|error| error.kind), Some(ErrorKind::Cancelled));
        assert_eq!(busy, None);
      }
      view => panic!("unexpected view {:?}", view),
    }

    surface.cancel();
    assert_eq!(editor_state(&surface), EditorState::Viewing { profile: al() });
    assert_eq!(store.0.row("u1"), Some(al()));
  }

  #[actix_rt::test]
  async fn slow_bootstrap_times_out() {
    let surface = surface_with(Arc::new(StalledStore), Duration::from_millis(20));
    surface.sign_in("a@b.com", "pw").await.unwrap();

    surface.load_profile().await;

    match editor_state(&surface) {
      EditorState::Failed { error } => assert_eq!(error.kind, ErrorKind::Timeout),
      state => panic!("unexpected state {:?}", state),
    }

    surface.retry();
    assert_eq!(editor_state(&surface), EditorState::Loading);
  }

  #[actix_rt::test]
  async fn auth_outage_fails_the_bootstrap() {
    let provider = provider();
    let surface = Surface::new(
      "s1".to_owned(),
      provider.clone(),
      Arc::new(MemoryStore::new()),
      ProfileDefaults::new(&Settings::for_tests()),
      Duration::from_secs(2),
    );
    surface.sign_in("a@b.com", "pw").await.unwrap();

    provider.set_offline(true);
    surface.load_profile().await;

    match editor_state(&surface) {
      EditorState::Failed { error } => assert_eq!(error.kind, ErrorKind::AuthUnavailable),
      state => panic!("unexpected state {:?}", state),
    }
  }

  #[test]
  fn idle_surfaces_are_evicted() {
    let mut settings = Settings::for_tests();
    settings.session.idle_ttl_secs = 60;
    let surfaces = Surfaces::new(&settings, provider(), Arc::new(MemoryStore::new()));

    let surface = surfaces.create();
    assert!(surfaces.find(&surface.id).is_none());

    surfaces.register(surface.clone());
    assert!(surfaces.find(&surface.id).is_some());
    assert_eq!(surfaces.len(), 1);

    assert_eq!(surfaces.evict_idle(Utc::now()), 0);
    assert_eq!(surfaces.evict_idle(Utc::now() + chrono::Duration::minutes(2)), 1);
    assert!(surfaces.find(&surface.id).is_none());
  }

  #[test]
  fn unknown_surfaces_are_not_found() {
    let surfaces = Surfaces::new(
      &Settings::for_tests(),
      provider(),
      Arc::new(MemoryStore::new()),
    );
    assert!(surfaces.find("nope").is_none());
  }
}

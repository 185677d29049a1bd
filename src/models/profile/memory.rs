use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::auth::Session;
use crate::errors::Error;
use crate::lib::util::lock;
use crate::models::profile::{Profile, ProfileChanges};
use crate::models::ProfileStore;

/// In-process `profiles` table for the `memory` backend and the tests.
#[derive(Default)]
pub struct MemoryStore {
  rows: Mutex<HashMap<String, Profile>>,
  writes: AtomicUsize,
  offline: Mutex<bool>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn with_row(self, profile: Profile) -> Self {
    lock(&self.rows).insert(profile.id.clone(), profile);
    self
  }

  pub fn row(&self, id: &str) -> Option<Profile> {
    lock(&self.rows).get(id).cloned()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    lock(&self.rows).len()
  }

  /// Number of successful inserts and updates.
  #[cfg(test)]
  pub fn writes(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  /// Simulates a store outage.
  #[cfg(test)]
  pub fn set_offline(&self, offline: bool) {
    *lock(&self.offline) = offline;
  }

  fn ensure_online(&self) -> Result<(), Error> {
    if *lock(&self.offline) {
      return Err(Error::persistence("memory store is offline"));
    }
    Ok(())
  }
}

#[async_trait]
impl ProfileStore for MemoryStore {
  async fn find_by_id(&self, _session: &Session, id: &str) -> Result<Profile, Error> {
    self.ensure_online()?;
    self.row(id).ok_or_else(|| Error::NotFound(id.to_owned()))
  }

  async fn create(&self, _session: &Session, profile: &Profile) -> Result<Profile, Error> {
    self.ensure_online()?;

    let mut rows = lock(&self.rows);
    if rows.contains_key(&profile.id) {
      return Err(Error::Conflict(profile.id.clone()));
    }
    rows.insert(profile.id.clone(), profile.clone());
    self.writes.fetch_add(1, Ordering::SeqCst);

    Ok(profile.clone())
  }

  async fn update(
    &self,
    _session: &Session,
    id: &str,
    changes: &ProfileChanges,
  ) -> Result<Profile, Error> {
    self.ensure_online()?;

    let mut rows = lock(&self.rows);
    let row = rows.get_mut(id).ok_or_else(|| Error::NotFound(id.to_owned()))?;
    *row = row.apply(changes);
    self.writes.fetch_add(1, Ordering::SeqCst);

    Ok(row.clone())
  }
}

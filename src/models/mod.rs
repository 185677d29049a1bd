pub mod profile;

use async_trait::async_trait;

use crate::auth::Session;
use crate::errors::Error;
use crate::models::profile::{Profile, ProfileChanges};

/// The `profiles` table. Every call runs on behalf of the session's user.
///
/// `find_by_id` reports a missing row as `Error::NotFound` and `create`
/// reports a duplicate id as `Error::Conflict`, so callers can tell those
/// apart from other store failures.
#[async_trait]
pub trait ProfileStore: Send + Sync {
  async fn find_by_id(&self, session: &Session, id: &str) -> Result<Profile, Error>;

  async fn create(&self, session: &Session, profile: &Profile) -> Result<Profile, Error>;

  async fn update(
    &self,
    session: &Session,
    id: &str,
    changes: &ProfileChanges,
  ) -> Result<Profile, Error>;
}

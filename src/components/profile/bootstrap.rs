use crate::auth::Session;
use crate::errors::Error;
use crate::models::profile::{Profile, ProfileDefaults};
use crate::models::ProfileStore;

/// Returns the profile of the session's user, creating the default record
/// the first time the user is seen. A concurrent first sign-in that wins
/// the insert is not an error: the row it created is read back instead.
pub async fn read_or_create(
  store: &dyn ProfileStore,
  session: &Session,
  defaults: &ProfileDefaults,
) -> Result<Profile, Error> {
  let identity = &session.identity;

  match store.find_by_id(session, &identity.id).await {
    Ok(profile) => {
      debug!("Found profile for {}", identity.email);
      return Ok(profile);
    }
    Err(Error::NotFound(_)) => {}
    Err(err) => {
      error!("Failed to fetch profile for {}: {}", identity.email, err);
      return Err(err);
    }
  }

  let profile = Profile::default_for(identity, defaults);
  debug!("Creating default profile for {}", identity.email);

  match store.create(session, &profile).await {
    Ok(created) => Ok(created),
    Err(Error::Conflict(_)) => {
      info!("Profile for {} was created concurrently, reading it back", identity.email);
      match store.find_by_id(session, &identity.id).await {
        // The row exists but this session cannot see it.
        Err(Error::NotFound(id)) => Err(Error::Persistence(format!(
          "profile {} exists but could not be read back",
          id
        ))),
        result => result,
      }
    }
    Err(err) => {
      error!("Failed to insert profile for {}: {}", identity.email, err);
      Err(err)
    }
  }
}

use std::sync::Arc;

use crate::auth::gotrue::GoTrue;
use crate::auth::memory::MemoryIdentityProvider;
use crate::auth::{Identity, IdentityProvider, Metadata};
use crate::database::Database;
use crate::errors::Error;
use crate::lib::util::{create_random_string, non_empty};
use crate::models::profile::memory::MemoryStore;
use crate::models::profile::model::Model;
use crate::models::ProfileStore;
use crate::settings::{Backend, Settings};
use crate::surface::Surfaces;

#[derive(Clone)]
pub struct Context {
  pub settings: Settings,
  pub surfaces: Arc<Surfaces>,
}

impl Context {
  pub fn new(settings: &Settings) -> Result<Self, Error> {
    let (identity, profiles): (Arc<dyn IdentityProvider>, Arc<dyn ProfileStore>) =
      match settings.backend {
        Backend::Supabase => {
          let database = Database::new(settings)?;
          (Arc::new(GoTrue::new(settings)?), Arc::new(Model::new(database)))
        }
        Backend::Memory => {
          warn!("Using the in-memory backend, nothing will be persisted");
          (Arc::new(seeded_provider(settings)), Arc::new(MemoryStore::new()))
        }
      };

    Ok(Self::with_backends(settings.clone(), identity, profiles))
  }

  pub fn with_backends(
    settings: Settings,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
  ) -> Self {
    let surfaces = Arc::new(Surfaces::new(&settings, identity, profiles));
    Self { settings, surfaces }
  }
}

fn seeded_provider(settings: &Settings) -> MemoryIdentityProvider {
  let seed = &settings.session.seed;
  let identity = Identity {
    id: create_random_string(16),
    email: seed.email.clone(),
    metadata: Metadata {
      full_name: non_empty(Some(&seed.full_name)).map(str::to_owned),
      ..Metadata::default()
    },
  };
  info!("Seeded account {}", seed.email);

  MemoryIdentityProvider::new(&create_random_string(32)).with_account(identity, &seed.password)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[actix_rt::test]
  async fn memory_backend_accepts_the_seed_account() {
    let settings = Settings::for_tests();
    let ctx = Context::new(&settings).unwrap();

    let surface = ctx.surfaces.create();
    surface.sign_in("a@b.com", "secret").await.unwrap();

    assert!(surface.is_signed_in());
  }

  #[test]
  fn supabase_backend_needs_a_valid_url() {
    let mut settings = Settings::for_tests();
    settings.backend = Backend::Supabase;
    settings.supabase.url = "not a url".to_owned();

    assert!(Context::new(&settings).is_err());
  }
}

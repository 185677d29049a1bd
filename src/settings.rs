use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;
use std::{env, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  Supabase,
  Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
  pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logger {
  pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Supabase {
  pub url: String,
  pub anon_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
  pub avatar_placeholder: String,
  pub phone_placeholder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Seed {
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
  pub request_timeout_ms: u64,
  pub idle_ttl_secs: i64,
  pub cookie_name: String,
  pub seed: Seed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub backend: Backend,
  pub server: Server,
  pub logger: Logger,
  pub supabase: Supabase,
  pub profile: Profile,
  pub session: Session,
}

impl Settings {
  pub fn new() -> Result<Self, ConfigError> {
    let mut settings = Config::new();
    let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    settings.merge(config::File::with_name("config/default"))?;
    settings.merge(config::File::with_name(&format!("config/{}", env)).required(false))?;
    settings.merge(config::File::with_name("config/local").required(false))?;

    // Eg: `APP__LOGGER__LEVEL=info ./target/giftlist` sets `logger.level`.
    settings.merge(config::Environment::with_prefix("app").separator("__"))?;

    // Some cloud services like Heroku expose a randomly assigned port in
    // the PORT env var and there is no way to change the env var name.
    if let Ok(port) = env::var("PORT") {
      settings.set("server.port", port)?;
    }

    // Names used by the Supabase tooling.
    if let Ok(url) = env::var("SUPABASE_URL") {
      settings.set("supabase.url", url)?;
    }
    if let Ok(key) = env::var("SUPABASE_ANON_KEY") {
      settings.set("supabase.anon_key", key)?;
    }

    settings.try_into()
  }
}

impl Session {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }

  pub fn idle_ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.idle_ttl_secs)
  }
}

impl fmt::Display for Server {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "http://localhost:{}", &self.port)
  }
}

#[cfg(test)]
impl Settings {
  pub fn for_tests() -> Self {
    Self {
      backend: Backend::Memory,
      server: Server { port: 0 },
      logger: Logger {
        level: "off".to_owned(),
      },
      supabase: Supabase {
        url: "http://localhost:54321".to_owned(),
        anon_key: String::new(),
      },
      profile: Profile {
        avatar_placeholder: "https://via.placeholder.com/100".to_owned(),
        phone_placeholder: "123 456 789".to_owned(),
      },
      session: Session {
        request_timeout_ms: 2_000,
        idle_ttl_secs: 3_600,
        cookie_name: "giftlist_surface".to_owned(),
        seed: Seed {
          email: "a@b.com".to_owned(),
          password: "secret".to_owned(),
          full_name: String::new(),
        },
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn loads_default_configuration_file() {
    let settings = Settings::new().expect("config/default.toml should load");

    assert_eq!(settings.profile.phone_placeholder, "123 456 789");
    assert_eq!(settings.session.request_timeout(), Duration::from_secs(10));
    assert!(!settings.session.cookie_name.is_empty());
  }

  #[test]
  fn server_displays_as_local_url() {
    let server = Server { port: 8080 };
    assert_eq!(server.to_string(), "http://localhost:8080");
  }
}

use std::env;

use crate::settings::Settings;

pub struct Logger;

impl Logger {
  pub fn setup(settings: &Settings) -> Result<(), log::SetLoggerError> {
    // An explicit RUST_LOG wins over the configured level.
    if env::var("RUST_LOG").is_err() {
      let level = settings.logger.level.as_str();
      env::set_var("RUST_LOG", format!("giftlist={},actix_web={}", level, level));
    }

    pretty_env_logger::try_init()
  }
}

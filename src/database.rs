use crate::errors::Error;
use crate::lib::util;
use crate::settings::Settings;

/// Connection to the Supabase PostgREST API. Requests run as the signed-in
/// user, so row level security applies to every query.
#[derive(Clone)]
pub struct Database {
  pub rest_url: String,
  pub anon_key: String,
  pub client: reqwest::Client,
}

impl Database {
  pub fn new(settings: &Settings) -> Result<Self, Error> {
    let url = util::parse_url(&settings.supabase.url)?;

    // Every store call is bounded by the same timeout as the auth calls.
    let client = reqwest::Client::builder()
      .timeout(settings.session.request_timeout())
      .build()
      .map_err(Error::persistence)?;

    Ok(Self {
      rest_url: format!("{}/rest/v1", url.as_str().trim_end_matches('/')),
      anon_key: settings.supabase.anon_key.clone(),
      client,
    })
  }

  pub fn table_url(&self, table: &str) -> String {
    format!("{}/{}", self.rest_url, table)
  }
}

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::auth::Session;
use crate::database::Database;
use crate::errors::Error;
use crate::models::profile::{Profile, ProfileChanges, COLUMNS, TABLE};
use crate::models::ProfileStore;

// Asks PostgREST for exactly one row instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
// PostgREST: the single-object request matched zero rows.
const NO_ROWS: &str = "PGRST116";
// Postgres: unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct Model {
  pub database: Database,
}

#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
  code: Option<String>,
  message: Option<String>,
}

impl Model {
  pub fn new(database: Database) -> Self {
    Self { database }
  }

  fn authorize(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
    request
      .header("apikey", self.database.anon_key.as_str())
      .bearer_auth(&session.access_token)
  }
}

#[async_trait]
impl ProfileStore for Model {
  async fn find_by_id(&self, session: &Session, id: &str) -> Result<Profile, Error> {
    let request = self
      .database
      .client
      .get(self.database.table_url(TABLE).as_str())
      .query(&[("id", format!("eq.{}", id)), ("select", COLUMNS.to_owned())])
      .header("Accept", SINGLE_OBJECT);

    let res = self
      .authorize(request, session)
      .send()
      .await
      .map_err(Error::persistence)?;

    check_response(res, id)
      .await?
      .json::<Profile>()
      .await
      .map_err(Error::persistence)
  }

  async fn create(&self, session: &Session, profile: &Profile) -> Result<Profile, Error> {
    let request = self
      .database
      .client
      .post(self.database.table_url(TABLE).as_str())
      .header("Accept", SINGLE_OBJECT)
      .header("Prefer", "return=representation")
      .json(profile);

    let res = self
      .authorize(request, session)
      .send()
      .await
      .map_err(Error::persistence)?;

    check_response(res, &profile.id)
      .await?
      .json::<Profile>()
      .await
      .map_err(Error::persistence)
  }

  async fn update(
    &self,
    session: &Session,
    id: &str,
    changes: &ProfileChanges,
  ) -> Result<Profile, Error> {
    let request = self
      .database
      .client
      .patch(self.database.table_url(TABLE).as_str())
      .query(&[("id", format!("eq.{}", id))])
      .header("Prefer", "return=representation")
      .json(changes);

    let res = self
      .authorize(request, session)
      .send()
      .await
      .map_err(Error::persistence)?;

    // An update that matched nothing comes back as an empty array.
    check_response(res, id)
      .await?
      .json::<Vec<Profile>>()
      .await
      .map_err(Error::persistence)?
      .into_iter()
      .next()
      .ok_or_else(|| Error::NotFound(id.to_owned()))
  }
}

async fn check_response(res: Response, id: &str) -> Result<Response, Error> {
  let status = res.status();
  if status.is_success() {
    return Ok(res);
  }

  let body = res.text().await.unwrap_or_default();
  Err(classify_failure(status, &body, id))
}

fn classify_failure(status: StatusCode, body: &str, id: &str) -> Error {
  let details = serde_json::from_str::<PostgrestError>(body).unwrap_or_default();

  match details.code.as_deref() {
    Some(NO_ROWS) => return Error::NotFound(id.to_owned()),
    Some(UNIQUE_VIOLATION) => return Error::Conflict(id.to_owned()),
    _ => {}
  }

  if status == StatusCode::CONFLICT {
    return Error::Conflict(id.to_owned());
  }

  let message = details.message.unwrap_or_else(|| body.to_owned());
  Error::Persistence(format!("{} {}", status, message))
}
